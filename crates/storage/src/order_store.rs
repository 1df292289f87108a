use async_trait::async_trait;
use smm_relay_domain::model::{ExternalOrderId, NewOrder, OrderId, OrderRecord, OrderStatusUpdate};
use smm_relay_domain::storage::{OrderStore, StorageResult};

use crate::{RestStorage, Table};

#[async_trait]
impl OrderStore for RestStorage {
    async fn insert_order(&self, order: NewOrder) -> StorageResult<OrderRecord> {
        self.insert_one(Table::Orders, &order).await
    }

    async fn mark_processing(
        &self,
        order: &OrderId,
        external_order_id: &ExternalOrderId,
    ) -> StorageResult<()> {
        let update = OrderStatusUpdate::processing(external_order_id.clone());
        self.update_where(Table::Orders, &[("id", order.as_str())], &update)
            .await
    }
}
