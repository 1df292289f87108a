use async_trait::async_trait;
use smm_relay_domain::model::{Server, ServerId, Service, ServiceRef};
use smm_relay_domain::storage::{CatalogStore, StorageResult};

use crate::{RestStorage, Table};

#[async_trait]
impl CatalogStore for RestStorage {
    async fn find_service(&self, service: &ServiceRef) -> StorageResult<Option<Service>> {
        let id = service.to_string();
        self.select_one(Table::Services, &[("id", id.as_str())])
            .await
    }

    async fn find_server(&self, server: &ServerId) -> StorageResult<Option<Server>> {
        self.select_one(Table::Servers, &[("id", server.as_str())])
            .await
    }
}
