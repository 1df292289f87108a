use async_trait::async_trait;
use smm_relay_domain::model::{Customer, EmailAddress, NewCustomer};
use smm_relay_domain::storage::{CustomerStore, StorageResult};

use crate::{RestStorage, Table};

#[async_trait]
impl CustomerStore for RestStorage {
    async fn find_customer_by_email(
        &self,
        email: &EmailAddress,
    ) -> StorageResult<Option<Customer>> {
        self.select_one(Table::Customers, &[("email", email.as_str())])
            .await
    }

    async fn insert_customer(&self, customer: NewCustomer) -> StorageResult<Customer> {
        self.insert_one(Table::Customers, &customer).await
    }
}
