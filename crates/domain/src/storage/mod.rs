use async_trait::async_trait;
use thiserror::Error;

use crate::model::{
    Customer, EmailAddress, ExternalOrderId, NewCustomer, NewOrder, OrderId, OrderRecord, Server,
    ServerId, Service, ServiceRef,
};

/// Common result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("datastore unreachable: {0}")]
    Transport(String),
    #[error("datastore rejected request with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("could not decode datastore response: {0}")]
    Decode(String),
    #[error("datastore returned no `{0}` row")]
    MissingRow(&'static str),
}

impl StorageError {
    pub fn from_source(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }
}

#[async_trait]
pub trait CustomerStore: Send + Sync {
    async fn find_customer_by_email(&self, email: &EmailAddress)
        -> StorageResult<Option<Customer>>;
    async fn insert_customer(&self, customer: NewCustomer) -> StorageResult<Customer>;
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn find_service(&self, service: &ServiceRef) -> StorageResult<Option<Service>>;
    async fn find_server(&self, server: &ServerId) -> StorageResult<Option<Server>>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert_order(&self, order: NewOrder) -> StorageResult<OrderRecord>;
    async fn mark_processing(
        &self,
        order: &OrderId,
        external_order_id: &ExternalOrderId,
    ) -> StorageResult<()>;
}

/// Everything the webhook flow needs from the datastore.
pub trait RelayStore: CustomerStore + CatalogStore + OrderStore {}

impl<T> RelayStore for T where T: CustomerStore + CatalogStore + OrderStore {}
