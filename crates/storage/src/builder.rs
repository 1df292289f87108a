use std::time::Duration;

use smm_relay_domain::storage::{StorageError, StorageResult};

use crate::RestStorage;

pub struct StorageBuilder {
    base_url: Option<String>,
    service_key: Option<String>,
    timeout: Duration,
}

impl Default for StorageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageBuilder {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new() -> Self {
        Self {
            base_url: None,
            service_key: None,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn service_key(mut self, key: impl Into<String>) -> Self {
        self.service_key = Some(key.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> StorageResult<RestStorage> {
        let url = self
            .base_url
            .ok_or_else(|| StorageError::Transport("missing datastore url".into()))?;
        let key = self
            .service_key
            .ok_or_else(|| StorageError::Transport("missing datastore service key".into()))?;
        RestStorage::connect(&url, &key, self.timeout)
    }
}
