//! Datastore adapter that satisfies the domain storage traits over the
//! datastore's REST dialect (`{base}/rest/v1/{table}` with `column=eq.value`
//! filters and JSON-array bodies).

mod builder;
mod catalog_store;
mod customer_store;
mod order_store;
mod rows;


use std::{sync::Arc, time::Duration};

use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION},
    Client,
};
use smm_relay_domain::storage::{StorageError, StorageResult};

pub use builder::StorageBuilder;
pub use rows::Table;

/// Shared datastore handle. Cloning is cheap; all clones reuse one pooled
/// client whose default headers carry the service credential.
#[derive(Clone)]
pub struct RestStorage {
    base_url: String,
    client: Arc<Client>,
}

impl RestStorage {
    /// Builds the pooled client for `base_url`. No request is made until the
    /// first query.
    pub fn connect(base_url: &str, service_key: &str, timeout: Duration) -> StorageResult<Self> {
        let mut headers = HeaderMap::with_capacity(2);
        let key = HeaderValue::from_str(service_key)
            .map_err(|err| StorageError::Transport(format!("invalid service key: {err}")))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {service_key}"))
            .map_err(|err| StorageError::Transport(format!("invalid service key: {err}")))?;
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(StorageError::from_source)?;

        Ok(Self::from_client(base_url, client))
    }

    pub fn builder() -> StorageBuilder {
        StorageBuilder::new()
    }

    pub(crate) fn from_client(base_url: &str, client: Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Arc::new(client),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn client(&self) -> &Client {
        self.client.as_ref()
    }

    pub(crate) fn table_url(&self, table: Table) -> String {
        format!("{}/rest/v1/{}", self.base_url, table.as_str())
    }
}
