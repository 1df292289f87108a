use reqwest::{header::HeaderValue, Response};
use serde::{
    de::{DeserializeOwned, IgnoredAny},
    Serialize,
};
use smm_relay_domain::storage::{StorageError, StorageResult};
use tracing::{debug, warn};

use crate::RestStorage;

const PREFER: &str = "Prefer";

/// Tables the relay touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Customers,
    Services,
    Servers,
    Orders,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Customers => "customers",
            Table::Services => "services",
            Table::Servers => "servers",
            Table::Orders => "orders",
        }
    }
}

/// Equality filter rendered as `column=eq.value`.
pub(crate) type Filter<'a> = (&'a str, &'a str);

fn filter_query<'a>(filters: &[Filter<'a>]) -> Vec<(&'a str, String)> {
    filters
        .iter()
        .map(|(column, value)| (*column, format!("eq.{value}")))
        .collect()
}

impl RestStorage {
    /// `GET` the first row matching every filter.
    pub(crate) async fn select_one<T>(
        &self,
        table: Table,
        filters: &[Filter<'_>],
    ) -> StorageResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        let mut query = filter_query(filters);
        query.push(("select", "*".to_string()));
        query.push(("limit", "1".to_string()));

        debug!(table = table.as_str(), "datastore select");
        let response = self
            .client()
            .get(self.table_url(table))
            .query(&query)
            .send()
            .await
            .map_err(StorageError::from_source)?;
        let rows: Vec<T> = decode_rows(table, response).await?;
        Ok(rows.into_iter().next())
    }

    /// `POST` one row and return the representation the datastore stored.
    pub(crate) async fn insert_one<B, T>(&self, table: Table, body: &B) -> StorageResult<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        debug!(table = table.as_str(), "datastore insert");
        let response = self
            .client()
            .post(self.table_url(table))
            .header(PREFER, HeaderValue::from_static("return=representation"))
            .json(body)
            .send()
            .await
            .map_err(StorageError::from_source)?;
        let rows: Vec<T> = decode_rows(table, response).await?;
        rows.into_iter()
            .next()
            .ok_or(StorageError::MissingRow(table.as_str()))
    }

    /// `PATCH` every row matching the filters. A filter that matches nothing
    /// is reported as `MissingRow`, since the datastore answers 2xx anyway.
    pub(crate) async fn update_where<B>(
        &self,
        table: Table,
        filters: &[Filter<'_>],
        body: &B,
    ) -> StorageResult<()>
    where
        B: Serialize + ?Sized + Sync,
    {
        debug!(table = table.as_str(), "datastore update");
        let response = self
            .client()
            .patch(self.table_url(table))
            .query(&filter_query(filters))
            .header(PREFER, HeaderValue::from_static("return=representation"))
            .json(body)
            .send()
            .await
            .map_err(StorageError::from_source)?;
        let updated: Vec<IgnoredAny> = decode_rows(table, response).await?;
        if updated.is_empty() {
            return Err(StorageError::MissingRow(table.as_str()));
        }
        Ok(())
    }
}

async fn ensure_success(table: Table, response: Response) -> StorageResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    warn!(
        table = table.as_str(),
        status = status.as_u16(),
        %body,
        "datastore rejected request"
    );
    Err(StorageError::Rejected {
        status: status.as_u16(),
        body,
    })
}

async fn decode_rows<T>(table: Table, response: Response) -> StorageResult<Vec<T>>
where
    T: DeserializeOwned,
{
    ensure_success(table, response)
        .await?
        .json::<Vec<T>>()
        .await
        .map_err(|err| StorageError::Decode(err.to_string()))
}
