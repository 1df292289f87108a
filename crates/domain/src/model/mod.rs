//! Rows and value types shared across the API, storage and panel crates.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum_macros::AsRefStr;
use thiserror::Error;
use uuid::Uuid;

/// Identifier as the datastore returns it: integer primary keys and UUID/text
/// keys both occur depending on the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    Number(i64),
    Text(String),
}

impl RawId {
    pub fn into_string(self) -> String {
        match self {
            RawId::Number(value) => value.to_string(),
            RawId::Text(value) => value,
        }
    }
}

macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(from = "RawId")]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl From<RawId> for $name {
            fn from(value: RawId) -> Self {
                Self(value.into_string())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

row_id!(
    /// Primary key of a `customers` row.
    CustomerId
);
row_id!(
    /// Primary key of a `services` row.
    ServiceId
);
row_id!(
    /// Primary key of a `servers` row (one panel account).
    ServerId
);
row_id!(
    /// Primary key of an `orders` row.
    OrderId
);
row_id!(
    /// Service identifier on the panel side, sent as the `service` form field.
    ProviderServiceId
);
row_id!(
    /// Order identifier assigned by the panel once it accepted an order.
    ExternalOrderId
);

impl ExternalOrderId {
    /// Extracts the identifier from the panel's `order` field. The panel
    /// answers with a number or a string; anything else is not an id.
    pub fn from_panel_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(number) => Some(Self(number.to_string())),
            Value::String(text) if !text.trim().is_empty() => Some(Self(text.trim().to_owned())),
            _ => None,
        }
    }
}

/// Longest address accepted, per the SMTP path limit.
pub const EMAIL_MAX_LENGTH: usize = 254;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EmailFormatError {
    #[error("email address is empty")]
    Empty,
    #[error("email address exceeds {EMAIL_MAX_LENGTH} characters")]
    TooLong,
    #[error("email address contains whitespace")]
    Whitespace,
    #[error("email address must contain exactly one '@'")]
    MissingAt,
    #[error("email address has an empty local part")]
    EmptyLocalPart,
    #[error("email address has an invalid domain")]
    InvalidDomain,
}

/// Checks the syntax the payment provider is expected to send: a non-empty
/// local part, one `@`, and a dotted domain of alphanumeric/hyphen labels.
pub fn validate_email(email: &str) -> Result<(), EmailFormatError> {
    if email.is_empty() {
        return Err(EmailFormatError::Empty);
    }
    if email.len() > EMAIL_MAX_LENGTH {
        return Err(EmailFormatError::TooLong);
    }
    if email.chars().any(char::is_whitespace) {
        return Err(EmailFormatError::Whitespace);
    }

    let mut parts = email.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(EmailFormatError::MissingAt);
    };
    if local.is_empty() {
        return Err(EmailFormatError::EmptyLocalPart);
    }

    let labels: Vec<&str> = domain.split('.').collect();
    let labels_ok = labels.iter().all(|label| {
        !label.is_empty()
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    });
    if labels.len() < 2 || !labels_ok {
        return Err(EmailFormatError::InvalidDomain);
    }

    Ok(())
}

/// Validated email address with a lowercased domain. The local part keeps
/// its case since mailbox names may be case-sensitive and customer rows are
/// matched on the exact value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct EmailAddress(String);

impl EmailAddress {
    pub fn parse(raw: &str) -> Result<Self, EmailFormatError> {
        let trimmed = raw.trim();
        validate_email(trimmed)?;
        let (local, domain) = trimmed
            .split_once('@')
            .ok_or(EmailFormatError::MissingAt)?;
        Ok(Self(format!("{local}@{}", domain.to_ascii_lowercase())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceRefError {
    #[error("service reference is empty")]
    Empty,
    #[error("service reference `{0}` is neither an integer nor a UUID")]
    Invalid(String),
}

/// Reference to a `services` row as sent by the payment provider. Older
/// deployments key services by integer, newer ones by UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceRef {
    Numeric(i64),
    Uuid(Uuid),
}

impl ServiceRef {
    pub fn parse(raw: &str) -> Result<Self, ServiceRefError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ServiceRefError::Empty);
        }
        if let Ok(number) = trimmed.parse::<i64>() {
            return Ok(Self::Numeric(number));
        }
        Uuid::parse_str(trimmed)
            .map(Self::Uuid)
            .map_err(|_| ServiceRefError::Invalid(trimmed.to_owned()))
    }
}

impl fmt::Display for ServiceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceRef::Numeric(id) => write!(f, "{id}"),
            ServiceRef::Uuid(id) => write!(f, "{}", id.hyphenated()),
        }
    }
}

/// Order lifecycle. The relay only writes `Paid` and `Processing`; the later
/// states belong to whatever tracks fulfilment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OrderStatus {
    Paid,
    Processing,
    Completed,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewCustomer {
    pub email: EmailAddress,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Service {
    pub id: ServiceId,
    pub server_id: ServerId,
    #[serde(rename = "service_id")]
    pub provider_service_id: ProviderServiceId,
}

#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Server {
    pub id: ServerId,
    pub api_key: String,
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server")
            .field("id", &self.id)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewOrder {
    pub customer_id: CustomerId,
    pub service_id: ServiceId,
    pub target_url: String,
    pub quantity: i64,
    pub amount: f64,
    pub status: OrderStatus,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OrderRecord {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub service_id: ServiceId,
    pub quantity: i64,
    pub status: OrderStatus,
    #[serde(default)]
    pub external_order_id: Option<ExternalOrderId>,
}

/// Patch applied once the panel accepted an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderStatusUpdate {
    pub status: OrderStatus,
    pub external_order_id: ExternalOrderId,
}

impl OrderStatusUpdate {
    pub fn processing(external_order_id: ExternalOrderId) -> Self {
        Self {
            status: OrderStatus::Processing,
            external_order_id,
        }
    }
}
