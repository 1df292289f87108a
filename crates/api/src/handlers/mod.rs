pub mod direct_order;
pub mod metrics;
pub mod webhook;

pub use direct_order::create_order_handler;
pub use metrics::metrics_handler;
pub use webhook::payment_webhook_handler;

use actix_web::{http::StatusCode, web, HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use smm_relay_domain::model::{EmailFormatError, ServiceRefError};
use smm_relay_domain::storage::StorageError;
use smm_relay_panel::PanelError;

/// Registers the two relay entry points.
pub fn configure_relay_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/create-order", web::post().to(create_order_handler))
        .route(
            "/webhook/payment-success",
            web::post().to(payment_webhook_handler),
        );
}

/// JSON extractor config: malformed bodies get the same error shape as every
/// other rejection.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err, _req| ApiError::InvalidBody(err.to_string()).into())
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid request body: {0}")]
    InvalidBody(String),
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailFormatError),
    #[error("invalid service reference: {0}")]
    InvalidServiceRef(#[from] ServiceRefError),
    #[error("Service not allowed")]
    ServiceNotAllowed,
    #[error("Service not found")]
    ServiceNotFound,
    #[error("Server not found")]
    ServerNotFound,
    #[error("failed to resolve customer: {0}")]
    Customer(StorageError),
    #[error("failed to load service: {0}")]
    ServiceLookup(StorageError),
    #[error("failed to load server: {0}")]
    ServerLookup(StorageError),
    #[error("failed to create order: {0}")]
    OrderRejected(StorageError),
    #[error("order rejected by panel: {0}")]
    PanelRejected(PanelError),
    #[error("panel error: {0}")]
    Panel(PanelError),
}

impl ApiError {
    /// Webhook flow: an explicit panel refusal is the caller's problem (400),
    /// anything else is an upstream fault (502).
    pub fn from_panel(err: PanelError) -> Self {
        match err {
            PanelError::Rejected { .. } => ApiError::PanelRejected(err),
            other => ApiError::Panel(other),
        }
    }

    fn detail(&self) -> Option<Value> {
        match self {
            ApiError::Panel(err) | ApiError::PanelRejected(err) => err.supplier_body().cloned(),
            ApiError::OrderRejected(StorageError::Rejected { body, .. }) => Some(
                serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.clone())),
            ),
            _ => None,
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidBody(_)
            | ApiError::InvalidEmail(_)
            | ApiError::InvalidServiceRef(_) => StatusCode::BAD_REQUEST,
            ApiError::ServiceNotAllowed => StatusCode::FORBIDDEN,
            ApiError::ServiceNotFound => StatusCode::NOT_FOUND,
            ApiError::ServerNotFound
            | ApiError::Customer(_)
            | ApiError::ServiceLookup(_)
            | ApiError::ServerLookup(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::OrderRejected(StorageError::Rejected { .. }) => StatusCode::BAD_REQUEST,
            ApiError::OrderRejected(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::PanelRejected(_) => StatusCode::BAD_REQUEST,
            ApiError::Panel(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.to_string(),
            detail: self.detail(),
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
}
