use actix_web::{web, HttpResponse};
use metrics::counter;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use smm_relay_panel::PanelOrder;
use tracing::{info, warn};

use crate::state::AppState;

use super::ApiError;

#[derive(Debug, Deserialize, Serialize)]
pub struct DirectOrderRequest {
    pub order_id: String,
    pub service_id: i64,
    pub link: String,
    pub quantity: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runs: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DirectOrderResponse {
    pub status: String,
    pub local_order_id: String,
    pub supplier_order_id: Value,
    pub raw_supplier_response: Value,
}

fn record(status: &'static str) {
    counter!("relay_direct_orders_total", "status" => status).increment(1);
}

/// Stateless relay: allow-listed services go straight to the panel with the
/// relay's own key. Nothing is written to the datastore.
pub async fn create_order_handler(
    state: web::Data<AppState>,
    payload: web::Json<DirectOrderRequest>,
) -> Result<HttpResponse, ApiError> {
    let request = payload.into_inner();
    let policy = state.direct_orders();
    if !policy.allows(request.service_id) {
        record("not_allowed");
        info!(service_id = request.service_id, "service not on allow-list");
        return Err(ApiError::ServiceNotAllowed);
    }

    let order = PanelOrder::add(
        policy.panel_api_key(),
        request.service_id.to_string(),
        request.link,
        request.quantity,
    )
    .with_drip_feed(request.runs, request.interval);

    let receipt = match state.panel().add_order(&order).await {
        Ok(receipt) => receipt,
        Err(err) => {
            record("panel_error");
            warn!(local_order_id = %request.order_id, %err, "panel did not accept direct order");
            return Err(ApiError::Panel(err));
        }
    };

    record("success");
    info!(
        local_order_id = %request.order_id,
        supplier_order_id = %receipt.order,
        "direct order relayed"
    );
    Ok(HttpResponse::Ok().json(DirectOrderResponse {
        status: "success".to_string(),
        local_order_id: request.order_id,
        supplier_order_id: receipt.order,
        raw_supplier_response: receipt.raw,
    }))
}
