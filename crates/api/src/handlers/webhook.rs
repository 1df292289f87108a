use actix_web::{web, HttpResponse};
use metrics::counter;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use smm_relay_domain::model::{
    Customer, EmailAddress, NewCustomer, NewOrder, OrderStatus, RawId, ServiceRef,
};
use smm_relay_domain::storage::{CatalogStore, CustomerStore, OrderStore, RelayStore};
use smm_relay_panel::PanelOrder;
use tracing::{info, warn};

use crate::state::AppState;

use super::ApiError;

/// Body posted by the payment provider once a payment succeeded. Newer
/// deployments send `service_uuid`, older ones an integer `service_id`.
#[derive(Debug, Deserialize, Serialize)]
pub struct PaymentWebhook {
    pub email: String,
    #[serde(alias = "service_uuid")]
    pub service_id: RawId,
    pub target_url: String,
    pub quantity: i64,
    pub amount: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentWebhookResponse {
    pub success: bool,
    pub order_id: String,
    pub panel_order_id: Value,
}

fn record(status: &'static str) {
    counter!("relay_webhook_orders_total", "status" => status).increment(1);
}

/// Customer → service → server → order row (`paid`) → panel → `processing`.
/// Each step aborts the chain on failure; rows written before the failing
/// step are left as they are.
pub async fn payment_webhook_handler(
    state: web::Data<AppState>,
    payload: web::Json<PaymentWebhook>,
) -> Result<HttpResponse, ApiError> {
    let webhook = payload.into_inner();
    let email = EmailAddress::parse(&webhook.email).inspect_err(|_| record("invalid_email"))?;
    let service_ref = ServiceRef::parse(&webhook.service_id.into_string())
        .inspect_err(|_| record("invalid_service"))?;
    let storage = state.storage();

    let customer = resolve_customer(storage, &email)
        .await
        .inspect_err(|_| record("customer_error"))?;

    let service = match storage.find_service(&service_ref).await {
        Ok(Some(service)) => service,
        Ok(None) => {
            record("service_not_found");
            info!(service = %service_ref, "webhook references unknown service");
            return Err(ApiError::ServiceNotFound);
        }
        Err(err) => {
            record("service_error");
            return Err(ApiError::ServiceLookup(err));
        }
    };

    let server = match storage.find_server(&service.server_id).await {
        Ok(Some(server)) => server,
        Ok(None) => {
            record("server_not_found");
            warn!(server_id = %service.server_id, service_id = %service.id, "service points at missing server");
            return Err(ApiError::ServerNotFound);
        }
        Err(err) => {
            record("server_error");
            return Err(ApiError::ServerLookup(err));
        }
    };

    let order = storage
        .insert_order(NewOrder {
            customer_id: customer.id,
            service_id: service.id,
            target_url: webhook.target_url.clone(),
            quantity: webhook.quantity,
            amount: webhook.amount,
            status: OrderStatus::Paid,
        })
        .await
        .map_err(|err| {
            record("order_rejected");
            warn!(%err, "datastore refused order row");
            ApiError::OrderRejected(err)
        })?;

    let submission = PanelOrder::add(
        server.api_key,
        service.provider_service_id.into_inner(),
        webhook.target_url,
        webhook.quantity,
    );
    let receipt = match state.panel().add_order(&submission).await {
        Ok(receipt) => receipt,
        Err(err) => {
            record("panel_error");
            warn!(order_id = %order.id, %err, "panel submission failed, order left as paid");
            return Err(ApiError::from_panel(err));
        }
    };

    let external_order_id = receipt.external_order_id;
    if let Err(err) = storage
        .mark_processing(&order.id, &external_order_id)
        .await
    {
        record("status_update_failed");
        warn!(order_id = %order.id, %external_order_id, %err, "could not mark order as processing");
    } else {
        record("success");
    }

    info!(order_id = %order.id, %external_order_id, "paid order relayed to panel");
    Ok(HttpResponse::Ok().json(PaymentWebhookResponse {
        success: true,
        order_id: order.id.into_inner(),
        panel_order_id: receipt.order,
    }))
}

/// Reuses the customer keyed by `email` or creates one. Two deliveries racing
/// on a new email can both miss the lookup and both insert.
async fn resolve_customer(
    storage: &dyn RelayStore,
    email: &EmailAddress,
) -> Result<Customer, ApiError> {
    if let Some(existing) = storage
        .find_customer_by_email(email)
        .await
        .map_err(ApiError::Customer)?
    {
        return Ok(existing);
    }

    let created = storage
        .insert_customer(NewCustomer {
            email: email.clone(),
        })
        .await
        .map_err(ApiError::Customer)?;
    info!(customer_id = %created.id, "created customer");
    Ok(created)
}
