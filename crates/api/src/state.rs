use std::sync::Arc;

use smm_relay_domain::services::telemetry::TelemetryGuard;
use smm_relay_domain::storage::RelayStore;
use smm_relay_panel::PanelClient;

/// Settings of the stateless `/create-order` route: the relay's own panel
/// key and the services that may be ordered without a payment webhook.
#[derive(Clone)]
pub struct DirectOrderPolicy {
    panel_api_key: String,
    allowed_service_ids: Arc<[i64]>,
}

impl DirectOrderPolicy {
    pub fn new(panel_api_key: impl Into<String>, allowed_service_ids: Vec<i64>) -> Self {
        Self {
            panel_api_key: panel_api_key.into(),
            allowed_service_ids: allowed_service_ids.into(),
        }
    }

    pub fn allows(&self, service_id: i64) -> bool {
        self.allowed_service_ids.contains(&service_id)
    }

    pub fn panel_api_key(&self) -> &str {
        &self.panel_api_key
    }
}

#[derive(Clone)]
pub struct AppState {
    storage: Arc<dyn RelayStore>,
    panel: Arc<dyn PanelClient>,
    telemetry: TelemetryGuard,
    direct_orders: DirectOrderPolicy,
}

impl AppState {
    pub fn new(
        storage: Arc<dyn RelayStore>,
        panel: Arc<dyn PanelClient>,
        telemetry: TelemetryGuard,
        direct_orders: DirectOrderPolicy,
    ) -> Self {
        Self {
            storage,
            panel,
            telemetry,
            direct_orders,
        }
    }

    pub fn storage(&self) -> &dyn RelayStore {
        self.storage.as_ref()
    }

    pub fn panel(&self) -> &dyn PanelClient {
        self.panel.as_ref()
    }

    pub fn telemetry(&self) -> &TelemetryGuard {
        &self.telemetry
    }

    pub fn direct_orders(&self) -> &DirectOrderPolicy {
        &self.direct_orders
    }
}
