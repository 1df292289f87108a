use std::fmt;

use serde::Serialize;
use serde_json::Value;
use smm_relay_domain::model::ExternalOrderId;

/// Form body of an `action=add` call.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct PanelOrder {
    key: String,
    action: &'static str,
    service: String,
    link: String,
    quantity: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    runs: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    interval: Option<i64>,
}

impl PanelOrder {
    pub fn add(
        key: impl Into<String>,
        service: impl Into<String>,
        link: impl Into<String>,
        quantity: i64,
    ) -> Self {
        Self {
            key: key.into(),
            action: "add",
            service: service.into(),
            link: link.into(),
            quantity,
            runs: None,
            interval: None,
        }
    }

    /// Drip-feed parameters: deliver `quantity` per run, `runs` times,
    /// `interval` minutes apart. Either may be absent.
    pub fn with_drip_feed(mut self, runs: Option<i64>, interval: Option<i64>) -> Self {
        self.runs = runs;
        self.interval = interval;
        self
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn link(&self) -> &str {
        &self.link
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn runs(&self) -> Option<i64> {
        self.runs
    }

    pub fn interval(&self) -> Option<i64> {
        self.interval
    }
}

impl fmt::Debug for PanelOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PanelOrder")
            .field("key", &"<redacted>")
            .field("service", &self.service)
            .field("link", &self.link)
            .field("quantity", &self.quantity)
            .field("runs", &self.runs)
            .field("interval", &self.interval)
            .finish()
    }
}

/// Accepted submission: the panel's order id exactly as it was sent, the
/// same id as text for the datastore, and the whole response body.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelReceipt {
    pub order: Value,
    pub external_order_id: ExternalOrderId,
    pub raw: Value,
}

impl PanelReceipt {
    /// Accepts only a number or a non-blank string as the panel's id; any
    /// other body is handed back unchanged.
    pub fn from_body(raw: Value) -> Result<Self, Value> {
        let Some((order, external_order_id)) = raw.get("order").and_then(|order| {
            ExternalOrderId::from_panel_value(order).map(|id| (order.clone(), id))
        }) else {
            return Err(raw);
        };
        Ok(Self {
            order,
            external_order_id,
            raw,
        })
    }
}
