use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::types::{PanelOrder, PanelReceipt};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PanelError {
    #[error("could not build panel client: {0}")]
    Initialization(String),
    #[error("panel request failed: {0}")]
    Transport(String),
    #[error("panel answered with status {status}")]
    Status { status: u16, body: Value },
    #[error("panel rejected the order")]
    Rejected { body: Value },
    #[error("panel response carried no order id")]
    Malformed { body: Value },
}

impl PanelError {
    /// Raw supplier payload, when the panel answered at all.
    pub fn supplier_body(&self) -> Option<&Value> {
        match self {
            PanelError::Status { body, .. }
            | PanelError::Rejected { body }
            | PanelError::Malformed { body } => Some(body),
            PanelError::Initialization(_) | PanelError::Transport(_) => None,
        }
    }
}

#[async_trait]
pub trait PanelClient: Send + Sync {
    async fn add_order(&self, order: &PanelOrder) -> Result<PanelReceipt, PanelError>;
}

/// `reqwest`-backed panel client. The inner client is built once and shared.
#[derive(Clone)]
pub struct HttpPanelClient {
    endpoint: String,
    client: Arc<Client>,
}

impl HttpPanelClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, PanelError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| PanelError::Initialization(err.to_string()))?;
        Ok(Self {
            endpoint: endpoint.into(),
            client: Arc::new(client),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl PanelClient for HttpPanelClient {
    async fn add_order(&self, order: &PanelOrder) -> Result<PanelReceipt, PanelError> {
        debug!(
            service = order.service(),
            quantity = order.quantity(),
            "submitting order to panel"
        );
        let response = self
            .client
            .post(&self.endpoint)
            .form(order)
            .send()
            .await
            .map_err(|err| PanelError::Transport(err.to_string()))?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|err| PanelError::Transport(err.to_string()))?;

        let outcome = interpret_response(status, &text);
        if let Err(err) = &outcome {
            warn!(%err, status, "panel did not accept order");
        }
        outcome
    }
}

/// Classifies a panel answer. Success needs a 2xx status and a JSON body
/// with no `error` field whose `order` is a number or a non-blank string. Bodies that are not JSON are
/// kept as a JSON string so callers can still surface them.
pub fn interpret_response(status: u16, text: &str) -> Result<PanelReceipt, PanelError> {
    let parsed = serde_json::from_str::<Value>(text);
    let is_json = parsed.is_ok();
    let body = parsed.unwrap_or_else(|_| Value::String(text.to_owned()));

    if !(200..300).contains(&status) {
        return Err(PanelError::Status { status, body });
    }
    if !is_json {
        return Err(PanelError::Malformed { body });
    }
    if body.get("error").is_some() {
        return Err(PanelError::Rejected { body });
    }
    PanelReceipt::from_body(body).map_err(|body| PanelError::Malformed { body })
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, web, App, HttpResponse, HttpServer};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;

    type Seen = Arc<Mutex<Vec<HashMap<String, String>>>>;

    // Throw-away panel that records every form it receives and answers with
    // a canned status/body.
    fn spawn_panel(status: StatusCode, body: &'static str) -> (String, Seen) {
        let seen: Seen = Arc::default();
        let recorder = seen.clone();
        let server = HttpServer::new(move || {
            let recorder = recorder.clone();
            App::new().route(
                "/api/v2",
                web::post().to(move |form: web::Form<HashMap<String, String>>| {
                    let recorder = recorder.clone();
                    async move {
                        recorder.lock().unwrap().push(form.into_inner());
                        HttpResponse::build(status)
                            .content_type("application/json")
                            .body(body)
                    }
                }),
            )
        })
        .workers(1)
        .bind(("127.0.0.1", 0))
        .expect("bind fake panel");
        let addr = server.addrs()[0];
        actix_web::rt::spawn(server.run());
        (format!("http://{addr}/api/v2"), seen)
    }

    fn client(endpoint: String) -> HttpPanelClient {
        HttpPanelClient::new(endpoint, Duration::from_secs(5)).expect("client builds")
    }

    #[test]
    fn accepts_order_field() {
        let receipt = interpret_response(200, r#"{"order": 555}"#).unwrap();
        assert_eq!(receipt.order, json!(555));
        assert_eq!(receipt.raw, json!({"order": 555}));
        assert_eq!(receipt.external_order_id.as_str(), "555");
    }

    #[test]
    fn error_field_wins_over_order_field() {
        let err = interpret_response(200, r#"{"order": 1, "error": "Not enough funds"}"#)
            .unwrap_err();
        assert_eq!(
            err,
            PanelError::Rejected {
                body: json!({"order": 1, "error": "Not enough funds"})
            }
        );
    }

    #[test]
    fn non_success_status_keeps_body() {
        let err = interpret_response(500, r#"{"error": "down"}"#).unwrap_err();
        assert_eq!(err.supplier_body(), Some(&json!({"error": "down"})));
        assert!(matches!(err, PanelError::Status { status: 500, .. }));
    }

    #[test]
    fn unparseable_body_is_malformed() {
        let err = interpret_response(200, "<html>maintenance</html>").unwrap_err();
        assert_eq!(
            err,
            PanelError::Malformed {
                body: json!("<html>maintenance</html>")
            }
        );
        let missing = interpret_response(200, r#"{"status": "ok"}"#).unwrap_err();
        assert!(matches!(missing, PanelError::Malformed { .. }));
    }

    #[test]
    fn order_field_must_carry_an_id() {
        for text in [
            r#"{"order": ""}"#,
            r#"{"order": "   "}"#,
            r#"{"order": false}"#,
            r#"{"order": {}}"#,
            r#"{"order": null}"#,
        ] {
            let err = interpret_response(200, text).unwrap_err();
            assert!(
                matches!(err, PanelError::Malformed { .. }),
                "{text} should be malformed, got {err:?}"
            );
        }
        let receipt = interpret_response(200, r#"{"order": " A-9 "}"#).unwrap();
        assert_eq!(receipt.order, json!(" A-9 "));
        assert_eq!(receipt.external_order_id.as_str(), "A-9");
    }

    #[test]
    fn order_debug_hides_key() {
        let order = PanelOrder::add("top-secret", "234", "http://x/y", 100);
        assert!(!format!("{order:?}").contains("top-secret"));
    }

    #[actix_web::test]
    async fn posts_form_fields_to_panel() {
        let (endpoint, seen) = spawn_panel(StatusCode::OK, r#"{"order": 555}"#);
        let panel = client(endpoint.clone());
        assert_eq!(panel.endpoint(), endpoint);
        let order = PanelOrder::add("panel-key", "234", "http://x/y", 100)
            .with_drip_feed(Some(3), Some(15));

        let receipt = panel.add_order(&order).await.expect("accepted");
        assert_eq!(receipt.order, json!(555));

        let forms = seen.lock().unwrap();
        assert_eq!(forms.len(), 1);
        let form = &forms[0];
        assert_eq!(form["key"], "panel-key");
        assert_eq!(form["action"], "add");
        assert_eq!(form["service"], "234");
        assert_eq!(form["link"], "http://x/y");
        assert_eq!(form["quantity"], "100");
        assert_eq!(form["runs"], "3");
        assert_eq!(form["interval"], "15");
    }

    #[actix_web::test]
    async fn omits_absent_drip_feed_fields() {
        let (endpoint, seen) = spawn_panel(StatusCode::OK, r#"{"order": "X1"}"#);
        let order = PanelOrder::add("panel-key", "234", "http://x/y", 100);

        client(endpoint).add_order(&order).await.expect("accepted");

        let forms = seen.lock().unwrap();
        assert!(!forms[0].contains_key("runs"));
        assert!(!forms[0].contains_key("interval"));
    }

    #[actix_web::test]
    async fn surfaces_panel_error_payload() {
        let (endpoint, _) = spawn_panel(StatusCode::OK, r#"{"error": "Incorrect service ID"}"#);
        let order = PanelOrder::add("panel-key", "1", "http://x/y", 10);

        let err = client(endpoint).add_order(&order).await.unwrap_err();
        assert_eq!(
            err.supplier_body(),
            Some(&json!({"error": "Incorrect service ID"}))
        );
    }

    #[actix_web::test]
    async fn unreachable_panel_is_transport_error() {
        let order = PanelOrder::add("panel-key", "1", "http://x/y", 10);
        let err = client("http://127.0.0.1:9/api/v2".into())
            .add_order(&order)
            .await
            .unwrap_err();
        assert!(matches!(err, PanelError::Transport(_)));
    }
}
