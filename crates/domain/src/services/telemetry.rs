//! Process-wide tracing subscriber and Prometheus recorder.
//!
//! Both are global, so installation happens at most once per process. Later
//! calls (tests building several app states, for instance) get a guard over
//! the recorder that is already installed.

use std::{
    env,
    net::{AddrParseError, SocketAddr},
    sync::Arc,
};

use metrics::describe_counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use thiserror::Error;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::hydrate_env_file;

pub const DEFAULT_LOG_FILTER: &str = "info";

/// Counters emitted by the relay handlers, labelled by `status`.
pub const RELAY_COUNTERS: &[(&str, &str)] = &[
    (
        "relay_direct_orders_total",
        "Direct /create-order requests by outcome",
    ),
    (
        "relay_webhook_orders_total",
        "Payment webhook deliveries by outcome",
    ),
];

static TRACING: OnceCell<()> = OnceCell::new();
static RECORDER: OnceCell<Arc<PrometheusHandle>> = OnceCell::new();

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    log_filter: String,
    metrics_listener: Option<SocketAddr>,
}

impl TelemetryConfig {
    pub fn new(log_filter: impl Into<String>) -> Self {
        Self {
            log_filter: log_filter.into(),
            metrics_listener: None,
        }
    }

    pub fn with_metrics_listener(mut self, addr: SocketAddr) -> Self {
        self.metrics_listener = Some(addr);
        self
    }

    /// Reads `<PREFIX>_LOG_FILTER` (default `info`) and the optional
    /// `<PREFIX>_METRICS_ADDRESS` standalone exporter address.
    pub fn from_env(prefix: &str) -> Result<Self, TelemetryError> {
        let _ = hydrate_env_file();
        let prefix = prefix.trim().to_ascii_uppercase();

        let log_filter = non_blank_var(&format!("{prefix}_LOG_FILTER"))
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());
        let metrics_listener = non_blank_var(&format!("{prefix}_METRICS_ADDRESS"))
            .map(parse_listener)
            .transpose()?;

        Ok(Self {
            log_filter,
            metrics_listener,
        })
    }

    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    pub fn metrics_listener(&self) -> Option<SocketAddr> {
        self.metrics_listener
    }
}

fn non_blank_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_listener(raw: String) -> Result<SocketAddr, TelemetryError> {
    raw.parse()
        .map_err(|err: AddrParseError| TelemetryError::InvalidMetricsAddress {
            reason: err.to_string(),
            address: raw,
        })
}

/// Handle to the installed recorder; cheap to clone into app state.
#[derive(Clone)]
pub struct TelemetryGuard {
    handle: Arc<PrometheusHandle>,
}

impl TelemetryGuard {
    /// Prometheus text exposition of every metric recorded so far.
    pub fn render_metrics(&self) -> String {
        self.handle.render()
    }
}

pub fn init_telemetry(config: &TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    install_tracing(config.log_filter())?;
    let handle = install_recorder(config.metrics_listener())?;
    Ok(TelemetryGuard { handle })
}

fn install_tracing(filter: &str) -> Result<(), TelemetryError> {
    let filter =
        EnvFilter::try_new(filter).map_err(|err| TelemetryError::InvalidLogFilter(err.to_string()))?;

    TRACING.get_or_try_init(|| {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .try_init()
            .map_err(|err| TelemetryError::Tracing(err.to_string()))
    })?;
    Ok(())
}

fn install_recorder(listener: Option<SocketAddr>) -> Result<Arc<PrometheusHandle>, TelemetryError> {
    RECORDER
        .get_or_try_init(|| {
            let builder = match listener {
                Some(addr) => PrometheusBuilder::new().with_http_listener(addr),
                None => PrometheusBuilder::new(),
            };
            let handle = builder
                .install_recorder()
                .map_err(|err| TelemetryError::Metrics(err.to_string()))?;

            for (name, help) in RELAY_COUNTERS {
                describe_counter!(*name, *help);
            }
            Ok(Arc::new(handle))
        })
        .cloned()
}

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("invalid log filter: {0}")]
    InvalidLogFilter(String),
    #[error("failed to install tracing subscriber: {0}")]
    Tracing(String),
    #[error("invalid metrics address `{address}`: {reason}")]
    InvalidMetricsAddress { address: String, reason: String },
    #[error("failed to install metrics recorder: {0}")]
    Metrics(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_GUARD: Mutex<()> = Mutex::new(());

    fn clear(prefix: &str) {
        env::set_var("SMM_RELAY_SKIP_DOTENV", "1");
        env::remove_var(format!("{prefix}_LOG_FILTER"));
        env::remove_var(format!("{prefix}_METRICS_ADDRESS"));
    }

    #[test]
    fn defaults_apply_without_env() {
        let _guard = ENV_GUARD.lock().unwrap();
        clear("RELAY_T1");

        let cfg = TelemetryConfig::from_env("relay_t1").unwrap();
        assert_eq!(cfg, TelemetryConfig::new(DEFAULT_LOG_FILTER));
    }

    #[test]
    fn prefixed_vars_are_read() {
        let _guard = ENV_GUARD.lock().unwrap();
        clear("RELAY_T2");
        env::set_var("RELAY_T2_LOG_FILTER", "debug,actix_web=warn");
        env::set_var("RELAY_T2_METRICS_ADDRESS", " 127.0.0.1:9898 ");

        let cfg = TelemetryConfig::from_env("RELAY_T2").unwrap();
        assert_eq!(cfg.log_filter(), "debug,actix_web=warn");
        assert_eq!(
            cfg.metrics_listener(),
            Some("127.0.0.1:9898".parse().unwrap())
        );
        clear("RELAY_T2");
    }

    #[test]
    fn blank_metrics_address_is_ignored() {
        let _guard = ENV_GUARD.lock().unwrap();
        clear("RELAY_T3");
        env::set_var("RELAY_T3_METRICS_ADDRESS", "  ");

        let cfg = TelemetryConfig::from_env("RELAY_T3").unwrap();
        assert_eq!(cfg.metrics_listener(), None);
        clear("RELAY_T3");
    }

    #[test]
    fn malformed_metrics_address_is_rejected() {
        let _guard = ENV_GUARD.lock().unwrap();
        clear("RELAY_T4");
        env::set_var("RELAY_T4_METRICS_ADDRESS", "not-an-address");

        let err = TelemetryConfig::from_env("RELAY_T4").unwrap_err();
        assert!(matches!(
            err,
            TelemetryError::InvalidMetricsAddress { ref address, .. } if address == "not-an-address"
        ));
        clear("RELAY_T4");
    }
}
