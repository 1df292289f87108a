//! Environment-driven configuration for the relay binary.

use std::{env, time::Duration};

use thiserror::Error;

/// Panel endpoint used when `SMM_API_URL` is not set.
pub const DEFAULT_PANEL_URL: &str = "https://cheapestsmmpanels.com/api/v2";
/// Services orderable through `/create-order` when no allow-list is configured.
pub const DEFAULT_ALLOWED_SERVICES: &[i64] = &[234];
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Listener, datastore and panel settings. Secrets are kept private and
/// only exposed through accessors so `Debug` output stays safe to log.
#[derive(Clone, PartialEq, Eq)]
pub struct RelayConfig {
    api_bind_address: String,
    api_unix_socket: Option<String>,
    internal_bind_address: Option<String>,
    datastore_url: String,
    datastore_service_key: String,
    panel_api_key: String,
    panel_url: String,
    allowed_service_ids: Vec<i64>,
    http_timeout: Duration,
}

impl RelayConfig {
    /// Hydrates `.env` (if present) and reads the process variables. Missing
    /// or malformed entries surface as `ConfigError`.
    pub fn load_from_env() -> Result<Self, ConfigError> {
        hydrate_env_file()?;

        let allowed_service_ids = match get_optional_var("ALLOWED_SERVICE_IDS") {
            Some(raw) => parse_id_list("ALLOWED_SERVICE_IDS", &raw)?,
            None => DEFAULT_ALLOWED_SERVICES.to_vec(),
        };
        let http_timeout = match get_optional_var("HTTP_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(raw.parse().map_err(|source| {
                ConfigError::InvalidNumber {
                    key: "HTTP_TIMEOUT_SECS",
                    source,
                }
            })?),
            None => DEFAULT_HTTP_TIMEOUT,
        };

        Ok(Self {
            api_bind_address: get_required_var("API_BIND_ADDRESS")?,
            api_unix_socket: get_optional_var("API_UNIX_SOCKET"),
            internal_bind_address: get_optional_var("API_INTERNAL_BIND_ADDRESS"),
            datastore_url: get_required_var("DATASTORE_URL")?,
            datastore_service_key: get_required_var("DATASTORE_SERVICE_KEY")?,
            panel_api_key: get_required_var("SMM_API_KEY")?,
            panel_url: get_optional_var("SMM_API_URL")
                .unwrap_or_else(|| DEFAULT_PANEL_URL.to_string()),
            allowed_service_ids,
            http_timeout,
        })
    }

    pub fn api_bind_address(&self) -> &str {
        &self.api_bind_address
    }

    pub fn api_unix_socket(&self) -> Option<&str> {
        self.api_unix_socket.as_deref()
    }

    pub fn internal_bind_address(&self) -> Option<&str> {
        self.internal_bind_address.as_deref()
    }

    pub fn has_internal_listener(&self) -> bool {
        self.internal_bind_address.is_some()
    }

    pub fn datastore_url(&self) -> &str {
        &self.datastore_url
    }

    pub fn datastore_service_key(&self) -> &str {
        &self.datastore_service_key
    }

    pub fn panel_api_key(&self) -> &str {
        &self.panel_api_key
    }

    pub fn panel_url(&self) -> &str {
        &self.panel_url
    }

    pub fn allowed_service_ids(&self) -> &[i64] {
        &self.allowed_service_ids
    }

    pub fn http_timeout(&self) -> Duration {
        self.http_timeout
    }
}

impl std::fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayConfig")
            .field("api_bind_address", &self.api_bind_address)
            .field("api_unix_socket", &self.api_unix_socket)
            .field("internal_bind_address", &self.internal_bind_address)
            .field("datastore_url", &self.datastore_url)
            .field("panel_url", &self.panel_url)
            .field("allowed_service_ids", &self.allowed_service_ids)
            .field("http_timeout", &self.http_timeout)
            .finish_non_exhaustive()
    }
}

fn get_required_var(key: &'static str) -> Result<String, ConfigError> {
    match env::var(key) {
        Ok(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                Err(ConfigError::MissingVar { key })
            } else {
                Ok(trimmed.to_string())
            }
        }
        Err(_) => Err(ConfigError::MissingVar { key }),
    }
}

fn get_optional_var(key: &'static str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn parse_id_list(key: &'static str, raw: &str) -> Result<Vec<i64>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            item.parse()
                .map_err(|source| ConfigError::InvalidNumber { key, source })
        })
        .collect()
}

pub fn hydrate_env_file() -> Result<(), ConfigError> {
    if env::var_os("SMM_RELAY_SKIP_DOTENV").is_some() {
        return Ok(());
    }
    match dotenvy::dotenv() {
        Ok(_) => {}
        Err(dotenvy::Error::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => return Err(ConfigError::Dotenv { source: err }),
    }

    Ok(())
}

/// Errors emitted when `.env` hydration or environment parsing fails.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable `{key}`")]
    MissingVar { key: &'static str },
    #[error("invalid integer in `{key}`: {source}")]
    InvalidNumber {
        key: &'static str,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("failed to load .env file: {source}")]
    Dotenv {
        #[from]
        source: dotenvy::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_GUARD: Mutex<()> = Mutex::new(());

    fn set_env() {
        std::env::set_var("SMM_RELAY_SKIP_DOTENV", "1");
        std::env::set_var("API_BIND_ADDRESS", "127.0.0.1:8080");
        std::env::set_var("DATASTORE_URL", "https://project.example.co");
        std::env::set_var("DATASTORE_SERVICE_KEY", "service-role-key");
        std::env::set_var("SMM_API_KEY", "panel-key");
        std::env::remove_var("API_UNIX_SOCKET");
        std::env::remove_var("API_INTERNAL_BIND_ADDRESS");
        std::env::remove_var("SMM_API_URL");
        std::env::remove_var("ALLOWED_SERVICE_IDS");
        std::env::remove_var("HTTP_TIMEOUT_SECS");
    }

    #[test]
    fn config_loader_applies_defaults() {
        let _guard = ENV_GUARD.lock().unwrap();
        set_env();

        let config = RelayConfig::load_from_env().expect("config loads");
        assert_eq!(config.api_bind_address(), "127.0.0.1:8080");
        assert_eq!(config.datastore_url(), "https://project.example.co");
        assert_eq!(config.panel_url(), DEFAULT_PANEL_URL);
        assert_eq!(config.allowed_service_ids(), &[234]);
        assert_eq!(config.http_timeout(), Duration::from_secs(30));
        assert!(!config.has_internal_listener());
    }

    #[test]
    fn config_loader_reads_optional_overrides() {
        let _guard = ENV_GUARD.lock().unwrap();
        set_env();
        std::env::set_var("API_UNIX_SOCKET", "/tmp/relay.sock");
        std::env::set_var("API_INTERNAL_BIND_ADDRESS", "127.0.0.1:9090");
        std::env::set_var("SMM_API_URL", "http://panel.local/api/v2");
        std::env::set_var("ALLOWED_SERVICE_IDS", " 234, 1001 ,,77 ");
        std::env::set_var("HTTP_TIMEOUT_SECS", "5");

        let config = RelayConfig::load_from_env().expect("config loads");
        assert_eq!(config.api_unix_socket(), Some("/tmp/relay.sock"));
        assert_eq!(config.internal_bind_address(), Some("127.0.0.1:9090"));
        assert!(config.has_internal_listener());
        assert_eq!(config.panel_url(), "http://panel.local/api/v2");
        assert_eq!(config.allowed_service_ids(), &[234, 1001, 77]);
        assert_eq!(config.http_timeout(), Duration::from_secs(5));

        set_env();
    }

    #[test]
    fn required_env_vars_are_trimmed() {
        let _guard = ENV_GUARD.lock().unwrap();
        set_env();
        std::env::set_var("SMM_API_KEY", "  padded-key ");

        let config = RelayConfig::load_from_env().expect("config loads");
        assert_eq!(config.panel_api_key(), "padded-key");

        set_env();
    }

    #[test]
    fn empty_required_env_var_is_treated_as_missing() {
        let _guard = ENV_GUARD.lock().unwrap();
        set_env();
        std::env::set_var("DATASTORE_SERVICE_KEY", "   ");

        let err = RelayConfig::load_from_env().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingVar {
                key: "DATASTORE_SERVICE_KEY"
            }
        ));

        set_env();
    }

    #[test]
    fn malformed_allow_list_is_rejected() {
        let _guard = ENV_GUARD.lock().unwrap();
        set_env();
        std::env::set_var("ALLOWED_SERVICE_IDS", "234,abc");

        let err = RelayConfig::load_from_env().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidNumber {
                key: "ALLOWED_SERVICE_IDS",
                ..
            }
        ));

        set_env();
    }

    #[test]
    fn debug_output_hides_secrets() {
        let _guard = ENV_GUARD.lock().unwrap();
        set_env();

        let config = RelayConfig::load_from_env().expect("config loads");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("service-role-key"));
        assert!(!rendered.contains("panel-key"));
    }
}
