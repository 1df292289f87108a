// `Arc`: 原子引用计数，用于共享状态。
use std::sync::Arc;

// 仅在 Unix 系统下引入文件系统模块，用于处理 Unix Domain Socket 文件。
#[cfg(unix)]
use std::{fs, path::Path};

// 引入 actix-web 框架组件：
// `middleware::Logger`: HTTP 请求日志中间件。
// `web`: 路由配置和数据提取。
use actix_web::{middleware::Logger, web, App, HttpServer};

// 引入领域层配置和服务。
use smm_relay_domain::config::{ConfigError, RelayConfig};
use smm_relay_domain::services::telemetry::{init_telemetry, TelemetryConfig, TelemetryError};
use smm_relay_domain::storage::StorageError;
// 引入上游面板客户端与数据存储实现。
use smm_relay_panel::{HttpPanelClient, PanelError};
use smm_relay_storage::RestStorage;
use thiserror::Error;
use tracing::info;

use crate::{
    handlers::{configure_relay_routes, json_config, metrics_handler},
    state::{AppState, DirectOrderPolicy},
};

// 应用程序启动入口函数。
pub async fn run() -> Result<(), BootstrapError> {
    // 1. 加载配置
    let config = RelayConfig::load_from_env()?;

    // 2. 初始化遥测 (Telemetry)
    let telemetry_config = TelemetryConfig::from_env("API")?;
    let telemetry = init_telemetry(&telemetry_config)?;
    info!(?config, "relay configuration loaded");

    // 3. 构建共享的出站 HTTP 客户端（数据存储 + 上游面板），进程内只创建一次。
    let storage = RestStorage::connect(
        config.datastore_url(),
        config.datastore_service_key(),
        config.http_timeout(),
    )?;
    let panel = HttpPanelClient::new(config.panel_url(), config.http_timeout())?;
    info!(
        datastore = storage.base_url(),
        panel = panel.endpoint(),
        "outbound clients ready"
    );

    // 4. 构建应用状态
    let direct_orders = DirectOrderPolicy::new(
        config.panel_api_key(),
        config.allowed_service_ids().to_vec(),
    );
    let state = AppState::new(
        Arc::new(storage),
        Arc::new(panel),
        telemetry,
        direct_orders,
    );

    // 配置了内部监听器时，指标只在内部接口暴露。
    let include_metrics_on_public = !config.has_internal_listener();

    let public_state = state.clone();

    // 5. 公共 HTTP 服务器
    let mut public_server = HttpServer::new(move || {
        let mut app = App::new()
            .app_data(web::Data::new(public_state.clone()))
            .app_data(json_config())
            .wrap(Logger::default())
            .configure(configure_relay_routes);

        if include_metrics_on_public {
            app = app.route("/metrics", web::get().to(metrics_handler));
        }

        app
    });

    #[cfg(unix)]
    {
        if let Some(socket) = config.api_unix_socket() {
            // 先清理上次遗留的 socket 文件，否则 bind 会失败。
            cleanup_socket(socket)?;
            public_server = public_server.bind_uds(socket)?;
        } else {
            public_server = public_server.bind(config.api_bind_address())?;
        }
    }

    #[cfg(not(unix))]
    {
        if let Some(socket) = config.api_unix_socket() {
            return Err(BootstrapError::Io(std::io::Error::other(format!(
                "unix socket '{socket}' requested but this platform does not support it"
            ))));
        }
        public_server = public_server.bind(config.api_bind_address())?;
    }

    let public_server = public_server.run();

    // 6. 内部 HTTP 服务器（可选），只暴露 /metrics。
    let internal_server = match config.internal_bind_address() {
        Some(addr) => {
            let internal_state = state.clone();
            let server = HttpServer::new(move || {
                App::new()
                    .app_data(web::Data::new(internal_state.clone()))
                    .wrap(Logger::default())
                    .route("/metrics", web::get().to(metrics_handler))
            })
            .bind(addr)?
            .run();
            Some(server)
        }
        None => None,
    };

    // 7. 运行服务器，任何一个出错都会导致整体退出。
    if let Some(internal) = internal_server {
        tokio::try_join!(public_server, internal)?;
    } else {
        public_server.await?;
    }

    Ok(())
}

// 启动过程中的错误枚举。
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("panel client error: {0}")]
    Panel(#[from] PanelError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// 如果 socket 文件已存在（例如上次非正常退出遗留），bind 会失败，所以需要先删除。
#[cfg(unix)]
fn cleanup_socket(path: &str) -> std::io::Result<()> {
    let socket_path = Path::new(path);
    if socket_path.exists() {
        fs::remove_file(socket_path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #[cfg(unix)]
    #[actix_web::test]
    async fn cleanup_socket_removes_stale_file() {
        use super::cleanup_socket;

        let path = std::env::temp_dir().join(format!(
            "smm-relay-test-{}-{}.sock",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::SystemTime::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        std::fs::write(&path, b"stub").expect("write socket file");
        cleanup_socket(path.to_str().unwrap()).expect("cleanup succeeds");
        assert!(!path.exists());
    }
}
