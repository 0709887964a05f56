//! Server mode
//!
//! Configures and starts the HTTP server: management API under `/api`,
//! everything else handled by the redirect catch-all.

use actix_web::{App, HttpServer};
use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::api::{RequestIdMiddleware, configure_app};
use crate::config::StaticConfig;
use crate::runtime::lifetime;

/// Run the HTTP server until it stops or Ctrl+C is received.
///
/// **Note**: Logging system must be initialized before calling this function
pub async fn run_server(config: &StaticConfig) -> Result<()> {
    let startup = lifetime::startup::prepare_server_startup(config)
        .await
        .inspect_err(|e| tracing::error!("Server startup failed: {:#}", e))?;

    let state = startup.state.clone();
    let gate = startup.gate.clone();

    let cpu_count = config.server.cpu_count.clamp(1, 32);
    info!("Using {} CPU cores for the server", cpu_count);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(RequestIdMiddleware)
            .configure(configure_app(state.clone(), gate.clone()))
    })
    .keep_alive(std::time::Duration::from_secs(30))
    .client_request_timeout(std::time::Duration::from_millis(5000))
    .client_disconnect_timeout(std::time::Duration::from_millis(1000))
    .workers(cpu_count);

    let bind_address = format!("{}:{}", config.server.host, config.server.port);
    warn!("Starting server at http://{}", bind_address);
    let server = server
        .bind(&bind_address)
        .with_context(|| format!("Failed to bind {}", bind_address))?
        .run();

    tokio::select! {
        res = server => {
            res?;
        }
        _ = lifetime::shutdown::listen_for_shutdown(startup.background_tasks) => {
            warn!("Graceful shutdown complete");
        }
    }

    Ok(())
}
