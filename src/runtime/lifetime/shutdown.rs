use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// 等待 Ctrl+C，然后中止后台任务
pub async fn listen_for_shutdown(background_tasks: Vec<JoinHandle<()>>) {
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Shutdown signal received, stopping...");
        }
        Err(e) => {
            warn!(
                "Failed to listen for Ctrl+C: {}. Proceeding with shutdown anyway.",
                e
            );
        }
    }

    for task in background_tasks {
        task.abort();
    }
    info!("Background tasks stopped");
}
