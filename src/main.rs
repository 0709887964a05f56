use anyhow::Context;
use clap::Parser;
use tracing::info;

use linkmap::cli::{Cli, Commands};
use linkmap::config::{init_config, try_init_config};
use linkmap::runtime::modes::{run_cli, run_server};
use linkmap::system::init_logging;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let command = cli.command();
    let config = if command.touches_store() {
        try_init_config(cli.config.as_deref()).context("Failed to load configuration")?
    } else {
        init_config(cli.config.as_deref())
    };

    match command {
        Commands::Serve => {
            // guard 必须存活到进程结束，否则文件日志不会落盘
            let _log_guard = init_logging(&config.logging)?;
            info!(
                "linkmap {} starting (storage: {})",
                env!("CARGO_PKG_VERSION"),
                config.storage.backend
            );
            run_server(&config).await
        }
        command => run_cli(&config, command).await,
    }
}
