//! MySQL table browser entry point.
//!
//! Loads configuration from the environment, connects the pool and serves
//! the JSON API until Ctrl+C, SIGTERM or SIGHUP.

use std::sync::Arc;

use anyhow::Result;
use mysql_table_browser::database::{create_pool, QueryExecutor};
use mysql_table_browser::http::{serve, AppState};
use mysql_table_browser::shutdown::{install_signal_handlers, new_shutdown_controller};
use mysql_table_browser::{Config, ServerError, TableService};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    info!(
        "MySQL table browser v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env().inspect_err(report)?;
    info!("Configuration loaded successfully");

    let controller = new_shutdown_controller(config.shutdown.drain_timeout);
    install_signal_handlers(controller.clone());

    let pool = create_pool(&config.database).await.inspect_err(report)?;
    let executor = Arc::new(QueryExecutor::new(
        pool.clone(),
        config.database.query_timeout,
    ));
    let state = Arc::new(AppState::new(TableService::new(
        executor,
        config.browse.clone(),
    )));

    let served = serve(state, &config.http, controller.clone()).await;
    controller.close(&pool).await;
    served.inspect_err(report)?;

    Ok(())
}

fn report(err: &ServerError) {
    match err.suggestion() {
        Some(hint) => error!("{} ({})", err, hint),
        None => error!("{}", err),
    }
}

/// Initialize tracing subscriber with stderr output.
fn init_logging() {
    let filter = std::env::var("RUST_LOG")
        .map(EnvFilter::new)
        .unwrap_or_else(|_| EnvFilter::new("warn,mysql_table_browser=info,tower_http=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}
