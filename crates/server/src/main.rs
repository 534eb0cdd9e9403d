// crates/server/src/main.rs
//! Dashboard server binary.

use anyhow::{Context, Result};
use cc_dashboard_server::{create_app, AppState, DataSource, ServerConfig};
use clap::Parser;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "warn,cc_dashboard=info,cc_dashboard_server=info,cc_dashboard_stats=info";

#[tokio::main]
async fn main() -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = ServerConfig::parse();
    let live_dir = config
        .live_dir()
        .context("cannot determine Claude data directory; pass --claude-dir")?;
    let data_source = DataSource::new(&live_dir, &config.import_dir);
    let active = data_source.active().await;
    tracing::info!(
        live_dir = %live_dir.display(),
        import_dir = %config.import_dir.display(),
        active = active.as_str(),
        "Data source configured"
    );

    let state = AppState::new(data_source, config.stats_config());
    let app = create_app(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    eprintln!("cc-dashboard listening on http://{}", addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
