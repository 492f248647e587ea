//! StockPulse service binary

use anyhow::Result;
use stockpulse::config::AppConfig;
use stockpulse::server::{self, AppState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("stockpulse=info,tower_http=warn")),
        )
        .init();

    let config = AppConfig::load()?;
    let state = AppState::from_config(&config);
    server::serve(&config, state).await
}
