//! HTTP server module
//!
//! Wires the pipeline providers into the axum application and runs it.

mod api;

pub use api::create_router;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;

use crate::config::AppConfig;
use crate::pipeline::{QuoteSource, ScriptQuoteSource, ScriptSentimentScorer, SentimentScorer};
use crate::process::ProcessHarness;

/// Shared state for the API handlers.
///
/// The providers carry no per-request state; each request spawns its
/// own collaborator processes, so handlers share nothing mutable.
#[derive(Clone)]
pub struct AppState {
    pub quotes: Arc<dyn QuoteSource>,
    pub sentiment: Arc<dyn SentimentScorer>,
}

impl AppState {
    /// Build the process-backed providers from configuration.
    pub fn from_config(config: &AppConfig) -> Self {
        let harness =
            ProcessHarness::new(Duration::from_secs(config.pipeline.stage_timeout_secs));
        Self {
            quotes: Arc::new(ScriptQuoteSource::new(
                config.pipeline.quote.clone(),
                harness.clone(),
            )),
            sentiment: Arc::new(ScriptSentimentScorer::new(
                config.pipeline.sentiment.clone(),
                harness,
            )),
        }
    }
}

/// Bind and serve until a shutdown signal arrives.
pub async fn serve(config: &AppConfig, state: AppState) -> Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "listening");

    let app = create_router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received");
    }
}
