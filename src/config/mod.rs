//! Configuration management for StockPulse
//!
//! Loads from YAML files + environment variables via .env

use anyhow::Result;
use config::{Config, Environment, File};
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,
    /// Listen port
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Quote-source invocation; the symbol is appended per request
    pub quote: StageCommand,
    /// Sentiment-scorer invocation; the dataset arrives on stdin
    pub sentiment: StageCommand,
    /// Hard bound on each external invocation in seconds
    pub stage_timeout_secs: u64,
}

/// Program plus fixed argument prefix for one collaborator.
#[derive(Debug, Clone, Deserialize)]
pub struct StageCommand {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self> {
        // Load .env file first
        dotenvy::dotenv().ok();

        let config = Config::builder()
            // Server defaults
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            // Pipeline defaults
            .set_default("pipeline.quote.program", "python3")?
            .set_default("pipeline.quote.args", vec!["scripts/fetch_quotes.py"])?
            .set_default("pipeline.sentiment.program", "python3")?
            .set_default("pipeline.sentiment.args", vec!["scripts/score_sentiment.py"])?
            .set_default("pipeline.stage_timeout_secs", 30)?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // Environment variables override (STOCKPULSE__SERVER__PORT=8080)
            .add_source(Environment::with_prefix("STOCKPULSE").separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}
