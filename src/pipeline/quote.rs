//! Quote fetch stage
//!
//! Invokes the quote-source program with the requested symbol and
//! classifies its three failure channels: process exit code, malformed
//! stdout, and the source's in-band error field.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{error, info};

use super::{PipelineError, QuoteSource};
use crate::config::StageCommand;
use crate::process::ProcessHarness;
use crate::types::QuoteDataset;

/// Quote source backed by an external program.
///
/// The program is invoked as `<program> [args..] <symbol>` with no
/// stdin payload and must emit one JSON dataset document on stdout.
pub struct ScriptQuoteSource {
    command: StageCommand,
    harness: ProcessHarness,
}

impl ScriptQuoteSource {
    pub fn new(command: StageCommand, harness: ProcessHarness) -> Self {
        Self { command, harness }
    }
}

#[async_trait]
impl QuoteSource for ScriptQuoteSource {
    async fn fetch(&self, symbol: &str) -> Result<QuoteDataset, PipelineError> {
        let mut args = self.command.args.clone();
        args.push(symbol.to_string());

        let output = self
            .harness
            .run(&self.command.program, &args, None)
            .await
            .map_err(|e| PipelineError::from_harness("quote", e))?;

        if !output.success() {
            let stderr = output.stderr_text();
            error!(
                symbol,
                exit_code = output.exit_code(),
                stderr = %stderr.trim(),
                "quote source failed"
            );
            return Err(PipelineError::UpstreamFetch {
                exit_code: output.exit_code(),
                stderr,
            });
        }

        let document: Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| PipelineError::ResponseParse(e.to_string()))?;

        // The source can report a semantic error (unknown symbol, rate
        // limit) inside an otherwise successful run. Check the in-band
        // channel before coercing; the exit code alone is not enough.
        if let Some(message) = document.get("error").and_then(Value::as_str) {
            info!(symbol, upstream_error = message, "quote source reported a data error");
            return Err(PipelineError::UpstreamData(message.to_string()));
        }

        let mut dataset: QuoteDataset = serde_json::from_value(document)
            .map_err(|e| PipelineError::ResponseParse(e.to_string()))?;
        if dataset.symbol.is_empty() {
            dataset.symbol = symbol.to_string();
        }

        info!(symbol, rows = dataset.rows.len(), "quote dataset fetched");
        Ok(dataset)
    }
}
