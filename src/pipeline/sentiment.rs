//! Sentiment scoring stage
//!
//! Serializes the fetched dataset onto the scorer's stdin and parses
//! the verdict from its stdout. Every failure mode here is absorbed
//! into a placeholder result; this stage never takes the request down
//! with it.

use async_trait::async_trait;
use tracing::warn;

use super::SentimentScorer;
use crate::config::StageCommand;
use crate::process::ProcessHarness;
use crate::types::{QuoteDataset, SentimentResult};

const RUN_FAILURE_MESSAGE: &str = "Sentiment analysis failed to run.";
const PARSE_FAILURE_MESSAGE: &str = "Failed to parse sentiment result.";

/// Sentiment scorer backed by an external program.
///
/// The program is invoked with no per-request arguments; it reads the
/// dataset JSON from stdin until end-of-input and must emit a
/// `{prediction, score, message}` document on stdout.
pub struct ScriptSentimentScorer {
    command: StageCommand,
    harness: ProcessHarness,
}

impl ScriptSentimentScorer {
    pub fn new(command: StageCommand, harness: ProcessHarness) -> Self {
        Self { command, harness }
    }
}

#[async_trait]
impl SentimentScorer for ScriptSentimentScorer {
    async fn score(&self, dataset: &QuoteDataset) -> SentimentResult {
        let payload = match serde_json::to_vec(dataset) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "could not serialize dataset for the scorer");
                return SentimentResult::failure(RUN_FAILURE_MESSAGE);
            }
        };

        let output = match self
            .harness
            .run(&self.command.program, &self.command.args, Some(&payload))
            .await
        {
            Ok(output) => output,
            Err(e) => {
                warn!(symbol = %dataset.symbol, error = %e, "sentiment scorer did not run");
                return SentimentResult::failure(RUN_FAILURE_MESSAGE);
            }
        };

        if !output.success() {
            warn!(
                symbol = %dataset.symbol,
                exit_code = output.exit_code(),
                stderr = %output.stderr_text().trim(),
                "sentiment scorer exited nonzero"
            );
            return SentimentResult::failure(RUN_FAILURE_MESSAGE);
        }

        match serde_json::from_slice::<SentimentResult>(&output.stdout) {
            Ok(result) => result,
            Err(e) => {
                warn!(symbol = %dataset.symbol, error = %e, "sentiment scorer output did not parse");
                SentimentResult::failure(PARSE_FAILURE_MESSAGE)
            }
        }
    }
}
