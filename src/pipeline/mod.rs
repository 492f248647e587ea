//! Quote and sentiment aggregation pipeline
//!
//! Two capability providers behind trait seams: a quote source that
//! fetches one symbol's time series, and a sentiment scorer that
//! classifies a fetched dataset. The process-backed implementations
//! live in `quote` and `sentiment`; the traits exist so an in-process
//! provider can replace a spawned one without touching the handlers.

mod quote;
mod sentiment;

pub use quote::ScriptQuoteSource;
pub use sentiment::ScriptSentimentScorer;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::process::HarnessError;
use crate::types::{QuoteDataset, SentimentResult};

/// Failures that terminate a request.
///
/// Everything here comes out of the quote path; the sentiment stage
/// absorbs its own failures into a placeholder result instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The request did not carry a usable ticker symbol.
    #[error("Stock symbol is required.")]
    MissingSymbol,

    /// A collaborator program could not be started at all.
    #[error("failed to launch `{program}`: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The quote process exited nonzero; `stderr` carries its diagnostics.
    #[error("quote source exited with code {exit_code}")]
    UpstreamFetch { exit_code: i32, stderr: String },

    /// The quote process exited zero but its output was not a dataset.
    #[error("failed to parse quote source output: {0}")]
    ResponseParse(String),

    /// The quote source reported a semantic error in-band (unknown
    /// symbol, rate limit) despite exiting zero.
    #[error("{0}")]
    UpstreamData(String),

    /// An external invocation exceeded the configured bound.
    #[error("{stage} stage timed out after {timeout:?}")]
    StageTimeout {
        stage: &'static str,
        timeout: Duration,
    },

    /// Pipe plumbing to a collaborator failed mid-conversation.
    #[error("{stage} stage i/o failure: {reason}")]
    StageIo { stage: &'static str, reason: String },
}

impl PipelineError {
    pub(crate) fn from_harness(stage: &'static str, err: HarnessError) -> Self {
        match err {
            HarnessError::Launch { program, source } => PipelineError::Launch { program, source },
            HarnessError::Timeout { timeout, .. } => PipelineError::StageTimeout { stage, timeout },
            HarnessError::Io { source, .. } => PipelineError::StageIo {
                stage,
                reason: source.to_string(),
            },
        }
    }
}

/// A provider of quote datasets for ticker symbols.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Fetch the time series for `symbol`. A failure here is terminal
    /// for the request; there is no dataset to fall back on.
    async fn fetch(&self, symbol: &str) -> Result<QuoteDataset, PipelineError>;
}

/// A provider of sentiment classifications for quote datasets.
///
/// Scoring is best-effort by contract: implementations absorb their own
/// failures and return the Error placeholder instead, so an unstable
/// scorer can never block delivery of already-fetched quote data.
#[async_trait]
pub trait SentimentScorer: Send + Sync {
    async fn score(&self, dataset: &QuoteDataset) -> SentimentResult;
}
