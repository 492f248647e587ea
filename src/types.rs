//! Core types used throughout StockPulse
//!
//! Defines the quote dataset, sentiment result, and the aggregated
//! response document returned by the API.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One symbol's time series of price bars plus metadata.
///
/// Produced by the quote fetch stage and never mutated afterwards;
/// `rows` keep the order the upstream emitted them in (oldest first).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteDataset {
    /// Ticker symbol the dataset was fetched for. Upstream documents may
    /// omit it; the fetch stage fills it from the request.
    #[serde(default)]
    pub symbol: String,
    pub meta: QuoteMeta,
    pub rows: Vec<OhlcvBar>,
}

/// Metadata block of a quote dataset, camelCase on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteMeta {
    pub symbol: String,
    pub last_refreshed: String,
    pub time_zone: String,
    /// Present only for intraday series.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,
}

/// Open/high/low/close/volume record for one time interval.
///
/// The `high >= open/close >= low` envelope is an upstream guarantee and
/// is not re-checked here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OhlcvBar {
    pub timestamp: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Directional label produced by the sentiment scorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Prediction {
    Bullish,
    Bearish,
    Neutral,
    /// Placeholder label used when the scoring stage failed.
    Error,
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prediction::Bullish => write!(f, "Bullish"),
            Prediction::Bearish => write!(f, "Bearish"),
            Prediction::Neutral => write!(f, "Neutral"),
            Prediction::Error => write!(f, "Error"),
        }
    }
}

/// Outcome of the sentiment stage.
///
/// Either parsed from the scorer's stdout, or synthesized locally via
/// [`SentimentResult::failure`] when the stage fails in any way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentResult {
    pub prediction: Prediction,
    /// Trend score, present only on a successful scorer run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    pub message: String,
}

impl SentimentResult {
    /// Placeholder result substituted when the scoring stage fails.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            prediction: Prediction::Error,
            score: None,
            message: message.into(),
        }
    }
}

/// The response document: quote dataset with sentiment attached.
///
/// `sentiment` is always populated; scorer failures yield the Error
/// placeholder rather than an absent field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedQuote {
    #[serde(flatten)]
    pub quote: QuoteDataset,
    pub sentiment: SentimentResult,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_camel_case_wire_format() {
        let meta = QuoteMeta {
            symbol: "AAPL".to_string(),
            last_refreshed: "2024-01-02".to_string(),
            time_zone: "US/Eastern".to_string(),
            interval: None,
        };

        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["lastRefreshed"], "2024-01-02");
        assert_eq!(json["timeZone"], "US/Eastern");
        // Absent interval stays off the wire entirely
        assert!(json.get("interval").is_none());
    }

    #[test]
    fn test_dataset_symbol_defaults_when_upstream_omits_it() {
        let raw = r#"{"meta":{"symbol":"AAPL","lastRefreshed":"2024-01-02","timeZone":"US/Eastern"},"rows":[]}"#;
        let dataset: QuoteDataset = serde_json::from_str(raw).unwrap();
        assert_eq!(dataset.symbol, "");
        assert_eq!(dataset.meta.symbol, "AAPL");
    }

    #[test]
    fn test_aggregated_quote_flattens_dataset() {
        let aggregated = AggregatedQuote {
            quote: QuoteDataset {
                symbol: "AAPL".to_string(),
                meta: QuoteMeta {
                    symbol: "AAPL".to_string(),
                    last_refreshed: "2024-01-02".to_string(),
                    time_zone: "US/Eastern".to_string(),
                    interval: None,
                },
                rows: vec![OhlcvBar {
                    timestamp: "2024-01-02".to_string(),
                    open: 180.0,
                    high: 182.0,
                    low: 179.0,
                    close: 181.0,
                    volume: 1000,
                }],
            },
            sentiment: SentimentResult {
                prediction: Prediction::Bullish,
                score: Some(0.82),
                message: "uptrend".to_string(),
            },
        };

        let json = serde_json::to_value(&aggregated).unwrap();
        // Dataset fields sit at the top level next to sentiment
        assert_eq!(json["symbol"], "AAPL");
        assert_eq!(json["rows"][0]["close"], 181.0);
        assert_eq!(json["sentiment"]["prediction"], "Bullish");
        assert_eq!(json["sentiment"]["score"], 0.82);
    }

    #[test]
    fn test_failure_placeholder_has_no_score() {
        let placeholder = SentimentResult::failure("Sentiment analysis failed to run.");
        assert_eq!(placeholder.prediction, Prediction::Error);
        assert_eq!(placeholder.score, None);

        let json = serde_json::to_value(&placeholder).unwrap();
        assert!(json.get("score").is_none());
    }
}
