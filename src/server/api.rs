//! Aggregation HTTP API
//!
//! REST endpoints for the stock-tracker frontend.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use super::AppState;
use crate::pipeline::PipelineError;
use crate::types::AggregatedQuote;

/// Create the API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/stock", get(get_stock))
        .route("/api/health", get(get_health))
        .with_state(state)
        // CORS for frontend
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

#[derive(Debug, Deserialize)]
struct StockQuery {
    symbol: Option<String>,
}

/// GET /api/stock?symbol=AAPL - quote dataset with sentiment attached
///
/// The two stages run strictly in sequence: a fetch failure ends the
/// request before the scorer is ever spawned, while a scorer failure is
/// absorbed so the fetched data still goes out.
async fn get_stock(
    Query(query): Query<StockQuery>,
    State(state): State<AppState>,
) -> Result<Json<AggregatedQuote>, ApiError> {
    let symbol = query.symbol.as_deref().map(str::trim).unwrap_or("");
    if symbol.is_empty() {
        return Err(ApiError::from(PipelineError::MissingSymbol));
    }

    info!(symbol, "aggregating quote");
    let quote = state.quotes.fetch(symbol).await?;
    let sentiment = state.sentiment.score(&quote).await;

    Ok(Json(AggregatedQuote { quote, sentiment }))
}

/// GET /api/health - liveness probe
async fn get_health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().timestamp(),
    }))
}

/// HTTP projection of a pipeline failure.
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    error: String,
    details: Option<String>,
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::MissingSymbol => Self {
                status: StatusCode::BAD_REQUEST,
                error: "Stock symbol is required.".to_string(),
                details: None,
            },
            PipelineError::UpstreamData(message) => Self {
                status: StatusCode::NOT_FOUND,
                error: message,
                details: None,
            },
            PipelineError::UpstreamFetch { stderr, .. } => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                error: "Failed to fetch stock data.".to_string(),
                details: Some(stderr),
            },
            PipelineError::ResponseParse(reason) => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                error: "Failed to parse stock data.".to_string(),
                details: Some(reason),
            },
            other @ (PipelineError::Launch { .. }
            | PipelineError::StageTimeout { .. }
            | PipelineError::StageIo { .. }) => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                error: "Stock data pipeline failed to run.".to_string(),
                details: Some(other.to_string()),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({ "error": self.error });
        if let Some(details) = self.details {
            body["details"] = json!(details);
        }
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{QuoteSource, SentimentScorer};
    use crate::types::{OhlcvBar, Prediction, QuoteDataset, QuoteMeta, SentimentResult};
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use mockall::mock;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    mock! {
        Quotes {}

        #[async_trait]
        impl QuoteSource for Quotes {
            async fn fetch(&self, symbol: &str) -> Result<QuoteDataset, PipelineError>;
        }
    }

    mock! {
        Scorer {}

        #[async_trait]
        impl SentimentScorer for Scorer {
            async fn score(&self, dataset: &QuoteDataset) -> SentimentResult;
        }
    }

    fn app(quotes: MockQuotes, scorer: MockScorer) -> Router {
        create_router(AppState {
            quotes: Arc::new(quotes),
            sentiment: Arc::new(scorer),
        })
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap();
        (status, body)
    }

    fn dataset(symbol: &str) -> QuoteDataset {
        QuoteDataset {
            symbol: symbol.to_string(),
            meta: QuoteMeta {
                symbol: symbol.to_string(),
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
        }
    }

    #[tokio::test]
    async fn test_missing_symbol_is_rejected_before_any_stage() {
        // No expectations set: a fetch or score call would panic.
        let (status, body) = get(app(MockQuotes::new(), MockScorer::new()), "/api/stock").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Stock symbol is required." }));
    }

    #[tokio::test]
    async fn test_blank_symbol_is_rejected_before_any_stage() {
        let (status, body) = get(
            app(MockQuotes::new(), MockScorer::new()),
            "/api/stock?symbol=%20%20",
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Stock symbol is required." }));
    }

    #[tokio::test]
    async fn test_upstream_data_error_maps_to_404_and_skips_scoring() {
        let mut quotes = MockQuotes::new();
        quotes
            .expect_fetch()
            .withf(|symbol: &str| symbol == "ZZZZ")
            .returning(|_| Err(PipelineError::UpstreamData("Invalid symbol".to_string())));

        let (status, body) = get(app(quotes, MockScorer::new()), "/api/stock?symbol=ZZZZ").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "error": "Invalid symbol" }));
    }

    #[tokio::test]
    async fn test_fetch_process_failure_maps_to_500_with_details() {
        let mut quotes = MockQuotes::new();
        quotes.expect_fetch().returning(|_| {
            Err(PipelineError::UpstreamFetch {
                exit_code: 1,
                stderr: "upstream unreachable\n".to_string(),
            })
        });

        let (status, body) = get(app(quotes, MockScorer::new()), "/api/stock?symbol=BAD").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to fetch stock data.");
        assert_eq!(body["details"], "upstream unreachable\n");
    }

    #[tokio::test]
    async fn test_stage_timeout_maps_to_500() {
        let mut quotes = MockQuotes::new();
        quotes.expect_fetch().returning(|_| {
            Err(PipelineError::StageTimeout {
                stage: "quote",
                timeout: Duration::from_secs(30),
            })
        });

        let (status, body) = get(app(quotes, MockScorer::new()), "/api/stock?symbol=AAPL").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["details"].as_str().unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_success_merges_dataset_and_sentiment() {
        let mut quotes = MockQuotes::new();
        quotes
            .expect_fetch()
            .withf(|symbol: &str| symbol == "AAPL")
            .returning(|symbol| Ok(dataset(symbol)));

        let mut scorer = MockScorer::new();
        scorer
            .expect_score()
            .withf(|dataset: &QuoteDataset| dataset.symbol == "AAPL")
            .returning(|_| SentimentResult {
                prediction: Prediction::Bullish,
                score: Some(0.82),
                message: "uptrend".to_string(),
            });

        let (status, body) = get(app(quotes, scorer), "/api/stock?symbol=AAPL").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["symbol"], "AAPL");
        assert_eq!(body["meta"]["timeZone"], "US/Eastern");
        assert_eq!(body["rows"][0]["volume"], 1000);
        assert_eq!(body["sentiment"]["prediction"], "Bullish");
        assert_eq!(body["sentiment"]["score"], 0.82);
    }

    #[tokio::test]
    async fn test_scorer_placeholder_still_yields_200() {
        let mut quotes = MockQuotes::new();
        quotes.expect_fetch().returning(|symbol| Ok(dataset(symbol)));

        let mut scorer = MockScorer::new();
        scorer
            .expect_score()
            .returning(|_| SentimentResult::failure("Sentiment analysis failed to run."));

        let (status, body) = get(app(quotes, scorer), "/api/stock?symbol=AAPL").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["rows"][0]["close"], 181.0);
        assert_eq!(
            body["sentiment"],
            json!({ "prediction": "Error", "message": "Sentiment analysis failed to run." })
        );
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (status, body) = get(app(MockQuotes::new(), MockScorer::new()), "/api/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "stockpulse");
    }
}
