//! HTTP façade re-exposing the sender's operations.
//!
//! Routes:
//! - `POST /postback` and `POST /click`: 200 with the API response, or 400 with the error text
//! - `POST /batch-postbacks`: always 200 with one tagged result per conversion
//! - `GET /health` and `GET /api/metrics`

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::client::AfftokClient;
use crate::error::DeliveryError;
use crate::types::{BatchItemResult, ClickEvent, ConversionEvent, DeliveryReport, DeliveryResult};

/// Application state shared across all requests
#[derive(Clone)]
pub struct AppState {
    client: Arc<AfftokClient>,
    metrics: Arc<Metrics>,
}

/// Server metrics
struct Metrics {
    total_requests: AtomicU64,
    requests_in_flight: AtomicU64,
    failed_deliveries: AtomicU64,
    start_time: Instant,
}

impl Metrics {
    /// Count a request and hold it as in-flight until the guard drops.
    fn begin(&self) -> RequestGuard<'_> {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.requests_in_flight.fetch_add(1, Ordering::Relaxed);
        RequestGuard(&self.requests_in_flight)
    }

    fn record_failures(&self, count: u64) {
        if count > 0 {
            self.failed_deliveries.fetch_add(count, Ordering::Relaxed);
        }
    }
}

/// RAII guard for tracking in-flight requests
struct RequestGuard<'a>(&'a AtomicU64);

impl<'a> Drop for RequestGuard<'a> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Build the Axum application with routes and middleware
pub fn build_app(client: Arc<AfftokClient>) -> Router {
    let metrics = Arc::new(Metrics {
        total_requests: AtomicU64::new(0),
        requests_in_flight: AtomicU64::new(0),
        failed_deliveries: AtomicU64::new(0),
        start_time: Instant::now(),
    });

    let state = AppState { client, metrics };

    Router::new()
        .route("/health", get(health_check))
        .route("/postback", post(send_postback))
        .route("/click", post(track_click))
        .route("/batch-postbacks", post(batch_postbacks))
        .route("/api/metrics", get(get_metrics))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

/// Forward one conversion
async fn send_postback(
    State(state): State<AppState>,
    Json(event): Json<ConversionEvent>,
) -> Result<Json<DeliveryReport>, ApiError> {
    let _guard = state.metrics.begin();
    event.validate().map_err(ApiError::from)?;

    tracing::info!(
        "Postback for offer {} transaction {}",
        event.offer_id,
        event.transaction_id
    );

    let result = state.client.send_postback(&event).await;
    into_report(&state, result)
}

/// Forward one click
async fn track_click(
    State(state): State<AppState>,
    Json(event): Json<ClickEvent>,
) -> Result<Json<DeliveryReport>, ApiError> {
    let _guard = state.metrics.begin();
    event.validate().map_err(ApiError::from)?;

    tracing::info!("Click for offer {}", event.offer_id);

    let result = state.client.track_click(&event).await;
    into_report(&state, result)
}

/// Forward several conversions in order
async fn batch_postbacks(
    State(state): State<AppState>,
    Json(events): Json<Vec<ConversionEvent>>,
) -> Result<Json<BatchResponse>, ApiError> {
    let _guard = state.metrics.begin();
    tracing::info!("Batch of {} postbacks", events.len());

    let results = state.client.send_batch_postbacks(&events).await;
    let failed = results.iter().filter(|r| !r.is_success()).count();
    state.metrics.record_failures(failed as u64);

    Ok(Json(BatchResponse { results }))
}

#[derive(Serialize)]
struct BatchResponse {
    results: Vec<BatchItemResult>,
}

/// Get server metrics
async fn get_metrics(State(state): State<AppState>) -> Json<MetricsResponse> {
    Json(MetricsResponse {
        total_requests: state.metrics.total_requests.load(Ordering::Relaxed),
        requests_in_flight: state.metrics.requests_in_flight.load(Ordering::Relaxed),
        failed_deliveries: state.metrics.failed_deliveries.load(Ordering::Relaxed),
        uptime_seconds: state.metrics.start_time.elapsed().as_secs(),
    })
}

#[derive(Serialize, Deserialize)]
pub struct MetricsResponse {
    pub total_requests: u64,
    pub requests_in_flight: u64,
    pub failed_deliveries: u64,
    pub uptime_seconds: u64,
}

fn into_report(state: &AppState, result: DeliveryResult) -> Result<Json<DeliveryReport>, ApiError> {
    if let Err(e) = &result {
        state.metrics.record_failures(1);
        tracing::error!("Delivery error: {}", e);
        return Err(ApiError::Delivery(e.to_string()));
    }
    Ok(Json(DeliveryReport::from(&result)))
}

impl From<DeliveryError> for ApiError {
    fn from(err: DeliveryError) -> Self {
        match err {
            DeliveryError::Invalid(msg) => ApiError::BadRequest(msg),
            other => ApiError::Delivery(other.to_string()),
        }
    }
}

/// API error types
enum ApiError {
    BadRequest(String),
    /// The tracking API rejected the event or could not be reached.
    Delivery(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match self {
            ApiError::BadRequest(msg) | ApiError::Delivery(msg) => msg,
        };

        let body = Json(serde_json::json!({
            "success": false,
            "error": message
        }));

        (StatusCode::BAD_REQUEST, body).into_response()
    }
}
