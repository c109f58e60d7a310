//! HTTP API for district comparison
//!
//! # Routes
//!
//! - `GET /districts` - Distinct district names from a fresh upstream fetch
//! - `GET /district/{name}` - Raw records for one district (case-insensitive)
//! - `GET /compare?sortby={field}&top={n}` - Cached per-district summaries
//! - `GET /health` - Liveness probe
//! - `GET /stats` - Summary cache state
//!
//! Every route is also served under `/api`.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::net::TcpListener;

use crate::cache::{CacheStats, SummaryCache};
use crate::cli::ServiceConfig;
use crate::data::{
    district_name, text_field, DataGovClient, DistrictSummary, RawRecord, RecordSource,
    SourceError, SummaryField, DISTRICT_NAME,
};

/// `top` value used when the parameter has no leading integer
pub const DEFAULT_TOP: usize = 10;
/// Upper bound on `top`
pub const MAX_TOP: usize = 100;

/// Message returned for a district with no records
pub const NOT_FOUND_MESSAGE: &str = "No data found for this district.";

/// Server error types
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Record source error: {0}")]
    Source(#[from] SourceError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Bind error on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },
}

/// Endpoint failures, each rendered as `{ "message": ... }`
#[derive(Debug, Error)]
pub enum ApiError {
    /// The upstream fetch failed; `message` is the endpoint's static reply
    #[error("{message}: {source}")]
    SourceUnavailable {
        message: &'static str,
        #[source]
        source: SourceError,
    },

    /// No records matched the requested district
    #[error("No data found for this district.")]
    NotFound,
}

impl ApiError {
    /// Wraps a source error with the endpoint's static message
    fn unavailable(message: &'static str) -> impl FnOnce(SourceError) -> Self {
        move |source| ApiError::SourceUnavailable { message, source }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::SourceUnavailable { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::NotFound => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            ApiError::SourceUnavailable { message, source } => {
                tracing::error!(error = %source, "{}", message);
                *message
            }
            ApiError::NotFound => NOT_FOUND_MESSAGE,
        };

        (
            self.status(),
            Json(ErrorResponse {
                message: message.to_string(),
            }),
        )
            .into_response()
    }
}

// ============================================================================
// Request/Response types
// ============================================================================

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}

/// Body of `GET /districts`
#[derive(Debug, Serialize, Deserialize)]
pub struct DistrictsResponse {
    pub districts: Vec<String>,
}

/// Query string of `GET /compare`
#[derive(Debug, Default)]
pub struct CompareQuery {
    pub sortby: Option<String>,
    pub top: Option<String>,
}

impl CompareQuery {
    /// Builds the query from raw key/value pairs; a repeated key keeps its first value
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut query = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "sortby" => &mut query.sortby,
                "top" => &mut query.top,
                _ => continue,
            };
            slot.get_or_insert(value);
        }
        query
    }
}

/// Resolves a `top` parameter to an entry count
///
/// Takes the leading integer of `raw` (after optional whitespace and sign),
/// clamps it to `0..=MAX_TOP`, and falls back to [`DEFAULT_TOP`] when there
/// is no leading integer.
pub fn parse_top(raw: &str) -> usize {
    let trimmed = raw.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let mut value: u64 = 0;
    let mut seen_digit = false;
    for byte in digits.bytes().take_while(u8::is_ascii_digit) {
        seen_digit = true;
        value = value
            .saturating_mul(10)
            .saturating_add(u64::from(byte - b'0'));
    }

    if !seen_digit {
        DEFAULT_TOP
    } else if negative {
        0
    } else {
        value.min(MAX_TOP as u64) as usize
    }
}

/// Applies `sortby` and `top` to a summary set without touching the cached set
///
/// Sorting is descending and stable, so ties keep their cached order. An
/// unknown or non-numeric `sortby` leaves the order unchanged. Empty
/// parameters count as absent.
pub fn apply_compare_query(
    summary: &[DistrictSummary],
    query: &CompareQuery,
) -> Vec<DistrictSummary> {
    let mut out = summary.to_vec();

    if let Some(sortby) = query.sortby.as_deref().filter(|s| !s.is_empty()) {
        match SummaryField::from_param(sortby) {
            Some(field) => out.sort_by(|a, b| {
                field
                    .value(b)
                    .partial_cmp(&field.value(a))
                    .unwrap_or(Ordering::Equal)
            }),
            None => tracing::debug!(sortby, "Ignoring unknown sort field"),
        }
    }

    if let Some(top) = query.top.as_deref().filter(|s| !s.is_empty()) {
        out.truncate(parse_top(top));
    }

    out
}

// ============================================================================
// Server
// ============================================================================

/// Shared server state
struct AppState {
    source: Arc<dyn RecordSource>,
    cache: SummaryCache,
}

/// HTTP server for the comparison API
pub struct ApiServer {
    state: Arc<AppState>,
}

impl ApiServer {
    /// Creates a server over `source`, caching summaries for `cache_ttl`
    pub fn new(source: Arc<dyn RecordSource>, cache_ttl: Duration) -> Self {
        let cache = SummaryCache::new(Arc::clone(&source), cache_ttl);
        Self {
            state: Arc::new(AppState { source, cache }),
        }
    }

    /// Creates a server backed by the data.gov.in API as configured
    pub fn from_config(config: &ServiceConfig) -> Result<Self, ServerError> {
        let mut client = DataGovClient::with_base_url(&config.base_url, &config.api_key)
            .with_limit(config.record_limit);
        if let Some(timeout) = config.upstream_timeout {
            client = client.with_timeout(timeout)?;
        }
        Ok(Self::new(Arc::new(client), config.cache_ttl))
    }

    /// Builds the router, serving every route at the root and under `/api`
    pub fn router(&self) -> Router {
        routes()
            .nest("/api", routes())
            .layer(middleware::from_fn(log_request))
            .with_state(Arc::clone(&self.state))
    }

    /// Run the server on the given address until Ctrl-C or SIGTERM
    pub async fn run(self, addr: SocketAddr) -> Result<(), ServerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;

        tracing::info!(
            addr = %addr,
            cache_ttl_secs = self.state.cache.ttl().as_secs(),
            "MGNREGA comparison API listening"
        );

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(ServerError::Io)
    }
}

fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .route("/stats", get(cache_stats))
        .route("/districts", get(list_districts))
        .route("/district/{name}", get(get_district))
        .route("/compare", get(compare))
}

/// Logs method, path, status and latency for every request
async fn log_request(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    tracing::info!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request"
    );
    response
}

async fn shutdown_signal() {
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {},
        _ = terminate => {},
    }
    tracing::info!("Shutting down");
}

// ============================================================================
// Handlers
// ============================================================================

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn cache_stats(State(state): State<Arc<AppState>>) -> Json<CacheStats> {
    Json(state.cache.stats().await)
}

async fn list_districts(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DistrictsResponse>, ApiError> {
    let records = state
        .source
        .fetch_records()
        .await
        .map_err(ApiError::unavailable("Failed to load districts"))?;

    let names: BTreeSet<String> = records
        .iter()
        .filter_map(district_name)
        .map(str::to_string)
        .collect();

    Ok(Json(DistrictsResponse {
        districts: names.into_iter().collect(),
    }))
}

async fn get_district(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<Vec<RawRecord>>, ApiError> {
    let records = state
        .source
        .fetch_records()
        .await
        .map_err(ApiError::unavailable("Error fetching data"))?;

    let wanted = name.to_lowercase();
    let matching: Vec<RawRecord> = records
        .into_iter()
        .filter(|r| text_field(r, DISTRICT_NAME).unwrap_or("").to_lowercase() == wanted)
        .collect();

    if matching.is_empty() {
        return Err(ApiError::NotFound);
    }
    Ok(Json(matching))
}

async fn compare(
    State(state): State<Arc<AppState>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<DistrictSummary>>, ApiError> {
    let query = CompareQuery::from_pairs(pairs);
    let summary = state
        .cache
        .get_summary()
        .await
        .map_err(ApiError::unavailable("Failed to compute comparison"))?;

    Ok(Json(apply_compare_query(&summary, &query)))
}
