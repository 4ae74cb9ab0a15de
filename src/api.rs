// 🌐 HTTP API - dashboard and company detail as JSON
//
// Every request re-reads both CSV files on the blocking pool. Nothing is
// cached between requests.

use crate::config::InsightsConfig;
use crate::error::InsightsError;
use crate::loader::{load_datasets, Datasets, LoadOptions};
use crate::report::{CompanyDetailReport, DashboardReport};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

#[derive(Clone)]
struct AppState {
    config: Arc<InsightsConfig>,
}

/// API Response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CompanyQuery {
    id: Option<String>,
}

fn failure(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ApiResponse::<()>::err(message))).into_response()
}

async fn fetch(state: &AppState) -> Result<Datasets, Response> {
    let config = Arc::clone(&state.config);
    let loaded = tokio::task::spawn_blocking(move || {
        let options = LoadOptions::with_delimiter(config.delimiter);
        load_datasets(&config.data, &options)
    })
    .await;

    match loaded {
        Ok(Ok(data)) => Ok(data),
        Ok(Err(e)) => {
            log::error!("Error loading datasets: {}", e);
            let status = match e {
                InsightsError::SourceUnavailable { .. } | InsightsError::MalformedSource { .. } => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            Err(failure(status, e.to_string()))
        }
        Err(e) => {
            log::error!("Loader task failed: {}", e);
            Err(failure(StatusCode::INTERNAL_SERVER_ERROR, "loader task failed"))
        }
    }
}

async fn detail(state: &AppState, id: &str) -> Response {
    match fetch(state).await {
        Ok(data) => {
            let report = CompanyDetailReport::from_datasets(id, &data, &state.config.limits);
            (StatusCode::OK, Json(ApiResponse::ok(report))).into_response()
        }
        Err(response) => response,
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/dashboard - KPIs, stage distribution, volume by type, featured companies
async fn get_dashboard(State(state): State<AppState>) -> Response {
    match fetch(&state).await {
        Ok(data) => {
            let report = DashboardReport::from_datasets(&data, &state.config.limits);
            (StatusCode::OK, Json(ApiResponse::ok(report))).into_response()
        }
        Err(response) => response,
    }
}

/// GET /api/company?id=<identifier> - Detail view for one company
async fn get_company(State(state): State<AppState>, Query(query): Query<CompanyQuery>) -> Response {
    match query.id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => detail(&state, id).await,
        _ => failure(StatusCode::BAD_REQUEST, "missing query parameter: id"),
    }
}

/// GET /api/companies/:id - Same as /api/company, identifier in the path
///
/// `Path` has already percent-decoded the segment.
async fn get_company_by_path(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    detail(&state, &id).await
}

// ============================================================================
// Router
// ============================================================================

pub fn router(config: InsightsConfig) -> Router {
    let static_dir = config.static_dir.clone();
    let state = AppState {
        config: Arc::new(config),
    };

    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/dashboard", get(get_dashboard))
        .route("/company", get(get_company))
        .route("/companies/:id", get(get_company_by_path))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(CorsLayer::permissive())
}

// ============================================================================
// TESTS
// ============================================================================
