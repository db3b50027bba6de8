use std::sync::Arc;

use axum::{
    Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::RwLock;
use tracing::{info, warn};

use nitrilens_core::{AnalysisError, ConcentrationUnit, ReferenceScale};
use nitrilens_media::ImagePayload;
use nitrilens_understanding::Analyzer;

use crate::history::SessionHistory;
use crate::shell::MISSING_KEY;

/// Gemini accepts inline images up to 20 MB.
pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

const HISTORY_PAGE: usize = 10;

/// Shared application state for API handlers.
pub struct AppState {
    pub analyzer: Analyzer,
    pub default_api_key: Option<String>,
    pub default_unit: ConcentrationUnit,
    pub history: RwLock<SessionHistory>,
}

/// Build the Axum router with all API routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/analyze", post(analyze_image))
        .route("/api/history", get(get_history).delete(clear_history))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

pub fn status_for(err: &AnalysisError) -> StatusCode {
    match err {
        AnalysisError::InvalidCredential(_) => StatusCode::UNAUTHORIZED,
        AnalysisError::QuotaExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
        AnalysisError::MalformedResponse(_) => StatusCode::BAD_GATEWAY,
        AnalysisError::TransportError(_) => StatusCode::GATEWAY_TIMEOUT,
        AnalysisError::UnsupportedImage(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
    }
}

fn error_response(err: &AnalysisError) -> Response {
    (
        status_for(err),
        Json(json!({
            "error": err.to_string(),
            "kind": err.kind(),
            "hint": err.hint(),
        })),
    )
        .into_response()
}

/// Health check endpoint.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "nitrilens",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[derive(Debug, Deserialize)]
struct AnalyzeParams {
    unit: Option<String>,
}

/// Credential from `x-goog-api-key`, then `Authorization: Bearer`.
fn credential_from(headers: &HeaderMap) -> Option<String> {
    let from_key_header = headers
        .get("x-goog-api-key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let from_bearer = || {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::to_string)
    };
    from_key_header
        .or_else(from_bearer)
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
}

/// Analyze the uploaded image carried in the request body.
async fn analyze_image(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AnalyzeParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let unit = match params.unit.as_deref().map(str::parse::<ConcentrationUnit>) {
        None => state.default_unit,
        Some(Ok(unit)) => unit,
        Some(Err(e)) => {
            return (StatusCode::BAD_REQUEST, Json(json!({ "error": e, "kind": "bad_request" })))
                .into_response();
        }
    };

    let Some(credential) = credential_from(&headers).or_else(|| state.default_api_key.clone())
    else {
        return error_response(&AnalysisError::InvalidCredential(MISSING_KEY.to_string()));
    };

    let Some(content_type) = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
    else {
        warn!("Rejected upload without Content-Type");
        return error_response(&AnalysisError::UnsupportedImage(
            "missing Content-Type".to_string(),
        ));
    };
    let image = match ImagePayload::from_bytes("upload", body, Some(content_type)) {
        Ok(image) => image,
        Err(e) => {
            warn!(content_type, "Rejected upload");
            return error_response(&e);
        }
    };

    info!(bytes = image.len(), mime = image.mime_type, %unit, "Analyzing upload");

    match state.analyzer.analyze(&image.data, &credential, unit).await {
        Ok(result) => {
            let entry_id = state.history.write().await.record(&result, unit).id;
            Json(json!({
                "id": entry_id,
                "unit": unit,
                "band": result.band(),
                "band_message": result.band().message(),
                "nearest_reference_level": ReferenceScale::nearest(result.predicted_level()),
                "result": result,
            }))
            .into_response()
        }
        Err(e) => error_response(&e),
    }
}

/// Recent analyses and session statistics.
async fn get_history(State(state): State<Arc<AppState>>) -> Json<Value> {
    let history = state.history.read().await;
    Json(json!({
        "entries": history.recent(HISTORY_PAGE),
        "stats": history.stats(),
    }))
}

/// Clear the session history.
async fn clear_history(State(state): State<Arc<AppState>>) -> StatusCode {
    state.history.write().await.clear();
    info!("Session history cleared");
    StatusCode::NO_CONTENT
}
