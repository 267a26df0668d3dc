use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use domains::DomainError;
use serde_json::{json, Value};

use crate::web::error::{error_response, ApiError};
use crate::web::AppState;

const OPENMETRICS: &str = "application/openmetrics-text; version=1.0.0; charset=utf-8";

pub async fn metrics(State(state): State<AppState>) -> Result<Response, ApiError> {
    let body = state.metrics.encode().map_err(DomainError::internal)?;
    Ok(([(CONTENT_TYPE, OPENMETRICS)], body).into_response())
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn not_found(uri: Uri) -> Response {
    error_response(StatusCode::NOT_FOUND, format!("No page at {}", uri.path()))
}
