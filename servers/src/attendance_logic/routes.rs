//! HTTP surface: a health probe and the on-demand seven-day dump.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use lib_attendance::dss::FetchError;
use serde_json::{Value, json};
use tracing::{error, info};

use super::state::AppState;

pub const HEALTH_MESSAGE: &str = "Dahua Record Assistance API en ejecución ...";

/// Errors surfaced to HTTP clients as `{"error_type", "message"}`.
#[derive(Debug)]
pub enum ApiError {
    Upstream(FetchError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Upstream(e) => {
                error!("Upstream fetch error: {}", e);
                (
                    StatusCode::BAD_GATEWAY,
                    json!({
                        "error_type": "UpstreamError",
                        "message": e.to_string(),
                        "upstream_status": e.status(),
                    }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

impl From<FetchError> for ApiError {
    fn from(e: FetchError) -> Self {
        ApiError::Upstream(e)
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/obtener-registros-7-dias", post(records_last_week))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!([
        { "message": HEALTH_MESSAGE },
        { "status": "ok" }
    ]))
}

async fn records_last_week(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    info!("Seven-day record dump requested");
    let envelope = state.week.fetch_week(Utc::now()).await?;
    Ok(Json(envelope))
}
