use axum::{
    extract::{rejection::JsonRejection, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use kubeguard_privilege::Query;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{error::Result, state::AppState};

/// Privilege search payload
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchRequest {
    /// Subject names or regular expressions
    pub subjects: Vec<String>,

    /// `json` (default) or `yaml`/`yml`, case-insensitive
    #[serde(default)]
    pub format: String,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        uptime_seconds: state.uptime_seconds(),
    })
}

/// Privilege search endpoint
///
/// The body is encoded only after the query has fully succeeded, so a
/// failure never leaves a partial result on the wire.
pub async fn search_privileges(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(request) = payload?;

    debug!("Search payload: {:?}", request);

    let query = Query::with_options(
        state.client.clone(),
        request.subjects,
        &request.format,
        state.options.clone(),
    )?;
    let output = query.execute().await?;

    info!(
        "Search answered {} subjects as {} ({} diagnostics)",
        query.subjects().len(),
        output.format,
        output.diagnostics.len()
    );

    Ok(([(header::CONTENT_TYPE, output.content_type())], output.body).into_response())
}
