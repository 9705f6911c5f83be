//! Route definitions for the API server

use crate::{handlers, state::AppState};
use axum::{routing::get, Router};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    timeout::TimeoutLayer,
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Search endpoint path
pub const SEARCH_PATH: &str = "/api/v0.1/privilege/search";

/// Create the application router
///
/// `request_timeout` bounds each request, including the RBAC collaborator
/// calls it makes.
pub fn create_router(state: AppState, request_timeout: Duration) -> Router {
    let trace = TraceLayer::new_for_http()
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    Router::new()
        .route(
            SEARCH_PATH,
            get(handlers::search_privileges).post(handlers::search_privileges),
        )
        .route("/health", get(handlers::health_check))
        .layer(
            ServiceBuilder::new()
                .layer(trace)
                .layer(TimeoutLayer::new(request_timeout)),
        )
        .with_state(state)
}
