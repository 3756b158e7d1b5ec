//! API route definitions
//!
//! - /api/v1/health  - liveness and engine settings
//! - /api/v1/limits  - limit rows for given system parameters
//! - /api/v1/analyze - full compliance analysis

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{self, ApiState};

/// Create all API routes
pub fn api_routes(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/limits", get(handlers::limits))
        .route("/analyze", post(handlers::analyze))
        .with_state(state)
}
