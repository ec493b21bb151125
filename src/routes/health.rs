use axum::{extract::State, response::Json};
use serde::Serialize;

use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
}

/// Health check endpoint handler.
///
/// # Route
/// - **Method**: GET
/// - **Path**: `/`
///
/// # Response Format
/// ```json
/// {
///   "status": "The server is up and running....",
///   "database": "connected"
/// }
/// ```
///
/// Always answers 200 while the process is alive; `database` reports
/// `"unreachable"` when the store ping fails so load balancers can still
/// tell a live process from a dead one.
pub async fn status(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = match state.store.ping().await {
        Ok(()) => "connected",
        Err(e) => {
            tracing::error!("Store health check failed: {}", e);
            "unreachable"
        }
    };

    Json(HealthResponse {
        status: "The server is up and running....".to_string(),
        database: database.to_string(),
    })
}
