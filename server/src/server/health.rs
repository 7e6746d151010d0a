//! Readiness endpoint. Liveness (`/health`) comes from `gatherly-web`.

use super::state::AppState;
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

/// Readiness check response.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReadinessResponse {
    /// Overall readiness status
    pub ready: bool,
    /// Storage connectivity
    pub database: bool,
}

/// `GET /ready`
///
/// 200 when storage answers, 503 otherwise.
///
/// ```bash
/// curl http://localhost:5000/ready
/// # {"ready":true,"database":true}
/// ```
pub async fn readiness_check(
    State(state): State<AppState>,
) -> (StatusCode, Json<ReadinessResponse>) {
    let database = match state.events.ping().await {
        Ok(()) => true,
        Err(error) => {
            tracing::error!(%error, "Readiness check failed");
            false
        },
    };

    let status = if database {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ReadinessResponse {
            ready: database,
            database,
        }),
    )
}
