//! Liveness endpoint.

use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};

/// Liveness response body.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    /// Always `"ok"` when the process can answer
    pub status: String,
    /// Crate version
    pub version: String,
}

/// `GET /health`
///
/// Answers as long as the process is serving requests; dependencies are not
/// consulted (that is the readiness probe's job).
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}
