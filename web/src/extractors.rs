//! Custom Axum extractors.
//!
//! - `JsonBody`: `Json<T>` whose rejections use the [`AppError`] body

use crate::error::AppError;
use axum::{
    async_trait,
    extract::{FromRequest, Request},
    http::StatusCode,
    Json,
};
use serde::de::DeserializeOwned;

/// JSON request body.
///
/// Behaves like `axum::Json` but rejects with an [`AppError`], so malformed
/// bodies get the same `{code, message}` shape as every other failure.
/// Deserialization failures (missing fields, negative counts) are 422,
/// syntax errors 400, a wrong content type 415.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => {
                let status = rejection.status();
                let message = rejection.body_text();
                Err(match status {
                    StatusCode::UNPROCESSABLE_ENTITY => AppError::validation(message),
                    StatusCode::BAD_REQUEST => AppError::bad_request(message),
                    _ => AppError::new(status, message, "BAD_REQUEST"),
                })
            },
        }
    }
}
