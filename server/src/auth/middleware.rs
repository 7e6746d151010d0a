//! Authentication extractors.
//!
//! ```rust,ignore
//! async fn join_event(
//!     session: SessionUser,
//!     Path(id): Path<String>,
//! ) -> Result<Json<EventView>, AppError> {
//!     // session.identity is a verified caller
//! }
//! ```

use crate::server::state::AppState;
use crate::types::Identity;
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use gatherly_web::AppError;

/// Bearer token extracted from `Authorization: Bearer <token>` header.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("Missing authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| {
                AppError::unauthorized("Invalid authorization format. Expected 'Bearer <token>'")
            })?
            .trim();

        if token.is_empty() {
            return Err(AppError::unauthorized("Empty bearer token"));
        }

        Ok(Self(token.to_string()))
    }
}

/// Authenticated caller.
///
/// Use this as a handler parameter to require authentication.
#[derive(Debug, Clone, Copy)]
pub struct SessionUser {
    /// Who is calling
    pub identity: Identity,
}

#[async_trait]
impl<S> FromRequestParts<S> for SessionUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let bearer = BearerToken::from_request_parts(parts, state)
            .await
            .inspect_err(|error| tracing::warn!(%error, "Rejected request without credentials"))?;

        let app_state = AppState::from_ref(state);
        let identity = app_state
            .accounts
            .authenticate(&bearer.0)
            .await
            .map_err(|error| {
                tracing::warn!(%error, "Rejected bearer token");
                AppError::from(error)
            })?;

        Ok(Self { identity })
    }
}
