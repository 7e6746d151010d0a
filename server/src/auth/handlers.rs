//! Account endpoints under `/api/auth`.

use crate::app::accounts::{AuthResponse, LoginRequest, RegisterRequest, UpdateProfileRequest};
use crate::auth::middleware::SessionUser;
use crate::server::state::AppState;
use crate::types::UserView;
use axum::{extract::State, http::StatusCode, Json};
use gatherly_web::{JsonBody, WebResult};

/// `POST /api/auth/register`
///
/// ```bash
/// curl -X POST http://localhost:5000/api/auth/register \
///   -H "Content-Type: application/json" \
///   -d '{"name":"Ana","email":"ana@example.com","password":"secret1"}'
/// ```
pub async fn register(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<RegisterRequest>,
) -> WebResult<(StatusCode, Json<AuthResponse>)> {
    let response = state.accounts.register(request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// `POST /api/auth/login`
pub async fn login(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<LoginRequest>,
) -> WebResult<Json<AuthResponse>> {
    Ok(Json(state.accounts.login(request).await?))
}

/// `GET /api/auth/me`
pub async fn me(session: SessionUser, State(state): State<AppState>) -> WebResult<Json<UserView>> {
    Ok(Json(state.accounts.me(session.identity).await?))
}

/// `PUT /api/auth/update`
///
/// An empty or missing `password` keeps the current one.
pub async fn update(
    session: SessionUser,
    State(state): State<AppState>,
    JsonBody(request): JsonBody<UpdateProfileRequest>,
) -> WebResult<Json<UserView>> {
    Ok(Json(
        state
            .accounts
            .update_profile(session.identity, request)
            .await?,
    ))
}
