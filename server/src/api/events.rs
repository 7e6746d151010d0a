//! Event endpoints under `/api/events`.
//!
//! - `POST   /api/events` - create (auth)
//! - `GET    /api/events` - list, public
//! - `GET    /api/events/:id` - details, public
//! - `PUT    /api/events/:id` - replace details (organizer or admin)
//! - `DELETE /api/events/:id` - delete (organizer or admin)
//! - `POST   /api/events/:id/join` - take a slot (auth)
//! - `POST   /api/events/:id/leave` - give a slot back (auth)
//! - `GET    /api/events/:id/attendees` - attendee list (auth)
//! - `DELETE /api/events/:id/attendees/:attendee_id` - remove an attendee (organizer or admin)

use crate::auth::middleware::SessionUser;
use crate::server::state::AppState;
use crate::types::{AttendeeView, EventDetails, EventId, EventView, UserId};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use gatherly_web::{AppError, JsonBody, WebResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Body of `DELETE /api/events/:id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Human readable confirmation
    pub message: String,
}

/// Ids that are not UUIDs cannot name an existing event.
fn parse_event_id(raw: &str) -> WebResult<EventId> {
    Uuid::parse_str(raw)
        .map(EventId::from_uuid)
        .map_err(|_| AppError::not_found("Event", raw))
}

fn parse_user_id(raw: &str) -> WebResult<UserId> {
    Uuid::parse_str(raw)
        .map(UserId::from_uuid)
        .map_err(|_| AppError::not_found("User", raw))
}

/// Create a new event. The caller becomes the organizer.
///
/// ```bash
/// curl -X POST http://localhost:5000/api/events \
///   -H "Authorization: Bearer <token>" \
///   -H "Content-Type: application/json" \
///   -d '{"title":"Rust meetup","description":"Talks","date":"2025-06-01",
///        "location":"Lisbon","slots":30}'
/// ```
pub async fn create_event(
    session: SessionUser,
    State(state): State<AppState>,
    JsonBody(details): JsonBody<EventDetails>,
) -> WebResult<(StatusCode, Json<EventView>)> {
    let event = state
        .events
        .create(session.identity.user_id, details)
        .await?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// List every event, soonest first.
pub async fn list_events(State(state): State<AppState>) -> WebResult<Json<Vec<EventView>>> {
    Ok(Json(state.events.list().await?))
}

/// Event details. Public.
pub async fn get_event(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> WebResult<Json<EventView>> {
    let event_id = parse_event_id(&id)?;
    Ok(Json(state.events.get(event_id).await?))
}

/// Replace an event's details. Organizer or admin only.
pub async fn update_event(
    session: SessionUser,
    Path(id): Path<String>,
    State(state): State<AppState>,
    JsonBody(details): JsonBody<EventDetails>,
) -> WebResult<Json<EventView>> {
    let event_id = parse_event_id(&id)?;
    let event = state
        .events
        .update(event_id, session.identity, details)
        .await?;
    Ok(Json(event))
}

/// Delete an event. Organizer or admin only.
pub async fn delete_event(
    session: SessionUser,
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> WebResult<Json<MessageResponse>> {
    let event_id = parse_event_id(&id)?;
    state.events.delete(event_id, session.identity).await?;
    Ok(Json(MessageResponse {
        message: "Event deleted successfully".to_string(),
    }))
}

/// Take a slot.
pub async fn join_event(
    session: SessionUser,
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> WebResult<Json<EventView>> {
    let event_id = parse_event_id(&id)?;
    Ok(Json(
        state
            .events
            .join(event_id, session.identity.user_id)
            .await?,
    ))
}

/// Give a slot back.
pub async fn leave_event(
    session: SessionUser,
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> WebResult<Json<EventView>> {
    let event_id = parse_event_id(&id)?;
    Ok(Json(
        state
            .events
            .leave(event_id, session.identity.user_id)
            .await?,
    ))
}

/// Attendees as `{id, name, email}`.
pub async fn list_attendees(
    _session: SessionUser,
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> WebResult<Json<Vec<AttendeeView>>> {
    let event_id = parse_event_id(&id)?;
    Ok(Json(state.events.list_attendees(event_id).await?))
}

/// Remove an attendee. Organizer or admin only.
pub async fn remove_attendee(
    session: SessionUser,
    Path((id, attendee_id)): Path<(String, String)>,
    State(state): State<AppState>,
) -> WebResult<Json<EventView>> {
    let event_id = parse_event_id(&id)?;
    let attendee_id = parse_user_id(&attendee_id)?;
    let event = state
        .events
        .remove_attendee(event_id, attendee_id, session.identity)
        .await?;
    Ok(Json(event))
}
