//! Router configuration.

use super::health::readiness_check;
use super::state::AppState;
use crate::api::events;
use crate::auth::handlers as auth;
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use gatherly_web::{correlation_id_layer, handlers::health_check};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Build the complete Axum router.
///
/// Health checks sit at the root; everything else lives under `/api`.
/// Every request is traced and tagged with a correlation id.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Accounts
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        .route("/auth/update", put(auth::update))
        // Events
        .route("/events", post(events::create_event))
        .route("/events", get(events::list_events))
        .route("/events/:id", get(events::get_event))
        .route("/events/:id", put(events::update_event))
        .route("/events/:id", delete(events::delete_event))
        // Attendance
        .route("/events/:id/join", post(events::join_event))
        .route("/events/:id/leave", post(events::leave_event))
        .route("/events/:id/attendees", get(events::list_attendees))
        .route(
            "/events/:id/attendees/:attendee_id",
            delete(events::remove_attendee),
        );

    Router::new()
        // Health checks (no authentication)
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .nest("/api", api_routes)
        .layer(correlation_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
