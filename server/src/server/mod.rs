//! HTTP server: shared state, router and readiness probe.

pub mod health;
pub mod routes;
pub mod state;

pub use routes::build_router;
pub use state::AppState;
