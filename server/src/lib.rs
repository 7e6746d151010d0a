//! # Gatherly
//!
//! Event attendance backend: users register and authenticate, create events
//! and join or leave them while the service keeps slot counts honest.
//!
//! ## Architecture
//!
//! ```text
//! HTTP (axum) ─▶ SessionUser ─▶ api handler ─▶ EventService
//!                                                  │ load event
//!                                                  ▼
//!                                       AttendanceReducer (pure)
//!                                                  │ effects
//!                                                  ▼
//!                                  EventRepository (memory | postgres)
//! ```
//!
//! - [`aggregates`]: the attendance reducer, its actions and errors
//! - [`app`]: services that drive reducers and own account logic
//! - [`store`]: repository traits with in-memory and `PostgreSQL` backends
//! - [`auth`]: argon2 passwords, HS256 tokens, extractors, `/api/auth`
//! - [`api`]: `/api/events` handlers and error translation
//! - [`server`]: state, router and readiness probe

#![forbid(unsafe_code)]
#![allow(clippy::module_name_repetitions)]

pub mod aggregates;
pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod server;
pub mod store;
pub mod types;

pub use config::Config;
pub use server::{build_router, AppState};
