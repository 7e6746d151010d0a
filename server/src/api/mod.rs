//! HTTP API handlers.

pub mod errors;
pub mod events;
