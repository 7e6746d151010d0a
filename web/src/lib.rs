//! Axum plumbing shared by Gatherly HTTP services.
//!
//! The functional core (reducers) never sees HTTP. This crate is the
//! imperative shell's toolbox:
//!
//! ```text
//! request ─▶ correlation id layer ─▶ JsonBody extractor
//!         ─▶ handler builds a command ─▶ service runs reducer + effects
//!         ─▶ domain error ─▶ AppError ─▶ {code, message} JSON response
//! ```

#![forbid(unsafe_code)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;

pub use error::{AppError, ErrorBody};
pub use extractors::JsonBody;
pub use middleware::{correlation_id_layer, CORRELATION_ID_HEADER};

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
