//! Application services: load state, run reducers, execute effects.

pub mod accounts;
pub mod events;

pub use accounts::{AccountError, AccountService};
pub use events::EventService;
