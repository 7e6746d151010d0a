//! Persistence for users and events.
//!
//! Two backends implement the same traits: [`memory`] for tests and local
//! runs, [`postgres`] for deployments. Event writes are conditional on the
//! version that was read, so two requests racing on the same event cannot
//! both succeed.

pub mod memory;
pub mod postgres;

use crate::types::{Event, EventId, User, UserId};
use async_trait::async_trait;
use thiserror::Error;

pub use memory::{InMemoryEventRepository, InMemoryUserRepository};
pub use postgres::{PostgresEventRepository, PostgresUserRepository};

/// Errors raised by repositories.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// Row does not exist
    #[error("Record not found")]
    NotFound,

    /// Stored version differs from the one the write was based on
    #[error("Version conflict: expected {expected}, found {actual}")]
    VersionConflict {
        /// Version the caller loaded
        expected: u64,
        /// Version currently stored
        actual: u64,
    },

    /// Unique email constraint
    #[error("Email already registered")]
    DuplicateEmail,

    /// Backend failure
    #[error("Database error: {0}")]
    Database(String),

    /// A stored value could not be mapped to the domain type
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for repository operations
pub type Result<T> = std::result::Result<T, RepositoryError>;

/// Event documents.
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Store a newly created event.
    ///
    /// # Errors
    ///
    /// `Database` on backend failure.
    async fn insert(&self, event: &Event) -> Result<()>;

    /// Load one event.
    ///
    /// # Errors
    ///
    /// `Database` on backend failure.
    async fn find(&self, id: EventId) -> Result<Option<Event>>;

    /// All events ordered by date, then creation time.
    ///
    /// # Errors
    ///
    /// `Database` on backend failure.
    async fn list(&self) -> Result<Vec<Event>>;

    /// Overwrite an event if the stored version still equals
    /// `expected_version`. `event.version` is the new version.
    ///
    /// # Errors
    ///
    /// `NotFound` if the event is gone, `VersionConflict` if someone else
    /// wrote it first.
    async fn save(&self, event: &Event, expected_version: u64) -> Result<()>;

    /// Delete an event if the stored version still equals `expected_version`.
    ///
    /// # Errors
    ///
    /// Same as [`EventRepository::save`].
    async fn delete(&self, id: EventId, expected_version: u64) -> Result<()>;

    /// Cheap connectivity probe for readiness checks.
    ///
    /// # Errors
    ///
    /// `Database` when the backend is unreachable.
    async fn ping(&self) -> Result<()>;
}

/// User accounts.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Store a new account.
    ///
    /// # Errors
    ///
    /// `DuplicateEmail` if the (lowercased) email is taken.
    async fn insert(&self, user: &User) -> Result<()>;

    /// Load by id.
    ///
    /// # Errors
    ///
    /// `Database` on backend failure.
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>>;

    /// Load by email, case-insensitively.
    ///
    /// # Errors
    ///
    /// `Database` on backend failure.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Load several users; unknown ids are skipped, order is unspecified.
    ///
    /// # Errors
    ///
    /// `Database` on backend failure.
    async fn find_many(&self, ids: &[UserId]) -> Result<Vec<User>>;

    /// Overwrite name, password hash and admin flag.
    ///
    /// # Errors
    ///
    /// `NotFound` if the user does not exist.
    async fn update(&self, user: &User) -> Result<()>;
}

/// Lowercase and trim an email for storage and lookup.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
