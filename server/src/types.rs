//! Domain types for Gatherly.
//!
//! Identifiers, the two stored entities (`User`, `Event`), the validated
//! `EventDetails` input, the authenticated `Identity`, and the read views
//! returned by the API.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for an event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new random `EventId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an `EventId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a user
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new random `UserId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `UserId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Identity
// ============================================================================

/// The caller behind a verified bearer token.
///
/// This is all the attendance engine ever learns about who is asking.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Identity {
    /// Authenticated user
    pub user_id: UserId,
    /// Whether the user holds the admin flag
    pub is_admin: bool,
}

impl Identity {
    /// A regular (non-admin) identity
    #[must_use]
    pub const fn user(user_id: UserId) -> Self {
        Self {
            user_id,
            is_admin: false,
        }
    }

    /// An admin identity
    #[must_use]
    pub const fn admin(user_id: UserId) -> Self {
        Self {
            user_id,
            is_admin: true,
        }
    }
}

// ============================================================================
// User
// ============================================================================

/// A registered account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    /// User ID
    pub id: UserId,
    /// Display name
    pub name: String,
    /// Email, stored lowercased
    pub email: String,
    /// Argon2 encoded password hash
    pub password_hash: String,
    /// Admin flag
    pub is_admin: bool,
    /// Registration time
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Public projection of this user (never includes the hash)
    #[must_use]
    pub fn view(&self) -> UserView {
        UserView {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            is_admin: self.is_admin,
            created_at: self.created_at,
        }
    }
}

/// User as returned by the API.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserView {
    /// User ID
    pub id: UserId,
    /// Display name
    pub name: String,
    /// Email
    pub email: String,
    /// Admin flag
    pub is_admin: bool,
    /// Registration time
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Event
// ============================================================================

/// Maximum title length, in characters.
pub const MAX_TITLE_LEN: usize = 200;

/// The user-editable part of an event.
///
/// Updates replace all of it at once; there is no field-level merge.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDetails {
    /// Title
    pub title: String,
    /// Free-form description
    #[serde(default)]
    pub description: String,
    /// Day the event takes place
    pub date: NaiveDate,
    /// Where it takes place
    pub location: String,
    /// Remaining capacity
    pub slots: u32,
}

impl EventDetails {
    /// Checks the invariants serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns a human readable reason when the title or location is blank or
    /// the title is too long.
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("Title cannot be empty".to_string());
        }
        if self.title.chars().count() > MAX_TITLE_LEN {
            return Err(format!("Title cannot exceed {MAX_TITLE_LEN} characters"));
        }
        if self.location.trim().is_empty() {
            return Err("Location cannot be empty".to_string());
        }
        Ok(())
    }
}

/// A stored event document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event {
    /// Event ID
    pub id: EventId,
    /// Title
    pub title: String,
    /// Description
    pub description: String,
    /// Day the event takes place
    pub date: NaiveDate,
    /// Location
    pub location: String,
    /// Remaining capacity
    pub slots: u32,
    /// Creator
    pub organizer: UserId,
    /// Attendees in join order, without duplicates
    pub attendees: Vec<UserId>,
    /// Optimistic concurrency version, 1 after creation
    pub version: u64,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Creates a fresh event with no attendees
    #[must_use]
    pub fn new(id: EventId, organizer: UserId, details: EventDetails, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: details.title,
            description: details.description,
            date: details.date,
            location: details.location,
            slots: details.slots,
            organizer,
            attendees: Vec::new(),
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replaces every editable field
    pub fn apply_details(&mut self, details: EventDetails) {
        self.title = details.title;
        self.description = details.description;
        self.date = details.date;
        self.location = details.location;
        self.slots = details.slots;
    }

    /// Is `user` in the attendee list
    #[must_use]
    pub fn is_attending(&self, user: UserId) -> bool {
        self.attendees.contains(&user)
    }

    /// Organizer or admin
    #[must_use]
    pub fn can_be_managed_by(&self, identity: &Identity) -> bool {
        identity.is_admin || identity.user_id == self.organizer
    }

    /// Read view, with the organizer name resolved by the caller
    #[must_use]
    pub fn view(&self, organizer_name: Option<String>) -> EventView {
        EventView {
            id: self.id,
            title: self.title.clone(),
            description: self.description.clone(),
            date: self.date,
            location: self.location.clone(),
            slots: self.slots,
            organizer: OrganizerView {
                id: self.organizer,
                name: organizer_name,
            },
            attendees: self.attendees.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Organizer reference embedded in [`EventView`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizerView {
    /// Organizer ID
    pub id: UserId,
    /// Organizer name, `null` if the account no longer exists
    pub name: Option<String>,
}

/// Event as returned by the API.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventView {
    /// Event ID
    pub id: EventId,
    /// Title
    pub title: String,
    /// Description
    pub description: String,
    /// Day the event takes place
    pub date: NaiveDate,
    /// Location
    pub location: String,
    /// Remaining capacity
    pub slots: u32,
    /// Organizer
    pub organizer: OrganizerView,
    /// Attendee ids in join order
    pub attendees: Vec<UserId>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

/// Attendee as returned by `GET /api/events/:id/attendees`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendeeView {
    /// User ID
    pub id: UserId,
    /// Display name
    pub name: String,
    /// Email
    pub email: String,
}

impl From<&User> for AttendeeView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}
