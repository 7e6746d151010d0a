//! Attendance aggregate: one event document, its capacity and its attendees.
//!
//! Commands are validated against the loaded event. A valid command becomes a
//! domain event that is applied to state and persisted through an effect; an
//! invalid one records `last_error` and touches nothing else.

use crate::store::{EventRepository, RepositoryError};
use crate::types::{Event, EventDetails, EventId, Identity, UserId};
use chrono::{DateTime, Utc};
use gatherly_core::{effect::Effect, environment::Clock, reducer::Reducer, smallvec, SmallVec};
use std::sync::Arc;
use thiserror::Error;

// ============================================================================
// Errors
// ============================================================================

/// Why an attendance command was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AttendanceError {
    /// Event does not exist (or was deleted)
    #[error("Event not found")]
    NotFound,

    /// Requester is neither the organizer nor an admin
    #[error("Only the organizer or an admin can modify this event")]
    Forbidden,

    /// Requester already attends
    #[error("You are already attending this event")]
    Conflict,

    /// No slots left
    #[error("No slots available for this event")]
    CapacityExceeded,

    /// Details failed validation
    #[error("{0}")]
    InvalidInput(String),

    /// Another request wrote the event first
    #[error("The event was modified concurrently, please retry")]
    ConcurrentModification,

    /// Storage failure
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<RepositoryError> for AttendanceError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::NotFound => Self::NotFound,
            RepositoryError::VersionConflict { .. } => Self::ConcurrentModification,
            other => Self::Internal(other.to_string()),
        }
    }
}

// ============================================================================
// Actions (Commands + Events)
// ============================================================================

/// Actions for the attendance aggregate.
///
/// Commands express intent, events record what happened.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttendanceAction {
    // Commands
    /// Create an event owned by `organizer`
    CreateEvent {
        /// New event id
        id: EventId,
        /// Creating user
        organizer: UserId,
        /// Validated on receipt
        details: EventDetails,
    },

    /// Replace the event's details
    UpdateEvent {
        /// Target event
        event_id: EventId,
        /// Caller
        requester: Identity,
        /// New details
        details: EventDetails,
    },

    /// Delete the event
    DeleteEvent {
        /// Target event
        event_id: EventId,
        /// Caller
        requester: Identity,
    },

    /// Take a slot
    Join {
        /// Target event
        event_id: EventId,
        /// Joining user
        user_id: UserId,
    },

    /// Give a slot back
    Leave {
        /// Target event
        event_id: EventId,
        /// Leaving user
        user_id: UserId,
    },

    /// Organizer/admin removes someone from the attendee list
    RemoveAttendee {
        /// Target event
        event_id: EventId,
        /// User to remove
        attendee_id: UserId,
        /// Caller
        requester: Identity,
    },

    // Events
    /// Event was created
    EventCreated {
        /// Event id
        id: EventId,
        /// Organizer
        organizer: UserId,
        /// Initial details
        details: EventDetails,
        /// Creation time
        created_at: DateTime<Utc>,
    },

    /// Details were replaced
    EventUpdated {
        /// Event id
        event_id: EventId,
        /// New details
        details: EventDetails,
        /// Update time
        updated_at: DateTime<Utc>,
    },

    /// Event was deleted
    EventDeleted {
        /// Event id
        event_id: EventId,
        /// Deletion time
        deleted_at: DateTime<Utc>,
    },

    /// A user took a slot
    AttendeeJoined {
        /// Event id
        event_id: EventId,
        /// User
        user_id: UserId,
        /// Join time
        joined_at: DateTime<Utc>,
    },

    /// A user gave a slot back
    AttendeeLeft {
        /// Event id
        event_id: EventId,
        /// User
        user_id: UserId,
        /// Leave time
        left_at: DateTime<Utc>,
    },

    /// A user was removed by the organizer or an admin
    AttendeeRemoved {
        /// Event id
        event_id: EventId,
        /// Removed user
        attendee_id: UserId,
        /// Who removed them
        removed_by: UserId,
        /// Removal time
        removed_at: DateTime<Utc>,
    },

    /// Validation or persistence failed
    CommandFailed {
        /// Reason
        error: AttendanceError,
    },
}

// ============================================================================
// State
// ============================================================================

/// State of one attendance aggregate instance.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AttendanceState {
    /// The loaded event, `None` if it does not exist
    pub event: Option<Event>,
    /// Set once `EventDeleted` has been applied
    pub deleted: bool,
    /// Last rejection, cleared by the next successful transition
    pub last_error: Option<AttendanceError>,
}

impl AttendanceState {
    /// Empty state (no event)
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// State wrapping an event loaded from the store
    #[must_use]
    pub fn loaded(event: Event) -> Self {
        Self {
            event: Some(event),
            ..Self::default()
        }
    }

    /// The event, unless absent or deleted
    #[must_use]
    pub fn event(&self) -> Option<&Event> {
        if self.deleted {
            None
        } else {
            self.event.as_ref()
        }
    }

    fn live_event(&self, event_id: EventId) -> Result<&Event, AttendanceError> {
        self.event()
            .filter(|event| event.id == event_id)
            .ok_or(AttendanceError::NotFound)
    }

    fn live_event_mut(&mut self, event_id: EventId) -> Option<&mut Event> {
        if self.deleted {
            return None;
        }
        self.event.as_mut().filter(|event| event.id == event_id)
    }
}

// ============================================================================
// Environment
// ============================================================================

/// Environment dependencies for the attendance aggregate
#[derive(Clone)]
pub struct AttendanceEnvironment {
    /// Clock for timestamps
    pub clock: Arc<dyn Clock>,
    /// Where events are persisted
    pub events: Arc<dyn EventRepository>,
}

impl AttendanceEnvironment {
    /// Creates a new `AttendanceEnvironment`
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, events: Arc<dyn EventRepository>) -> Self {
        Self { clock, events }
    }
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer for the attendance aggregate
#[derive(Clone, Copy, Debug, Default)]
pub struct AttendanceReducer;

/// What to do with the store after a successful transition
enum Persist {
    Insert,
    Save { expected_version: u64 },
    Delete { expected_version: u64 },
}

impl AttendanceReducer {
    /// Creates a new `AttendanceReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn validate_create(
        state: &AttendanceState,
        details: &EventDetails,
    ) -> Result<(), AttendanceError> {
        if state.event.is_some() {
            return Err(AttendanceError::InvalidInput("Event already exists".to_string()));
        }
        details.validate().map_err(AttendanceError::InvalidInput)
    }

    fn validate_manage(
        state: &AttendanceState,
        event_id: EventId,
        requester: &Identity,
    ) -> Result<u64, AttendanceError> {
        let event = state.live_event(event_id)?;
        if !event.can_be_managed_by(requester) {
            return Err(AttendanceError::Forbidden);
        }
        Ok(event.version)
    }

    fn validate_join(
        state: &AttendanceState,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<u64, AttendanceError> {
        let event = state.live_event(event_id)?;
        // Membership is checked before capacity
        if event.is_attending(user_id) {
            return Err(AttendanceError::Conflict);
        }
        if event.slots == 0 {
            return Err(AttendanceError::CapacityExceeded);
        }
        Ok(event.version)
    }

    /// Bumps the version and modification time of a mutated event
    fn touch(event: &mut Event, at: DateTime<Utc>) {
        event.version += 1;
        event.updated_at = at;
    }

    /// Removes `user` from the attendees and returns the slot.
    ///
    /// The slot is returned whether or not `user` was attending.
    fn release_slot(event: &mut Event, user: UserId) {
        event.attendees.retain(|attendee| *attendee != user);
        event.slots = event.slots.saturating_add(1);
    }

    /// Applies an event to state
    fn apply_event(state: &mut AttendanceState, action: &AttendanceAction) {
        match action {
            AttendanceAction::EventCreated {
                id,
                organizer,
                details,
                created_at,
            } => {
                state.event = Some(Event::new(*id, *organizer, details.clone(), *created_at));
                state.deleted = false;
                state.last_error = None;
            },
            AttendanceAction::EventUpdated {
                event_id,
                details,
                updated_at,
            } => {
                if let Some(event) = state.live_event_mut(*event_id) {
                    event.apply_details(details.clone());
                    Self::touch(event, *updated_at);
                }
                state.last_error = None;
            },
            AttendanceAction::EventDeleted { event_id, .. } => {
                if state.live_event(*event_id).is_ok() {
                    state.deleted = true;
                }
                state.last_error = None;
            },
            AttendanceAction::AttendeeJoined {
                event_id,
                user_id,
                joined_at,
            } => {
                if let Some(event) = state.live_event_mut(*event_id) {
                    if !event.is_attending(*user_id) {
                        event.attendees.push(*user_id);
                        event.slots = event.slots.saturating_sub(1);
                    }
                    Self::touch(event, *joined_at);
                }
                state.last_error = None;
            },
            AttendanceAction::AttendeeLeft {
                event_id,
                user_id,
                left_at,
            } => {
                if let Some(event) = state.live_event_mut(*event_id) {
                    Self::release_slot(event, *user_id);
                    Self::touch(event, *left_at);
                }
                state.last_error = None;
            },
            AttendanceAction::AttendeeRemoved {
                event_id,
                attendee_id,
                removed_at,
                ..
            } => {
                if let Some(event) = state.live_event_mut(*event_id) {
                    Self::release_slot(event, *attendee_id);
                    Self::touch(event, *removed_at);
                }
                state.last_error = None;
            },
            AttendanceAction::CommandFailed { error } => {
                state.last_error = Some(error.clone());
            },
            // Commands don't modify state
            AttendanceAction::CreateEvent { .. }
            | AttendanceAction::UpdateEvent { .. }
            | AttendanceAction::DeleteEvent { .. }
            | AttendanceAction::Join { .. }
            | AttendanceAction::Leave { .. }
            | AttendanceAction::RemoveAttendee { .. } => {},
        }
    }

    /// Records a rejection; no effects
    fn reject(
        state: &mut AttendanceState,
        error: AttendanceError,
    ) -> SmallVec<[Effect<AttendanceAction>; 4]> {
        tracing::debug!(%error, "Attendance command rejected");
        Self::apply_event(state, &AttendanceAction::CommandFailed { error });
        SmallVec::new()
    }

    /// Applies `event` and returns the effect persisting the result
    fn commit(
        state: &mut AttendanceState,
        event: &AttendanceAction,
        persist: Persist,
        env: &AttendanceEnvironment,
    ) -> SmallVec<[Effect<AttendanceAction>; 4]> {
        Self::apply_event(state, event);

        let Some(snapshot) = state.event.clone() else {
            return SmallVec::new();
        };
        let repository = Arc::clone(&env.events);

        smallvec![Effect::future(async move {
            let result = match persist {
                Persist::Insert => repository.insert(&snapshot).await,
                Persist::Save { expected_version } => {
                    repository.save(&snapshot, expected_version).await
                },
                Persist::Delete { expected_version } => {
                    repository.delete(snapshot.id, expected_version).await
                },
            };

            match result {
                Ok(()) => None,
                Err(error) => {
                    tracing::warn!(event_id = %snapshot.id, %error, "Failed to persist event");
                    Some(AttendanceAction::CommandFailed {
                        error: error.into(),
                    })
                },
            }
        })]
    }
}

impl Reducer for AttendanceReducer {
    type State = AttendanceState;
    type Action = AttendanceAction;
    type Environment = AttendanceEnvironment;

    #[allow(clippy::too_many_lines)] // One arm per command
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            // ========== Commands ==========
            AttendanceAction::CreateEvent {
                id,
                organizer,
                details,
            } => {
                if let Err(error) = Self::validate_create(state, &details) {
                    return Self::reject(state, error);
                }

                let event = AttendanceAction::EventCreated {
                    id,
                    organizer,
                    details,
                    created_at: env.clock.now(),
                };
                Self::commit(state, &event, Persist::Insert, env)
            },

            AttendanceAction::UpdateEvent {
                event_id,
                requester,
                details,
            } => {
                let expected_version = match Self::validate_manage(state, event_id, &requester)
                    .and_then(|version| {
                        details
                            .validate()
                            .map(|()| version)
                            .map_err(AttendanceError::InvalidInput)
                    }) {
                    Ok(version) => version,
                    Err(error) => return Self::reject(state, error),
                };

                let event = AttendanceAction::EventUpdated {
                    event_id,
                    details,
                    updated_at: env.clock.now(),
                };
                Self::commit(state, &event, Persist::Save { expected_version }, env)
            },

            AttendanceAction::DeleteEvent {
                event_id,
                requester,
            } => {
                let expected_version = match Self::validate_manage(state, event_id, &requester) {
                    Ok(version) => version,
                    Err(error) => return Self::reject(state, error),
                };

                let event = AttendanceAction::EventDeleted {
                    event_id,
                    deleted_at: env.clock.now(),
                };
                Self::commit(state, &event, Persist::Delete { expected_version }, env)
            },

            AttendanceAction::Join { event_id, user_id } => {
                let expected_version = match Self::validate_join(state, event_id, user_id) {
                    Ok(version) => version,
                    Err(error) => return Self::reject(state, error),
                };

                let event = AttendanceAction::AttendeeJoined {
                    event_id,
                    user_id,
                    joined_at: env.clock.now(),
                };
                Self::commit(state, &event, Persist::Save { expected_version }, env)
            },

            AttendanceAction::Leave { event_id, user_id } => {
                let expected_version = match state.live_event(event_id) {
                    Ok(event) => event.version,
                    Err(error) => return Self::reject(state, error),
                };

                let event = AttendanceAction::AttendeeLeft {
                    event_id,
                    user_id,
                    left_at: env.clock.now(),
                };
                Self::commit(state, &event, Persist::Save { expected_version }, env)
            },

            AttendanceAction::RemoveAttendee {
                event_id,
                attendee_id,
                requester,
            } => {
                let expected_version = match Self::validate_manage(state, event_id, &requester) {
                    Ok(version) => version,
                    Err(error) => return Self::reject(state, error),
                };

                let event = AttendanceAction::AttendeeRemoved {
                    event_id,
                    attendee_id,
                    removed_by: requester.user_id,
                    removed_at: env.clock.now(),
                };
                Self::commit(state, &event, Persist::Save { expected_version }, env)
            },

            // ========== Events (replay / feedback) ==========
            event => {
                Self::apply_event(state, &event);
                SmallVec::new()
            },
        }
    }
}
