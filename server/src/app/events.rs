//! Event service: the imperative shell around [`AttendanceReducer`].
//!
//! Every mutating call is one load, reduce, execute-effects cycle against a
//! single event document. Feedback actions from the effects (persistence
//! failures) are reduced too, so a lost version race surfaces as
//! `ConcurrentModification`.

use crate::aggregates::{
    AttendanceAction, AttendanceEnvironment, AttendanceError, AttendanceReducer, AttendanceState,
};
use crate::store::{EventRepository, RepositoryError, UserRepository};
use crate::types::{AttendeeView, Event, EventDetails, EventId, EventView, Identity, UserId};
use gatherly_core::{effect, environment::Clock, reducer::Reducer};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Result type for event operations
pub type Result<T> = std::result::Result<T, AttendanceError>;

/// Event operations exposed to the API layer.
#[derive(Clone)]
pub struct EventService {
    reducer: AttendanceReducer,
    env: AttendanceEnvironment,
    users: Arc<dyn UserRepository>,
}

impl EventService {
    /// Creates a new `EventService`
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        events: Arc<dyn EventRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            reducer: AttendanceReducer::new(),
            env: AttendanceEnvironment::new(clock, events),
            users,
        }
    }

    async fn load(&self, event_id: EventId) -> Result<AttendanceState> {
        Ok(match self.env.events.find(event_id).await? {
            Some(event) => AttendanceState::loaded(event),
            None => AttendanceState::new(),
        })
    }

    /// Reduce `action`, run its effects and reduce their feedback.
    async fn dispatch(
        &self,
        mut state: AttendanceState,
        action: AttendanceAction,
    ) -> Result<AttendanceState> {
        let effects = self.reducer.reduce(&mut state, action, &self.env);
        if let Some(error) = state.last_error.take() {
            return Err(error);
        }

        for feedback in effect::execute(effects).await {
            self.reducer.reduce(&mut state, feedback, &self.env);
        }
        match state.last_error.take() {
            Some(error) => Err(error),
            None => Ok(state),
        }
    }

    async fn dispatch_to(&self, event_id: EventId, action: AttendanceAction) -> Result<Event> {
        let state = self.load(event_id).await?;
        let state = self.dispatch(state, action).await?;
        state.event().cloned().ok_or(AttendanceError::NotFound)
    }

    async fn view(&self, event: &Event) -> Result<EventView> {
        let organizer = self.users.find_by_id(event.organizer).await?;
        Ok(event.view(organizer.map(|user| user.name)))
    }

    /// Create an event organized by `organizer`.
    ///
    /// # Errors
    ///
    /// `InvalidInput` if `details` fail validation, `Internal` on storage failure.
    #[tracing::instrument(skip(self, details), fields(title = %details.title))]
    pub async fn create(&self, organizer: UserId, details: EventDetails) -> Result<EventView> {
        let id = EventId::new();
        let state = self
            .dispatch(
                AttendanceState::new(),
                AttendanceAction::CreateEvent {
                    id,
                    organizer,
                    details,
                },
            )
            .await?;
        let event = state.event().ok_or(AttendanceError::NotFound)?;

        info!(event_id = %id, %organizer, slots = event.slots, "Event created");
        self.view(event).await
    }

    /// One event.
    ///
    /// # Errors
    ///
    /// `NotFound` if it does not exist.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, event_id: EventId) -> Result<EventView> {
        let event = self
            .env
            .events
            .find(event_id)
            .await?
            .ok_or(AttendanceError::NotFound)?;
        self.view(&event).await
    }

    /// All events ordered by date, then creation time.
    ///
    /// # Errors
    ///
    /// `Internal` on storage failure.
    #[tracing::instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<EventView>> {
        let events = self.env.events.list().await?;

        let mut organizer_ids: Vec<UserId> = events.iter().map(|event| event.organizer).collect();
        organizer_ids.sort_unstable();
        organizer_ids.dedup();
        let names: HashMap<UserId, String> = self
            .users
            .find_many(&organizer_ids)
            .await?
            .into_iter()
            .map(|user| (user.id, user.name))
            .collect();

        Ok(events
            .iter()
            .map(|event| event.view(names.get(&event.organizer).cloned()))
            .collect())
    }

    /// Replace an event's details.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Forbidden`, `InvalidInput` or `ConcurrentModification`.
    #[tracing::instrument(skip(self, details))]
    pub async fn update(
        &self,
        event_id: EventId,
        requester: Identity,
        details: EventDetails,
    ) -> Result<EventView> {
        let event = self
            .dispatch_to(
                event_id,
                AttendanceAction::UpdateEvent {
                    event_id,
                    requester,
                    details,
                },
            )
            .await?;

        info!(%event_id, version = event.version, "Event updated");
        self.view(&event).await
    }

    /// Delete an event.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Forbidden` or `ConcurrentModification`.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, event_id: EventId, requester: Identity) -> Result<()> {
        let state = self.load(event_id).await?;
        self.dispatch(
            state,
            AttendanceAction::DeleteEvent {
                event_id,
                requester,
            },
        )
        .await?;

        info!(%event_id, "Event deleted");
        Ok(())
    }

    /// Take a slot.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Conflict` (already attending), `CapacityExceeded` or
    /// `ConcurrentModification`.
    #[tracing::instrument(skip(self))]
    pub async fn join(&self, event_id: EventId, user_id: UserId) -> Result<EventView> {
        let event = self
            .dispatch_to(event_id, AttendanceAction::Join { event_id, user_id })
            .await?;

        info!(%event_id, %user_id, slots = event.slots, "Attendee joined");
        self.view(&event).await
    }

    /// Give a slot back.
    ///
    /// # Errors
    ///
    /// `NotFound` or `ConcurrentModification`.
    #[tracing::instrument(skip(self))]
    pub async fn leave(&self, event_id: EventId, user_id: UserId) -> Result<EventView> {
        let event = self
            .dispatch_to(event_id, AttendanceAction::Leave { event_id, user_id })
            .await?;

        info!(%event_id, %user_id, slots = event.slots, "Attendee left");
        self.view(&event).await
    }

    /// Attendees resolved to `{id, name, email}` in join order. Ids whose
    /// account no longer exists are skipped.
    ///
    /// # Errors
    ///
    /// `NotFound` if the event does not exist.
    #[tracing::instrument(skip(self))]
    pub async fn list_attendees(&self, event_id: EventId) -> Result<Vec<AttendeeView>> {
        let event = self
            .env
            .events
            .find(event_id)
            .await?
            .ok_or(AttendanceError::NotFound)?;

        let users: HashMap<UserId, AttendeeView> = self
            .users
            .find_many(&event.attendees)
            .await?
            .iter()
            .map(|user| (user.id, AttendeeView::from(user)))
            .collect();

        Ok(event
            .attendees
            .iter()
            .filter_map(|id| users.get(id).cloned())
            .collect())
    }

    /// Remove someone from the attendee list (organizer or admin only).
    ///
    /// # Errors
    ///
    /// `NotFound`, `Forbidden` or `ConcurrentModification`.
    #[tracing::instrument(skip(self))]
    pub async fn remove_attendee(
        &self,
        event_id: EventId,
        attendee_id: UserId,
        requester: Identity,
    ) -> Result<EventView> {
        let event = self
            .dispatch_to(
                event_id,
                AttendanceAction::RemoveAttendee {
                    event_id,
                    attendee_id,
                    requester,
                },
            )
            .await?;

        info!(%event_id, %attendee_id, slots = event.slots, "Attendee removed");
        self.view(&event).await
    }

    /// Storage connectivity, for readiness probes.
    ///
    /// # Errors
    ///
    /// The repository's error when it cannot be reached.
    pub async fn ping(&self) -> std::result::Result<(), RepositoryError> {
        self.env.events.ping().await
    }
}
