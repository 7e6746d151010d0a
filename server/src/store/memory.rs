//! In-memory repositories.
//!
//! Each repository is a `Mutex<HashMap>`; the lock is only held for the
//! duration of a single read or compare-and-set and never across an await.

use super::{normalize_email, EventRepository, RepositoryError, Result, UserRepository};
use crate::types::{Event, EventId, User, UserId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Database("Lock poisoned".to_string()))
}

/// In-memory event store.
#[derive(Clone, Debug, Default)]
pub struct InMemoryEventRepository {
    events: Arc<Mutex<HashMap<EventId, Event>>>,
}

impl InMemoryEventRepository {
    /// Creates an empty repository
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn check_version(stored: &Event, expected_version: u64) -> Result<()> {
        if stored.version == expected_version {
            Ok(())
        } else {
            Err(RepositoryError::VersionConflict {
                expected: expected_version,
                actual: stored.version,
            })
        }
    }
}

#[async_trait]
impl EventRepository for InMemoryEventRepository {
    async fn insert(&self, event: &Event) -> Result<()> {
        lock(&self.events)?.insert(event.id, event.clone());
        Ok(())
    }

    async fn find(&self, id: EventId) -> Result<Option<Event>> {
        Ok(lock(&self.events)?.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Event>> {
        let mut events: Vec<Event> = lock(&self.events)?.values().cloned().collect();
        events.sort_by(|a, b| {
            a.date
                .cmp(&b.date)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        Ok(events)
    }

    async fn save(&self, event: &Event, expected_version: u64) -> Result<()> {
        let mut events = lock(&self.events)?;
        let stored = events.get(&event.id).ok_or(RepositoryError::NotFound)?;
        Self::check_version(stored, expected_version)?;
        events.insert(event.id, event.clone());
        Ok(())
    }

    async fn delete(&self, id: EventId, expected_version: u64) -> Result<()> {
        let mut events = lock(&self.events)?;
        let stored = events.get(&id).ok_or(RepositoryError::NotFound)?;
        Self::check_version(stored, expected_version)?;
        events.remove(&id);
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        lock(&self.events).map(|_| ())
    }
}

/// In-memory account store.
#[derive(Clone, Debug, Default)]
pub struct InMemoryUserRepository {
    users: Arc<Mutex<HashMap<UserId, User>>>,
}

impl InMemoryUserRepository {
    /// Creates an empty repository
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn insert(&self, user: &User) -> Result<()> {
        let mut users = lock(&self.users)?;
        let email = normalize_email(&user.email);
        if users.values().any(|existing| existing.email == email) {
            return Err(RepositoryError::DuplicateEmail);
        }
        users.insert(
            user.id,
            User {
                email,
                ..user.clone()
            },
        );
        Ok(())
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>> {
        Ok(lock(&self.users)?.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let email = normalize_email(email);
        Ok(lock(&self.users)?
            .values()
            .find(|user| user.email == email)
            .cloned())
    }

    async fn find_many(&self, ids: &[UserId]) -> Result<Vec<User>> {
        let users = lock(&self.users)?;
        Ok(ids.iter().filter_map(|id| users.get(id).cloned()).collect())
    }

    async fn update(&self, user: &User) -> Result<()> {
        let mut users = lock(&self.users)?;
        let stored = users.get_mut(&user.id).ok_or(RepositoryError::NotFound)?;
        stored.name.clone_from(&user.name);
        stored.password_hash.clone_from(&user.password_hash);
        stored.is_admin = user.is_admin;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::EventDetails;
    use chrono::{Duration, NaiveDate, Utc};

    fn event_on(day: u32) -> Event {
        Event::new(
            EventId::new(),
            UserId::new(),
            EventDetails {
                title: format!("Event {day}"),
                description: String::new(),
                date: NaiveDate::from_ymd_opt(2025, 6, day).unwrap(),
                location: "Porto".to_string(),
                slots: 3,
            },
            Utc::now(),
        )
    }

    fn user(email: &str) -> User {
        User {
            id: UserId::new(),
            name: "Ana".to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            is_admin: false,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_save_requires_matching_version() {
        let repo = InMemoryEventRepository::new();
        let mut event = event_on(1);
        repo.insert(&event).await.unwrap();

        event.version = 2;
        repo.save(&event, 1).await.unwrap();

        // A second writer that also loaded version 1 loses
        let stale = repo.save(&event, 1).await;
        assert_eq!(
            stale,
            Err(RepositoryError::VersionConflict {
                expected: 1,
                actual: 2
            })
        );
    }

    #[tokio::test]
    async fn test_delete_missing_event() {
        let repo = InMemoryEventRepository::new();
        assert_eq!(
            repo.delete(EventId::new(), 1).await,
            Err(RepositoryError::NotFound)
        );
    }

    #[tokio::test]
    async fn test_list_orders_by_date_then_creation() {
        let repo = InMemoryEventRepository::new();
        let late = event_on(20);
        let mut early_second = event_on(5);
        early_second.created_at += Duration::seconds(10);
        let early_first = event_on(5);

        for event in [&late, &early_second, &early_first] {
            repo.insert(event).await.unwrap();
        }

        let ids: Vec<EventId> = repo.list().await.unwrap().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![early_first.id, early_second.id, late.id]);
    }

    #[tokio::test]
    async fn test_email_is_unique_case_insensitively() {
        let repo = InMemoryUserRepository::new();
        repo.insert(&user("ana@example.com")).await.unwrap();

        assert_eq!(
            repo.insert(&user("ANA@example.com")).await,
            Err(RepositoryError::DuplicateEmail)
        );
        assert!(repo.find_by_email("Ana@Example.com").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_find_many_skips_unknown_ids() {
        let repo = InMemoryUserRepository::new();
        let known = user("known@example.com");
        repo.insert(&known).await.unwrap();

        let found = repo.find_many(&[UserId::new(), known.id]).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, known.id);
    }
}
