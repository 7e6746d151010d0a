//! `PostgreSQL` repositories.
//!
//! Tables are created by the embedded migrations in `server/migrations`.
//! Attendees live in a `uuid[]` column on the event row so a join or leave
//! is a single conditional `UPDATE`.

use super::{normalize_email, EventRepository, RepositoryError, Result, UserRepository};
use crate::types::{Event, EventId, User, UserId};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use uuid::Uuid;

/// Connect a pool with the given limits.
///
/// # Errors
///
/// Returns `Database` if the connection cannot be established.
pub async fn connect(
    url: &str,
    max_connections: u32,
    min_connections: u32,
    connect_timeout: Duration,
) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .min_connections(min_connections)
        .acquire_timeout(connect_timeout)
        .connect(url)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to connect: {e}")))
}

/// Run the embedded migrations.
///
/// # Errors
///
/// Returns `Database` if a migration fails.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Migration failed: {e}")))
}

fn db_error(context: &str, error: &sqlx::Error) -> RepositoryError {
    RepositoryError::Database(format!("{context}: {error}"))
}

fn to_db_int(value: u64, field: &str) -> Result<i64> {
    i64::try_from(value)
        .map_err(|_| RepositoryError::Serialization(format!("{field} out of range: {value}")))
}

#[derive(sqlx::FromRow)]
struct EventRow {
    id: Uuid,
    title: String,
    description: String,
    date: NaiveDate,
    location: String,
    slots: i64,
    organizer_id: Uuid,
    attendees: Vec<Uuid>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for Event {
    type Error = RepositoryError;

    fn try_from(row: EventRow) -> Result<Self> {
        let slots = u32::try_from(row.slots)
            .map_err(|_| RepositoryError::Serialization(format!("Invalid slots: {}", row.slots)))?;
        let version = u64::try_from(row.version).map_err(|_| {
            RepositoryError::Serialization(format!("Invalid version: {}", row.version))
        })?;

        Ok(Self {
            id: EventId::from_uuid(row.id),
            title: row.title,
            description: row.description,
            date: row.date,
            location: row.location,
            slots,
            organizer: UserId::from_uuid(row.organizer_id),
            attendees: row.attendees.into_iter().map(UserId::from_uuid).collect(),
            version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const EVENT_COLUMNS: &str = "id, title, description, date, location, slots, organizer_id, \
                             attendees, version, created_at, updated_at";

/// `PostgreSQL` event repository.
#[derive(Clone, Debug)]
pub struct PostgresEventRepository {
    pool: PgPool,
}

impl PostgresEventRepository {
    /// Wrap an existing pool
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Explain a conditional write that touched no row.
    async fn conflict_for(&self, id: EventId, expected_version: u64) -> RepositoryError {
        let current: std::result::Result<Option<i64>, sqlx::Error> =
            sqlx::query_scalar("SELECT version FROM events WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await;

        match current {
            Ok(None) => RepositoryError::NotFound,
            Ok(Some(actual)) => RepositoryError::VersionConflict {
                expected: expected_version,
                actual: u64::try_from(actual).unwrap_or_default(),
            },
            Err(e) => db_error("Failed to read event version", &e),
        }
    }
}

#[async_trait]
impl EventRepository for PostgresEventRepository {
    async fn insert(&self, event: &Event) -> Result<()> {
        let attendees: Vec<Uuid> = event.attendees.iter().map(|id| *id.as_uuid()).collect();

        sqlx::query(
            "INSERT INTO events \
             (id, title, description, date, location, slots, organizer_id, attendees, \
              version, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(event.id.as_uuid())
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.date)
        .bind(&event.location)
        .bind(i64::from(event.slots))
        .bind(event.organizer.as_uuid())
        .bind(&attendees)
        .bind(to_db_int(event.version, "version")?)
        .bind(event.created_at)
        .bind(event.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to insert event", &e))?;

        Ok(())
    }

    async fn find(&self, id: EventId) -> Result<Option<Event>> {
        let row: Option<EventRow> =
            sqlx::query_as(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("Failed to load event", &e))?;

        row.map(Event::try_from).transpose()
    }

    async fn list(&self) -> Result<Vec<Event>> {
        let rows: Vec<EventRow> = sqlx::query_as(&format!(
            "SELECT {EVENT_COLUMNS} FROM events ORDER BY date ASC, created_at ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list events", &e))?;

        rows.into_iter().map(Event::try_from).collect()
    }

    async fn save(&self, event: &Event, expected_version: u64) -> Result<()> {
        let attendees: Vec<Uuid> = event.attendees.iter().map(|id| *id.as_uuid()).collect();

        let result = sqlx::query(
            "UPDATE events SET \
             title = $3, description = $4, date = $5, location = $6, slots = $7, \
             attendees = $8, version = $9, updated_at = $10 \
             WHERE id = $1 AND version = $2",
        )
        .bind(event.id.as_uuid())
        .bind(to_db_int(expected_version, "version")?)
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.date)
        .bind(&event.location)
        .bind(i64::from(event.slots))
        .bind(&attendees)
        .bind(to_db_int(event.version, "version")?)
        .bind(event.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to save event", &e))?;

        if result.rows_affected() == 0 {
            return Err(self.conflict_for(event.id, expected_version).await);
        }
        Ok(())
    }

    async fn delete(&self, id: EventId, expected_version: u64) -> Result<()> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1 AND version = $2")
            .bind(id.as_uuid())
            .bind(to_db_int(expected_version, "version")?)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to delete event", &e))?;

        if result.rows_affected() == 0 {
            return Err(self.conflict_for(id, expected_version).await);
        }
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| db_error("Ping failed", &e))
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    password_hash: String,
    is_admin: bool,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: UserId::from_uuid(row.id),
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            is_admin: row.is_admin,
            created_at: row.created_at,
        }
    }
}

const USER_COLUMNS: &str = "id, name, email, password_hash, is_admin, created_at";

/// `PostgreSQL` user repository.
#[derive(Clone, Debug)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    /// Wrap an existing pool
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn insert(&self, user: &User) -> Result<()> {
        sqlx::query(
            "INSERT INTO users (id, name, email, password_hash, is_admin, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(user.id.as_uuid())
        .bind(&user.name)
        .bind(normalize_email(&user.email))
        .bind(&user.password_hash)
        .bind(user.is_admin)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return RepositoryError::DuplicateEmail;
                }
            }
            db_error("Failed to insert user", &e)
        })?;

        Ok(())
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("Failed to load user", &e))?;

        Ok(row.map(User::from))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
                .bind(normalize_email(email))
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("Failed to load user", &e))?;

        Ok(row.map(User::from))
    }

    async fn find_many(&self, ids: &[UserId]) -> Result<Vec<User>> {
        let ids: Vec<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();
        let rows: Vec<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1)"))
                .bind(&ids)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| db_error("Failed to load users", &e))?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn update(&self, user: &User) -> Result<()> {
        let result = sqlx::query(
            "UPDATE users SET name = $2, password_hash = $3, is_admin = $4 WHERE id = $1",
        )
        .bind(user.id.as_uuid())
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(user.is_admin)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to update user", &e))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
