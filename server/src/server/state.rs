//! Application state shared across all HTTP handlers.

use crate::app::{AccountService, EventService};
use crate::auth::TokenIssuer;
use crate::config::{Config, StorageBackend};
use crate::store::{
    self, EventRepository, InMemoryEventRepository, InMemoryUserRepository,
    PostgresEventRepository, PostgresUserRepository, UserRepository,
};
use gatherly_core::environment::{Clock, SystemClock};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Application state, cloned (cheaply, via `Arc`) for each request.
#[derive(Clone)]
pub struct AppState {
    /// Event and attendance operations
    pub events: Arc<EventService>,
    /// Account operations and token authentication
    pub accounts: Arc<AccountService>,
}

impl AppState {
    /// Wire services over the given repositories.
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        events: Arc<dyn EventRepository>,
        users: Arc<dyn UserRepository>,
        tokens: TokenIssuer,
    ) -> Self {
        Self {
            events: Arc::new(EventService::new(clock.clone(), events, users.clone())),
            accounts: Arc::new(AccountService::new(users, tokens, clock)),
        }
    }

    /// State backed by in-memory repositories.
    #[must_use]
    pub fn in_memory(clock: Arc<dyn Clock>, tokens: TokenIssuer) -> Self {
        Self::new(
            clock,
            Arc::new(InMemoryEventRepository::new()),
            Arc::new(InMemoryUserRepository::new()),
            tokens,
        )
    }

    /// Build the state the configuration asks for, connecting and migrating
    /// the database when the postgres backend is selected.
    ///
    /// # Errors
    ///
    /// Returns an error if the database is unreachable or a migration fails.
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let tokens = TokenIssuer::new(&config.auth.jwt_secret, config.auth.token_lifetime());

        match config.storage.backend {
            StorageBackend::Memory => {
                info!("Using in-memory storage");
                Ok(Self::in_memory(clock, tokens))
            },
            StorageBackend::Postgres => {
                info!("Connecting to PostgreSQL...");
                let pool = store::postgres::connect(
                    &config.postgres.url,
                    config.postgres.max_connections,
                    config.postgres.min_connections,
                    Duration::from_secs(config.postgres.connect_timeout),
                )
                .await?;
                store::postgres::migrate(&pool).await?;
                info!("PostgreSQL connected and migrated");

                Ok(Self::new(
                    clock,
                    Arc::new(PostgresEventRepository::new(pool.clone())),
                    Arc::new(PostgresUserRepository::new(pool)),
                    tokens,
                ))
            },
        }
    }
}
