//! # RSVP Postgres
//!
//! PostgreSQL implementation of [`rsvp_core::RegistrationStore`].
//!
//! The concurrency discipline lives here, not in the services:
//!
//! - The `(event_id, user_id)` unique constraint closes the
//!   duplicate-registration race; the insert is never pre-checked.
//! - Status transitions and confirmations lock their row with
//!   `SELECT ... FOR UPDATE`; the `created → paid` move is a conditional
//!   update under that lock, so the checkout and webhook channels
//!   serialize even across process instances.
//! - The participant counter moves via a single
//!   `GREATEST(current_participants + delta, 0)` update, never a
//!   read-modify-write in application memory.
//! - A partial unique index allows one active attempt per registration;
//!   the losing side of a concurrent order creation converges on the
//!   winner's row.
//!
//! Queries use sqlx's runtime-checked API so the workspace builds without
//! a live `DATABASE_URL`.

mod rows;
mod store;

use rsvp_core::{CoreError, Result};
use sqlx::PgPool;

/// PostgreSQL store.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and create a store.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Storage`] if the connection fails.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| CoreError::storage(format!("failed to connect: {e}")))?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Storage`] if a migration fails.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| CoreError::storage(format!("migration failed: {e}")))?;
        Ok(())
    }

    pub(crate) const fn pool(&self) -> &PgPool {
        &self.pool
    }
}
