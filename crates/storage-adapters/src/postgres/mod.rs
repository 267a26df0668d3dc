//! Postgres implementation of the repository ports.
//!
//! One [`PgStore`] wraps the pool and implements every repository trait.
//! Dynamic catalog SQL lives in [`catalog`].

pub mod catalog;
mod cards;
mod categories;
mod tags;
mod users;

use std::time::Duration;

use domains::DomainError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use thiserror::Error;
use tracing::{error, info};

/// Startup failures. Request-time failures become [`DomainError`].
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("could not connect to the database: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("database migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(url)
            .await
            .map_err(StorageError::Connect)?;
        info!(max_connections, "database pool ready");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn migrate(&self) -> Result<(), StorageError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("database migrations applied");
        Ok(())
    }

    /// Cheap round-trip used by the health endpoint.
    pub async fn ping(&self) -> Result<(), DomainError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(map_sqlx)
    }
}

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";
pub(crate) const INVALID_REGULAR_EXPRESSION: &str = "2201B";

pub(crate) fn sqlstate(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db) => db.code().map(|code| code.into_owned()),
        _ => None,
    }
}

/// Translates driver errors into domain errors, logging the unexpected ones.
pub(crate) fn map_sqlx(err: sqlx::Error) -> DomainError {
    if let sqlx::Error::Database(db) = &err {
        match db.code().as_deref() {
            Some(UNIQUE_VIOLATION) => {
                return DomainError::Conflict(format!(
                    "duplicate value violates {}",
                    db.constraint().unwrap_or("a unique constraint")
                ));
            }
            Some(FOREIGN_KEY_VIOLATION) => {
                return DomainError::invalid(
                    "category",
                    format!(
                        "referenced row does not exist ({})",
                        db.constraint().unwrap_or("foreign key")
                    ),
                );
            }
            _ => {}
        }
    }
    error!(error = %err, "database error");
    DomainError::internal(err)
}

pub(crate) fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some(FOREIGN_KEY_VIOLATION))
}
