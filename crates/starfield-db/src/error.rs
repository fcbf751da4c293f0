//! Error types for the persistence adapter.
//!
//! Every operation returns [`DbError`]. At the boundary to the simulation
//! core it is folded into a [`PersistenceError`] so the persistence gate can
//! tell an unreachable database apart from bad data.

use starfield_core::persistence::PersistenceError;

/// Errors that can occur in the persistence adapter.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A JSONB column could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored row holds a value the domain types cannot represent.
    #[error("Invalid row in {table}: {reason}")]
    InvalidRow {
        /// Table the row came from.
        table: &'static str,
        /// What was wrong with it.
        reason: String,
    },

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<DbError> for PersistenceError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Postgres(
                sqlx::Error::Io(_)
                | sqlx::Error::PoolTimedOut
                | sqlx::Error::PoolClosed
                | sqlx::Error::Tls(_),
            ) => Self::Unavailable(err.to_string()),
            DbError::Serialization(_) | DbError::InvalidRow { .. } => {
                Self::Corrupt(err.to_string())
            }
            DbError::Postgres(_) | DbError::Migration(_) | DbError::Config(_) => {
                Self::Backend(err.to_string())
            }
        }
    }
}
