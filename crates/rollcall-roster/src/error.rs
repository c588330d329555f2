//! Roster store error types

use thiserror::Error;
use uuid::Uuid;

/// Result type for roster operations.
pub type RosterResult<T> = Result<T, RosterError>;

/// Errors that can occur against the local roster store.
#[derive(Debug, Error)]
pub enum RosterError {
    /// Database error. Applying an action list inside a transaction rolls
    /// the whole binding back when this is raised.
    #[error("database error: {0}")]
    Database(String),

    /// The binding does not exist (or is disabled).
    #[error("group binding not found: {binding_id}")]
    BindingNotFound { binding_id: Uuid },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<sqlx::Error> for RosterError {
    fn from(e: sqlx::Error) -> Self {
        RosterError::Database(e.to_string())
    }
}
