//! Sync engine error types

use thiserror::Error;

use rollcall_directory::DirectoryError;
use rollcall_roster::RosterError;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Error that aborts a sync run.
///
/// Only a handful of conditions surface here; most failures are absorbed
/// into per-context or per-binding diagnostics on the run report instead.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Directory failure the run cannot continue past (connect/bind).
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// Roster store failure outside any binding's transaction.
    #[error(transparent)]
    Roster(#[from] RosterError),

    /// The sync configuration is invalid.
    #[error("invalid sync configuration: {0}")]
    Configuration(String),
}
