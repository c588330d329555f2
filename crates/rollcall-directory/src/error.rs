//! Directory adapter error types
//!
//! Errors are classified so the orchestrator can distinguish the one fatal
//! condition (cannot connect/bind) from per-context and per-entry failures
//! that degrade to diagnostics.

use thiserror::Error;

/// Result type for directory operations.
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Error that can occur while talking to the directory.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Failed to establish a connection to the directory server.
    #[error("connection failed: {message}")]
    ConnectionFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Bind was refused (LDAP result code 49).
    #[error("authentication failed: invalid bind credentials")]
    AuthenticationFailed,

    /// A search against one context failed.
    #[error("search failed in context '{context}': {message}")]
    SearchFailed {
        context: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A read of a single entry failed for a reason other than "no such
    /// object" (which is reported as `Ok(None)` instead).
    #[error("read failed for '{dn}': {message}")]
    ReadFailed { dn: String, message: String },

    /// The adapter configuration is invalid.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },
}

impl DirectoryError {
    /// Build a `ConnectionFailed` from a message.
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Build a `ConnectionFailed` wrapping a lower-level cause.
    pub fn connection_failed_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::ConnectionFailed {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Whether this error aborts the whole sync run.
    ///
    /// Only connectivity failures are fatal; everything else is handled at
    /// context, binding, or member granularity by the caller.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DirectoryError::ConnectionFailed { .. } | DirectoryError::AuthenticationFailed
        )
    }
}
