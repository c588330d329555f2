//! Directory connection configuration
//!
//! Connection-level settings only; what to search for (contexts, object
//! classes, attributes) is the sync engine's configuration surface.

use serde::{Deserialize, Serialize};

use crate::error::{DirectoryError, DirectoryResult};

/// Configuration for the LDAP directory connection.
#[derive(Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Directory server hostname or IP address.
    pub host: String,

    /// Directory server port (389 for LDAP, 636 for LDAPS).
    #[serde(default = "default_port")]
    pub port: u16,

    /// Use SSL/TLS (LDAPS).
    #[serde(default)]
    pub use_ssl: bool,

    /// Use STARTTLS upgrade on a plain connection.
    #[serde(default)]
    pub use_starttls: bool,

    /// Bind DN for authentication.
    pub bind_dn: String,

    /// Bind password.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind_password: Option<String>,

    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Page size for paged search operations.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Search the whole subtree under each context. When false, searches
    /// are limited to the context's direct children.
    #[serde(default = "default_true")]
    pub search_subtree: bool,
}

fn default_port() -> u16 {
    389
}

fn default_connect_timeout_secs() -> u64 {
    15
}

fn default_page_size() -> u32 {
    250
}

fn default_true() -> bool {
    true
}

impl DirectoryConfig {
    /// Create a config with required fields and defaults for the rest.
    pub fn new(host: impl Into<String>, bind_dn: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: default_port(),
            use_ssl: false,
            use_starttls: false,
            bind_dn: bind_dn.into(),
            bind_password: None,
            connect_timeout_secs: default_connect_timeout_secs(),
            page_size: default_page_size(),
            search_subtree: true,
        }
    }

    /// Set the bind password.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.bind_password = Some(password.into());
        self
    }

    /// Enable SSL (LDAPS) and switch to the LDAPS port.
    #[must_use]
    pub fn with_ssl(mut self) -> Self {
        self.use_ssl = true;
        self.port = 636;
        self
    }

    /// The LDAP URL for this configuration.
    #[must_use]
    pub fn url(&self) -> String {
        let scheme = if self.use_ssl { "ldaps" } else { "ldap" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> DirectoryResult<()> {
        if self.host.is_empty() {
            return Err(DirectoryError::InvalidConfiguration {
                message: "host is required".to_string(),
            });
        }
        if self.bind_dn.is_empty() {
            return Err(DirectoryError::InvalidConfiguration {
                message: "bind_dn is required".to_string(),
            });
        }
        if self.use_ssl && self.use_starttls {
            return Err(DirectoryError::InvalidConfiguration {
                message: "cannot use both SSL and STARTTLS".to_string(),
            });
        }
        if self.page_size == 0 {
            return Err(DirectoryError::InvalidConfiguration {
                message: "page_size must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for DirectoryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("use_ssl", &self.use_ssl)
            .field("use_starttls", &self.use_starttls)
            .field("bind_dn", &self.bind_dn)
            .field(
                "bind_password",
                &self.bind_password.as_ref().map(|_| "***REDACTED***"),
            )
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("page_size", &self.page_size)
            .field("search_subtree", &self.search_subtree)
            .finish()
    }
}
