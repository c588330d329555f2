//! `ldap3`-backed implementation of [`DirectoryClient`].

use async_trait::async_trait;
use ldap3::adapters::{Adapter, EntriesOnly, PagedResults};
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, LdapError, Scope, SearchEntry};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::client::DirectoryClient;
use crate::config::DirectoryConfig;
use crate::entry::DirEntry;
use crate::error::{DirectoryError, DirectoryResult};

// LDAP result codes the adapter cares about.
const RC_SUCCESS: u32 = 0;
const RC_NO_SUCH_OBJECT: u32 = 32;
const RC_INVALID_CREDENTIALS: u32 = 49;

/// Directory client backed by a single shared LDAP connection.
///
/// The connection is established lazily, reused across every context of a
/// sync run, and released by [`close`](DirectoryClient::close). Paged
/// result cursors are handled per search by the `ldap3` streaming
/// adapters, so a fresh search never inherits another search's cursor.
pub struct LdapDirectory {
    config: DirectoryConfig,

    /// Cached connection handle (lazily initialized).
    connection: Arc<RwLock<Option<Ldap>>>,
}

impl LdapDirectory {
    /// Create a directory client with the given configuration.
    pub fn new(config: DirectoryConfig) -> DirectoryResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            connection: Arc::new(RwLock::new(None)),
        })
    }

    /// Get the shared connection, creating and binding one if necessary.
    async fn get_connection(&self) -> DirectoryResult<Ldap> {
        {
            let guard = self.connection.read().await;
            if let Some(ref conn) = *guard {
                return Ok(conn.clone());
            }
        }

        let conn = self.create_connection().await?;

        {
            let mut guard = self.connection.write().await;
            *guard = Some(conn.clone());
        }

        Ok(conn)
    }

    async fn create_connection(&self) -> DirectoryResult<Ldap> {
        let url = self.config.url();
        debug!(url = %url, "Connecting to directory server");

        let settings = LdapConnSettings::new()
            .set_conn_timeout(std::time::Duration::from_secs(
                self.config.connect_timeout_secs,
            ))
            .set_starttls(self.config.use_starttls);

        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &url)
            .await
            .map_err(|e| {
                DirectoryError::connection_failed_with_source(
                    format!("failed to connect to directory server at {url}"),
                    e,
                )
            })?;

        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!(error = %e, "Directory connection driver error");
            }
        });

        let bind_dn = &self.config.bind_dn;
        let bind_password = self.config.bind_password.as_deref().unwrap_or("");

        debug!(bind_dn = %bind_dn, "Performing directory bind");

        let result = ldap.simple_bind(bind_dn, bind_password).await.map_err(|e| {
            DirectoryError::connection_failed_with_source(
                format!("directory bind failed for {bind_dn}"),
                e,
            )
        })?;

        if result.rc == RC_INVALID_CREDENTIALS {
            return Err(DirectoryError::AuthenticationFailed);
        }
        if result.rc != RC_SUCCESS {
            return Err(DirectoryError::connection_failed(format!(
                "directory bind failed with code {}: {}",
                result.rc, result.text
            )));
        }

        info!(host = %self.config.host, "Directory connection established");

        Ok(ldap)
    }

    fn search_scope(&self) -> Scope {
        if self.config.search_subtree {
            Scope::Subtree
        } else {
            Scope::OneLevel
        }
    }
}

/// Convert an `ldap3` search entry into the adapter's entry model,
/// lowercasing attribute names.
fn to_dir_entry(entry: SearchEntry) -> DirEntry {
    let mut out = DirEntry::new(entry.dn);
    for (name, values) in entry.attrs {
        out.attrs.insert(name.to_lowercase(), values);
    }
    for (name, values) in entry.bin_attrs {
        out.bin_attrs.insert(name.to_lowercase(), values);
    }
    out
}

#[async_trait]
impl DirectoryClient for LdapDirectory {
    #[instrument(skip(self))]
    async fn connect(&self) -> DirectoryResult<()> {
        self.get_connection().await.map(|_| ())
    }

    #[instrument(skip(self, attrs), fields(filter = %filter))]
    async fn search(
        &self,
        context: &str,
        filter: &str,
        attrs: &[&str],
    ) -> DirectoryResult<Vec<DirEntry>> {
        let mut ldap = self.get_connection().await?;

        let adapters: Vec<Box<dyn Adapter<_, _>>> = vec![
            Box::new(EntriesOnly::new()),
            Box::new(PagedResults::new(self.config.page_size as i32)),
        ];

        let mut stream = ldap
            .streaming_search_with(adapters, context, self.search_scope(), filter, attrs.to_vec())
            .await
            .map_err(|e| DirectoryError::SearchFailed {
                context: context.to_string(),
                message: e.to_string(),
                source: Some(Box::new(e)),
            })?;

        let mut entries = Vec::new();
        loop {
            match stream.next().await {
                Ok(Some(result_entry)) => {
                    entries.push(to_dir_entry(SearchEntry::construct(result_entry)));
                }
                Ok(None) => break,
                // Any page failure discards the whole context's batch.
                Err(e) => {
                    return Err(DirectoryError::SearchFailed {
                        context: context.to_string(),
                        message: e.to_string(),
                        source: Some(Box::new(e)),
                    });
                }
            }
        }

        let res = stream.finish().await;
        if res.rc != RC_SUCCESS && res.rc != RC_NO_SUCH_OBJECT {
            return Err(DirectoryError::SearchFailed {
                context: context.to_string(),
                message: format!("search ended with code {}: {}", res.rc, res.text),
                source: None,
            });
        }

        debug!(
            context = %context,
            entries = entries.len(),
            "Directory search completed"
        );

        Ok(entries)
    }

    #[instrument(skip(self, attrs))]
    async fn read(
        &self,
        dn: &str,
        filter: &str,
        attrs: &[&str],
    ) -> DirectoryResult<Option<DirEntry>> {
        let mut ldap = self.get_connection().await?;

        let result = ldap
            .search(dn, Scope::Base, filter, attrs.to_vec())
            .await
            .map_err(|e| DirectoryError::ReadFailed {
                dn: dn.to_string(),
                message: e.to_string(),
            })?;

        let (entries, _res) = match result.success() {
            Ok(ok) => ok,
            Err(LdapError::LdapResult { result }) if result.rc == RC_NO_SUCH_OBJECT => {
                return Ok(None);
            }
            Err(e) => {
                return Err(DirectoryError::ReadFailed {
                    dn: dn.to_string(),
                    message: e.to_string(),
                });
            }
        };

        Ok(entries
            .into_iter()
            .next()
            .map(|e| to_dir_entry(SearchEntry::construct(e))))
    }

    async fn close(&self) -> DirectoryResult<()> {
        let mut guard = self.connection.write().await;
        if let Some(mut ldap) = guard.take() {
            if let Err(e) = ldap.unbind().await {
                warn!(error = %e, "Error during directory unbind");
            }
            info!("Directory connection released");
        }
        Ok(())
    }
}

impl std::fmt::Debug for LdapDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LdapDirectory")
            .field("config", &self.config)
            .finish()
    }
}
