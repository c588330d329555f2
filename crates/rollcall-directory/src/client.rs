//! The directory query interface consumed by the sync core.

use async_trait::async_trait;

use crate::entry::DirEntry;
use crate::error::DirectoryResult;

/// Read-only, paginated access to the external directory.
///
/// Implementations own one shared connection for the duration of a sync
/// run. The sync orchestrator calls [`connect`](DirectoryClient::connect)
/// once before touching the roster (connect failure is the single fatal,
/// run-aborting condition) and [`close`](DirectoryClient::close) on every
/// exit path.
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    /// Establish and verify the connection (bind).
    async fn connect(&self) -> DirectoryResult<()>;

    /// Search one context for entries matching `filter`, returning only
    /// the requested attributes.
    ///
    /// The implementation drains every result page for the context before
    /// returning; each page is folded into the returned batch, so callers
    /// never observe a partially-fetched context. A failure mid-page
    /// discards the whole context's contribution.
    async fn search(
        &self,
        context: &str,
        filter: &str,
        attrs: &[&str],
    ) -> DirectoryResult<Vec<DirEntry>>;

    /// Read a single entry by distinguished name.
    ///
    /// Returns `Ok(None)` when the entry does not exist ("no such
    /// object"); other failures are errors.
    async fn read(
        &self,
        dn: &str,
        filter: &str,
        attrs: &[&str],
    ) -> DirectoryResult<Option<DirEntry>>;

    /// Release the underlying connection. Idempotent.
    async fn close(&self) -> DirectoryResult<()>;
}
