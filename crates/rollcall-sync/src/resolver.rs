//! Membership reference resolution
//!
//! Maps the raw references found in a group's membership attribute to the
//! stable external identities the roster is keyed on, and the reverse
//! mapping used by user-scoped sync. Resolution is shaped entirely by the
//! configured attribute layout; when the reference format and the
//! identity attribute coincide, no directory traffic happens at all.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rollcall_directory::{DirEntry, DirectoryClient};
use tracing::debug;

use crate::config::SyncConfig;
use crate::error::SyncResult;

/// Resolves membership references against the directory.
pub struct IdentityResolver<'a> {
    directory: &'a dyn DirectoryClient,
    config: &'a SyncConfig,
}

impl<'a> IdentityResolver<'a> {
    pub fn new(directory: &'a dyn DirectoryClient, config: &'a SyncConfig) -> Self {
        Self { directory, config }
    }

    /// Resolve one membership reference to an external identity.
    ///
    /// Returns `Ok(None)` when the referenced entry does not exist or
    /// carries no identity value; the caller reports that as a
    /// per-member diagnostic.
    pub async fn resolve(&self, member_ref: &str) -> SyncResult<Option<String>> {
        if self.config.member_attribute_is_dn {
            // DN reference, DN identity: the reference already is the
            // identity. Zero directory reads on this path.
            if self.config.is_dn_identity() {
                return Ok(Some(member_ref.to_string()));
            }
            let entry = self
                .directory
                .read(
                    member_ref,
                    "(objectClass=*)",
                    &[self.config.identity_attribute.as_str()],
                )
                .await?;
            return Ok(entry.as_ref().and_then(|e| self.identity_of(e)));
        }

        // Plain reference pointing at the user attribute. When that is
        // also the identity attribute the value needs no lookup.
        if !self.config.needs_user_search() {
            return Ok(Some(member_ref.to_string()));
        }
        let entry = self
            .find_user(&self.config.user_attribute, member_ref)
            .await?;
        Ok(entry.as_ref().and_then(|e| self.identity_of(e)))
    }

    /// Reverse mapping: the membership reference that group entries would
    /// hold for the user with this external identity.
    ///
    /// Returns `Ok(None)` when the user has no directory entry; the
    /// user-scoped sync then sees an empty matched-group set and applies
    /// removal policy alone.
    pub async fn member_reference_for(&self, external_id: &str) -> SyncResult<Option<String>> {
        if self.config.member_attribute_is_dn {
            if self.config.is_dn_identity() {
                return Ok(Some(external_id.to_string()));
            }
            let entry = self
                .find_user(&self.config.identity_attribute, external_id)
                .await?;
            return Ok(entry.map(|e| e.dn));
        }

        if !self.config.needs_user_search() {
            return Ok(Some(external_id.to_string()));
        }
        let entry = self
            .find_user(&self.config.identity_attribute, external_id)
            .await?;
        Ok(entry.as_ref().and_then(|e| {
            e.first(&self.config.user_attribute)
                .map(ToString::to_string)
        }))
    }

    /// Extract the identity attribute's value from a user entry. Binary
    /// values (directory GUIDs) are carried as base64.
    fn identity_of(&self, entry: &DirEntry) -> Option<String> {
        if self.config.is_dn_identity() {
            return Some(entry.dn.clone());
        }
        let attr = &self.config.identity_attribute;
        if let Some(value) = entry.first(attr) {
            return Some(value.to_string());
        }
        entry.first_binary(attr).map(|raw| BASE64.encode(raw))
    }

    /// Search the user contexts for the entry whose `attribute` equals
    /// `value`. First match wins.
    async fn find_user(&self, attribute: &str, value: &str) -> SyncResult<Option<DirEntry>> {
        let filter = self.config.user_lookup_filter(attribute, value);
        let attrs = [
            self.config.identity_attribute.as_str(),
            self.config.user_attribute.as_str(),
        ];
        for context in &self.config.user_contexts {
            let entries = self.directory.search(context, &filter, &attrs).await?;
            if let Some(entry) = entries.into_iter().next() {
                return Ok(Some(entry));
            }
        }
        debug!(attribute, value, "No user entry matched in any context");
        Ok(None)
    }
}
