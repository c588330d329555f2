//! Nested group expansion
//!
//! Flattens a group's membership attribute into the set of user-member
//! references, following sub-group references transitively when enabled.
//! Traversal is iterative (a work queue, not recursion) and keeps a
//! visited set keyed on each group's stable identifier, so membership
//! cycles and diamonds terminate and contribute each user once.

use std::collections::{HashSet, VecDeque};

use rollcall_directory::{DirEntry, DirectoryClient};
use tracing::{debug, warn};

use crate::config::SyncConfig;
use crate::error::SyncResult;

/// Result of flattening one group.
#[derive(Debug, Default)]
pub struct Expansion {
    /// User-member references, deduplicated, in first-seen order.
    pub member_refs: Vec<String>,
    /// Sub-group references skipped because their identifier was already
    /// visited on this expansion.
    pub cycles_detected: usize,
    /// References whose group-or-user classification read failed; they
    /// were not followed.
    pub unresolved: Vec<String>,
}

/// Flattens group membership against the directory.
pub struct GroupExpander<'a> {
    directory: &'a dyn DirectoryClient,
    config: &'a SyncConfig,
}

impl<'a> GroupExpander<'a> {
    pub fn new(directory: &'a dyn DirectoryClient, config: &'a SyncConfig) -> Self {
        Self { directory, config }
    }

    /// Flatten the group identified by `group_id`, whose entries (one per
    /// context it appeared in) have already been fetched.
    ///
    /// Sub-group detection requires DN membership references; with plain
    /// references every member is treated as a user.
    pub async fn expand(&self, group_id: &str, entries: &[DirEntry]) -> SyncResult<Expansion> {
        let mut expansion = Expansion::default();
        let mut seen_members: HashSet<String> = HashSet::new();
        let mut visited_groups: HashSet<String> = HashSet::new();
        visited_groups.insert(group_id.to_lowercase());

        let mut queue: VecDeque<String> = VecDeque::new();
        for entry in entries {
            for member_ref in entry.member_references(&self.config.member_attribute) {
                queue.push_back(member_ref);
            }
        }

        let follow_subgroups = self.config.nested_groups && self.config.member_attribute_is_dn;

        while let Some(member_ref) = queue.pop_front() {
            if !follow_subgroups {
                Self::push_member(&mut expansion, &mut seen_members, member_ref);
                continue;
            }

            match self.classify(&member_ref).await {
                Ok(Some(group)) => {
                    let identifier = group
                        .first(&self.config.group_attribute)
                        .map_or_else(|| group.dn.to_lowercase(), str::to_lowercase);
                    if !visited_groups.insert(identifier) {
                        expansion.cycles_detected += 1;
                        debug!(reference = %member_ref, "Sub-group already visited, breaking cycle");
                        continue;
                    }
                    for nested in group.member_references(&self.config.member_attribute) {
                        queue.push_back(nested);
                    }
                }
                // Not a group (or no such entry): a user-member reference.
                Ok(None) => Self::push_member(&mut expansion, &mut seen_members, member_ref),
                Err(err) if err.is_fatal() => return Err(err.into()),
                Err(err) => {
                    warn!(reference = %member_ref, error = %err, "Could not classify member reference");
                    expansion.unresolved.push(member_ref);
                }
            }
        }

        Ok(expansion)
    }

    /// Read a DN reference and return its entry when it is a sub-group.
    async fn classify(
        &self,
        member_ref: &str,
    ) -> Result<Option<DirEntry>, rollcall_directory::DirectoryError> {
        let attrs = [
            "objectClass",
            self.config.group_attribute.as_str(),
            self.config.member_attribute.as_str(),
        ];
        let entry = self
            .directory
            .read(member_ref, "(objectClass=*)", &attrs)
            .await?;
        Ok(entry.filter(|e| e.has_object_class(&self.config.group_object_class)))
    }

    fn push_member(expansion: &mut Expansion, seen: &mut HashSet<String>, member_ref: String) {
        if seen.insert(member_ref.clone()) {
            expansion.member_refs.push(member_ref);
        }
    }
}
