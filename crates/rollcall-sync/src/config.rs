//! Sync engine configuration
//!
//! One [`SyncConfig`] describes how the external directory is shaped:
//! where groups and users live, which attributes carry identity and
//! membership, and which optional behaviors (nested expansion, login
//! sync) are on. Connection settings live in the directory adapter's own
//! configuration.

use rollcall_directory::filter;
use serde::{Deserialize, Serialize};

use crate::error::{SyncError, SyncResult};

fn default_group_object_class() -> String {
    "groupOfNames".to_string()
}

fn default_user_object_class() -> String {
    "inetOrgPerson".to_string()
}

fn default_group_attribute() -> String {
    "cn".to_string()
}

fn default_member_attribute() -> String {
    "member".to_string()
}

fn default_identity_attribute() -> String {
    "uid".to_string()
}

fn default_user_attribute() -> String {
    "uid".to_string()
}

fn default_true() -> bool {
    true
}

/// Directory-shape configuration for the sync engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Base DNs searched for group entries. Group lookups query every
    /// context and union the results.
    pub group_contexts: Vec<String>,

    /// Base DNs searched for user entries. Required when member
    /// references or external identities need a user search to resolve.
    #[serde(default)]
    pub user_contexts: Vec<String>,

    /// Object class that marks an entry as a group. Also the sub-group
    /// discriminator during nested expansion.
    #[serde(default = "default_group_object_class")]
    pub group_object_class: String,

    /// Object class that marks an entry as a user.
    #[serde(default = "default_user_object_class")]
    pub user_object_class: String,

    /// Attribute holding a group's stable identifier (the value bindings
    /// reference).
    #[serde(default = "default_group_attribute")]
    pub group_attribute: String,

    /// Attribute on a group entry holding membership references.
    #[serde(default = "default_member_attribute")]
    pub member_attribute: String,

    /// Whether membership references are distinguished names (true for
    /// `member`/`uniqueMember` schemas) or plain attribute values (true
    /// for `memberUid` schemas).
    #[serde(default = "default_true")]
    pub member_attribute_is_dn: bool,

    /// Attribute on a user entry whose value is the user's stable
    /// external identity. The special values `dn` and `distinguishedName`
    /// make the entry's DN itself the identity.
    #[serde(default = "default_identity_attribute")]
    pub identity_attribute: String,

    /// Attribute a non-DN membership reference points at on the user
    /// entry.
    #[serde(default = "default_user_attribute")]
    pub user_attribute: String,

    /// Expand sub-groups transitively. Only meaningful when membership
    /// references are DNs; plain references are always treated as users.
    #[serde(default)]
    pub nested_groups: bool,

    /// Extra filter fragment AND-ed into every group search. Must be a
    /// complete parenthesized LDAP filter, e.g. `(department=science)`.
    #[serde(default)]
    pub group_filter: Option<String>,

    /// Run the user-scoped sync when a user logs in.
    #[serde(default = "default_true")]
    pub login_sync: bool,
}

impl SyncConfig {
    /// Validate shape and attribute settings.
    pub fn validate(&self) -> SyncResult<()> {
        if self.group_contexts.is_empty() {
            return Err(SyncError::Configuration(
                "at least one group context is required".to_string(),
            ));
        }
        for (name, value) in [
            ("group_object_class", &self.group_object_class),
            ("user_object_class", &self.user_object_class),
            ("group_attribute", &self.group_attribute),
            ("member_attribute", &self.member_attribute),
            ("identity_attribute", &self.identity_attribute),
            ("user_attribute", &self.user_attribute),
        ] {
            if value.trim().is_empty() {
                return Err(SyncError::Configuration(format!("{name} must not be empty")));
            }
        }
        if self.needs_user_search() && self.user_contexts.is_empty() {
            return Err(SyncError::Configuration(
                "user contexts are required when identity resolution needs a user search"
                    .to_string(),
            ));
        }
        Ok(())
    }

    /// Whether the identity attribute is the entry's DN itself.
    #[must_use]
    pub fn is_dn_identity(&self) -> bool {
        self.identity_attribute.eq_ignore_ascii_case("dn")
            || self.identity_attribute.eq_ignore_ascii_case("distinguishedname")
    }

    /// Whether resolving identities ever requires searching user contexts.
    #[must_use]
    pub fn needs_user_search(&self) -> bool {
        if self.member_attribute_is_dn {
            false
        } else {
            !self
                .user_attribute
                .eq_ignore_ascii_case(&self.identity_attribute)
        }
    }

    /// Filter matching the group entry (or entries) carrying `group_id`.
    #[must_use]
    pub fn group_search_filter(&self, group_id: &str) -> String {
        let mut parts = vec![
            filter::object_class(&self.group_object_class),
            filter::eq(&self.group_attribute, group_id),
        ];
        if let Some(extra) = &self.group_filter {
            parts.push(extra.clone());
        }
        filter::and(&parts)
    }

    /// Filter matching groups whose membership attribute contains
    /// `member_ref`.
    #[must_use]
    pub fn groups_containing_filter(&self, member_ref: &str) -> String {
        let mut parts = vec![
            filter::object_class(&self.group_object_class),
            filter::eq(&self.member_attribute, member_ref),
        ];
        if let Some(extra) = &self.group_filter {
            parts.push(extra.clone());
        }
        filter::and(&parts)
    }

    /// Filter matching the user entry whose `attribute` equals `value`.
    #[must_use]
    pub fn user_lookup_filter(&self, attribute: &str, value: &str) -> String {
        filter::and(&[
            filter::object_class(&self.user_object_class),
            filter::eq(attribute, value),
        ])
    }

    /// Attributes to request on group searches.
    #[must_use]
    pub fn group_search_attrs(&self) -> Vec<&str> {
        vec![
            "objectClass",
            self.group_attribute.as_str(),
            self.member_attribute.as_str(),
        ]
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            group_contexts: Vec::new(),
            user_contexts: Vec::new(),
            group_object_class: default_group_object_class(),
            user_object_class: default_user_object_class(),
            group_attribute: default_group_attribute(),
            member_attribute: default_member_attribute(),
            member_attribute_is_dn: true,
            identity_attribute: default_identity_attribute(),
            user_attribute: default_user_attribute(),
            nested_groups: false,
            group_filter: None,
            login_sync: true,
        }
    }
}
