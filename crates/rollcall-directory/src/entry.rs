//! Transient directory entry model
//!
//! A [`DirEntry`] is one search or read result. Entries are produced per
//! page by the adapter, consumed by the sync core, and never persisted.
//! Attribute names are lowercased on construction because LDAP attribute
//! names are case-insensitive (RFC 4512) and servers disagree on the
//! casing they return.

use std::collections::HashMap;

/// A single directory entry: its distinguished name plus attribute values.
#[derive(Debug, Clone, Default)]
pub struct DirEntry {
    /// Distinguished name of the entry.
    pub dn: String,
    /// String-valued attributes, keyed by lowercased attribute name.
    pub attrs: HashMap<String, Vec<String>>,
    /// Binary-valued attributes, keyed by lowercased attribute name.
    pub bin_attrs: HashMap<String, Vec<Vec<u8>>>,
}

impl DirEntry {
    /// Create an entry with just a DN.
    #[must_use]
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attrs: HashMap::new(),
            bin_attrs: HashMap::new(),
        }
    }

    /// Add a multi-valued string attribute (builder style, for tests and
    /// adapters alike). The name is lowercased.
    #[must_use]
    pub fn with_attr(mut self, name: &str, values: Vec<String>) -> Self {
        self.attrs.insert(name.to_lowercase(), values);
        self
    }

    /// Add a binary attribute. The name is lowercased.
    #[must_use]
    pub fn with_bin_attr(mut self, name: &str, values: Vec<Vec<u8>>) -> Self {
        self.bin_attrs.insert(name.to_lowercase(), values);
        self
    }

    /// First string value of an attribute, if any.
    #[must_use]
    pub fn first(&self, name: &str) -> Option<&str> {
        self.attrs
            .get(&name.to_lowercase())
            .and_then(|v| v.first())
            .map(String::as_str)
    }

    /// All string values of an attribute (empty slice when absent).
    #[must_use]
    pub fn values(&self, name: &str) -> &[String] {
        self.attrs
            .get(&name.to_lowercase())
            .map_or(&[], Vec::as_slice)
    }

    /// First binary value of an attribute, if any.
    #[must_use]
    pub fn first_binary(&self, name: &str) -> Option<&[u8]> {
        self.bin_attrs
            .get(&name.to_lowercase())
            .and_then(|v| v.first())
            .map(Vec::as_slice)
    }

    /// Whether the entry's `objectClass` values contain `class`
    /// (case-insensitive). This is the sub-group discriminator used by the
    /// nested group expander.
    #[must_use]
    pub fn has_object_class(&self, class: &str) -> bool {
        self.values("objectclass")
            .iter()
            .any(|v| v.eq_ignore_ascii_case(class))
    }

    /// The raw membership references held in `member_attr`, preserving
    /// directory order.
    #[must_use]
    pub fn member_references(&self, member_attr: &str) -> Vec<String> {
        self.values(member_attr)
            .iter()
            .filter(|v| !v.is_empty())
            .cloned()
            .collect()
    }
}
