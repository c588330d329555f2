//! LDAP filter composition helpers
//!
//! Filters are plain strings at the adapter boundary; these helpers keep
//! the escaping rules (RFC 4515) in one place so the sync core never
//! interpolates raw external identifiers into a filter.

/// Escape special characters in an LDAP filter value (RFC 4515).
#[must_use]
pub fn escape_value(value: &str) -> String {
    value
        .replace('\\', "\\5c")
        .replace('*', "\\2a")
        .replace('(', "\\28")
        .replace(')', "\\29")
        .replace('\0', "\\00")
}

/// `(attribute=value)` with the value escaped.
#[must_use]
pub fn eq(attribute: &str, value: &str) -> String {
    format!("({}={})", attribute, escape_value(value))
}

/// AND-combine filter fragments. Fragments must already be parenthesized.
#[must_use]
pub fn and(fragments: &[String]) -> String {
    match fragments.len() {
        0 => String::new(),
        1 => fragments[0].clone(),
        _ => format!("(&{})", fragments.concat()),
    }
}

/// OR-combine filter fragments. Fragments must already be parenthesized.
#[must_use]
pub fn or(fragments: &[String]) -> String {
    match fragments.len() {
        0 => String::new(),
        1 => fragments[0].clone(),
        _ => format!("(|{})", fragments.concat()),
    }
}

/// `(objectClass=class)` for the given class name.
#[must_use]
pub fn object_class(class: &str) -> String {
    format!("(objectClass={})", escape_value(class))
}
