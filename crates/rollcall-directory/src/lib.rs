//! # Directory Query Adapter
//!
//! Read-only access to an external hierarchical directory (LDAP) for the
//! rollcall enrollment sync engine.
//!
//! The sync core never speaks the wire protocol itself. It consumes the
//! [`DirectoryClient`] trait, which exposes exactly three capabilities:
//!
//! - [`DirectoryClient::search`] — search one context, draining every
//!   result page before returning
//! - [`DirectoryClient::read`] — read a single entry by distinguished name
//! - [`DirectoryClient::connect`] / [`DirectoryClient::close`] — explicit
//!   lifecycle for the shared connection, reused across contexts within a
//!   sync run and released at run end
//!
//! [`LdapDirectory`] is the production implementation backed by `ldap3`.
//! Tests substitute their own `DirectoryClient`, so the core engine is
//! exercised without a live server.
//!
//! ## Crate Organization
//!
//! - [`config`] — connection configuration with validation and redaction
//! - [`entry`] — the transient directory entry model
//! - [`error`] — error types with fatal/recoverable classification
//! - [`client`] — the `DirectoryClient` trait
//! - [`ldap`] — the `ldap3`-backed implementation
//! - [`filter`] — RFC 4515 filter value escaping and composition helpers

pub mod client;
pub mod config;
pub mod entry;
pub mod error;
pub mod filter;
pub mod ldap;

pub use client::DirectoryClient;
pub use config::DirectoryConfig;
pub use entry::DirEntry;
pub use error::{DirectoryError, DirectoryResult};
pub use ldap::LdapDirectory;
