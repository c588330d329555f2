//! # Directory Group Enrollment Sync
//!
//! Keeps local course rosters in agreement with group membership held in
//! an external LDAP directory. Administrators bind a directory group to a
//! course and role; the engine flattens the group (transitively, when
//! nested expansion is on), resolves each member to a stable external
//! identity, diffs that set against the roster, and applies the resulting
//! actions under the binding's removal policy.
//!
//! The engine is deliberately one-directional: it reads the directory and
//! writes the roster, never the reverse. Local users are matched by
//! external identity and never auto-created.
//!
//! ## Crate Organization
//!
//! - [`config`] — directory-shape configuration
//! - [`runner`] — the bulk and user-scoped sync entry points
//! - [`reconcile`] — the pure membership diff
//! - [`expander`] — nested group flattening
//! - [`resolver`] — membership reference to identity mapping
//! - [`report`] — run reports and diagnostics
//! - [`error`] — error types

pub mod config;
pub mod error;
pub mod expander;
pub mod reconcile;
pub mod report;
pub mod resolver;
pub mod runner;

#[cfg(test)]
mod testutil;

pub use config::SyncConfig;
pub use error::{SyncError, SyncResult};
pub use expander::{Expansion, GroupExpander};
pub use reconcile::reconcile;
pub use report::{Diagnostic, SyncReport};
pub use resolver::IdentityResolver;
pub use runner::SyncRunner;
