//! Sync run reporting
//!
//! A [`SyncReport`] is the durable summary of one run: what was applied,
//! what was skipped, and every condition that degraded to a diagnostic
//! instead of aborting the run.

use chrono::{DateTime, Utc};
use rollcall_roster::AppliedActions;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A non-fatal condition observed during a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// No group entry matched the binding's external identifier in any
    /// context. The binding is skipped entirely; absence of the group is
    /// never treated as an empty membership.
    GroupNotFound {
        binding_id: Uuid,
        external_group_id: String,
    },

    /// One context could not be searched; results from the other contexts
    /// still count.
    ContextSkipped { context: String, message: String },

    /// A membership reference could not be resolved to an external
    /// identity.
    UnresolvableMember { reference: String },

    /// A resolved external identity matched no local roster user.
    UnknownLocalUser { external_id: String },

    /// Applying a binding's action list failed; the transaction rolled
    /// back and the run moved on.
    BindingFailed { binding_id: Uuid, message: String },
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::GroupNotFound {
                binding_id,
                external_group_id,
            } => write!(
                f,
                "group '{external_group_id}' not found in any context (binding {binding_id})"
            ),
            Diagnostic::ContextSkipped { context, message } => {
                write!(f, "context '{context}' skipped: {message}")
            }
            Diagnostic::UnresolvableMember { reference } => {
                write!(f, "member reference '{reference}' could not be resolved")
            }
            Diagnostic::UnknownLocalUser { external_id } => {
                write!(f, "no local user with external identity '{external_id}'")
            }
            Diagnostic::BindingFailed {
                binding_id,
                message,
            } => write!(f, "binding {binding_id} failed: {message}"),
        }
    }
}

/// Summary of one sync run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Bindings whose action list was applied (possibly empty).
    pub bindings_processed: usize,
    /// Bindings skipped before reconciliation (group not found, storage
    /// read failure).
    pub bindings_skipped: usize,
    /// Membership cycles broken during nested expansion.
    pub cycles_detected: usize,
    /// Aggregated roster mutations across all bindings.
    pub applied: AppliedActions,
    pub diagnostics: Vec<Diagnostic>,
}

impl SyncReport {
    /// Start a report stamped with the current time.
    #[must_use]
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            bindings_processed: 0,
            bindings_skipped: 0,
            cycles_detected: 0,
            applied: AppliedActions::default(),
            diagnostics: Vec::new(),
        }
    }

    /// Record a diagnostic.
    pub fn record(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Stamp the finish time.
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Whether the run completed without any diagnostics.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

impl Default for SyncReport {
    fn default() -> Self {
        Self::new()
    }
}
