//! Roster domain types
//!
//! These are the durable artifacts the sync engine exists to keep
//! correct, plus the action vocabulary the reconciler emits and the
//! store applies.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Administrator-created association between one external directory group
/// and one local course/role.
///
/// At most one enabled binding exists per (course, external group) pair;
/// the store enforces this with a partial unique index. Bindings are never
/// auto-created by the sync core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupBinding {
    /// Binding ID.
    pub id: Uuid,
    /// Local course the external group is bound to.
    pub course_id: Uuid,
    /// Stable identifier of the external group (the configured group
    /// attribute's value, e.g. a cn).
    pub external_group_id: String,
    /// Role granted to members of the group.
    pub role_id: Uuid,
    /// Behavior for locally-enrolled users no longer present externally.
    pub removal_policy: RemovalPolicy,
    /// Disabled bindings are skipped by the orchestrator.
    pub enabled: bool,
}

/// Enrollment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    Active,
    Suspended,
}

impl EnrollmentStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrollmentStatus::Active => "active",
            EnrollmentStatus::Suspended => "suspended",
        }
    }
}

impl std::fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EnrollmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(EnrollmentStatus::Active),
            "suspended" => Ok(EnrollmentStatus::Suspended),
            other => Err(format!("unknown enrollment status: {other}")),
        }
    }
}

/// One user's enrollment under a binding, as read back for reconciliation.
///
/// `external_id` is the user's stable external identifier (the roster's
/// copy of the directory identity attribute); membership diffs are keyed
/// on it. `has_role` reports whether the role assignment this binding owns
/// is currently present, which drives the role self-heal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enrollment {
    /// Local user ID.
    pub user_id: Uuid,
    /// The user's external identifier.
    pub external_id: String,
    /// Current enrollment status.
    pub status: EnrollmentStatus,
    /// Whether the binding's role assignment exists for this user.
    pub has_role: bool,
}

/// Configured behavior for a locally-enrolled user who is no longer a
/// member of the external group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalPolicy {
    /// Delete the enrollment; the role assignment is removed as part of
    /// the unenrol cascade.
    Unenrol,
    /// Leave enrollment and role untouched; sync only ever adds.
    Keep,
    /// Suspend the enrollment, keeping the role assignment intact.
    Suspend,
    /// Suspend the enrollment and explicitly remove the role assignment.
    SuspendAndUnassignRole,
}

impl RemovalPolicy {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            RemovalPolicy::Unenrol => "unenrol",
            RemovalPolicy::Keep => "keep",
            RemovalPolicy::Suspend => "suspend",
            RemovalPolicy::SuspendAndUnassignRole => "suspend_and_unassign_role",
        }
    }
}

impl std::fmt::Display for RemovalPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RemovalPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unenrol" => Ok(RemovalPolicy::Unenrol),
            "keep" => Ok(RemovalPolicy::Keep),
            "suspend" => Ok(RemovalPolicy::Suspend),
            "suspend_and_unassign_role" => Ok(RemovalPolicy::SuspendAndUnassignRole),
            other => Err(format!("unknown removal policy: {other}")),
        }
    }
}

/// One roster mutation, produced by the reconciler and applied by the
/// store inside the binding's transaction.
///
/// `Enrol` carries the external identifier because the user may not have
/// been looked up yet; every other action targets a known local user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    /// Enrol a new member (status active) and assign the binding's role.
    Enrol { external_id: String },
    /// Flip a suspended enrollment back to active.
    Reactivate { user_id: Uuid },
    /// Re-issue the binding's role assignment (idempotent self-heal).
    AssignRole { user_id: Uuid },
    /// Suspend an active enrollment.
    Suspend { user_id: Uuid },
    /// Delete the enrollment and cascade-remove the role assignment.
    Unenrol { user_id: Uuid },
    /// Remove the role assignment while the (suspended) enrollment stays.
    UnassignRole { user_id: Uuid },
}

impl Action {
    /// Short name for logs and reports.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Enrol { .. } => "enrol",
            Action::Reactivate { .. } => "reactivate",
            Action::AssignRole { .. } => "assign_role",
            Action::Suspend { .. } => "suspend",
            Action::Unenrol { .. } => "unenrol",
            Action::UnassignRole { .. } => "unassign_role",
        }
    }
}
