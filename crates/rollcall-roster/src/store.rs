//! The roster store interface consumed by the sync core.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::RosterResult;
use crate::types::{Action, Enrollment, GroupBinding};

/// Counts of roster mutations applied for one transaction, plus the
/// external identifiers that matched no local user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppliedActions {
    pub enrolled: usize,
    pub reactivated: usize,
    pub roles_assigned: usize,
    pub suspended: usize,
    pub unenrolled: usize,
    pub roles_unassigned: usize,
    /// External identifiers from `Enrol` actions with no matching roster
    /// user. These are skipped, not failed; the caller reports them.
    pub unknown_members: Vec<String>,
}

impl AppliedActions {
    /// Total number of mutations applied.
    #[must_use]
    pub fn total(&self) -> usize {
        self.enrolled
            + self.reactivated
            + self.roles_assigned
            + self.suspended
            + self.unenrolled
            + self.roles_unassigned
    }

    /// Fold another batch's counts into this one.
    pub fn merge(&mut self, other: AppliedActions) {
        self.enrolled += other.enrolled;
        self.reactivated += other.reactivated;
        self.roles_assigned += other.roles_assigned;
        self.suspended += other.suspended;
        self.unenrolled += other.unenrolled;
        self.roles_unassigned += other.roles_unassigned;
        self.unknown_members.extend(other.unknown_members);
    }
}

/// Persisted enrollment/role state the reconciler reads and the
/// orchestrator mutates.
///
/// `apply_actions` and `apply_user_actions` are transactional: either the
/// whole action list is applied or none of it is. That guarantee is what
/// lets the orchestrator treat a storage failure as a clean per-binding
/// skip.
#[async_trait]
pub trait RosterStore: Send + Sync {
    /// Every enabled group binding, optionally scoped to one course (the
    /// restore/import path).
    async fn enabled_bindings(&self, course_id: Option<Uuid>) -> RosterResult<Vec<GroupBinding>>;

    /// Enabled bindings whose external group identifier is in `group_ids`.
    /// Used by single-user sync to map matched directory groups back to
    /// bindings.
    async fn bindings_for_groups(&self, group_ids: &[String]) -> RosterResult<Vec<GroupBinding>>;

    /// Current membership under a binding, in stable (user id) order,
    /// including suspended enrollments.
    async fn current_membership(&self, binding: &GroupBinding) -> RosterResult<Vec<Enrollment>>;

    /// This user's enrollments across all bindings owned by the sync
    /// component.
    async fn enrollments_for_user(
        &self,
        user_id: Uuid,
    ) -> RosterResult<Vec<(GroupBinding, Enrollment)>>;

    /// Apply one binding's action list inside a single transaction.
    async fn apply_actions(
        &self,
        binding: &GroupBinding,
        actions: &[Action],
    ) -> RosterResult<AppliedActions>;

    /// Apply action lists for several bindings, all scoped to one user,
    /// inside a single transaction (the login-sync path).
    async fn apply_user_actions(
        &self,
        user_id: Uuid,
        batches: &[(GroupBinding, Vec<Action>)],
    ) -> RosterResult<AppliedActions>;
}
