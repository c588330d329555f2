//! Postgres implementation of [`RosterStore`].
//!
//! Schema (managed externally):
//!
//! - `users (id uuid pk, external_id text, deleted bool)`
//! - `group_bindings (id uuid pk, course_id uuid, external_group_id text,
//!   role_id uuid, removal_policy text, enabled bool)` with a partial
//!   unique index on `(course_id, external_group_id) WHERE enabled`
//! - `enrollments (user_id uuid, binding_id uuid, status text,
//!   primary key (user_id, binding_id))`
//! - `role_assignments (user_id uuid, binding_id uuid, role_id uuid,
//!   component text, primary key (user_id, binding_id, component))`
//!
//! Role assignments written here always carry the sync component tag, so
//! removal never touches manually-granted roles.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::error::{RosterError, RosterResult};
use crate::store::{AppliedActions, RosterStore};
use crate::types::{Action, Enrollment, EnrollmentStatus, GroupBinding, RemovalPolicy};

/// Component tag stamped on every role assignment this store owns.
const COMPONENT: &str = "rollcall";

/// Roster store backed by a Postgres pool.
pub struct PgRosterStore {
    pool: PgPool,
}

impl PgRosterStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply one action inside the caller's transaction, updating counts.
    async fn apply_one(
        tx: &mut Transaction<'_, Postgres>,
        binding: &GroupBinding,
        action: &Action,
        applied: &mut AppliedActions,
    ) -> RosterResult<()> {
        match action {
            Action::Enrol { external_id } => {
                let user_id: Option<Uuid> = sqlx::query_scalar(
                    "SELECT id FROM users WHERE external_id = $1 AND NOT deleted",
                )
                .bind(external_id)
                .fetch_optional(&mut **tx)
                .await?;

                let Some(user_id) = user_id else {
                    // No local user for this external member; skip and
                    // let the caller surface it as a diagnostic.
                    applied.unknown_members.push(external_id.clone());
                    return Ok(());
                };

                // Status is forced active even on an existing row: after a
                // suspend-and-unassign removal, a returning member must
                // come back active.
                sqlx::query(
                    r"
                    INSERT INTO enrollments (user_id, binding_id, status)
                    VALUES ($1, $2, 'active')
                    ON CONFLICT (user_id, binding_id)
                    DO UPDATE SET status = 'active'
                    ",
                )
                .bind(user_id)
                .bind(binding.id)
                .execute(&mut **tx)
                .await?;

                Self::insert_role(tx, binding, user_id).await?;
                applied.enrolled += 1;
            }
            Action::Reactivate { user_id } => {
                sqlx::query(
                    "UPDATE enrollments SET status = 'active' WHERE user_id = $1 AND binding_id = $2",
                )
                .bind(user_id)
                .bind(binding.id)
                .execute(&mut **tx)
                .await?;
                applied.reactivated += 1;
            }
            Action::AssignRole { user_id } => {
                Self::insert_role(tx, binding, *user_id).await?;
                applied.roles_assigned += 1;
            }
            Action::Suspend { user_id } => {
                sqlx::query(
                    "UPDATE enrollments SET status = 'suspended' WHERE user_id = $1 AND binding_id = $2",
                )
                .bind(user_id)
                .bind(binding.id)
                .execute(&mut **tx)
                .await?;
                applied.suspended += 1;
            }
            Action::Unenrol { user_id } => {
                // Role removal cascades with the enrollment.
                Self::delete_role(tx, binding, *user_id).await?;
                sqlx::query(
                    "DELETE FROM enrollments WHERE user_id = $1 AND binding_id = $2",
                )
                .bind(user_id)
                .bind(binding.id)
                .execute(&mut **tx)
                .await?;
                applied.unenrolled += 1;
            }
            Action::UnassignRole { user_id } => {
                Self::delete_role(tx, binding, *user_id).await?;
                applied.roles_unassigned += 1;
            }
        }
        Ok(())
    }

    async fn insert_role(
        tx: &mut Transaction<'_, Postgres>,
        binding: &GroupBinding,
        user_id: Uuid,
    ) -> RosterResult<()> {
        sqlx::query(
            r"
            INSERT INTO role_assignments (user_id, binding_id, role_id, component)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, binding_id, component) DO NOTHING
            ",
        )
        .bind(user_id)
        .bind(binding.id)
        .bind(binding.role_id)
        .bind(COMPONENT)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn delete_role(
        tx: &mut Transaction<'_, Postgres>,
        binding: &GroupBinding,
        user_id: Uuid,
    ) -> RosterResult<()> {
        sqlx::query(
            "DELETE FROM role_assignments WHERE user_id = $1 AND binding_id = $2 AND component = $3",
        )
        .bind(user_id)
        .bind(binding.id)
        .bind(COMPONENT)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl RosterStore for PgRosterStore {
    #[instrument(skip(self))]
    async fn enabled_bindings(&self, course_id: Option<Uuid>) -> RosterResult<Vec<GroupBinding>> {
        let rows: Vec<BindingRow> = sqlx::query_as(
            r"
            SELECT id, course_id, external_group_id, role_id, removal_policy, enabled
            FROM group_bindings
            WHERE enabled AND ($1::uuid IS NULL OR course_id = $1)
            ORDER BY course_id, external_group_id
            ",
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(BindingRow::into_binding).collect())
    }

    async fn bindings_for_groups(&self, group_ids: &[String]) -> RosterResult<Vec<GroupBinding>> {
        let rows: Vec<BindingRow> = sqlx::query_as(
            r"
            SELECT id, course_id, external_group_id, role_id, removal_policy, enabled
            FROM group_bindings
            WHERE enabled AND external_group_id = ANY($1)
            ORDER BY course_id, external_group_id
            ",
        )
        .bind(group_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(BindingRow::into_binding).collect())
    }

    async fn current_membership(&self, binding: &GroupBinding) -> RosterResult<Vec<Enrollment>> {
        let rows: Vec<EnrollmentRow> = sqlx::query_as(
            r"
            SELECT
                e.user_id, u.external_id, e.status,
                EXISTS (
                    SELECT 1 FROM role_assignments ra
                    WHERE ra.user_id = e.user_id
                      AND ra.binding_id = e.binding_id
                      AND ra.component = $2
                ) AS has_role
            FROM enrollments e
            JOIN users u ON u.id = e.user_id AND NOT u.deleted
            WHERE e.binding_id = $1
            ORDER BY e.user_id
            ",
        )
        .bind(binding.id)
        .bind(COMPONENT)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(EnrollmentRow::into_enrollment).collect())
    }

    async fn enrollments_for_user(
        &self,
        user_id: Uuid,
    ) -> RosterResult<Vec<(GroupBinding, Enrollment)>> {
        let rows: Vec<UserEnrollmentRow> = sqlx::query_as(
            r"
            SELECT
                b.id, b.course_id, b.external_group_id, b.role_id, b.removal_policy, b.enabled,
                e.user_id, u.external_id, e.status,
                EXISTS (
                    SELECT 1 FROM role_assignments ra
                    WHERE ra.user_id = e.user_id
                      AND ra.binding_id = e.binding_id
                      AND ra.component = $2
                ) AS has_role
            FROM enrollments e
            JOIN group_bindings b ON b.id = e.binding_id AND b.enabled
            JOIN users u ON u.id = e.user_id AND NOT u.deleted
            WHERE e.user_id = $1
            ORDER BY b.course_id, b.external_group_id
            ",
        )
        .bind(user_id)
        .bind(COMPONENT)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(UserEnrollmentRow::into_pair).collect())
    }

    #[instrument(skip(self, actions), fields(binding_id = %binding.id, action_count = actions.len()))]
    async fn apply_actions(
        &self,
        binding: &GroupBinding,
        actions: &[Action],
    ) -> RosterResult<AppliedActions> {
        let mut applied = AppliedActions::default();
        if actions.is_empty() {
            return Ok(applied);
        }

        // One transaction per binding; any failure rolls the whole list
        // back when the transaction is dropped uncommitted.
        let mut tx = self.pool.begin().await?;
        for action in actions {
            Self::apply_one(&mut tx, binding, action, &mut applied).await?;
        }
        tx.commit().await?;

        if !applied.unknown_members.is_empty() {
            warn!(
                binding_id = %binding.id,
                unknown = applied.unknown_members.len(),
                "External members with no matching roster user were skipped"
            );
        }
        debug!(applied = applied.total(), "Applied binding action list");

        Ok(applied)
    }

    #[instrument(skip(self, batches), fields(user_id = %user_id, binding_count = batches.len()))]
    async fn apply_user_actions(
        &self,
        user_id: Uuid,
        batches: &[(GroupBinding, Vec<Action>)],
    ) -> RosterResult<AppliedActions> {
        let mut applied = AppliedActions::default();
        if batches.iter().all(|(_, actions)| actions.is_empty()) {
            return Ok(applied);
        }

        let mut tx = self.pool.begin().await?;
        for (binding, actions) in batches {
            for action in actions {
                Self::apply_one(&mut tx, binding, action, &mut applied).await?;
            }
        }
        tx.commit().await?;

        debug!(applied = applied.total(), "Applied user-scoped action lists");

        Ok(applied)
    }
}

/// Row from the `group_bindings` table.
#[derive(Debug, sqlx::FromRow)]
struct BindingRow {
    id: Uuid,
    course_id: Uuid,
    external_group_id: String,
    role_id: Uuid,
    removal_policy: String,
    enabled: bool,
}

impl BindingRow {
    fn into_binding(self) -> GroupBinding {
        // Unknown policy values degrade to Keep, the one policy that can
        // never remove anything.
        let removal_policy = self.removal_policy.parse().unwrap_or(RemovalPolicy::Keep);
        GroupBinding {
            id: self.id,
            course_id: self.course_id,
            external_group_id: self.external_group_id,
            role_id: self.role_id,
            removal_policy,
            enabled: self.enabled,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct EnrollmentRow {
    user_id: Uuid,
    external_id: String,
    status: String,
    has_role: bool,
}

impl EnrollmentRow {
    fn into_enrollment(self) -> Enrollment {
        let status = self.status.parse().unwrap_or(EnrollmentStatus::Active);
        Enrollment {
            user_id: self.user_id,
            external_id: self.external_id,
            status,
            has_role: self.has_role,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserEnrollmentRow {
    id: Uuid,
    course_id: Uuid,
    external_group_id: String,
    role_id: Uuid,
    removal_policy: String,
    enabled: bool,
    user_id: Uuid,
    external_id: String,
    status: String,
    has_role: bool,
}

impl UserEnrollmentRow {
    fn into_pair(self) -> (GroupBinding, Enrollment) {
        let binding = BindingRow {
            id: self.id,
            course_id: self.course_id,
            external_group_id: self.external_group_id,
            role_id: self.role_id,
            removal_policy: self.removal_policy,
            enabled: self.enabled,
        }
        .into_binding();
        let enrollment = EnrollmentRow {
            user_id: self.user_id,
            external_id: self.external_id,
            status: self.status,
            has_role: self.has_role,
        }
        .into_enrollment();
        (binding, enrollment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binding_row_parses_policy() {
        let row = BindingRow {
            id: Uuid::new_v4(),
            course_id: Uuid::new_v4(),
            external_group_id: "math-101".to_string(),
            role_id: Uuid::new_v4(),
            removal_policy: "suspend_and_unassign_role".to_string(),
            enabled: true,
        };
        let binding = row.into_binding();
        assert_eq!(
            binding.removal_policy,
            RemovalPolicy::SuspendAndUnassignRole
        );
    }

    #[test]
    fn test_binding_row_unknown_policy_degrades_to_keep() {
        let row = BindingRow {
            id: Uuid::new_v4(),
            course_id: Uuid::new_v4(),
            external_group_id: "math-101".to_string(),
            role_id: Uuid::new_v4(),
            removal_policy: "obliterate".to_string(),
            enabled: true,
        };
        assert_eq!(row.into_binding().removal_policy, RemovalPolicy::Keep);
    }

    #[test]
    fn test_enrollment_row_parses_status() {
        let row = EnrollmentRow {
            user_id: Uuid::new_v4(),
            external_id: "s42".to_string(),
            status: "suspended".to_string(),
            has_role: false,
        };
        let enrollment = row.into_enrollment();
        assert_eq!(enrollment.status, EnrollmentStatus::Suspended);
        assert!(!enrollment.has_role);
    }
}
