//! Membership reconciliation
//!
//! Pure diff between the external membership set and the roster's current
//! state for one binding. No I/O happens here; the orchestrator resolves
//! membership first and applies the returned actions afterwards, so this
//! is the single place the enrollment policy lives.

use std::collections::HashSet;

use rollcall_roster::{Action, Enrollment, EnrollmentStatus, GroupBinding, RemovalPolicy};

/// Compute the action list that moves `current` to agree with `external`.
///
/// Ordering is fixed: enrollments and reactivations first, then role
/// self-heals, then removals. Members are visited in sorted order so the
/// same inputs always produce the same list.
///
/// The diff is idempotent: reconciling a roster that already agrees with
/// the external set yields an empty list, whatever the removal policy.
#[must_use]
pub fn reconcile(
    binding: &GroupBinding,
    external: &HashSet<String>,
    current: &[Enrollment],
) -> Vec<Action> {
    let mut additions = Vec::new();
    let mut role_heals = Vec::new();
    let mut removals = Vec::new();

    let mut members: Vec<&String> = external.iter().collect();
    members.sort();

    for external_id in members {
        match current.iter().find(|e| &e.external_id == external_id) {
            None => additions.push(Action::Enrol {
                external_id: external_id.clone(),
            }),
            Some(enrollment) => {
                if enrollment.status == EnrollmentStatus::Suspended {
                    additions.push(Action::Reactivate {
                        user_id: enrollment.user_id,
                    });
                }
                if !enrollment.has_role {
                    role_heals.push(Action::AssignRole {
                        user_id: enrollment.user_id,
                    });
                }
            }
        }
    }

    for enrollment in current {
        if external.contains(&enrollment.external_id) {
            continue;
        }
        match binding.removal_policy {
            RemovalPolicy::Keep => {}
            RemovalPolicy::Unenrol => removals.push(Action::Unenrol {
                user_id: enrollment.user_id,
            }),
            RemovalPolicy::Suspend => {
                if enrollment.status == EnrollmentStatus::Active {
                    removals.push(Action::Suspend {
                        user_id: enrollment.user_id,
                    });
                }
            }
            RemovalPolicy::SuspendAndUnassignRole => {
                if enrollment.status == EnrollmentStatus::Active {
                    removals.push(Action::Suspend {
                        user_id: enrollment.user_id,
                    });
                }
                if enrollment.has_role {
                    removals.push(Action::UnassignRole {
                        user_id: enrollment.user_id,
                    });
                }
            }
        }
    }

    additions
        .into_iter()
        .chain(role_heals)
        .chain(removals)
        .collect()
}
