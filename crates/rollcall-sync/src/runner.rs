//! Sync orchestration
//!
//! [`SyncRunner`] drives the two entry points: the bulk run over every
//! enabled binding ([`sync_enrolments`](SyncRunner::sync_enrolments)) and
//! the user-scoped run triggered at login ([`sync_user`](SyncRunner::sync_user)).
//!
//! One directory connection is established per run and reused for every
//! search and read; failure to connect is the single fatal condition and
//! aborts before any roster mutation. Everything after that degrades at
//! the finest granularity that keeps the rest of the run useful: a
//! context, a member, or a binding.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use rollcall_directory::{DirEntry, DirectoryClient};
use rollcall_roster::{Enrollment, GroupBinding, RosterStore};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::expander::{Expansion, GroupExpander};
use crate::reconcile::reconcile;
use crate::report::{Diagnostic, SyncReport};
use crate::resolver::IdentityResolver;

/// Orchestrates sync runs over a directory client and a roster store.
pub struct SyncRunner {
    directory: Arc<dyn DirectoryClient>,
    roster: Arc<dyn RosterStore>,
    config: SyncConfig,
}

impl SyncRunner {
    pub fn new(
        directory: Arc<dyn DirectoryClient>,
        roster: Arc<dyn RosterStore>,
        config: SyncConfig,
    ) -> Self {
        Self {
            directory,
            roster,
            config,
        }
    }

    /// Reconcile every enabled binding, optionally scoped to one course.
    #[instrument(skip(self))]
    pub async fn sync_enrolments(&self, course_id: Option<Uuid>) -> SyncResult<SyncReport> {
        self.config.validate()?;
        let mut report = SyncReport::new();

        // Connect before touching the roster; a run that cannot reach the
        // directory must not mutate anything.
        self.directory.connect().await?;
        let outcome = self.run_bindings(course_id, &mut report).await;
        self.release_connection().await;
        report.finish();

        outcome.map(|()| report)
    }

    /// Reconcile one user's enrollments from their directory memberships.
    ///
    /// All of the user's action lists are applied in a single transaction.
    /// When login sync is disabled this is a no-op.
    #[instrument(skip(self, external_id), fields(user_id = %user_id))]
    pub async fn sync_user(&self, user_id: Uuid, external_id: &str) -> SyncResult<SyncReport> {
        self.config.validate()?;
        let mut report = SyncReport::new();
        if !self.config.login_sync {
            report.finish();
            return Ok(report);
        }

        self.directory.connect().await?;
        let outcome = self.run_user(user_id, external_id, &mut report).await;
        self.release_connection().await;
        report.finish();

        outcome.map(|()| report)
    }

    async fn run_bindings(
        &self,
        course_id: Option<Uuid>,
        report: &mut SyncReport,
    ) -> SyncResult<()> {
        let bindings = self.roster.enabled_bindings(course_id).await?;
        info!(count = bindings.len(), "Reconciling group bindings");
        for binding in &bindings {
            self.sync_binding(binding, report).await?;
        }
        Ok(())
    }

    #[instrument(skip(self, binding, report), fields(binding_id = %binding.id, group = %binding.external_group_id))]
    async fn sync_binding(&self, binding: &GroupBinding, report: &mut SyncReport) -> SyncResult<()> {
        let Some(entries) = self.fetch_group_entries(binding, report).await? else {
            report.bindings_skipped += 1;
            return Ok(());
        };

        let expander = GroupExpander::new(self.directory.as_ref(), &self.config);
        let Expansion {
            member_refs,
            cycles_detected,
            unresolved,
        } = expander.expand(&binding.external_group_id, &entries).await?;
        report.cycles_detected += cycles_detected;
        for reference in unresolved {
            report.record(Diagnostic::UnresolvableMember { reference });
        }

        let external = self.resolve_members(&member_refs, report).await?;

        let current = match self.roster.current_membership(binding).await {
            Ok(current) => current,
            Err(err) => {
                warn!(error = %err, "Could not read current membership, skipping binding");
                report.record(Diagnostic::BindingFailed {
                    binding_id: binding.id,
                    message: err.to_string(),
                });
                report.bindings_skipped += 1;
                return Ok(());
            }
        };

        let actions = reconcile(binding, &external, &current);
        debug!(
            members = external.len(),
            enrolled = current.len(),
            actions = actions.len(),
            "Reconciled binding"
        );

        match self.roster.apply_actions(binding, &actions).await {
            Ok(applied) => {
                for external_id in &applied.unknown_members {
                    report.record(Diagnostic::UnknownLocalUser {
                        external_id: external_id.clone(),
                    });
                }
                report.applied.merge(applied);
                report.bindings_processed += 1;
            }
            Err(err) => {
                // The store rolled the whole binding back; the run goes on.
                warn!(error = %err, "Applying binding actions failed");
                report.record(Diagnostic::BindingFailed {
                    binding_id: binding.id,
                    message: err.to_string(),
                });
                report.bindings_skipped += 1;
            }
        }
        Ok(())
    }

    /// Search every group context for the binding's group, unioning the
    /// entries. `Ok(None)` means the group was found nowhere: the binding
    /// must be skipped without any removal, since a vanished group is not
    /// an empty one.
    async fn fetch_group_entries(
        &self,
        binding: &GroupBinding,
        report: &mut SyncReport,
    ) -> SyncResult<Option<Vec<DirEntry>>> {
        let filter = self.config.group_search_filter(&binding.external_group_id);
        let attrs = self.config.group_search_attrs();
        let mut entries = Vec::new();

        for context in &self.config.group_contexts {
            match self.directory.search(context, &filter, &attrs).await {
                Ok(batch) => entries.extend(batch),
                Err(err) if err.is_fatal() => return Err(err.into()),
                Err(err) => {
                    warn!(context = %context, error = %err, "Context search failed");
                    report.record(Diagnostic::ContextSkipped {
                        context: context.clone(),
                        message: err.to_string(),
                    });
                }
            }
        }

        if entries.is_empty() {
            info!(group = %binding.external_group_id, "Group not found in any context");
            report.record(Diagnostic::GroupNotFound {
                binding_id: binding.id,
                external_group_id: binding.external_group_id.clone(),
            });
            return Ok(None);
        }
        Ok(Some(entries))
    }

    /// Resolve member references to external identities, deduplicating
    /// across contexts and sub-groups.
    async fn resolve_members(
        &self,
        member_refs: &[String],
        report: &mut SyncReport,
    ) -> SyncResult<HashSet<String>> {
        let resolver = IdentityResolver::new(self.directory.as_ref(), &self.config);
        let mut external = HashSet::new();
        for member_ref in member_refs {
            match resolver.resolve(member_ref).await {
                Ok(Some(external_id)) => {
                    external.insert(external_id);
                }
                Ok(None) => report.record(Diagnostic::UnresolvableMember {
                    reference: member_ref.clone(),
                }),
                Err(SyncError::Directory(err)) if !err.is_fatal() => {
                    warn!(reference = %member_ref, error = %err, "Member resolution failed");
                    report.record(Diagnostic::UnresolvableMember {
                        reference: member_ref.clone(),
                    });
                }
                Err(err) => return Err(err),
            }
        }
        Ok(external)
    }

    async fn run_user(
        &self,
        user_id: Uuid,
        external_id: &str,
        report: &mut SyncReport,
    ) -> SyncResult<()> {
        let resolver = IdentityResolver::new(self.directory.as_ref(), &self.config);
        let member_ref = match resolver.member_reference_for(external_id).await {
            Ok(member_ref) => member_ref,
            Err(SyncError::Directory(err)) if !err.is_fatal() => None,
            Err(err) => return Err(err),
        };

        // Same fail-safe as a vanished group: a user the directory cannot
        // produce an entry for is reported and left alone, never treated
        // as having departed every group.
        let Some(member_ref) = member_ref else {
            report.record(Diagnostic::UnresolvableMember {
                reference: external_id.to_string(),
            });
            return Ok(());
        };

        let matched = self.groups_containing(&member_ref, report).await?;
        debug!(groups = matched.len(), "Directory group memberships for user");

        let group_ids: Vec<String> = matched.iter().cloned().collect();
        let member_bindings = self.roster.bindings_for_groups(&group_ids).await?;
        let existing = self.roster.enrollments_for_user(user_id).await?;

        let mut batches = Vec::new();
        let mut covered: HashSet<Uuid> = HashSet::new();
        let singleton: HashSet<String> = std::iter::once(external_id.to_string()).collect();

        for binding in member_bindings {
            covered.insert(binding.id);
            let current: Vec<Enrollment> = existing
                .iter()
                .filter(|(b, _)| b.id == binding.id)
                .map(|(_, e)| e.clone())
                .collect();
            let actions = reconcile(&binding, &singleton, &current);
            batches.push((binding, actions));
        }

        // Enrollments under bindings whose group no longer lists the user.
        let empty = HashSet::new();
        for (binding, enrollment) in existing {
            if covered.contains(&binding.id) {
                continue;
            }
            let actions = reconcile(&binding, &empty, std::slice::from_ref(&enrollment));
            batches.push((binding, actions));
        }

        let applied = self.roster.apply_user_actions(user_id, &batches).await?;
        report.bindings_processed += batches
            .iter()
            .filter(|(_, actions)| !actions.is_empty())
            .count();
        for unknown in &applied.unknown_members {
            report.record(Diagnostic::UnknownLocalUser {
                external_id: unknown.clone(),
            });
        }
        report.applied.merge(applied);
        Ok(())
    }

    /// Directory groups whose membership attribute lists `member_ref`,
    /// expanded upward through parent groups when nesting is on.
    async fn groups_containing(
        &self,
        member_ref: &str,
        report: &mut SyncReport,
    ) -> SyncResult<HashSet<String>> {
        let mut matched = HashSet::new();
        let mut visited: HashSet<String> = HashSet::new();
        let mut parents: VecDeque<String> = VecDeque::new();

        self.collect_groups(member_ref, report, &mut matched, &mut visited, &mut parents)
            .await?;

        if self.config.nested_groups && self.config.member_attribute_is_dn {
            while let Some(group_dn) = parents.pop_front() {
                self.collect_groups(&group_dn, report, &mut matched, &mut visited, &mut parents)
                    .await?;
            }
        }
        Ok(matched)
    }

    async fn collect_groups(
        &self,
        member_ref: &str,
        report: &mut SyncReport,
        matched: &mut HashSet<String>,
        visited: &mut HashSet<String>,
        parents: &mut VecDeque<String>,
    ) -> SyncResult<()> {
        let filter = self.config.groups_containing_filter(member_ref);
        let attrs = self.config.group_search_attrs();
        for context in &self.config.group_contexts {
            let entries = match self.directory.search(context, &filter, &attrs).await {
                Ok(entries) => entries,
                Err(err) if err.is_fatal() => return Err(err.into()),
                Err(err) => {
                    report.record(Diagnostic::ContextSkipped {
                        context: context.clone(),
                        message: err.to_string(),
                    });
                    continue;
                }
            };
            for entry in entries {
                let identifier = entry
                    .first(&self.config.group_attribute)
                    .map_or_else(|| entry.dn.clone(), ToString::to_string);
                if visited.insert(identifier.to_lowercase()) {
                    matched.insert(identifier);
                    parents.push_back(entry.dn);
                }
            }
        }
        Ok(())
    }

    async fn release_connection(&self) {
        if let Err(err) = self.directory.close().await {
            warn!(error = %err, "Failed to release directory connection");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{InMemoryRosterStore, MockDirectory};
    use rollcall_roster::{EnrollmentStatus, RemovalPolicy};

    const GROUPS: &str = "ou=groups,dc=example,dc=com";
    const PEOPLE: &str = "ou=people,dc=example,dc=com";

    fn config() -> SyncConfig {
        SyncConfig {
            group_contexts: vec![GROUPS.to_string()],
            user_contexts: vec![PEOPLE.to_string()],
            ..SyncConfig::default()
        }
    }

    fn binding(group: &str, policy: RemovalPolicy) -> GroupBinding {
        GroupBinding {
            id: Uuid::new_v4(),
            course_id: Uuid::new_v4(),
            external_group_id: group.to_string(),
            role_id: Uuid::new_v4(),
            removal_policy: policy,
            enabled: true,
        }
    }

    fn person_dn(uid: &str) -> String {
        format!("uid={uid},{PEOPLE}")
    }

    fn group_entry(cn: &str, member_uids: &[&str]) -> DirEntry {
        DirEntry::new(format!("cn={cn},{GROUPS}"))
            .with_attr("objectClass", vec!["top".into(), "groupOfNames".into()])
            .with_attr("cn", vec![cn.to_string()])
            .with_attr(
                "member",
                member_uids.iter().map(|uid| person_dn(uid)).collect(),
            )
    }

    fn person_entry(uid: &str) -> DirEntry {
        DirEntry::new(person_dn(uid))
            .with_attr("objectClass", vec!["inetOrgPerson".into()])
            .with_attr("uid", vec![uid.to_string()])
    }

    fn runner(
        directory: Arc<MockDirectory>,
        roster: Arc<InMemoryRosterStore>,
        config: SyncConfig,
    ) -> SyncRunner {
        SyncRunner::new(directory, roster, config)
    }

    #[tokio::test]
    async fn test_full_run_enrols_members_and_is_idempotent() {
        let directory = Arc::new(MockDirectory::new());
        let roster = Arc::new(InMemoryRosterStore::new());
        let config = config();

        let b = binding("math-101", RemovalPolicy::Unenrol);
        roster.add_binding(b.clone());
        roster.add_user("alice");
        roster.add_user("bob");

        directory.expect_search(
            GROUPS,
            &config.group_search_filter("math-101"),
            vec![group_entry("math-101", &["alice", "bob"])],
        );
        directory.insert_entry(person_entry("alice"));
        directory.insert_entry(person_entry("bob"));

        let runner = runner(directory, roster.clone(), config);

        let report = runner.sync_enrolments(None).await.unwrap();
        assert!(report.is_clean());
        assert_eq!(report.applied.enrolled, 2);
        assert_eq!(report.bindings_processed, 1);
        assert!(roster.enrollment_of(b.id, "alice").is_some());

        // Second run against the now-agreeing roster changes nothing.
        let report = runner.sync_enrolments(None).await.unwrap();
        assert!(report.is_clean());
        assert_eq!(report.applied.total(), 0);
    }

    #[tokio::test]
    async fn test_missing_group_skips_binding_without_removals() {
        let directory = Arc::new(MockDirectory::new());
        let roster = Arc::new(InMemoryRosterStore::new());

        let b = binding("vanished", RemovalPolicy::Unenrol);
        roster.add_binding(b.clone());
        roster.add_user("alice");
        roster.seed_enrollment(b.id, "alice", EnrollmentStatus::Active, true);

        let runner = runner(directory, roster.clone(), config());
        let report = runner.sync_enrolments(None).await.unwrap();

        assert_eq!(report.bindings_skipped, 1);
        assert_eq!(report.applied.total(), 0);
        assert!(matches!(
            report.diagnostics[0],
            Diagnostic::GroupNotFound { .. }
        ));
        // The enrollment survives even under the unenrol policy.
        assert!(roster.enrollment_of(b.id, "alice").is_some());
    }

    #[tokio::test]
    async fn test_failed_context_degrades_to_diagnostic() {
        let directory = Arc::new(MockDirectory::new());
        let roster = Arc::new(InMemoryRosterStore::new());
        let other = "ou=groups,ou=school2,dc=example,dc=com";
        let mut config = config();
        config.group_contexts.push(other.to_string());

        let b = binding("math-101", RemovalPolicy::Keep);
        roster.add_binding(b.clone());
        roster.add_user("alice");

        directory.fail_context(GROUPS);
        directory.expect_search(
            other,
            &config.group_search_filter("math-101"),
            vec![group_entry("math-101", &["alice"])],
        );
        directory.insert_entry(person_entry("alice"));

        let runner = runner(directory, roster.clone(), config);
        let report = runner.sync_enrolments(None).await.unwrap();

        assert_eq!(report.applied.enrolled, 1);
        assert!(matches!(
            report.diagnostics[0],
            Diagnostic::ContextSkipped { .. }
        ));
    }

    #[tokio::test]
    async fn test_binding_failure_is_isolated() {
        let directory = Arc::new(MockDirectory::new());
        let roster = Arc::new(InMemoryRosterStore::new());
        let config = config();

        let a = binding("g-a", RemovalPolicy::Keep);
        let b = binding("g-b", RemovalPolicy::Keep);
        let c = binding("g-c", RemovalPolicy::Keep);
        for (binding, uid) in [(&a, "alice"), (&b, "bob"), (&c, "carol")] {
            roster.add_binding(binding.clone());
            roster.add_user(uid);
            directory.expect_search(
                GROUPS,
                &config.group_search_filter(&binding.external_group_id),
                vec![group_entry(&binding.external_group_id, &[uid])],
            );
            directory.insert_entry(person_entry(uid));
        }
        roster.fail_binding(b.id);

        let runner = runner(directory, roster.clone(), config);
        let report = runner.sync_enrolments(None).await.unwrap();

        assert_eq!(report.bindings_processed, 2);
        assert_eq!(report.bindings_skipped, 1);
        assert_eq!(report.applied.enrolled, 2);
        assert!(roster.enrollment_of(a.id, "alice").is_some());
        assert!(roster.enrollment_of(b.id, "bob").is_none());
        assert!(roster.enrollment_of(c.id, "carol").is_some());
        assert!(report
            .diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::BindingFailed { binding_id, .. } if *binding_id == b.id)));
    }

    #[tokio::test]
    async fn test_connect_failure_aborts_before_any_mutation() {
        let directory = Arc::new(MockDirectory::new());
        let roster = Arc::new(InMemoryRosterStore::new());
        directory.fail_connect();

        let b = binding("math-101", RemovalPolicy::Unenrol);
        roster.add_binding(b.clone());
        roster.add_user("alice");
        roster.seed_enrollment(b.id, "alice", EnrollmentStatus::Active, true);

        let runner = runner(directory.clone(), roster.clone(), config());
        let result = runner.sync_enrolments(None).await;

        assert!(result.is_err());
        assert_eq!(directory.search_count(), 0);
        assert!(roster.enrollment_of(b.id, "alice").is_some());
    }

    #[tokio::test]
    async fn test_member_with_no_local_user_is_reported() {
        let directory = Arc::new(MockDirectory::new());
        let roster = Arc::new(InMemoryRosterStore::new());
        let config = config();

        let b = binding("math-101", RemovalPolicy::Keep);
        roster.add_binding(b.clone());
        roster.add_user("alice");

        directory.expect_search(
            GROUPS,
            &config.group_search_filter("math-101"),
            vec![group_entry("math-101", &["alice", "ghost"])],
        );
        directory.insert_entry(person_entry("alice"));
        directory.insert_entry(person_entry("ghost"));

        let runner = runner(directory, roster.clone(), config);
        let report = runner.sync_enrolments(None).await.unwrap();

        assert_eq!(report.applied.enrolled, 1);
        assert!(report
            .diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::UnknownLocalUser { external_id } if external_id == "ghost")));
    }

    #[tokio::test]
    async fn test_unreadable_member_entry_is_reported() {
        let directory = Arc::new(MockDirectory::new());
        let roster = Arc::new(InMemoryRosterStore::new());
        let config = config();

        let b = binding("math-101", RemovalPolicy::Keep);
        roster.add_binding(b.clone());
        roster.add_user("alice");

        directory.expect_search(
            GROUPS,
            &config.group_search_filter("math-101"),
            vec![group_entry("math-101", &["alice", "gone"])],
        );
        directory.insert_entry(person_entry("alice"));
        // No entry for uid=gone: the read resolves to nothing.

        let runner = runner(directory, roster.clone(), config);
        let report = runner.sync_enrolments(None).await.unwrap();

        assert_eq!(report.applied.enrolled, 1);
        assert!(report
            .diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::UnresolvableMember { .. })));
    }

    #[tokio::test]
    async fn test_suspend_policy_run() {
        let directory = Arc::new(MockDirectory::new());
        let roster = Arc::new(InMemoryRosterStore::new());
        let config = config();

        let b = binding("math-101", RemovalPolicy::Suspend);
        roster.add_binding(b.clone());
        roster.add_user("alice");
        roster.add_user("bob");
        roster.seed_enrollment(b.id, "alice", EnrollmentStatus::Active, true);
        roster.seed_enrollment(b.id, "bob", EnrollmentStatus::Active, true);

        // Only alice remains in the group.
        directory.expect_search(
            GROUPS,
            &config.group_search_filter("math-101"),
            vec![group_entry("math-101", &["alice"])],
        );
        directory.insert_entry(person_entry("alice"));

        let runner = runner(directory, roster.clone(), config);
        let report = runner.sync_enrolments(None).await.unwrap();

        assert_eq!(report.applied.suspended, 1);
        let bob = roster.enrollment_of(b.id, "bob").unwrap();
        assert_eq!(bob.status, EnrollmentStatus::Suspended);
        assert!(bob.has_role);
    }

    #[tokio::test]
    async fn test_sync_user_enrols_into_matched_groups() {
        let directory = Arc::new(MockDirectory::new());
        let roster = Arc::new(InMemoryRosterStore::new());
        let config = config();

        let b = binding("math-101", RemovalPolicy::Keep);
        roster.add_binding(b.clone());
        let alice = roster.add_user("alice");

        // DN lookup for alice, then the membership search.
        directory.expect_search(
            PEOPLE,
            &config.user_lookup_filter("uid", "alice"),
            vec![person_entry("alice")],
        );
        directory.expect_search(
            GROUPS,
            &config.groups_containing_filter(&person_dn("alice")),
            vec![group_entry("math-101", &["alice"])],
        );

        let runner = runner(directory, roster.clone(), config);
        let report = runner.sync_user(alice, "alice").await.unwrap();

        assert_eq!(report.applied.enrolled, 1);
        assert_eq!(report.bindings_processed, 1);
        assert!(roster.enrollment_of(b.id, "alice").is_some());

        // Re-running against the now-agreeing roster applies nothing and
        // counts no binding as processed.
        let report = runner.sync_user(alice, "alice").await.unwrap();
        assert_eq!(report.applied.total(), 0);
        assert_eq!(report.bindings_processed, 0);
    }

    #[tokio::test]
    async fn test_sync_user_without_directory_entry_never_removes() {
        let directory = Arc::new(MockDirectory::new());
        let roster = Arc::new(InMemoryRosterStore::new());

        let b = binding("math-101", RemovalPolicy::Unenrol);
        roster.add_binding(b.clone());
        let alice = roster.add_user("alice");
        roster.seed_enrollment(b.id, "alice", EnrollmentStatus::Active, true);

        // The directory has no entry for alice: the run must report her
        // and leave the enrollment untouched, even under unenrol.
        let runner = runner(directory, roster.clone(), config());
        let report = runner.sync_user(alice, "alice").await.unwrap();

        assert_eq!(report.applied.total(), 0);
        assert_eq!(report.bindings_processed, 0);
        assert!(roster.enrollment_of(b.id, "alice").is_some());
        assert!(report
            .diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::UnresolvableMember { reference } if reference == "alice")));
    }

    #[tokio::test]
    async fn test_sync_user_applies_removal_policy_when_departed() {
        let directory = Arc::new(MockDirectory::new());
        let roster = Arc::new(InMemoryRosterStore::new());
        let config = config();

        let b = binding("math-101", RemovalPolicy::Unenrol);
        roster.add_binding(b.clone());
        let alice = roster.add_user("alice");
        roster.seed_enrollment(b.id, "alice", EnrollmentStatus::Active, true);

        // Alice still has a directory entry but no group memberships.
        directory.expect_search(
            PEOPLE,
            &config.user_lookup_filter("uid", "alice"),
            vec![person_entry("alice")],
        );

        let runner = runner(directory, roster.clone(), config);
        let report = runner.sync_user(alice, "alice").await.unwrap();

        assert_eq!(report.applied.unenrolled, 1);
        assert!(roster.enrollment_of(b.id, "alice").is_none());
    }

    #[tokio::test]
    async fn test_sync_user_noop_when_login_sync_disabled() {
        let directory = Arc::new(MockDirectory::new());
        let roster = Arc::new(InMemoryRosterStore::new());
        let mut config = config();
        config.login_sync = false;

        let runner = runner(directory.clone(), roster, config);
        let report = runner.sync_user(Uuid::new_v4(), "alice").await.unwrap();

        assert!(report.is_clean());
        assert_eq!(report.applied.total(), 0);
        assert_eq!(directory.connect_count(), 0);
    }

    #[tokio::test]
    async fn test_nested_membership_reaches_parent_binding() {
        let directory = Arc::new(MockDirectory::new());
        let roster = Arc::new(InMemoryRosterStore::new());
        let mut config = config();
        config.nested_groups = true;

        // science contains the staff group; a binding exists for science.
        let b = binding("science", RemovalPolicy::Keep);
        roster.add_binding(b.clone());
        let alice = roster.add_user("alice");

        let staff_dn = format!("cn=staff,{GROUPS}");
        directory.expect_search(
            PEOPLE,
            &config.user_lookup_filter("uid", "alice"),
            vec![person_entry("alice")],
        );
        directory.expect_search(
            GROUPS,
            &config.groups_containing_filter(&person_dn("alice")),
            vec![group_entry("staff", &["alice"])],
        );
        directory.expect_search(
            GROUPS,
            &config.groups_containing_filter(&staff_dn),
            vec![DirEntry::new(format!("cn=science,{GROUPS}"))
                .with_attr("objectClass", vec!["groupOfNames".into()])
                .with_attr("cn", vec!["science".into()])
                .with_attr("member", vec![staff_dn.clone()])],
        );

        let runner = runner(directory, roster.clone(), config);
        let report = runner.sync_user(alice, "alice").await.unwrap();

        assert_eq!(report.applied.enrolled, 1);
        assert!(roster.enrollment_of(b.id, "alice").is_some());
    }
}
