//! In-memory doubles for the directory and roster seams.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use rollcall_directory::{DirEntry, DirectoryClient, DirectoryError, DirectoryResult};
use rollcall_roster::{
    Action, AppliedActions, Enrollment, EnrollmentStatus, GroupBinding, RosterError,
    RosterResult, RosterStore,
};
use uuid::Uuid;

/// Scripted directory: exact `(context, filter)` search expectations plus
/// a DN-keyed entry map for reads.
#[derive(Default)]
pub struct MockDirectory {
    searches: Mutex<HashMap<(String, String), Vec<DirEntry>>>,
    entries: Mutex<HashMap<String, DirEntry>>,
    failing_contexts: Mutex<HashSet<String>>,
    fail_connect: Mutex<bool>,
    connect_count: AtomicUsize,
    search_count: AtomicUsize,
    read_count: AtomicUsize,
}

impl MockDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the result of one exact search.
    pub fn expect_search(&self, context: &str, filter: &str, results: Vec<DirEntry>) {
        self.searches
            .lock()
            .unwrap()
            .insert((context.to_string(), filter.to_string()), results);
    }

    /// Make an entry readable by DN.
    pub fn insert_entry(&self, entry: DirEntry) {
        self.entries.lock().unwrap().insert(entry.dn.clone(), entry);
    }

    /// Make every search against `context` fail.
    pub fn fail_context(&self, context: &str) {
        self.failing_contexts
            .lock()
            .unwrap()
            .insert(context.to_string());
    }

    /// Make `connect` fail.
    pub fn fail_connect(&self) {
        *self.fail_connect.lock().unwrap() = true;
    }

    pub fn connect_count(&self) -> usize {
        self.connect_count.load(Ordering::SeqCst)
    }

    pub fn search_count(&self) -> usize {
        self.search_count.load(Ordering::SeqCst)
    }

    pub fn read_count(&self) -> usize {
        self.read_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DirectoryClient for MockDirectory {
    async fn connect(&self) -> DirectoryResult<()> {
        self.connect_count.fetch_add(1, Ordering::SeqCst);
        if *self.fail_connect.lock().unwrap() {
            return Err(DirectoryError::connection_failed("injected"));
        }
        Ok(())
    }

    async fn search(
        &self,
        context: &str,
        filter: &str,
        _attrs: &[&str],
    ) -> DirectoryResult<Vec<DirEntry>> {
        self.search_count.fetch_add(1, Ordering::SeqCst);
        if self.failing_contexts.lock().unwrap().contains(context) {
            return Err(DirectoryError::SearchFailed {
                context: context.to_string(),
                message: "injected".to_string(),
                source: None,
            });
        }
        Ok(self
            .searches
            .lock()
            .unwrap()
            .get(&(context.to_string(), filter.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn read(
        &self,
        dn: &str,
        _filter: &str,
        _attrs: &[&str],
    ) -> DirectoryResult<Option<DirEntry>> {
        self.read_count.fetch_add(1, Ordering::SeqCst);
        Ok(self.entries.lock().unwrap().get(dn).cloned())
    }

    async fn close(&self) -> DirectoryResult<()> {
        Ok(())
    }
}

/// In-memory roster with per-binding failure injection.
#[derive(Default)]
pub struct InMemoryRosterStore {
    bindings: Mutex<Vec<GroupBinding>>,
    users_by_external: Mutex<HashMap<String, Uuid>>,
    externals_by_user: Mutex<HashMap<Uuid, String>>,
    enrollments: Mutex<HashMap<(Uuid, Uuid), Enrollment>>,
    failing_bindings: Mutex<HashSet<Uuid>>,
}

impl InMemoryRosterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_binding(&self, binding: GroupBinding) {
        self.bindings.lock().unwrap().push(binding);
    }

    pub fn add_user(&self, external_id: &str) -> Uuid {
        let user_id = Uuid::new_v4();
        self.users_by_external
            .lock()
            .unwrap()
            .insert(external_id.to_string(), user_id);
        self.externals_by_user
            .lock()
            .unwrap()
            .insert(user_id, external_id.to_string());
        user_id
    }

    pub fn user_id(&self, external_id: &str) -> Option<Uuid> {
        self.users_by_external.lock().unwrap().get(external_id).copied()
    }

    /// Seed an enrollment for an already-added user.
    pub fn seed_enrollment(
        &self,
        binding_id: Uuid,
        external_id: &str,
        status: EnrollmentStatus,
        has_role: bool,
    ) {
        let user_id = self.user_id(external_id).expect("user not added");
        self.enrollments.lock().unwrap().insert(
            (binding_id, user_id),
            Enrollment {
                user_id,
                external_id: external_id.to_string(),
                status,
                has_role,
            },
        );
    }

    /// Make `apply_actions` fail for this binding.
    pub fn fail_binding(&self, binding_id: Uuid) {
        self.failing_bindings.lock().unwrap().insert(binding_id);
    }

    pub fn enrollment_of(&self, binding_id: Uuid, external_id: &str) -> Option<Enrollment> {
        let user_id = self.user_id(external_id)?;
        self.enrollments
            .lock()
            .unwrap()
            .get(&(binding_id, user_id))
            .cloned()
    }

    pub fn enrollment_count(&self, binding_id: Uuid) -> usize {
        self.enrollments
            .lock()
            .unwrap()
            .keys()
            .filter(|(b, _)| *b == binding_id)
            .count()
    }

    fn apply_one(
        &self,
        binding: &GroupBinding,
        action: &Action,
        applied: &mut AppliedActions,
    ) {
        let mut enrollments = self.enrollments.lock().unwrap();
        match action {
            Action::Enrol { external_id } => {
                let Some(user_id) = self.user_id(external_id) else {
                    applied.unknown_members.push(external_id.clone());
                    return;
                };
                enrollments.insert(
                    (binding.id, user_id),
                    Enrollment {
                        user_id,
                        external_id: external_id.clone(),
                        status: EnrollmentStatus::Active,
                        has_role: true,
                    },
                );
                applied.enrolled += 1;
            }
            Action::Reactivate { user_id } => {
                if let Some(e) = enrollments.get_mut(&(binding.id, *user_id)) {
                    e.status = EnrollmentStatus::Active;
                }
                applied.reactivated += 1;
            }
            Action::AssignRole { user_id } => {
                if let Some(e) = enrollments.get_mut(&(binding.id, *user_id)) {
                    e.has_role = true;
                }
                applied.roles_assigned += 1;
            }
            Action::Suspend { user_id } => {
                if let Some(e) = enrollments.get_mut(&(binding.id, *user_id)) {
                    e.status = EnrollmentStatus::Suspended;
                }
                applied.suspended += 1;
            }
            Action::Unenrol { user_id } => {
                enrollments.remove(&(binding.id, *user_id));
                applied.unenrolled += 1;
            }
            Action::UnassignRole { user_id } => {
                if let Some(e) = enrollments.get_mut(&(binding.id, *user_id)) {
                    e.has_role = false;
                }
                applied.roles_unassigned += 1;
            }
        }
    }
}

#[async_trait]
impl RosterStore for InMemoryRosterStore {
    async fn enabled_bindings(&self, course_id: Option<Uuid>) -> RosterResult<Vec<GroupBinding>> {
        Ok(self
            .bindings
            .lock()
            .unwrap()
            .iter()
            .filter(|b| b.enabled && course_id.map_or(true, |c| b.course_id == c))
            .cloned()
            .collect())
    }

    async fn bindings_for_groups(&self, group_ids: &[String]) -> RosterResult<Vec<GroupBinding>> {
        Ok(self
            .bindings
            .lock()
            .unwrap()
            .iter()
            .filter(|b| b.enabled && group_ids.contains(&b.external_group_id))
            .cloned()
            .collect())
    }

    async fn current_membership(&self, binding: &GroupBinding) -> RosterResult<Vec<Enrollment>> {
        let mut members: Vec<Enrollment> = self
            .enrollments
            .lock()
            .unwrap()
            .iter()
            .filter(|((b, _), _)| *b == binding.id)
            .map(|(_, e)| e.clone())
            .collect();
        members.sort_by_key(|e| e.user_id);
        Ok(members)
    }

    async fn enrollments_for_user(
        &self,
        user_id: Uuid,
    ) -> RosterResult<Vec<(GroupBinding, Enrollment)>> {
        let bindings = self.bindings.lock().unwrap();
        Ok(self
            .enrollments
            .lock()
            .unwrap()
            .iter()
            .filter(|((_, u), _)| *u == user_id)
            .filter_map(|((b, _), e)| {
                bindings
                    .iter()
                    .find(|binding| binding.id == *b && binding.enabled)
                    .map(|binding| (binding.clone(), e.clone()))
            })
            .collect())
    }

    async fn apply_actions(
        &self,
        binding: &GroupBinding,
        actions: &[Action],
    ) -> RosterResult<AppliedActions> {
        if self.failing_bindings.lock().unwrap().contains(&binding.id) {
            return Err(RosterError::Database("injected".to_string()));
        }
        let mut applied = AppliedActions::default();
        for action in actions {
            self.apply_one(binding, action, &mut applied);
        }
        Ok(applied)
    }

    async fn apply_user_actions(
        &self,
        _user_id: Uuid,
        batches: &[(GroupBinding, Vec<Action>)],
    ) -> RosterResult<AppliedActions> {
        let mut applied = AppliedActions::default();
        for (binding, actions) in batches {
            if self.failing_bindings.lock().unwrap().contains(&binding.id) {
                return Err(RosterError::Database("injected".to_string()));
            }
            for action in actions {
                self.apply_one(binding, action, &mut applied);
            }
        }
        Ok(applied)
    }
}
