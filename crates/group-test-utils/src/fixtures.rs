//! Fixtures wiring the sync engine and the reconciler to in-memory collaborators.

use std::sync::Arc;

use group_core::{DesiredGroup, DesiredStateStore, GroupReconciler, MemoryStore, ReconcileOptions};
use group_directory::{DirectoryClient, DirectoryConfig};

use crate::directory::MemoryDirectory;

/// Search base used by [`directory_config`]
pub const BASE_DN: &str = "ou=groups,dc=example,dc=org";

/// Directory settings matching the operator defaults, rooted at [`BASE_DN`].
pub fn directory_config() -> DirectoryConfig {
    DirectoryConfig {
        url: "memory://test".to_string(),
        bind_dn: "cn=operator,dc=example,dc=org".to_string(),
        bind_password: "secret".to_string(),
        search_base: BASE_DN.to_string(),
        ..DirectoryConfig::default()
    }
}

/// A client talking to `directory`.
pub fn client(directory: &MemoryDirectory) -> DirectoryClient {
    DirectoryClient::new(directory_config(), Arc::new(directory.clone()))
        .expect("fixture directory config is valid")
}

pub fn members(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

pub fn desired_group(name: &str, comment: &str, member_dns: &[&str]) -> DesiredGroup {
    DesiredGroup::new(name, comment, members(member_dns))
}

/// Install a test-writer subscriber honoring `RUST_LOG`. Safe to call from
/// every test.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A reconciler over a [`MemoryStore`] and a [`MemoryDirectory`].
///
/// # Example
///
/// ```rust,no_run
/// use group_test_utils::TestOperator;
///
/// let op = TestOperator::new();
/// op.apply("team-x", "Team X", &["uid=alice,ou=people,dc=example,dc=org"]);
/// op.reconciler().reconcile("team-x").unwrap();
/// assert_eq!(op.directory.writes().len(), 1);
/// ```
pub struct TestOperator {
    pub directory: MemoryDirectory,
    pub store: Arc<MemoryStore>,
    reconciler: GroupReconciler,
}

impl Default for TestOperator {
    fn default() -> Self {
        Self::new()
    }
}

impl TestOperator {
    pub fn new() -> Self {
        Self::with_options(ReconcileOptions::default())
    }

    pub fn with_options(options: ReconcileOptions) -> Self {
        init_test_logging();
        let directory = MemoryDirectory::new();
        let store = Arc::new(MemoryStore::new());
        let reconciler = GroupReconciler::with_options(store.clone(), client(&directory), options);
        Self {
            directory,
            store,
            reconciler,
        }
    }

    pub fn reconciler(&self) -> &GroupReconciler {
        &self.reconciler
    }

    /// Store a new desired group and return it as created.
    pub fn apply(&self, name: &str, comment: &str, member_dns: &[&str]) -> DesiredGroup {
        self.store
            .create(desired_group(name, comment, member_dns))
            .expect("fixture group can be created")
    }

    /// Current stored copy of `name`
    pub fn group(&self, name: &str) -> Option<DesiredGroup> {
        self.store.get(name).expect("memory store is readable")
    }

    /// Replace the spec of a stored group as its author would.
    pub fn edit(&self, name: &str, comment: &str, member_dns: &[&str]) -> DesiredGroup {
        let mut group = self.group(name).expect("group exists");
        group.spec.comment = comment.to_string();
        group.spec.members = members(member_dns);
        self.store.update(&group).expect("fixture edit is current")
    }

    pub fn request_deletion(&self, name: &str) -> Option<DesiredGroup> {
        self.store
            .request_deletion(name)
            .expect("fixture group exists")
    }
}
