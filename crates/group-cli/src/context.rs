//! Runtime context shared by commands
//!
//! Resolves the operator configuration (file, then environment and flags on
//! top) and builds the store, directory client and reconciler from it.

use std::sync::Arc;

use group_core::{
    Controller, DesiredStateStore, FileStore, GroupReconciler, OperatorConfig, SchemeRegistry,
};
use group_directory::DirectoryClient;
use tracing::debug;

use crate::cli::Cli;
use crate::error::Result;

/// Resolved configuration plus the scheme registry built at startup
pub struct Context {
    pub config: OperatorConfig,
    scheme: Arc<SchemeRegistry>,
}

impl Context {
    /// Load the configuration and apply command-line overrides.
    pub fn load(cli: &Cli) -> Result<Self> {
        let mut config = OperatorConfig::resolve(cli.config.as_deref())?;
        apply_overrides(&mut config, cli);
        debug!(directory = ?config.directory, store = %config.controller.store_dir.display(), "Resolved configuration");
        Ok(Self::new(config))
    }

    pub fn new(config: OperatorConfig) -> Self {
        Self {
            config,
            scheme: Arc::new(SchemeRegistry::with_groups()),
        }
    }

    pub fn scheme(&self) -> &SchemeRegistry {
        &self.scheme
    }

    pub fn store(&self) -> Result<Arc<FileStore>> {
        let store = FileStore::open(&self.config.controller.store_dir, self.scheme.clone())?;
        Ok(Arc::new(store))
    }

    pub fn directory(&self) -> Result<DirectoryClient> {
        Ok(DirectoryClient::ldap(self.config.directory.clone())?)
    }

    pub fn reconciler(&self) -> Result<GroupReconciler> {
        let store: Arc<dyn DesiredStateStore> = self.store()?;
        Ok(GroupReconciler::with_options(
            store,
            self.directory()?,
            self.config.controller.reconcile_options(),
        ))
    }

    pub fn controller(&self) -> Result<Controller> {
        Ok(Controller::new(
            self.reconciler()?,
            self.config.controller.controller_options(),
        ))
    }
}

fn apply_overrides(config: &mut OperatorConfig, cli: &Cli) {
    let args = &cli.directory;
    let directory = &mut config.directory;

    if let Some(url) = &args.ldap_url {
        directory.url = url.clone();
    }
    if let Some(bind_dn) = &args.bind_dn {
        directory.bind_dn = bind_dn.clone();
    }
    if let Some(password) = &args.bind_password {
        directory.bind_password = password.clone();
    }
    if let Some(base) = &args.group_search_base {
        directory.search_base = base.clone();
    }
    if let Some(scope) = args.group_search_scope {
        directory.search_scope = scope;
    }
    if let Some(filter) = &args.group_search_filter {
        directory.search_filter = filter.clone();
    }
    if let Some(name) = &args.group_name_property {
        directory.name_attribute = name.clone();
    }
    if !args.group_search_attributes.is_empty() {
        directory.search_attributes = args.group_search_attributes.clone();
    }
    if let Some(store_dir) = &cli.store_dir {
        config.controller.store_dir = store_dir.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use group_directory::SearchScope;
    use std::path::PathBuf;

    #[test]
    fn flags_override_file_values() {
        let mut config = OperatorConfig::parse(
            r#"
[directory]
url = "ldap://from-file"
search_base = "ou=groups,dc=example,dc=org"

[controller]
store_dir = "/var/lib/groups"
"#,
        )
        .unwrap();

        let cli = Cli::parse_from([
            "groupctl",
            "--ldap-url",
            "ldap://from-flag",
            "--group-search-scope",
            "base",
            "--store-dir",
            "/tmp/groups",
            "status",
        ]);
        apply_overrides(&mut config, &cli);

        assert_eq!(config.directory.url, "ldap://from-flag");
        assert_eq!(config.directory.search_base, "ou=groups,dc=example,dc=org");
        assert_eq!(config.directory.search_scope, SearchScope::BaseObject);
        assert_eq!(config.controller.store_dir, PathBuf::from("/tmp/groups"));
    }

    #[test]
    fn unset_flags_keep_file_values() {
        let mut config = OperatorConfig::default();
        let before = config.clone();
        let cli = Cli::parse_from(["groupctl", "status"]);

        apply_overrides(&mut config, &cli);
        // Environment may supply values in CI; only check the untouched list
        assert_eq!(config.directory.search_attributes, before.directory.search_attributes);
    }
}
