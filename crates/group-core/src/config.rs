//! Operator configuration
//!
//! Loaded from a TOML file with a `[directory]` and a `[controller]` section.
//! Every key is optional; missing keys take the defaults below, and the CLI
//! applies its flags on top of the loaded file.
//!
//! ```toml
//! [directory]
//! url = "ldap://ldap.example.org:389"
//! bind_dn = "cn=operator,dc=example,dc=org"
//! bind_password = "secret"
//! search_base = "ou=groups,dc=example,dc=org"
//! search_scope = "single"
//!
//! [controller]
//! store_dir = "/var/lib/group-operator/groups"
//! poll_interval_secs = 30
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use group_directory::DirectoryConfig;
use serde::{Deserialize, Serialize};

use crate::controller::ControllerOptions;
use crate::reconciler::ReconcileOptions;
use crate::{Error, Result};

const APP_DIR: &str = "group-operator";
const CONFIG_FILE: &str = "config.toml";

fn default_store_dir() -> PathBuf {
    PathBuf::from("groups")
}

fn default_poll_interval() -> u64 {
    30
}

fn default_max_conflict_retries() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    500
}

fn default_max_backoff_secs() -> u64 {
    300
}

fn default_slow_retry_secs() -> u64 {
    600
}

/// `[controller]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Directory holding one TOML document per desired group
    #[serde(default = "default_store_dir")]
    pub store_dir: PathBuf,

    /// Seconds between passes over the store
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Refetch-and-retry attempts after a persist conflict
    #[serde(default = "default_max_conflict_retries")]
    pub max_conflict_retries: u32,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff_secs")]
    pub max_backoff_secs: u64,

    /// Minimum delay before retrying failures that need an operator to fix
    #[serde(default = "default_slow_retry_secs")]
    pub slow_retry_secs: u64,

    /// Set `Configured=True` when a pass finds the group already in sync.
    #[serde(default)]
    pub mark_configured_when_settled: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            store_dir: default_store_dir(),
            poll_interval_secs: default_poll_interval(),
            max_conflict_retries: default_max_conflict_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_secs: default_max_backoff_secs(),
            slow_retry_secs: default_slow_retry_secs(),
            mark_configured_when_settled: false,
        }
    }
}

impl ControllerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn reconcile_options(&self) -> ReconcileOptions {
        ReconcileOptions {
            max_conflict_retries: self.max_conflict_retries,
            mark_configured_when_settled: self.mark_configured_when_settled,
        }
    }

    pub fn controller_options(&self) -> ControllerOptions {
        ControllerOptions {
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_secs(self.max_backoff_secs),
            slow_retry: Duration::from_secs(self.slow_retry_secs),
        }
    }
}

/// Complete operator configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OperatorConfig {
    #[serde(default)]
    pub directory: DirectoryConfig,

    #[serde(default)]
    pub controller: ControllerConfig,
}

impl OperatorConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("cannot read {}: {}", path.display(), e),
        })?;
        Self::parse(&content).map_err(|e| Error::Config {
            message: format!("invalid {}: {}", path.display(), e),
        })
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Platform config file location, e.g. `~/.config/group-operator/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Load `path` if given, else the platform config file if it exists, else defaults.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use group_directory::SearchScope;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_file_uses_defaults() {
        let config = OperatorConfig::parse("").unwrap();
        assert_eq!(config, OperatorConfig::default());
        assert_eq!(config.controller.max_conflict_retries, 3);
        assert!(!config.controller.mark_configured_when_settled);
    }

    #[test]
    fn sections_override_defaults() {
        let config = OperatorConfig::parse(
            r#"
[directory]
url = "ldap://ldap.example.org"
search_base = "ou=groups,dc=example,dc=org"
search_scope = "sub"

[controller]
store_dir = "/tmp/groups"
poll_interval_secs = 5
"#,
        )
        .unwrap();

        assert_eq!(config.directory.search_scope, SearchScope::WholeSubtree);
        assert_eq!(config.directory.name_attribute, "cn");
        assert_eq!(config.controller.store_dir, PathBuf::from("/tmp/groups"));
        assert_eq!(config.controller.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.controller.slow_retry_secs, 600);
    }

    #[test]
    fn unreadable_file_is_config_error() {
        let err = OperatorConfig::load(Path::new("/nonexistent/group-operator.toml")).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }
}
