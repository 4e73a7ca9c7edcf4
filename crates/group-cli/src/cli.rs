//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use group_directory::SearchScope;

/// Group operator - keep LDAP groups in line with declarative definitions
#[derive(Parser, Debug)]
#[command(name = "groupctl")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (defaults to the platform config directory)
    #[arg(short, long, global = true, env = "GROUPCTL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding desired group documents
    #[arg(long, global = true, env = "GROUPCTL_STORE_DIR")]
    pub store_dir: Option<PathBuf>,

    #[command(flatten)]
    pub directory: DirectoryArgs,

    /// The command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Directory settings overriding the configuration file
#[derive(Args, Debug, Clone, Default)]
pub struct DirectoryArgs {
    /// LDAP server URL, e.g. ldap://ldap.example.org:389
    #[arg(long, global = true, env = "GROUPCTL_LDAP_URL")]
    pub ldap_url: Option<String>,

    /// DN to bind as
    #[arg(long, global = true, env = "GROUPCTL_BIND_DN")]
    pub bind_dn: Option<String>,

    /// Password for the bind DN
    #[arg(long, global = true, env = "GROUPCTL_BIND_PASSWORD", hide_env_values = true)]
    pub bind_password: Option<String>,

    /// Base DN groups are searched under and created in
    #[arg(long, global = true, env = "GROUPCTL_GROUP_SEARCH_BASE")]
    pub group_search_base: Option<String>,

    /// Search scope: base, single or sub
    #[arg(long, global = true, env = "GROUPCTL_GROUP_SEARCH_SCOPE")]
    pub group_search_scope: Option<SearchScope>,

    /// Search filter with a single %s for the group name
    #[arg(long, global = true, env = "GROUPCTL_GROUP_SEARCH_FILTER")]
    pub group_search_filter: Option<String>,

    /// Attribute naming the group in its DN
    #[arg(long, global = true, env = "GROUPCTL_GROUP_NAME_PROPERTY")]
    pub group_name_property: Option<String>,

    /// Attribute to request when searching (repeatable or comma-separated)
    #[arg(
        long = "group-search-attribute",
        global = true,
        env = "GROUPCTL_GROUP_SEARCH_ATTRIBUTES",
        value_delimiter = ','
    )]
    pub group_search_attributes: Vec<String>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Create or update a desired group from a TOML document
    ///
    /// Examples:
    ///   groupctl apply team-x.toml
    Apply {
        /// Path to the group document
        file: PathBuf,
    },

    /// Request deletion of a desired group
    ///
    /// The directory group is removed on the next reconcile, after which the
    /// document disappears from the store.
    Delete {
        /// Group identity
        identity: String,
    },

    /// Reconcile one group now
    Reconcile {
        /// Group identity
        identity: String,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Run the controller loop over every stored group
    Run {
        /// Make a single pass and exit
        #[arg(long)]
        once: bool,

        /// Stop after this many passes
        #[arg(long, conflicts_with = "once")]
        max_ticks: Option<u64>,
    },

    /// Show how a directory group differs from its desired state
    Check {
        /// Group identity
        identity: String,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// List stored groups with their lifecycle phase and conditions
    Status {
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_overrides_parse_after_subcommand() {
        let cli = Cli::parse_from([
            "groupctl",
            "status",
            "--ldap-url",
            "ldap://localhost",
            "--group-search-scope",
            "sub",
            "--group-search-attribute",
            "cn",
            "--group-search-attribute",
            "member",
        ]);

        assert_eq!(cli.command, Commands::Status { json: false });
        assert_eq!(cli.directory.ldap_url.as_deref(), Some("ldap://localhost"));
        assert_eq!(cli.directory.group_search_scope, Some(SearchScope::WholeSubtree));
        assert_eq!(cli.directory.group_search_attributes, vec!["cn", "member"]);
    }

    #[test]
    fn search_attributes_accept_comma_lists_and_env() {
        let cli = Cli::parse_from([
            "groupctl",
            "status",
            "--group-search-attribute",
            "cn,uniqueMember",
        ]);
        assert_eq!(cli.directory.group_search_attributes, vec!["cn", "uniqueMember"]);

        let command = Cli::command();
        let arg = command
            .get_arguments()
            .find(|arg| arg.get_id() == "group_search_attributes")
            .unwrap();
        assert_eq!(
            arg.get_env(),
            Some(std::ffi::OsStr::new("GROUPCTL_GROUP_SEARCH_ATTRIBUTES"))
        );
    }

    #[test]
    fn unknown_scope_is_rejected() {
        assert!(Cli::try_parse_from(["groupctl", "status", "--group-search-scope", "deep"]).is_err());
    }

    #[test]
    fn once_conflicts_with_max_ticks() {
        assert!(Cli::try_parse_from(["groupctl", "run", "--once", "--max-ticks", "2"]).is_err());
    }
}
