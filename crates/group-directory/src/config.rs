//! Directory connection and group search settings

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::entry::{DESCRIPTION, OBJECT_CLASS, UNIQUE_MEMBER};
use crate::error::{Error, Result};

/// Placeholder substituted with the escaped group identity in the search filter.
pub const FILTER_PLACEHOLDER: &str = "%s";

fn default_scope() -> SearchScope {
    SearchScope::SingleLevel
}

fn default_filter() -> String {
    "(&(objectClass=groupOfUniqueNames)(cn=%s))".to_string()
}

fn default_name_attribute() -> String {
    "cn".to_string()
}

fn default_attributes() -> Vec<String> {
    vec![
        "cn".to_string(),
        DESCRIPTION.to_string(),
        OBJECT_CLASS.to_string(),
        UNIQUE_MEMBER.to_string(),
    ]
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_operation_timeout() -> u64 {
    30
}

/// Depth of the group search below the search base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SearchScope {
    /// Only the base entry itself
    #[serde(rename = "base")]
    BaseObject,

    /// Direct children of the base entry
    #[default]
    #[serde(rename = "single", alias = "one")]
    SingleLevel,

    /// The base entry and everything below it
    #[serde(rename = "sub", alias = "subtree")]
    WholeSubtree,
}

impl FromStr for SearchScope {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "base" => Ok(SearchScope::BaseObject),
            "single" | "one" => Ok(SearchScope::SingleLevel),
            "sub" | "subtree" => Ok(SearchScope::WholeSubtree),
            _ => Err(Error::invalid_config(format!(
                "unknown search scope '{}', expected 'base', 'single' or 'sub'",
                s
            ))),
        }
    }
}

impl fmt::Display for SearchScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchScope::BaseObject => write!(f, "base"),
            SearchScope::SingleLevel => write!(f, "single"),
            SearchScope::WholeSubtree => write!(f, "sub"),
        }
    }
}

/// Everything needed to reach the directory and locate group entries.
///
/// Parsed from the `[directory]` section of the operator config file and
/// overridable from the command line.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Directory URL, e.g. `ldap://ldap.example.org:389`
    #[serde(default)]
    pub url: String,

    /// DN of the service account used to bind
    #[serde(default)]
    pub bind_dn: String,

    /// Password of the service account
    #[serde(default)]
    pub bind_password: String,

    /// DN under which groups are searched and created
    #[serde(default)]
    pub search_base: String,

    #[serde(default = "default_scope")]
    pub search_scope: SearchScope,

    /// Filter template containing exactly one `%s`
    #[serde(default = "default_filter")]
    pub search_filter: String,

    /// Attribute holding the group name, used to build new DNs
    #[serde(default = "default_name_attribute")]
    pub name_attribute: String,

    /// Attributes requested on search
    #[serde(default = "default_attributes")]
    pub search_attributes: Vec<String>,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_operation_timeout")]
    pub operation_timeout_secs: u64,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            bind_dn: String::new(),
            bind_password: String::new(),
            search_base: String::new(),
            search_scope: default_scope(),
            search_filter: default_filter(),
            name_attribute: default_name_attribute(),
            search_attributes: default_attributes(),
            connect_timeout_secs: default_connect_timeout(),
            operation_timeout_secs: default_operation_timeout(),
        }
    }
}

impl fmt::Debug for DirectoryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryConfig")
            .field("url", &self.url)
            .field("bind_dn", &self.bind_dn)
            .field("bind_password", &"<redacted>")
            .field("search_base", &self.search_base)
            .field("search_scope", &self.search_scope)
            .field("search_filter", &self.search_filter)
            .field("name_attribute", &self.name_attribute)
            .field("search_attributes", &self.search_attributes)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("operation_timeout_secs", &self.operation_timeout_secs)
            .finish()
    }
}

impl DirectoryConfig {
    /// Check the settings before any connection is attempted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the URL, search base or name
    /// attribute is empty, or if the filter template does not contain
    /// exactly one `%s`.
    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(Error::invalid_config("directory url is empty"));
        }
        if self.search_base.trim().is_empty() {
            return Err(Error::invalid_config("group search base is empty"));
        }
        if self.name_attribute.trim().is_empty() {
            return Err(Error::invalid_config("group name attribute is empty"));
        }

        let placeholders = self.search_filter.matches(FILTER_PLACEHOLDER).count();
        if placeholders != 1 {
            return Err(Error::invalid_config(format!(
                "search filter '{}' must contain exactly one '{}', found {}",
                self.search_filter, FILTER_PLACEHOLDER, placeholders
            )));
        }

        Ok(())
    }

    /// Search filter for one group, with the identity escaped per RFC 4515.
    pub fn filter_for(&self, identity: &str) -> String {
        self.search_filter
            .replacen(FILTER_PLACEHOLDER, &ldap3::ldap_escape(identity), 1)
    }

    /// DN a newly created group receives: `<name_attribute>=<identity>,<search_base>`.
    pub fn group_dn(&self, identity: &str) -> String {
        format!(
            "{}={},{}",
            self.name_attribute,
            escape_dn_value(identity),
            self.search_base
        )
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }
}

/// Escape an RDN value per RFC 4514.
fn escape_dn_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    let last = value.chars().count().saturating_sub(1);

    for (i, c) in value.chars().enumerate() {
        let leading = i == 0 && (c == ' ' || c == '#');
        let trailing = i == last && c == ' ';
        match c {
            ',' | '+' | '"' | '\\' | '<' | '>' | ';' | '=' => {
                escaped.push('\\');
                escaped.push(c);
            }
            _ if leading || trailing => {
                escaped.push('\\');
                escaped.push(c);
            }
            _ => escaped.push(c),
        }
    }

    escaped
}
