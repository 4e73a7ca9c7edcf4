//! [`MemoryDirectory`]: an in-process directory implementing [`Connector`].
//!
//! Realism level: SIMULATED. Supports base/single/sub scopes, equality,
//! presence, `&`, `|` and `!` filters, returns only the requested attributes,
//! refuses attribute values that repeat ignoring case, and reports the same
//! error kinds the LDAP connector does. Every call is recorded so tests can count writes and
//! check that sessions were released.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use group_directory::{
    Attribute, Connector, DirectoryConfig, Error, RawEntry, Result, SearchRequest, SearchScope,
    Session,
};

/// One request received by the directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Search { base: String, filter: String },
    Add { dn: String, attributes: Vec<Attribute> },
    Modify { dn: String, attributes: Vec<Attribute> },
    Delete { dn: String },
}

impl Operation {
    pub fn is_write(&self) -> bool {
        !matches!(self, Operation::Search { .. })
    }
}

#[derive(Debug, Default)]
struct State {
    entries: BTreeMap<String, RawEntry>,
    operations: Vec<Operation>,
    sessions_opened: usize,
    sessions_closed: usize,
    unavailable: bool,
    rejected_writes: Option<String>,
}

/// Shared handle to an in-memory directory. Clones see the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryDirectory {
    state: Arc<Mutex<State>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Store an entry as-is, replacing any entry with the same DN.
    pub fn insert(&self, entry: RawEntry) {
        self.lock().entries.insert(entry.dn.to_lowercase(), entry);
    }

    /// Store a `groupOfUniqueNames` entry named by `cn`.
    pub fn insert_group(&self, dn: &str, description: &str, members: &[&str]) {
        let cn = dn
            .split(',')
            .next()
            .and_then(|rdn| rdn.split_once('='))
            .map(|(_, value)| value.to_string())
            .unwrap_or_default();

        let mut entry = RawEntry::new(dn)
            .with("cn", vec![cn])
            .with("objectClass", vec![group_directory::GROUP_CLASS.to_string()])
            .with(
                "uniqueMember",
                members.iter().map(|m| m.to_string()).collect(),
            );
        if !description.is_empty() {
            entry = entry.with("description", vec![description.to_string()]);
        }
        self.insert(entry);
    }

    pub fn entry(&self, dn: &str) -> Option<RawEntry> {
        self.lock().entries.get(&dn.to_lowercase()).cloned()
    }

    pub fn entries(&self) -> Vec<RawEntry> {
        self.lock().entries.values().cloned().collect()
    }

    pub fn operations(&self) -> Vec<Operation> {
        self.lock().operations.clone()
    }

    /// Adds, modifies and deletes received so far
    pub fn writes(&self) -> Vec<Operation> {
        self.lock()
            .operations
            .iter()
            .filter(|op| op.is_write())
            .cloned()
            .collect()
    }

    pub fn clear_operations(&self) {
        self.lock().operations.clear();
    }

    pub fn sessions_opened(&self) -> usize {
        self.lock().sessions_opened
    }

    /// Sessions opened but not yet released
    pub fn open_sessions(&self) -> usize {
        let state = self.lock();
        state.sessions_opened - state.sessions_closed
    }

    /// Refuse every connection while `unavailable` is set.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    /// Reject every add/modify/delete with `reason`, or accept them again with `None`.
    pub fn reject_writes(&self, reason: Option<&str>) {
        self.lock().rejected_writes = reason.map(str::to_string);
    }
}

impl Connector for MemoryDirectory {
    fn connect(&self, config: &DirectoryConfig) -> Result<Box<dyn Session>> {
        let mut state = self.lock();
        if state.unavailable {
            return Err(Error::unavailable(&config.url, "connection refused"));
        }
        state.sessions_opened += 1;
        Ok(Box::new(MemorySession {
            state: Arc::clone(&self.state),
            url: config.url.clone(),
        }))
    }
}

struct MemorySession {
    state: Arc<Mutex<State>>,
    url: String,
}

impl MemorySession {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }
}

fn check_writable(state: &State, dn: &str) -> Result<()> {
    match &state.rejected_writes {
        Some(reason) => Err(Error::write_failed(dn, reason)),
        None => Ok(()),
    }
}

/// Refuse an attribute that lists the same value twice ignoring case.
fn check_values_unique(dn: &str, attributes: &[Attribute]) -> Result<()> {
    for attr in attributes {
        let mut seen = std::collections::HashSet::new();
        if let Some(repeated) = attr.values.iter().find(|v| !seen.insert(v.to_lowercase())) {
            return Err(Error::write_failed(
                dn,
                format!("rc=20 attributeOrValueExists: {} '{}'", attr.name, repeated),
            ));
        }
    }
    Ok(())
}

/// Copy of `entry` holding only the requested attributes. An empty request
/// or `*` returns everything.
fn project(entry: &RawEntry, requested: &[String]) -> RawEntry {
    if requested.is_empty() || requested.iter().any(|name| name == "*") {
        return entry.clone();
    }
    RawEntry {
        dn: entry.dn.clone(),
        attributes: entry
            .attributes
            .iter()
            .filter(|(name, _)| requested.iter().any(|r| r.eq_ignore_ascii_case(name)))
            .map(|(name, values)| (name.clone(), values.clone()))
            .collect(),
    }
}

impl Session for MemorySession {
    fn search(&mut self, request: &SearchRequest) -> Result<Vec<RawEntry>> {
        let mut state = self.lock();
        state.operations.push(Operation::Search {
            base: request.base.clone(),
            filter: request.filter.clone(),
        });

        let filter = Filter::parse(&request.filter).ok_or_else(|| {
            Error::search_rejected(
                &request.base,
                format!("rc=87 bad search filter '{}'", request.filter),
            )
        })?;

        let base = request.base.to_lowercase();
        Ok(state
            .entries
            .iter()
            .filter(|(dn, _)| in_scope(dn, &base, request.scope))
            .filter(|(_, entry)| filter.matches(entry))
            .map(|(_, entry)| project(entry, &request.attributes))
            .collect())
    }

    fn add(&mut self, dn: &str, attributes: &[Attribute]) -> Result<()> {
        let mut state = self.lock();
        state.operations.push(Operation::Add {
            dn: dn.to_string(),
            attributes: attributes.to_vec(),
        });
        check_writable(&state, dn)?;
        check_values_unique(dn, attributes)?;

        let key = dn.to_lowercase();
        if state.entries.contains_key(&key) {
            return Err(Error::write_failed(dn, "entry already exists"));
        }

        let mut entry = RawEntry::new(dn);
        if let Some((name, value)) = dn.split(',').next().and_then(|rdn| rdn.split_once('=')) {
            entry = entry.with(name, vec![value.to_string()]);
        }
        for attr in attributes {
            entry = entry.with(attr.name.clone(), attr.values.clone());
        }
        state.entries.insert(key, entry);
        Ok(())
    }

    fn modify(&mut self, dn: &str, replacements: &[Attribute]) -> Result<()> {
        let mut state = self.lock();
        state.operations.push(Operation::Modify {
            dn: dn.to_string(),
            attributes: replacements.to_vec(),
        });
        check_writable(&state, dn)?;
        check_values_unique(dn, replacements)?;

        let entry = state
            .entries
            .get_mut(&dn.to_lowercase())
            .ok_or_else(|| Error::GroupNotFound {
                identity: dn.to_string(),
            })?;

        for attr in replacements {
            entry
                .attributes
                .retain(|name, _| !name.eq_ignore_ascii_case(&attr.name));
            if !attr.values.is_empty() {
                entry
                    .attributes
                    .insert(attr.name.clone(), attr.values.clone());
            }
        }
        Ok(())
    }

    fn delete(&mut self, dn: &str) -> Result<()> {
        let mut state = self.lock();
        state.operations.push(Operation::Delete { dn: dn.to_string() });
        check_writable(&state, dn)?;

        state
            .entries
            .remove(&dn.to_lowercase())
            .map(|_| ())
            .ok_or_else(|| Error::GroupNotFound {
                identity: dn.to_string(),
            })
    }
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            state.sessions_closed += 1;
        }
    }
}

fn parent(dn: &str) -> Option<&str> {
    let bytes = dn.as_bytes();
    (0..bytes.len())
        .find(|&i| bytes[i] == b',' && (i == 0 || bytes[i - 1] != b'\\'))
        .map(|i| &dn[i + 1..])
}

fn in_scope(dn: &str, base: &str, scope: SearchScope) -> bool {
    match scope {
        SearchScope::BaseObject => dn == base,
        SearchScope::SingleLevel => parent(dn) == Some(base),
        SearchScope::WholeSubtree => dn == base || dn.ends_with(&format!(",{}", base)),
    }
}

enum Filter {
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    Equal(String, String),
    Present(String),
}

impl Filter {
    fn parse(input: &str) -> Option<Filter> {
        let (filter, rest) = Self::component(input.trim())?;
        rest.is_empty().then_some(filter)
    }

    fn component(input: &str) -> Option<(Filter, &str)> {
        let body = input.strip_prefix('(')?;
        let op = body.chars().next()?;
        match op {
            '&' | '|' => {
                let mut rest = &body[1..];
                let mut parts = Vec::new();
                while !rest.starts_with(')') {
                    let (part, remaining) = Self::component(rest)?;
                    parts.push(part);
                    rest = remaining;
                }
                let filter = if op == '&' {
                    Filter::And(parts)
                } else {
                    Filter::Or(parts)
                };
                Some((filter, &rest[1..]))
            }
            '!' => {
                let (inner, rest) = Self::component(&body[1..])?;
                Some((Filter::Not(Box::new(inner)), rest.strip_prefix(')')?))
            }
            _ => {
                let end = body.find(')')?;
                let (name, value) = body[..end].split_once('=')?;
                let filter = if value == "*" {
                    Filter::Present(name.to_string())
                } else {
                    Filter::Equal(name.to_string(), unescape(value))
                };
                Some((filter, &body[end + 1..]))
            }
        }
    }

    fn matches(&self, entry: &RawEntry) -> bool {
        match self {
            Filter::And(parts) => parts.iter().all(|f| f.matches(entry)),
            Filter::Or(parts) => parts.iter().any(|f| f.matches(entry)),
            Filter::Not(inner) => !inner.matches(entry),
            Filter::Equal(name, value) => entry
                .values(name)
                .iter()
                .any(|v| v.eq_ignore_ascii_case(value)),
            Filter::Present(name) => !entry.values(name).is_empty(),
        }
    }
}

/// Decode `\XX` escapes in a filter assertion value.
fn unescape(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\'
            && let Some(hex) = value.get(i + 1..i + 3)
            && let Ok(byte) = u8::from_str_radix(hex, 16)
        {
            out.push(byte);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_matches_nested_terms() {
        let entry = RawEntry::new("cn=team-x,ou=groups,dc=example,dc=org")
            .with("cn", vec!["team-x".to_string()])
            .with("objectClass", vec!["groupOfUniqueNames".to_string()]);

        let filter = Filter::parse("(&(objectClass=groupOfUniqueNames)(cn=TEAM-X))").unwrap();
        assert!(filter.matches(&entry));

        let filter = Filter::parse("(&(objectClass=*)(!(cn=team-x)))").unwrap();
        assert!(!filter.matches(&entry));

        assert!(Filter::parse("(cn=team-x").is_none());
    }

    #[test]
    fn unescape_decodes_hex_pairs() {
        assert_eq!(unescape("a\\2a\\29"), "a*)");
        assert_eq!(unescape("plain"), "plain");
    }

    #[test]
    fn search_returns_only_requested_attributes() {
        let entry = RawEntry::new("cn=team-x,ou=groups")
            .with("cn", vec!["team-x".to_string()])
            .with("uniqueMember", vec!["uid=a".to_string()]);

        let narrowed = project(&entry, &["CN".to_string()]);
        assert_eq!(narrowed.values("cn"), ["team-x"]);
        assert!(narrowed.values("uniqueMember").is_empty());

        assert_eq!(project(&entry, &[]), entry);
        assert_eq!(project(&entry, &["*".to_string()]), entry);
    }

    #[test]
    fn values_repeating_ignoring_case_are_refused() {
        let attrs = vec![Attribute::new(
            "uniqueMember",
            vec!["uid=Alice".to_string(), "uid=alice".to_string()],
        )];
        assert!(matches!(
            check_values_unique("cn=x", &attrs),
            Err(Error::DirectoryWriteFailed { .. })
        ));
    }

    #[test]
    fn scopes_follow_dn_hierarchy() {
        let base = "ou=groups,dc=example,dc=org";
        assert!(in_scope(base, base, SearchScope::BaseObject));
        assert!(in_scope("cn=a,ou=groups,dc=example,dc=org", base, SearchScope::SingleLevel));
        assert!(!in_scope("cn=a,ou=x,ou=groups,dc=example,dc=org", base, SearchScope::SingleLevel));
        assert!(in_scope("cn=a,ou=x,ou=groups,dc=example,dc=org", base, SearchScope::WholeSubtree));
    }
}
