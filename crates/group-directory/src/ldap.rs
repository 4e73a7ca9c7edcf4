//! LDAP connector backed by the synchronous `ldap3` client

use std::collections::HashSet;
use std::time::Duration;

use ldap3::{LdapConn, LdapConnSettings, LdapError, Mod, Scope, SearchEntry};
use tracing::{debug, warn};

use crate::config::{DirectoryConfig, SearchScope};
use crate::entry::{Attribute, RawEntry};
use crate::error::{Error, Result};
use crate::session::{Connector, SearchRequest, Session};

/// Result code the directory returns for a missing entry.
const NO_SUCH_OBJECT: u32 = 32;

/// Opens sessions against a real directory server.
#[derive(Debug, Clone, Copy, Default)]
pub struct LdapConnector;

impl Connector for LdapConnector {
    fn connect(&self, config: &DirectoryConfig) -> Result<Box<dyn Session>> {
        let settings = LdapConnSettings::new().set_conn_timeout(config.connect_timeout());
        let mut conn = LdapConn::with_settings(settings, &config.url)
            .map_err(|e| Error::unavailable(&config.url, e))?;

        let bound = conn
            .with_timeout(config.operation_timeout())
            .simple_bind(&config.bind_dn, &config.bind_password)
            .and_then(|result| result.success());

        if let Err(e) = bound {
            let _ = conn.unbind();
            return Err(Error::unavailable(
                &config.url,
                format!("bind as '{}' failed: {}", config.bind_dn, e),
            ));
        }

        debug!(url = %config.url, bind_dn = %config.bind_dn, "Bound to directory");

        Ok(Box::new(LdapSession {
            conn,
            url: config.url.clone(),
            timeout: config.operation_timeout(),
        }))
    }
}

struct LdapSession {
    conn: LdapConn,
    url: String,
    timeout: Duration,
}

/// Map a failed add, modify or delete on `dn`.
///
/// A result code from the server is a rejection of the write, except
/// noSuchObject which means the entry is gone. Anything else is a transport
/// failure.
fn write_error(url: &str, dn: &str, err: LdapError) -> Error {
    match err {
        LdapError::LdapResult { result } if result.rc == NO_SUCH_OBJECT => Error::GroupNotFound {
            identity: dn.to_string(),
        },
        LdapError::LdapResult { result } => {
            Error::write_failed(dn, format!("rc={} {}", result.rc, result.text))
        }
        other => Error::unavailable(url, other),
    }
}

/// Map a failed search under `base`.
///
/// A result code from the server (missing base, bad filter, no access) will
/// not clear by itself. I/O errors and timeouts stay retryable.
fn search_error(url: &str, base: &str, err: LdapError) -> Error {
    match err {
        LdapError::LdapResult { result } => {
            Error::search_rejected(base, format!("rc={} {}", result.rc, result.text))
        }
        other => Error::unavailable(url, format!("search under '{}' failed: {}", base, other)),
    }
}

fn ldap_scope(scope: SearchScope) -> Scope {
    match scope {
        SearchScope::BaseObject => Scope::Base,
        SearchScope::SingleLevel => Scope::OneLevel,
        SearchScope::WholeSubtree => Scope::Subtree,
    }
}

fn value_set(attribute: &Attribute) -> HashSet<&str> {
    attribute.values.iter().map(String::as_str).collect()
}

impl Session for LdapSession {
    fn search(&mut self, request: &SearchRequest) -> Result<Vec<RawEntry>> {
        let (entries, _) = self
            .conn
            .with_timeout(self.timeout)
            .search(
                &request.base,
                ldap_scope(request.scope),
                &request.filter,
                request.attributes.clone(),
            )
            .and_then(|result| result.success())
            .map_err(|e| search_error(&self.url, &request.base, e))?;

        Ok(entries
            .into_iter()
            .map(|entry| {
                let entry = SearchEntry::construct(entry);
                RawEntry {
                    dn: entry.dn,
                    attributes: entry.attrs.into_iter().collect(),
                }
            })
            .collect())
    }

    fn add(&mut self, dn: &str, attributes: &[Attribute]) -> Result<()> {
        let attrs: Vec<(&str, HashSet<&str>)> = attributes
            .iter()
            .map(|attr| (attr.name.as_str(), value_set(attr)))
            .collect();

        self.conn
            .with_timeout(self.timeout)
            .add(dn, attrs)
            .and_then(|result| result.success())
            .map(|_| ())
            .map_err(|e| write_error(&self.url, dn, e))
    }

    fn modify(&mut self, dn: &str, replacements: &[Attribute]) -> Result<()> {
        let mods: Vec<Mod<&str>> = replacements
            .iter()
            .map(|attr| Mod::Replace(attr.name.as_str(), value_set(attr)))
            .collect();

        self.conn
            .with_timeout(self.timeout)
            .modify(dn, mods)
            .and_then(|result| result.success())
            .map(|_| ())
            .map_err(|e| write_error(&self.url, dn, e))
    }

    fn delete(&mut self, dn: &str) -> Result<()> {
        self.conn
            .with_timeout(self.timeout)
            .delete(dn)
            .and_then(|result| result.success())
            .map(|_| ())
            .map_err(|e| write_error(&self.url, dn, e))
    }
}

impl Drop for LdapSession {
    fn drop(&mut self) {
        if let Err(e) = self.conn.unbind() {
            warn!(url = %self.url, error = %e, "Failed to unbind from directory");
        }
    }
}
