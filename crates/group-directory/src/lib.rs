//! Directory sync engine for group entries
//!
//! This crate converges `groupOfUniqueNames` entries in an LDAP directory to a
//! desired description and member set:
//!
//! - **Existence**: scoped search with a configurable base, scope and filter
//! - **Drift**: case- and order-insensitive member comparison, verbatim description
//! - **Convergence**: create when missing, one modify when drifted, no write when in sync
//! - **Deletion**: resolve then delete, reporting `GroupNotFound` when already gone
//!
//! # Architecture
//!
//! ```text
//!            DirectoryClient
//!                  |
//!              Connector ---- LdapConnector (ldap3)
//!                  |
//!               Session  (one per operation, released on drop)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use group_directory::{DirectoryClient, DirectoryConfig};
//!
//! let client = DirectoryClient::ldap(DirectoryConfig {
//!     url: "ldap://ldap.example.org".to_string(),
//!     search_base: "ou=groups,dc=example,dc=org".to_string(),
//!     ..DirectoryConfig::default()
//! })?;
//! let result = client.reconcile_group("team-x", "Team X", &["uid=alice".to_string()])?;
//! assert!(result.mutation_occurred());
//! ```

pub mod client;
pub mod config;
pub mod drift;
pub mod entry;
pub mod error;
pub mod ldap;
pub mod session;

pub use client::{DirectoryClient, GroupAction, GroupReconcile};
pub use config::{DirectoryConfig, SearchScope};
pub use drift::{DriftStatus, GroupDrift, normalize_members};
pub use entry::{Attribute, DirectoryGroupEntry, RawEntry, GROUP_CLASS};
pub use error::{Error, Result, RetryClass};
pub use ldap::LdapConnector;
pub use session::{Connector, SearchRequest, Session};
