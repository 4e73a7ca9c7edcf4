//! Error types for group-core

use std::path::PathBuf;

use group_directory::RetryClass;

/// Result type for group-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in group-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The desired-state object changed since it was read
    #[error("Conflict persisting '{identity}': expected resource version {expected}, store has {found}")]
    PersistConflict {
        identity: String,
        expected: u64,
        found: u64,
    },

    /// The desired-state object does not exist
    #[error("Desired group not found: {identity}")]
    NotFound { identity: String },

    /// A desired-state object with this identity already exists
    #[error("Desired group already exists: {identity}")]
    AlreadyExists { identity: String },

    /// The identity cannot be used as an object name
    #[error("Invalid group identity '{identity}': {reason}")]
    InvalidIdentity { identity: String, reason: String },

    /// A document declares a kind no registry entry covers
    #[error("Unknown resource kind: {kind}")]
    UnknownKind { kind: String },

    /// A stored document could not be decoded
    #[error("Invalid document at {path}: {message}")]
    InvalidDocument { path: PathBuf, message: String },

    /// Operator configuration could not be used
    #[error("Configuration error: {message}")]
    Config { message: String },

    // Transparent wrappers for underlying crate errors
    /// Error from the directory sync engine
    #[error(transparent)]
    Directory(#[from] group_directory::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// TOML deserialization error
    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),

    /// TOML serialization error
    #[error(transparent)]
    TomlSer(#[from] toml::ser::Error),
}

impl Error {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::PersistConflict { .. })
    }

    /// Classify the error for the dispatcher's retry policy.
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Error::Directory(e) => e.retry_class(),
            Error::PersistConflict { .. } => RetryClass::Immediate,
            Error::NotFound { .. } | Error::Io(_) => RetryClass::Backoff,
            Error::AlreadyExists { .. }
            | Error::InvalidIdentity { .. }
            | Error::UnknownKind { .. }
            | Error::InvalidDocument { .. }
            | Error::Config { .. }
            | Error::Json(_)
            | Error::TomlDe(_)
            | Error::TomlSer(_) => RetryClass::Slow,
        }
    }
}
