//! Error types for group-directory

/// Result type for group-directory operations
pub type Result<T> = std::result::Result<T, Error>;

/// How a caller should treat a failed operation before trying again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    /// Retry right away, e.g. after refetching state
    Immediate,
    /// Retry with the usual exponential backoff
    Backoff,
    /// Retry rarely; the failure will not go away without an operator
    Slow,
}

/// Errors that can occur while talking to the group directory
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Connection, bind, transport or timeout failure
    #[error("Directory unavailable at {url}: {message}")]
    DirectoryUnavailable { url: String, message: String },

    /// The search filter matched more than one entry
    #[error("Search for group '{identity}' returned {count} entries, expected at most one")]
    AmbiguousResult { identity: String, count: usize },

    /// The directory answered the group search with an error result, e.g. a
    /// missing search base, a malformed filter or insufficient access
    #[error("Directory rejected search under {base}: {message}")]
    SearchRejected { base: String, message: String },

    /// The group does not exist in the directory
    #[error("Group '{identity}' was not found")]
    GroupNotFound { identity: String },

    /// The directory rejected an add, modify or delete
    #[error("Directory rejected write to {dn}: {message}")]
    DirectoryWriteFailed { dn: String, message: String },

    /// Directory settings were rejected before any connection was made
    #[error("Invalid directory configuration: {message}")]
    InvalidConfig { message: String },
}

impl Error {
    pub fn unavailable(url: impl Into<String>, message: impl ToString) -> Self {
        Self::DirectoryUnavailable {
            url: url.into(),
            message: message.to_string(),
        }
    }

    pub fn write_failed(dn: impl Into<String>, message: impl ToString) -> Self {
        Self::DirectoryWriteFailed {
            dn: dn.into(),
            message: message.to_string(),
        }
    }

    pub fn search_rejected(base: impl Into<String>, message: impl ToString) -> Self {
        Self::SearchRejected {
            base: base.into(),
            message: message.to_string(),
        }
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// True for [`Error::GroupNotFound`]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::GroupNotFound { .. })
    }

    /// Classify the error for the dispatcher's retry policy.
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::DirectoryUnavailable { .. } | Self::GroupNotFound { .. } => RetryClass::Backoff,
            Self::AmbiguousResult { .. }
            | Self::SearchRejected { .. }
            | Self::DirectoryWriteFailed { .. }
            | Self::InvalidConfig { .. } => RetryClass::Slow,
        }
    }
}
