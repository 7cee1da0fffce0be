//! Error types for Aquifer

use thiserror::Error;

/// Distinguishing code for adapter creation failures.
///
/// Creation failures are deterministic misconfiguration and are never
/// retried automatically; the code tells the caller which layer to fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreationCode {
    /// No adapter configuration exists for the requested name (`ECONF`)
    MissingConfig,
    /// The configured invariant name resolves to no registered adapter
    /// type, or the backing driver capability is absent (`EMOD`)
    MissingAdapter,
    /// The adapter type was found but the underlying connection attempt
    /// failed (`ECONN`)
    Connect,
}

impl std::fmt::Display for CreationCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CreationCode::MissingConfig => write!(f, "ECONF"),
            CreationCode::MissingAdapter => write!(f, "EMOD"),
            CreationCode::Connect => write!(f, "ECONN"),
        }
    }
}

/// Core error type for Aquifer operations
#[derive(Error, Debug)]
pub enum Error {
    /// The pool is not accepting acquisitions (paused or draining)
    #[error("Pool is not active")]
    PoolUnavailable,

    /// The acquire deadline elapsed while queued for a resource
    #[error("Timed out waiting for a pooled adapter: {0}")]
    AcquireTimeout(String),

    /// The caller withdrew while queued for a resource
    #[error("Acquisition cancelled while waiting")]
    Cancelled,

    /// The factory could not produce an adapter
    #[error("Adapter creation failed ({code}): {message}")]
    Creation {
        code: CreationCode,
        message: String,
    },

    /// The leased adapter was retired out from under its holder by the
    /// lifetime sweep; the holder must reacquire
    #[error("Pooled adapter expired while leased; reacquire and retry")]
    ResourceExpired,

    /// Operation attempted on an already-released handle
    #[error("Handle is closed")]
    HandleClosed,

    #[error("Query error: {0}")]
    Query(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for a creation error with the given code.
    pub fn creation(code: CreationCode, message: impl Into<String>) -> Self {
        Error::Creation {
            code,
            message: message.into(),
        }
    }
}

/// Result type alias for Aquifer operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creation_codes_render_stable_identifiers() {
        assert_eq!(CreationCode::MissingConfig.to_string(), "ECONF");
        assert_eq!(CreationCode::MissingAdapter.to_string(), "EMOD");
        assert_eq!(CreationCode::Connect.to_string(), "ECONN");
    }

    #[test]
    fn creation_error_message_includes_code() {
        let err = Error::creation(CreationCode::MissingAdapter, "no such invariant: h2");
        assert_eq!(
            err.to_string(),
            "Adapter creation failed (EMOD): no such invariant: h2"
        );
    }
}
