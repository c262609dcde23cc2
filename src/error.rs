//! Error types for authentication dispatch.
//!
//! Only [`Error::AuthenticationFailed`] is part of the designed control flow.
//! Every other variant is either a degraded-but-continuing condition that the
//! dispatcher logs, or a hard failure that propagates to the caller.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by schemes, sessions, the request wrapper and the dispatcher.
#[derive(Debug, Error)]
pub enum Error {
    /// Credentials were rejected.
    ///
    /// The message is intentionally generic: callers must never learn whether
    /// the identity was unknown or the credential was wrong.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// A route names an auth scheme that is not configured.
    #[error("auth scheme not configured: {0}")]
    SchemeUnresolved(String),

    /// The session claims to be authenticated but the cached identity is
    /// missing or has an unexpected shape.
    #[error("session cache inconsistent for key '{key}': {reason}")]
    SessionCacheInconsistent {
        /// Session key that was read
        key: String,
        /// What was wrong with the stored value
        reason: String,
    },

    /// Session load or save failed in the backing store.
    #[error("session storage failure: {0}")]
    Storage(String),

    /// An authenticator or authorizer backend failed for reasons other than
    /// bad credentials (unreachable database, token service error, ...).
    #[error("authentication backend failure: {0}")]
    Backend(String),

    /// A caller supplied an unusable argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// Multipart form extraction failed.
    #[error("multipart: {0}")]
    Multipart(String),

    /// Filesystem error while saving an upload.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// Security configuration is invalid.
    #[error("security config: {0}")]
    Config(String),
}

impl Error {
    /// Returns true for the expected, user-facing credential rejection.
    pub fn is_authentication_failed(&self) -> bool {
        matches!(self, Error::AuthenticationFailed)
    }
}

/// Error returned by an event hook subscriber.
///
/// Hook errors are logged by the dispatcher and never abort the auth flow.
#[derive(Debug, Error)]
#[error("event hook '{hook}' failed: {message}")]
pub struct HookError {
    hook: String,
    message: String,
}

impl HookError {
    /// Creates a new hook error.
    pub fn new(hook: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            hook: hook.into(),
            message: message.into(),
        }
    }

    /// Name of the hook that failed.
    pub fn hook(&self) -> &str {
        &self.hook
    }

    /// Failure message.
    pub fn message(&self) -> &str {
        &self.message
    }
}
