//! Error types for provider lookup and provider setup.
//!
//! Lookup failures are configuration errors and are never retried. Setup
//! failures are reported to the caller, which decides whether they are fatal.

use thiserror::Error;

/// Errors raised while resolving a provider or one of its local-dev options.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// No provider is registered under the requested id.
    #[error("unknown provider '{id}' (expected one of: {known})")]
    UnknownProvider { id: String, known: String },

    /// The provider exists but has no local-dev option of the requested type.
    #[error("provider '{provider}' has no local-dev option '{kind}' (expected one of: {known})")]
    UnknownLocalDev {
        provider: String,
        kind: String,
        known: String,
    },

    /// A local-dev type string did not parse.
    #[error("invalid local-dev type '{0}'")]
    InvalidLocalDevType(String),
}

/// Errors raised inside a provider's `setup` routine.
#[derive(Debug, Error)]
pub enum SetupError {
    /// Interactive input could not be read (closed terminal, interrupt).
    #[error("prompt failed: {0}")]
    Prompt(String),

    /// A helper command could not be started or exited unsuccessfully.
    #[error("command '{program}' failed: {detail}")]
    Command { program: String, detail: String },

    /// The helper ran but never reported a usable connection string.
    #[error("no connection string reported by '{0}'")]
    NoConnectionString(String),
}

/// Convenience alias for results with [`CoreError`].
pub type Result<T> = std::result::Result<T, CoreError>;
