//! Error types for lume-builder.
//!
//! # Error Message Style Guide
//!
//! - **Format**: `"<operation> failed: <reason>"` or `"<field> is required"`
//! - **Case**: All lowercase (Rust convention for error messages)
//! - **Context**: Include the VM name or path when available
//!
//! The one deliberate exception is [`Error::Lume`]: its message is the
//! trimmed output of the `lume` tool itself, so the user sees the tool's
//! own diagnostic text instead of a generic exit-code message.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using lume-builder's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in lume-builder operations.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Subprocess Errors
    // ========================================================================
    /// `lume` exited non-zero; the message is its trimmed combined output.
    #[error("{0}")]
    Lume(String),

    /// A streamed command exited non-zero.
    #[error("{program} exited with {status}")]
    ExitStatus {
        /// Program that was run.
        program: String,
        /// Exit status as reported by the OS.
        status: String,
    },

    /// The command could not be started or waited on.
    #[error("command execution failed: {program}: {source}")]
    Spawn {
        /// Program that was run.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The operation was cancelled (SIGINT/SIGTERM).
    #[error("operation cancelled")]
    Cancelled,

    // ========================================================================
    // Build Step Errors
    // ========================================================================
    /// The `create` step failed.
    #[error("vm creation failed: {0}")]
    VmCreation(#[source] Box<Error>),

    /// The `set` step failed.
    #[error("vm update failed: {0}")]
    VmUpdate(#[source] Box<Error>),

    /// Waiting for the VM's IP address failed.
    #[error("ip lookup failed: {0}")]
    IpLookup(#[source] Box<Error>),

    /// `lume ip` succeeded but printed no address.
    #[error("no ip address reported for vm: {0}")]
    NoIpAddress(String),

    /// A VM name was recorded twice within one build.
    #[error("vm name already recorded: {existing} (attempted {requested})")]
    VmNameConflict {
        /// Name recorded first.
        existing: String,
        /// Name that was rejected.
        requested: String,
    },

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// A required configuration field is empty.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// A VM name that cannot name a folder directly under the lume home.
    #[error("invalid vm name '{name}': {reason}")]
    InvalidVmName {
        /// Name as written in the configuration.
        name: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// The export chunk size could not be parsed.
    #[error("invalid chunk size '{value}': {reason}")]
    InvalidChunkSize {
        /// Value as written in the configuration.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The template file could not be read or decoded.
    #[error("config load failed: {}: {reason}", path.display())]
    ConfigLoad {
        /// Template path.
        path: PathBuf,
        /// The reason for the failure.
        reason: String,
    },

    /// Neither `LUME_HOME` nor the user's home directory is available.
    #[error("lume home not found: set LUME_HOME or --lume-home")]
    HomeNotFound,

    // ========================================================================
    // Output Errors
    // ========================================================================
    /// The manifest could not be encoded as JSON.
    #[error("manifest encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    // ========================================================================
    // Filesystem Errors
    // ========================================================================
    /// A filesystem operation failed.
    #[error("{operation} failed: {}: {source}", path.display())]
    Filesystem {
        /// The operation that failed (e.g., "copy file", "split disk image").
        operation: &'static str,
        /// Offending path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Create a filesystem error for `path`.
    pub fn filesystem(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::Filesystem {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Whether this error (or the step error it wraps) is a cancellation.
    pub fn is_cancelled(&self) -> bool {
        match self {
            Error::Cancelled => true,
            Error::VmCreation(inner) | Error::VmUpdate(inner) | Error::IpLookup(inner) => {
                inner.is_cancelled()
            }
            _ => false,
        }
    }
}
