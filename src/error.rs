//! Error types for the container lifecycle layer.
//!
//! Only faults travel through this enum: storage I/O, serialization,
//! unresolvable artifacts, controller transport. Expected business outcomes
//! (duplicate container id, mode conflict, a vetoed update, disabled
//! management API) are reported as [`ServiceResponse`] failures instead and
//! never become an `Err` (see [`crate::message`]).
//!
//! [`ServiceResponse`]: crate::message::ServiceResponse

use std::path::PathBuf;

/// Result type alias for container lifecycle operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the container lifecycle layer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // =========================================================================
    // Release Coordinate Errors
    // =========================================================================
    /// Release coordinate text could not be parsed.
    #[error("invalid release id '{text}': {reason}")]
    InvalidReleaseId { text: String, reason: String },

    /// Deployment-set entry could not be parsed.
    #[error("invalid deployment entry '{entry}': {reason}")]
    InvalidDeploymentEntry { entry: String, reason: String },

    // =========================================================================
    // Artifact Resolution Errors
    // =========================================================================
    /// No artifact exists for the requested coordinate.
    #[error("artifact not found for release id {0}")]
    ArtifactNotFound(String),

    /// Artifact resolution failed.
    #[error("failed to resolve artifact for '{release}': {reason}")]
    ResolutionFailed { release: String, reason: String },

    // =========================================================================
    // Storage Errors
    // =========================================================================
    /// State directory could not be initialized.
    #[error("failed to initialize state storage at {path}: {reason}")]
    StorageInitFailed { path: PathBuf, reason: String },

    /// Persisted state could not be read.
    #[error("failed to read server state for '{server_id}': {reason}")]
    StateReadFailed { server_id: String, reason: String },

    /// Persisted state could not be written.
    #[error("failed to write server state for '{server_id}': {reason}")]
    StateWriteFailed { server_id: String, reason: String },

    // =========================================================================
    // Extension Errors
    // =========================================================================
    /// Extension lifecycle callback failed.
    #[error("extension '{name}' callback '{callback}' failed: {reason}")]
    ExtensionFailed {
        name: String,
        callback: String,
        reason: String,
    },

    /// Extension callback exceeded its deadline.
    #[error("extension '{0}' callback timed out")]
    ExtensionTimeout(String),

    // =========================================================================
    // Startup / Controller Errors
    // =========================================================================
    /// Remote controller could not be reached during boot.
    #[error("controller connection failed: {0}")]
    ControllerUnavailable(String),

    /// Unknown startup strategy selector.
    #[error("unknown startup strategy '{0}'")]
    UnknownStartupStrategy(String),

    // =========================================================================
    // Serialization / I/O Errors
    // =========================================================================
    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// Internal error (should not happen).
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
