//! Error types for the migration library.

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::client::RemoteError;

/// Exit code for configuration errors.
pub const EXIT_CONFIG_ERROR: u8 = 1;
/// Exit code for dataset load errors.
pub const EXIT_LOAD_ERROR: u8 = 2;
/// Exit code for remote provider errors.
pub const EXIT_REMOTE_ERROR: u8 = 3;
/// Exit code for run-state file errors.
pub const EXIT_STATE_ERROR: u8 = 4;
/// Exit code for IO errors.
pub const EXIT_IO_ERROR: u8 = 7;
/// Exit code for JSON errors.
pub const EXIT_JSON_ERROR: u8 = 8;

/// Main error type for migration operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Source dataset could not be loaded. Fatal before any remote call.
    #[error("Failed to load {}: {}", .path.display(), .reason)]
    Load { path: PathBuf, reason: String },

    /// Remote provider call failed where the failure is process-level
    /// (health check). Per-record failures never surface here.
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// Identifier mapping invariant violated
    #[error("Mapping conflict: {0}")]
    Mapping(String),

    /// Run-state file error
    #[error("State file error: {0}")]
    State(String),

    /// Config hash mismatch on resume
    #[error("Config has changed since last run - cannot resume. Remove the state file to start fresh.")]
    ConfigChanged,

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MigrateError {
    /// Create a Load error for a file.
    pub fn load(path: impl AsRef<Path>, reason: impl Into<String>) -> Self {
        MigrateError::Load {
            path: path.as_ref().to_path_buf(),
            reason: reason.into(),
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            MigrateError::Config(_) | MigrateError::Yaml(_) | MigrateError::ConfigChanged => {
                EXIT_CONFIG_ERROR
            }
            MigrateError::Load { .. } => EXIT_LOAD_ERROR,
            MigrateError::Remote(_) => EXIT_REMOTE_ERROR,
            MigrateError::Mapping(_) | MigrateError::State(_) => EXIT_STATE_ERROR,
            MigrateError::Io(_) => EXIT_IO_ERROR,
            MigrateError::Json(_) => EXIT_JSON_ERROR,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
