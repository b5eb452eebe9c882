//! Error types for fleetkey

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for fleetkey
pub type Result<T> = std::result::Result<T, Error>;

/// fleetkey errors
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Root key validation error
    #[error("Root key error: {0}")]
    RootKey(String),

    /// Key file referenced by the inventory could not be read
    #[error("Failed to read key file {}: {source}", path.display())]
    KeyFile {
        /// Path of the unreadable key file
        path: PathBuf,
        /// Underlying IO error
        source: io::Error,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// True for errors caught by eager validation, before any output exists
    #[must_use]
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::Config(_) | Self::RootKey(_))
    }
}
