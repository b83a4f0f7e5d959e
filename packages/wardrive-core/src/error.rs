//! Error types shared across the wardrive core.

use std::path::PathBuf;
use thiserror::Error;

/// Failures reported by a radio backend.
#[derive(Debug, Error)]
pub enum RadioError {
    /// The wireless subsystem could not be reached at all
    #[error("Radio subsystem unavailable: {0}")]
    Unavailable(String),

    /// An active scan request was refused by policy
    #[error("Active scan not authorized on {0}")]
    NotAuthorized(String),

    /// Enumeration on a single interface failed
    #[error("Interface {name}: {message}")]
    Interface { name: String, message: String },

    /// The backend command ran but failed
    #[error("Radio command failed: {0}")]
    Command(String),
}

impl RadioError {
    /// Whether this error means the request was refused rather than broken.
    pub fn is_refusal(&self) -> bool {
        matches!(self, RadioError::NotAuthorized(_))
    }
}

/// Failures reported by a position backend.
#[derive(Debug, Error)]
pub enum PositionError {
    /// The position service could not be reached
    #[error("Position service unavailable: {0}")]
    Unavailable(String),

    /// The position service sent something we could not understand
    #[error("Position protocol error: {0}")]
    Protocol(String),
}

/// Failures while writing an export file.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV serialization failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("Formatting failed: {0}")]
    Format(#[from] std::fmt::Error),
}

/// Failures while loading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
