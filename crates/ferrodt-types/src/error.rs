//! Error types and handling for ferrodt
//!
//! This module provides the error taxonomy shared by the orchestration core,
//! the configuration layer and every extension. Faults raised by extensions
//! travel through the engine unchanged; the engine only converts
//! [`ErrorKind::MissingConfiguration`] into a run outcome.

use crate::types::Capability;

/// Main error type for ferrodt operations
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A required root setting (`Source`, `Sink`) is absent or blank
    #[error("Missing required configuration: {}", .keys.join(", "))]
    MissingConfiguration {
        /// Configuration keys that were not provided
        keys: Vec<String>,
    },

    /// A configured extension name matches no registered extension
    #[error(
        "No {capability} extension named '{name}' is registered (available: {})",
        .available.join(", ")
    )]
    ExtensionNotFound {
        /// Capability that was searched
        capability: Capability,
        /// Display name requested by the configuration
        name: String,
        /// Display names registered for that capability
        available: Vec<String>,
    },

    /// Two extensions of the same capability share a display name
    #[error("A {capability} extension named '{name}' is already registered")]
    DuplicateExtension {
        /// Capability of the rejected registration
        capability: Capability,
        /// Conflicting display name
        name: String,
    },

    /// An operation would recreate the store it is reading from
    #[error(
        "Operation {operation} uses the same {store} container '{container}' in database \
         '{database}' as both source and sink while '{setting}' is enabled on the sink; \
         the container would be recreated while it is still being read. Set '{setting}' \
         to false or write to a different container"
    )]
    DestructiveConflict {
        /// Index of the offending operation
        operation: usize,
        /// Human readable store family, e.g. "Cosmos DB"
        store: String,
        /// Database shared by source and sink
        database: String,
        /// Container shared by source and sink
        container: String,
        /// Name of the sink setting that requests recreation
        setting: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message describing the configuration issue
        message: String,
    },

    /// I/O operation failed
    #[error("I/O error: {message}")]
    Io {
        /// Error message from the I/O operation
        message: String,
    },

    /// Encoding or decoding of a record failed
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error message from the serializer
        message: String,
    },

    /// Fault raised by an extension while reading or writing
    #[error("Extension '{extension}' failed: {message}")]
    Extension {
        /// Display name of the failing extension
        extension: String,
        /// Error message reported by the extension
        message: String,
    },

    /// Operation cancelled
    #[error("Operation cancelled")]
    Cancelled,

    /// Generic error with custom message
    #[error("{message}")]
    Other {
        /// Custom error message
        message: String,
    },
}

/// Error kind for categorizing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Source or sink name not configured
    MissingConfiguration,
    /// Extension resolution failures
    Extension,
    /// Same-store conflict rejected before any I/O
    Conflict,
    /// Configuration errors
    Config,
    /// I/O related errors
    Io,
    /// Record encoding errors
    Serialization,
    /// Cancellation
    Cancelled,
    /// Other errors
    Other,
}

impl Error {
    /// Get the error kind
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingConfiguration { .. } => ErrorKind::MissingConfiguration,
            Self::ExtensionNotFound { .. }
            | Self::DuplicateExtension { .. }
            | Self::Extension { .. } => ErrorKind::Extension,
            Self::DestructiveConflict { .. } => ErrorKind::Conflict,
            Self::Config { .. } => ErrorKind::Config,
            Self::Io { .. } => ErrorKind::Io,
            Self::Serialization { .. } => ErrorKind::Serialization,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Other { .. } => ErrorKind::Other,
        }
    }

    /// Create a new missing configuration error
    pub fn missing_configuration<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::MissingConfiguration {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new serialization error
    pub fn serialization<S: Into<String>>(message: S) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create a new extension fault
    pub fn extension<E: Into<String>, S: Into<String>>(extension: E, message: S) -> Self {
        Self::Extension {
            extension: extension.into(),
            message: message.into(),
        }
    }

    /// Create a new generic error
    pub fn other<S: Into<String>>(message: S) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::Io {
            message: error.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization {
            message: error.to_string(),
        }
    }
}
