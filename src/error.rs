//! Error types and handling infrastructure for tensormap.
//!
//! This module provides a centralized error handling system using `thiserror` for
//! custom error types with a consistent `Result` alias across all modules.
//!
//! ## Taxonomy
//!
//! - **Io**: open/seek/read/write failures, carrying the OS diagnostic
//! - **Map**: native memory-mapping call failures
//! - **Format**: undersized buffers or decoder-reported malformed headers
//! - **TensorNotFound**: lookup miss by tensor name (recoverable per call)
//!
//! Construction-time failures (open, map, undersized buffer, decode) abort the
//! whole construction; best-effort teardown failures are logged, never raised.

use thiserror::Error;

/// The main error type for tensormap operations.
///
/// This enum covers all error conditions that can occur while opening,
/// mapping, decoding and reading tensor files.
#[derive(Error, Debug)]
pub enum TensorMapError {
    /// File system related errors (open failed, short read, seek error, etc.)
    #[error("I/O operation failed: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Native memory-mapping call failures
    #[error("Memory mapping failed: {message}")]
    Map { message: String },

    /// Undersized buffer or malformed header reported by the decoder
    #[error("Malformed tensor file: {message}")]
    Format { message: String },

    /// Tensor name lookup miss
    #[error("Tensor not found: {name}")]
    TensorNotFound { name: String },
}

/// Standard Result type for tensormap operations.
///
/// This type alias provides a consistent error handling interface across
/// all modules in the tensormap codebase.
pub type Result<T> = std::result::Result<T, TensorMapError>;

impl TensorMapError {
    /// Create an Io error from an io::Error with additional context
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Create a Map error with a descriptive message
    pub fn map(message: impl Into<String>) -> Self {
        Self::Map {
            message: message.into(),
        }
    }

    /// Create a Format error with a descriptive message
    pub fn format(message: impl Into<String>) -> Self {
        Self::Format {
            message: message.into(),
        }
    }

    /// Create a TensorNotFound error for the given tensor name
    pub fn tensor_not_found(name: impl Into<String>) -> Self {
        Self::TensorNotFound { name: name.into() }
    }
}

// Automatic conversion from io::Error to TensorMapError
impl From<std::io::Error> for TensorMapError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::Io {
                message: "File not found".to_string(),
                source: err,
            },
            std::io::ErrorKind::PermissionDenied => Self::Io {
                message: "Permission denied".to_string(),
                source: err,
            },
            _ => Self::Io {
                message: "IO operation failed".to_string(),
                source: err,
            },
        }
    }
}
