//! Error types for chargebridge
//!
//! Transport and decode failures are contained inside the connection manager;
//! only configuration errors ever reach the host process.

use thiserror::Error;

/// Result type alias for chargebridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Main error type for chargebridge
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Missing or unusable configuration; fatal at startup
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Connect, read or write failure on the charger socket
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// Inbound frame could not be decoded
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Failure while closing the link
    #[error("Shutdown error: {message}")]
    Shutdown { message: String },

    /// File I/O errors
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Validation errors
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    /// Generic errors with context
    #[error("Error: {message}")]
    Generic { message: String },
}

/// Reasons an inbound frame is discarded
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Fewer than 8 bytes, so there is no function code to inspect
    #[error("frame truncated: {len} bytes, need at least 8")]
    Truncated { len: usize },

    /// Function code other than "read holding registers"
    #[error("unsupported function code {code}")]
    UnsupportedFunction { code: u8 },
}

impl BridgeError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        BridgeError::Config {
            message: message.into(),
        }
    }

    /// Create a new transport error
    pub fn transport<S: Into<String>>(message: S) -> Self {
        BridgeError::Transport {
            message: message.into(),
        }
    }

    /// Create a new shutdown error
    pub fn shutdown<S: Into<String>>(message: S) -> Self {
        BridgeError::Shutdown {
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        BridgeError::Io {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(field: S, message: S) -> Self {
        BridgeError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new generic error
    pub fn generic<S: Into<String>>(message: S) -> Self {
        BridgeError::Generic {
            message: message.into(),
        }
    }

    /// Whether this error must halt startup
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            BridgeError::Config { .. } | BridgeError::Validation { .. }
        )
    }
}

impl From<std::io::Error> for BridgeError {
    fn from(err: std::io::Error) -> Self {
        BridgeError::io(err.to_string())
    }
}

impl From<serde_yaml::Error> for BridgeError {
    fn from(err: serde_yaml::Error) -> Self {
        BridgeError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        BridgeError::Serialization {
            message: err.to_string(),
        }
    }
}
