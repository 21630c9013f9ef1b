//! Core error types for fantail

use ft_protocol::ProtocolError;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for the fantail ecosystem
#[derive(Error, Debug)]
pub enum FtError {
    /// Protocol error
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// Session error
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Connection-related errors.
///
/// Every variant carries the hostname it concerns: connect failures are
/// caught per host by the session orchestrator and must be attributable
/// in the log without further context.
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// Host could not be reached
    #[error("Host {hostname} unreachable: {reason}")]
    Unreachable { hostname: String, reason: String },

    /// Authentication was rejected by the remote host
    #[error("Authentication rejected by {hostname}")]
    AuthRejected { hostname: String },

    /// Private key file not found
    #[error("Private key not found at {path}")]
    KeyNotFound { path: PathBuf },

    /// Private key could not be loaded
    #[error("Failed to load private key {path}: {reason}")]
    KeyInvalid { path: PathBuf, reason: String },

    /// Privilege elevation failed
    #[error("Elevation to '{identity}' failed on {hostname}: {reason}")]
    ElevationFailed {
        hostname: String,
        identity: String,
        reason: String,
    },

    /// Closing the connection failed
    #[error("Failed to close connection to {hostname}: {reason}")]
    CloseFailed { hostname: String, reason: String },
}

impl ConnectionError {
    /// The hostname this error concerns, if it carries one
    pub fn hostname(&self) -> Option<&str> {
        match self {
            Self::Unreachable { hostname, .. }
            | Self::AuthRejected { hostname }
            | Self::ElevationFailed { hostname, .. }
            | Self::CloseFailed { hostname, .. } => Some(hostname),
            Self::KeyNotFound { .. } | Self::KeyInvalid { .. } => None,
        }
    }
}

/// Session-related errors
#[derive(Error, Debug)]
pub enum SessionError {
    /// No paths were given to tail
    #[error("No paths to tail")]
    NoPaths,

    /// Writing to the output stream failed
    #[error("Output stream error: {0}")]
    Output(std::io::Error),

    /// A target was dispatched to more than once
    #[error("Target {0} already dispatched")]
    AlreadyDispatched(String),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
}
