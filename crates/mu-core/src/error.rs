//! Core error types for mu

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for the mu ecosystem
#[derive(Error, Debug)]
pub enum MuError {
    /// Connection error
    #[error("Connection error: {0}")]
    Connect(#[from] ConnectError),

    /// Remote command error
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// File transfer error
    #[error("Transfer error: {0}")]
    Transfer(#[from] TransferError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Version string violated the expected format
    #[error("Version error: {0}")]
    Version(#[from] VersionError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while opening a session to a device
#[derive(Error, Debug)]
pub enum ConnectError {
    /// The device refused our credentials
    #[error("Authentication failed for user {username}")]
    AuthenticationFailed { username: String },

    /// TCP/SSH level failure reaching the device
    #[error("Connection refused: {0}")]
    Refused(String),

    /// Connect did not complete within the configured timeout
    #[error("Connection timed out after {0}s")]
    TimedOut(u64),

    /// Host key did not match the pinned fingerprint
    #[error("Host key verification failed: expected {expected}, got {actual}")]
    HostKeyRejected { expected: String, actual: String },

    /// Private key could not be loaded
    #[error("Private key not usable at {path}: {message}")]
    KeyLoad { path: PathBuf, message: String },
}

impl ConnectError {
    /// Whether this failure is an authentication rejection
    pub fn is_auth(&self) -> bool {
        matches!(self, ConnectError::AuthenticationFailed { .. })
    }
}

/// Errors raised by a command on an open session
#[derive(Error, Debug)]
pub enum SessionError {
    /// The session is no longer usable
    #[error("Session closed")]
    Closed,

    /// Channel could not be opened or the command could not be sent
    #[error("Failed to execute '{command}': {message}")]
    Exec { command: String, message: String },
}

/// File transfer errors
#[derive(Error, Debug)]
pub enum TransferError {
    /// Local file is missing or unreadable
    #[error("Local file not found: {0}")]
    LocalFileMissing(PathBuf),

    /// Remote side rejected the transfer
    #[error("Remote rejected transfer of {file}: {message}")]
    Rejected { file: String, message: String },

    /// Transfer stream violated the protocol
    #[error("Transfer protocol error: {0}")]
    Protocol(String),

    /// Underlying session failure
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Local I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
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

    /// Missing required field
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// Device selected by name does not exist in the inventory
    #[error("Device {0} not found in configuration file")]
    UnknownDevice(String),
}

/// Version strings that break the `MAJOR.MINOR[tail][.PATCH]` contract
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    /// Empty input
    #[error("empty version string")]
    Empty,

    /// Major segment is not a number
    #[error("invalid major version in '{0}'")]
    InvalidMajor(String),

    /// Minor segment has no leading number
    #[error("invalid minor version in '{0}'")]
    InvalidMinor(String),

    /// Patch segment is not a number
    #[error("invalid patch version in '{0}'")]
    InvalidPatch(String),
}
