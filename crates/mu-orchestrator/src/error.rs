//! Step failures of a device run

use std::path::PathBuf;
use thiserror::Error;

use mu_core::error::{ConnectError, SessionError, TransferError, VersionError};

/// Why a device run stopped
///
/// Each variant maps onto one failure class: connectivity, authentication,
/// output-contract mismatch, transfer, reboot timeout, version contract
/// violation, or a problem with the local package set.
#[derive(Error, Debug)]
pub enum RunError {
    /// Could not open a session (includes authentication failures)
    #[error("cannot connect: {0}")]
    Connect(#[from] ConnectError),

    /// A command could not be executed
    #[error("command failed: {0}")]
    Command(#[from] SessionError),

    /// The device answered, but not with the text we expect
    #[error("{step} failed: {output}")]
    UnexpectedOutput { step: &'static str, output: String },

    /// Upload or download failed
    #[error("{action} of {file} failed: {source}")]
    Transfer {
        action: &'static str,
        file: String,
        #[source]
        source: TransferError,
    },

    /// The device did not come back within the reboot deadline
    #[error("timed out waiting for device after reboot ({0}s)")]
    RebootTimeout(u64),

    /// A version string broke the expected format
    #[error("invalid version: {0}")]
    Version(#[from] VersionError),

    /// Manual upgrade without any package files
    #[error("manual upgrade selected but no packages provided")]
    NoPackages,

    /// A package file does not exist locally
    #[error("{} does not exist", .0.display())]
    MissingPackage(PathBuf),

    /// Package file name does not follow `name-version...`
    #[error("cannot derive package name and version from {}", .0.display())]
    PackageName(PathBuf),

    /// Local filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RunError {
    /// Build an [`RunError::UnexpectedOutput`] from raw command output
    pub fn unexpected(step: &'static str, lines: &[String]) -> Self {
        let output = if lines.is_empty() {
            "no output".to_string()
        } else {
            lines.join(" | ")
        };
        RunError::UnexpectedOutput { step, output }
    }

    /// Whether the device rejected our credentials
    pub fn is_auth(&self) -> bool {
        matches!(self, RunError::Connect(e) if e.is_auth())
    }

    /// Whether the run ended waiting for a reboot
    pub fn is_timeout(&self) -> bool {
        matches!(self, RunError::RebootTimeout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unexpected_output_joins_lines() {
        let err = RunError::unexpected(
            "backup",
            &["failure: not enough space".to_string(), "".to_string()],
        );
        assert_eq!(
            err.to_string(),
            "backup failed: failure: not enough space | "
        );
        assert_eq!(
            RunError::unexpected("download", &[]).to_string(),
            "download failed: no output"
        );
    }

    #[test]
    fn test_classification() {
        let auth = RunError::Connect(ConnectError::AuthenticationFailed {
            username: "mu".to_string(),
        });
        assert!(auth.is_auth());
        assert!(!auth.is_timeout());
        assert!(RunError::RebootTimeout(240).is_timeout());
        assert_eq!(
            RunError::RebootTimeout(240).to_string(),
            "timed out waiting for device after reboot (240s)"
        );
    }
}
