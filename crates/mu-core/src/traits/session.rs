//! Session traits

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::error::{SessionError, TransferError};

/// An authenticated command channel to one device
///
/// Sessions are owned by exactly one device run and are never shared
/// between concurrent operations.
#[async_trait]
pub trait RemoteSession: Send {
    /// Run a command and return its output split into lines
    ///
    /// Line terminators (`\n`, `\r\n`) are stripped.
    async fn run(&mut self, command: &str) -> Result<Vec<String>, SessionError>;

    /// Close the session gracefully
    async fn close(&mut self) -> Result<(), SessionError>;
}

/// File transfer over an established session's transport
#[async_trait]
pub trait FileTransfer: Send {
    /// Upload a local file into a remote directory
    async fn upload(&mut self, local: &Path, remote_dir: &str) -> Result<(), TransferError>;

    /// Download a remote file into a local directory, returning the local path
    async fn download(
        &mut self,
        remote_file: &str,
        local_dir: &Path,
    ) -> Result<PathBuf, TransferError>;
}
