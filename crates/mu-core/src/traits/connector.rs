//! Connection traits

use async_trait::async_trait;

use crate::error::ConnectError;
use crate::traits::{FileTransfer, RemoteSession};
use crate::types::Device;

/// Opens sessions to devices
#[async_trait]
pub trait SessionConnector: Send + Sync {
    /// The session type produced by this connector
    type Session: RemoteSession + FileTransfer;

    /// Open an authenticated session to the device
    async fn connect(&self, device: &Device) -> Result<Self::Session, ConnectError>;

    /// Lightweight reachability test: connect, then close immediately
    ///
    /// Any failure, including authentication, counts as unreachable.
    async fn probe(&self, device: &Device) -> bool;
}
