//! Collaborator traits the orchestrator is written against
//!
//! The SSH adapter in `mu-orchestrator` implements the session traits for
//! real devices; tests implement them with scripted fakes.

mod access;
mod connector;
mod log;
mod session;

pub use access::{AccessGrant, AccessProvisioner, NoProvisioning};
pub use connector::SessionConnector;
pub use log::{DeviceLog, LogEntry, MemoryLog};
pub use session::{FileTransfer, RemoteSession};
