//! mu-orchestrator: Device upgrade orchestration
//!
//! Decides per device whether an update is needed, takes a verified
//! configuration backup, pushes firmware (downloaded by the device or
//! uploaded from local files), reboots, and supervises reconnection and
//! post-reboot verification. Partial failures at any step abort the run for
//! that device only.

pub mod backup;
pub mod batch;
pub mod channel;
pub mod error;
pub mod log;
pub mod package;
pub mod parse;
pub mod query;
pub mod reboot;
pub mod ssh;
pub mod upgrade;

#[cfg(test)]
mod testing;

pub use batch::BatchRunner;
pub use error::RunError;
pub use log::TracingLog;
pub use ssh::SshConnector;
pub use upgrade::{RunResult, RunState, UpgradeOrchestrator};
