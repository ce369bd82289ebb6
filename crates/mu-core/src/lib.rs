//! mu-core: Core abstractions and configuration for mu
//!
//! This crate provides the device and policy types, the version ordering used
//! to tell upgrades from downgrades, the error taxonomy, and the collaborator
//! traits (remote session, file transfer, access provisioning, device log)
//! that the orchestrator is written against.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;
pub mod version;

pub use error::MuError;
pub use types::{
    Device, DeviceStatus, RunMode, Severity, UpdateAvailability, UpgradeMode,
    VersionPair,
};
pub use version::{VersionKey, VersionOrdering};
