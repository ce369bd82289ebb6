//! Core domain types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// How firmware reaches the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpgradeMode {
    /// The device downloads packages from its update channel
    #[default]
    Online,
    /// Package files are uploaded from the local filesystem
    Manual,
}

impl fmt::Display for UpgradeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpgradeMode::Online => write!(f, "online"),
            UpgradeMode::Manual => write!(f, "manual"),
        }
    }
}

/// What a run is allowed to do to a device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Report versions and packages, change nothing
    CheckOnly,
    /// Take and download a backup only
    BackupOnly,
    /// Upgrade when an update is available
    UpdateOnly,
    /// Always back up, upgrade when an update is available
    Full,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::CheckOnly => write!(f, "check-only"),
            RunMode::BackupOnly => write!(f, "backup-only"),
            RunMode::UpdateOnly => write!(f, "update-only"),
            RunMode::Full => write!(f, "full"),
        }
    }
}

/// Log severity used by the device log collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Debug => write!(f, "debug"),
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// Tri-state answer to "is there a newer firmware on the channel"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateAvailability {
    #[default]
    Unknown,
    Available,
    UpToDate,
}

impl From<bool> for UpdateAvailability {
    fn from(available: bool) -> Self {
        if available {
            UpdateAvailability::Available
        } else {
            UpdateAvailability::UpToDate
        }
    }
}

/// Installed and latest firmware versions as reported by the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionPair {
    pub installed: Option<String>,
    pub latest: Option<String>,
}

impl fmt::Display for VersionPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "installed: {}, available: {}",
            self.installed.as_deref().unwrap_or("unknown"),
            self.latest.as_deref().unwrap_or("unknown")
        )
    }
}

/// Status derived from live queries during one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceStatus {
    pub installed_version: Option<String>,
    pub latest_version: Option<String>,
    pub update_available: UpdateAvailability,
    /// Name of the backup file taken during the run, if any
    pub backup_file_name: Option<String>,
}

impl DeviceStatus {
    /// Installed/latest pair, once at least one of them is known
    pub fn versions(&self) -> Option<VersionPair> {
        if self.installed_version.is_none() && self.latest_version.is_none() {
            return None;
        }
        Some(VersionPair {
            installed: self.installed_version.clone(),
            latest: self.latest_version.clone(),
        })
    }
}

/// A router resolved from the configuration file
///
/// Every field has already been merged with the global defaults, so the
/// orchestrator never consults the raw configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    /// Name used in logs and for `-d` selection
    pub name: String,
    /// Hostname or IP address
    pub address: String,
    /// SSH port
    pub port: u16,
    /// Login used for public key authentication
    pub username: String,
    /// Pinned SSH host key fingerprint, if any
    pub host_key: Option<String>,
    /// Online or manual upgrade
    pub mode: UpgradeMode,
    /// Update channel the device should track
    pub channel: String,
    /// Local package files for manual upgrades
    pub packages: Vec<PathBuf>,
}

impl Device {
    /// Create an online device with default port and channel
    pub fn new(
        name: impl Into<String>,
        address: impl Into<String>,
        username: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            port: 22,
            username: username.into(),
            host_key: None,
            mode: UpgradeMode::Online,
            channel: "stable".to_string(),
            packages: vec![],
        }
    }

    /// `address:port` for socket connects
    pub fn socket_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}
