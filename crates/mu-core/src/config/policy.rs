//! Global run policy

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::serde_utils::duration_secs;
use crate::error::ConfigError;
use crate::types::UpgradeMode;

/// Policy shared read-only by every device in a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalPolicy {
    /// Local directory backups are downloaded into
    pub backup_dir: PathBuf,

    /// Private key used for public key authentication on every device
    pub private_key_file: PathBuf,

    /// Default login for devices that omit one
    #[serde(default)]
    pub username: Option<String>,

    /// Default SSH port for devices that omit one
    #[serde(default)]
    pub port: Option<u16>,

    /// Directory for the run log file
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// How long to wait for a device to come back after reboot
    #[serde(default = "default_reboot_timeout", with = "duration_secs")]
    pub reboot_timeout: Duration,

    /// Pause between reconnection probes while waiting for a reboot
    #[serde(default = "default_probe_interval", with = "duration_secs")]
    pub probe_interval: Duration,

    /// Upper bound for a single SSH connect or probe
    #[serde(default = "default_connect_timeout", with = "duration_secs")]
    pub connect_timeout: Duration,

    /// Remove the backup file from the device once it is downloaded
    #[serde(default)]
    pub delete_backup_after_download: bool,

    /// Default update channel
    #[serde(default, alias = "online_update_channel", alias = "online_upgrade_channel")]
    pub update_channel: Option<String>,

    /// Default upgrade mode
    #[serde(default, alias = "upgrade_type")]
    pub update_type: Option<UpgradeMode>,
}

fn default_reboot_timeout() -> Duration {
    Duration::from_secs(240)
}

fn default_probe_interval() -> Duration {
    Duration::from_secs(5)
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(30)
}

impl GlobalPolicy {
    /// Create a policy with default timings
    pub fn new(backup_dir: impl Into<PathBuf>, private_key_file: impl Into<PathBuf>) -> Self {
        Self {
            backup_dir: backup_dir.into(),
            private_key_file: private_key_file.into(),
            username: None,
            port: None,
            log_dir: None,
            reboot_timeout: default_reboot_timeout(),
            probe_interval: default_probe_interval(),
            connect_timeout: default_connect_timeout(),
            delete_backup_after_download: false,
            update_channel: None,
            update_type: None,
        }
    }

    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        if self.backup_dir.as_os_str().is_empty() {
            return Err(ConfigError::MissingField("global.backup_dir".to_string()));
        }
        if self.private_key_file.as_os_str().is_empty() {
            return Err(ConfigError::MissingField(
                "global.private_key_file".to_string(),
            ));
        }
        if self.reboot_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "reboot_timeout must be greater than zero".to_string(),
            ));
        }
        if self.probe_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "probe_interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Backup directory with `~/` expanded
    pub fn backup_dir(&self) -> PathBuf {
        super::expand_home(&self.backup_dir)
    }

    /// Private key path with `~/` expanded
    pub fn private_key_file(&self) -> PathBuf {
        super::expand_home(&self.private_key_file)
    }

    /// Log directory with `~/` expanded
    pub fn log_dir(&self) -> Option<PathBuf> {
        self.log_dir.as_deref().map(super::expand_home)
    }
}
