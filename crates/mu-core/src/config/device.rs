//! Device inventory entries

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::types::UpgradeMode;

/// One `[[devices]]` entry as written in the configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceProfile {
    /// Name used in logs and for device selection
    pub name: String,

    /// Hostname or IP address
    pub address: String,

    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub username: Option<String>,

    /// Expected SSH host key fingerprint (`SHA256:...`)
    #[serde(default)]
    pub host_key: Option<String>,

    #[serde(default, alias = "online_update_channel", alias = "online_upgrade_channel")]
    pub update_channel: Option<String>,

    #[serde(default, alias = "upgrade_type")]
    pub update_type: Option<UpgradeMode>,

    /// Package files for manual upgrades
    #[serde(default)]
    pub packages: Vec<PathBuf>,
}
