//! Configuration management for mu
//!
//! A configuration file holds one `[global]` table (the [`GlobalPolicy`])
//! and any number of `[[devices]]` entries ([`DeviceProfile`]). Device
//! fields that are omitted inherit the global value, then a built-in default.

mod device;
mod policy;
pub mod serde_utils;

pub use device::DeviceProfile;
pub use policy::GlobalPolicy;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::types::{Device, UpgradeMode};

/// Port used when neither the device nor the global section sets one
pub const DEFAULT_PORT: u16 = 22;

/// Channel used when neither the device nor the global section sets one
pub const DEFAULT_CHANNEL: &str = "stable";

/// Get the default configuration directory
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mu")
}

/// Get the default configuration file path
pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.toml")
}

/// Expand a leading `~/` to the user's home directory
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| path.to_path_buf()),
        Err(_) => path.to_path_buf(),
    }
}

/// Load configuration from a file
pub fn load_config<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Invalid(format!("Failed to read config: {}", e)))?;

    let config: T = toml::from_str(&content)?;
    Ok(config)
}

/// The whole configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Policy shared by every device
    pub global: GlobalPolicy,

    /// Device inventory
    #[serde(default)]
    pub devices: Vec<DeviceProfile>,
}

impl ConfigFile {
    /// Load and validate a configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config: Self = load_config(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the cross-field rules that serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.global.validate()?;

        if self.devices.is_empty() {
            return Err(ConfigError::Invalid("no devices specified".to_string()));
        }

        let mut seen = HashSet::new();
        for profile in &self.devices {
            if profile.name.trim().is_empty() {
                return Err(ConfigError::MissingField("devices.name".to_string()));
            }
            if profile.address.trim().is_empty() {
                return Err(ConfigError::MissingField(format!(
                    "devices.address (device {})",
                    profile.name
                )));
            }
            if !seen.insert(profile.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "device {} is defined more than once",
                    profile.name
                )));
            }
            if profile.username.is_none() && self.global.username.is_none() {
                return Err(ConfigError::Invalid(format!(
                    "username not specified for device {} nor globally",
                    profile.name
                )));
            }
            if self.resolve_mode(profile) == UpgradeMode::Manual && profile.packages.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "device {} uses manual updates but lists no packages",
                    profile.name
                )));
            }
        }

        Ok(())
    }

    /// Resolve every device profile against the global defaults
    pub fn devices(&self) -> Result<Vec<Device>, ConfigError> {
        self.devices.iter().map(|p| self.resolve(p)).collect()
    }

    /// Resolve only the named devices, preserving the order of `names`
    ///
    /// An empty selection means every device.
    pub fn select(&self, names: &[String]) -> Result<Vec<Device>, ConfigError> {
        if names.is_empty() {
            return self.devices();
        }

        names
            .iter()
            .map(|name| {
                self.devices
                    .iter()
                    .find(|p| &p.name == name)
                    .ok_or_else(|| ConfigError::UnknownDevice(name.clone()))
                    .and_then(|p| self.resolve(p))
            })
            .collect()
    }

    fn resolve_mode(&self, profile: &DeviceProfile) -> UpgradeMode {
        profile
            .update_type
            .or(self.global.update_type)
            .unwrap_or_default()
    }

    fn resolve(&self, profile: &DeviceProfile) -> Result<Device, ConfigError> {
        let username = profile
            .username
            .clone()
            .or_else(|| self.global.username.clone())
            .ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "username not specified for device {} nor globally",
                    profile.name
                ))
            })?;

        let mode = self.resolve_mode(profile);
        let packages = match mode {
            UpgradeMode::Manual => profile.packages.iter().map(|p| expand_home(p)).collect(),
            UpgradeMode::Online => vec![],
        };

        Ok(Device {
            name: profile.name.clone(),
            address: profile.address.clone(),
            port: profile.port.or(self.global.port).unwrap_or(DEFAULT_PORT),
            username,
            host_key: profile.host_key.clone(),
            mode,
            channel: profile
                .update_channel
                .clone()
                .or_else(|| self.global.update_channel.clone())
                .unwrap_or_else(|| DEFAULT_CHANNEL.to_string()),
            packages,
        })
    }
}
