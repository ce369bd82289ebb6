//! Read-only device queries

use mu_core::traits::{DeviceLog, RemoteSession};
use mu_core::Device;

use crate::error::RunError;
use crate::parse::{self, commands, InstalledPackage};

/// Device identity, falling back to the configured name
pub async fn identity<S: RemoteSession>(
    session: &mut S,
    device: &Device,
    log: &dyn DeviceLog,
) -> Result<String, RunError> {
    let output = session.run(commands::IDENTITY).await?;
    match parse::parse_identity(&output) {
        Some(identity) => Ok(identity),
        None => {
            log.warn(
                &device.name,
                "device did not report an identity, using configured name",
            );
            Ok(device.name.clone())
        }
    }
}

/// Installed packages and their versions
pub async fn installed_packages<S: RemoteSession>(
    session: &mut S,
) -> Result<Vec<InstalledPackage>, RunError> {
    let output = session.run(commands::PACKAGE_PRINT).await?;
    Ok(parse::parse_installed_packages(&output))
}

/// `name version` pairs for log lines
pub fn describe_packages(packages: &[InstalledPackage]) -> String {
    let described: Vec<String> = packages
        .iter()
        .map(|p| format!("{} {}", p.name, p.version))
        .collect();
    format!("[{}]", described.join(", "))
}
