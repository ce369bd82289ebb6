//! Configuration backup
//!
//! A backup is only trusted once the device printed the exact confirmation
//! line and the file arrived in the local backup directory. Nothing is
//! downloaded unless the save was confirmed.

use std::path::PathBuf;

use chrono::{DateTime, Local};

use mu_core::config::GlobalPolicy;
use mu_core::traits::{DeviceLog, FileTransfer, RemoteSession};
use mu_core::{Device, Severity};

use crate::error::RunError;
use crate::parse::{self, commands};

/// A backup that was saved on the device and downloaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupOutcome {
    /// File name on the device (`identity-YYYYMMDD-HHMM.backup`)
    pub file_name: String,
    /// Where the file was stored locally
    pub local_path: PathBuf,
    /// Whether the on-device copy was removed afterwards
    pub remote_deleted: bool,
}

/// Backup base name: `{identity}-{YYYYMMDD-HHMM}`
pub fn backup_name(identity: &str, at: &DateTime<Local>) -> String {
    format!("{}-{}", identity, at.format("%Y%m%d-%H%M"))
}

/// Saves, downloads and optionally removes a configuration backup
pub struct BackupStep<'a> {
    policy: &'a GlobalPolicy,
    log: &'a dyn DeviceLog,
}

impl<'a> BackupStep<'a> {
    pub fn new(policy: &'a GlobalPolicy, log: &'a dyn DeviceLog) -> Self {
        Self { policy, log }
    }

    /// Take a backup named after `identity` and the current local time
    pub async fn run<S>(
        &self,
        session: &mut S,
        device: &Device,
        identity: &str,
    ) -> Result<BackupOutcome, RunError>
    where
        S: RemoteSession + FileTransfer,
    {
        self.run_at(session, device, identity, Local::now()).await
    }

    /// Take a backup with an explicit timestamp
    pub async fn run_at<S>(
        &self,
        session: &mut S,
        device: &Device,
        identity: &str,
        at: DateTime<Local>,
    ) -> Result<BackupOutcome, RunError>
    where
        S: RemoteSession + FileTransfer,
    {
        let name = backup_name(identity, &at);
        let file_name = format!("{name}.backup");

        self.log.log(
            Severity::Info,
            &device.name,
            &format!("running backup to file {file_name}"),
            false,
        );
        let output = session.run(&commands::backup_save(&name)).await?;
        if !parse::backup_saved(&output) {
            return Err(RunError::unexpected("backup", &output));
        }
        self.log
            .info(&device.name, &format!("backup saved to {file_name}"));

        let backup_dir = self.policy.backup_dir();
        tokio::fs::create_dir_all(&backup_dir).await?;
        let local_path = session
            .download(&file_name, &backup_dir)
            .await
            .map_err(|source| RunError::Transfer {
                action: "download",
                file: file_name.clone(),
                source,
            })?;
        self.log.info(
            &device.name,
            &format!("backup downloaded to {}", local_path.display()),
        );

        let remote_deleted = if self.policy.delete_backup_after_download {
            self.delete_remote(session, device, &file_name).await
        } else {
            false
        };

        Ok(BackupOutcome {
            file_name,
            local_path,
            remote_deleted,
        })
    }

    // Deletion failures are reported, never fatal.
    async fn delete_remote<S: RemoteSession>(
        &self,
        session: &mut S,
        device: &Device,
        file_name: &str,
    ) -> bool {
        self.log.info(&device.name, "deleting backup on device");
        match session.run(&commands::file_remove(file_name)).await {
            Ok(output) if output.iter().all(|l| l.trim().is_empty()) => true,
            Ok(output) => {
                self.log.warn(
                    &device.name,
                    &format!(
                        "failed to delete {file_name} on device: {}",
                        output.join(" | ")
                    ),
                );
                false
            }
            Err(e) => {
                self.log.warn(
                    &device.name,
                    &format!("failed to delete {file_name} on device: {e}"),
                );
                false
            }
        }
    }
}
