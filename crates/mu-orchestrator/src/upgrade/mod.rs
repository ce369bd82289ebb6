//! Per-device upgrade orchestration
//!
//! [`UpgradeOrchestrator::process_device`] drives one device through the
//! stages in [`RunState`]. The first failing step aborts the run; the failure
//! is logged once, here, and returned as part of the [`RunResult`].

mod state;

pub use state::{Acquisition, RunResult, RunState, UpgradeRun};

use std::sync::Arc;

use mu_core::config::GlobalPolicy;
use mu_core::traits::{
    AccessGrant, AccessProvisioner, DeviceLog, FileTransfer, NoProvisioning, RemoteSession,
    SessionConnector,
};
use mu_core::{Device, RunMode, UpdateAvailability, UpgradeMode};

use crate::backup::BackupStep;
use crate::channel::ChannelNegotiator;
use crate::error::RunError;
use crate::package::{self, PackageFile};
use crate::parse::{self, commands, UpdateCheck, PACKAGE_DESTINATION};
use crate::query;
use crate::reboot::RebootSupervisor;

/// Composes channel negotiation, backup, acquisition and reboot supervision
pub struct UpgradeOrchestrator<C> {
    connector: Arc<C>,
    policy: Arc<GlobalPolicy>,
    log: Arc<dyn DeviceLog>,
    provisioner: Arc<dyn AccessProvisioner>,
}

impl<C: SessionConnector> UpgradeOrchestrator<C> {
    pub fn new(connector: Arc<C>, policy: Arc<GlobalPolicy>, log: Arc<dyn DeviceLog>) -> Self {
        Self {
            connector,
            policy,
            log,
            provisioner: Arc::new(NoProvisioning),
        }
    }

    /// Set the collaborator consulted after an authentication failure
    pub fn with_provisioner(mut self, provisioner: Arc<dyn AccessProvisioner>) -> Self {
        self.provisioner = provisioner;
        self
    }

    pub fn policy(&self) -> &GlobalPolicy {
        &self.policy
    }

    /// Process one device in the given mode
    ///
    /// Never fails: every outcome, including connection errors, is reported
    /// in the returned [`RunResult`].
    pub async fn process_device(&self, device: &Device, mode: RunMode) -> RunResult {
        let mut run = UpgradeRun::new(&device.name, mode);
        tracing::info!(device = %device.name, %mode, upgrade = %device.mode, "processing device");

        let mut session = match self.open_session(device).await {
            Ok(session) => session,
            Err(e) => {
                self.fail(device, &mut run, &e);
                return run.finish();
            }
        };

        let outcome = match mode {
            RunMode::CheckOnly => self.check_only(&mut session, device, &mut run).await,
            RunMode::BackupOnly => self.backup_only(&mut session, device, &mut run).await,
            RunMode::UpdateOnly | RunMode::Full => {
                self.upgrade(&mut session, device, &mut run).await
            }
        };
        if let Err(e) = outcome {
            self.fail(device, &mut run, &e);
        }

        if let Err(e) = session.close().await {
            tracing::debug!(device = %device.name, error = %e, "closing session failed");
        }
        run.finish()
    }

    /// Connect, giving the access provisioner one chance after an auth failure
    async fn open_session(&self, device: &Device) -> Result<C::Session, RunError> {
        match self.connector.connect(device).await {
            Ok(session) => Ok(session),
            Err(e) if e.is_auth() => {
                self.log.warn(
                    &device.name,
                    &format!("{e}, trying to provision access"),
                );
                match self.provisioner.ensure_access(device).await {
                    AccessGrant::Granted => Ok(self.connector.connect(device).await?),
                    AccessGrant::Denied => Err(e.into()),
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    fn fail(&self, device: &Device, run: &mut UpgradeRun, error: &RunError) {
        let message = format!("{error} (during {})", run.state());
        self.log.error(&device.name, &message);
        run.abort(error.to_string());
        if error.is_timeout() {
            run.note("device left for manual follow-up");
        }
    }

    fn negotiator<'a>(&'a self, device: &'a Device) -> ChannelNegotiator<'a> {
        ChannelNegotiator::new(device, self.log.as_ref())
    }

    async fn check_only(
        &self,
        session: &mut C::Session,
        device: &Device,
        run: &mut UpgradeRun,
    ) -> Result<(), RunError> {
        match device.mode {
            UpgradeMode::Online => {
                let check = self
                    .negotiator(device)
                    .check_for_updates(session, &device.channel)
                    .await?;
                self.record_check(device, run, &check);
            }
            UpgradeMode::Manual => {
                let installed = query::installed_packages(session).await?;
                self.log.info(
                    &device.name,
                    &format!("installed packages: {}", query::describe_packages(&installed)),
                );
                let packages = PackageFile::collect(&device.packages)?;
                for p in &packages {
                    self.log.info(
                        &device.name,
                        &format!("would apply {} {}", p.name, p.version),
                    );
                }
                run.downgrade = package::detect_downgrade(&packages, &installed)?;
                if run.downgrade {
                    self.log.info(&device.name, "applying these packages is a downgrade");
                }
            }
        }
        Ok(())
    }

    async fn backup_only(
        &self,
        session: &mut C::Session,
        device: &Device,
        run: &mut UpgradeRun,
    ) -> Result<(), RunError> {
        run.advance(RunState::BackingUp);
        self.backup(session, device, run).await
    }

    async fn upgrade(
        &self,
        session: &mut C::Session,
        device: &Device,
        run: &mut UpgradeRun,
    ) -> Result<(), RunError> {
        match device.mode {
            UpgradeMode::Online => self.online_flow(session, device, run).await,
            UpgradeMode::Manual => self.manual_flow(session, device, run).await,
        }
    }

    /// Check, back up, download, reboot, verify
    ///
    /// An up-to-date device is left at the check. The previous update channel
    /// is put back whenever the run stops before packages were downloaded.
    /// After a download the device stays on the configured channel.
    async fn online_flow(
        &self,
        session: &mut C::Session,
        device: &Device,
        run: &mut UpgradeRun,
    ) -> Result<(), RunError> {
        let negotiator = self.negotiator(device);
        let previous = negotiator.ensure_channel(session, &device.channel).await?;

        let check = match negotiator.query_updates(session).await {
            Ok(check) => check,
            Err(e) => {
                negotiator.restore_or_warn(session, previous).await;
                return Err(e);
            }
        };
        self.record_check(device, run, &check);

        if !check.update_available {
            negotiator.restore_or_warn(session, previous).await;
            run.note("up to date");
            return Ok(());
        }

        run.advance(RunState::BackingUp);
        if let Err(e) = self.backup(session, device, run).await {
            negotiator.restore_or_warn(session, previous).await;
            return Err(e);
        }

        run.advance(RunState::Acquiring(Acquisition::Download));
        if let Err(e) = self.download(session, device).await {
            negotiator.restore_or_warn(session, previous).await;
            return Err(e);
        }
        run.acquired = true;
        if previous.is_some() {
            run.note(format!("update channel changed to {}", device.channel));
        }

        self.reboot_and_verify(session, device, run, false).await
    }

    async fn download(&self, session: &mut C::Session, device: &Device) -> Result<(), RunError> {
        self.log.info(&device.name, "downloading packages");
        let output = session.run(commands::DOWNLOAD).await?;
        if !parse::download_succeeded(&output) {
            return Err(RunError::unexpected("download", &output));
        }
        self.log.info(&device.name, "download successful");
        Ok(())
    }

    /// Validate, upload, back up, reboot (downgrading if needed), verify
    async fn manual_flow(
        &self,
        session: &mut C::Session,
        device: &Device,
        run: &mut UpgradeRun,
    ) -> Result<(), RunError> {
        let packages = PackageFile::collect(&device.packages)?;
        let installed = query::installed_packages(session).await?;
        tracing::debug!(
            device = %device.name,
            installed = %query::describe_packages(&installed),
            "installed packages"
        );
        run.downgrade = package::detect_downgrade(&packages, &installed)?;
        if run.downgrade {
            self.log.info(&device.name, "package downgrade detected");
            run.note("downgrade");
        }

        run.advance(RunState::Acquiring(Acquisition::Upload));
        for p in &packages {
            session
                .upload(&p.path, PACKAGE_DESTINATION)
                .await
                .map_err(|source| RunError::Transfer {
                    action: "upload",
                    file: p.file_name(),
                    source,
                })?;
            self.log.info(&device.name, &format!("uploaded {}", p.file_name()));
        }
        run.acquired = true;

        run.advance(RunState::BackingUp);
        self.backup(session, device, run).await?;

        let downgrade = run.downgrade;
        self.reboot_and_verify(session, device, run, downgrade).await
    }

    async fn backup(
        &self,
        session: &mut C::Session,
        device: &Device,
        run: &mut UpgradeRun,
    ) -> Result<(), RunError> {
        let identity = query::identity(session, device, self.log.as_ref()).await?;
        let outcome = BackupStep::new(&self.policy, self.log.as_ref())
            .run(session, device, &identity)
            .await?;
        run.status.backup_file_name = Some(outcome.file_name);
        run.backed_up = true;
        Ok(())
    }

    /// Reboot, wait for the device, then re-check versions on a fresh session
    async fn reboot_and_verify(
        &self,
        session: &mut C::Session,
        device: &Device,
        run: &mut UpgradeRun,
        downgrade: bool,
    ) -> Result<(), RunError> {
        debug_assert!(run.backed_up, "reboot without backup");
        let supervisor = RebootSupervisor::from_policy(
            self.connector.as_ref(),
            &self.policy,
            self.log.as_ref(),
        );

        run.advance(RunState::Rebooting);
        let started = supervisor.reboot(session, device, downgrade).await;

        run.advance(RunState::Reconnecting);
        supervisor.wait_for_reconnect_since(device, started).await?;
        run.reconnected = true;

        let fresh = self.connector.connect(device).await?;
        let mut stale = std::mem::replace(session, fresh);
        if let Err(e) = stale.close().await {
            tracing::debug!(device = %device.name, error = %e, "closing pre-reboot session failed");
        }

        let check = self
            .negotiator(device)
            .check_for_updates(session, &device.channel)
            .await?;
        self.record_check(device, run, &check);

        run.advance(RunState::Verified);
        self.log.info(
            &device.name,
            &format!(
                "upgrade verified, {}",
                run.status.versions().map(|v| v.to_string()).unwrap_or_default()
            ),
        );
        Ok(())
    }

    fn record_check(&self, device: &Device, run: &mut UpgradeRun, check: &UpdateCheck) {
        run.status.installed_version = check.installed_version.clone();
        run.status.latest_version = check.latest_version.clone();
        run.status.update_available = UpdateAvailability::from(check.update_available);

        let versions = run.status.versions().map(|v| v.to_string());
        let message = if check.update_available {
            "new version available"
        } else {
            "no new version available"
        };
        match versions {
            Some(v) => self.log.info(&device.name, &format!("{message} ({v})")),
            None => self.log.info(&device.name, message),
        }
    }
}
