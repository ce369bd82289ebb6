//! Reboot and reconnection supervision
//!
//! After a reboot command the device drops the session, so the supervisor
//! polls with lightweight probes until a login succeeds again or the
//! deadline passes. Probes never outlive the deadline.

use std::time::Duration;

use tokio::time::Instant;

use mu_core::config::GlobalPolicy;
use mu_core::traits::{DeviceLog, RemoteSession, SessionConnector};
use mu_core::Device;

use crate::error::RunError;
use crate::parse::commands;

/// Issues reboots and waits for devices to come back
pub struct RebootSupervisor<'a, C> {
    connector: &'a C,
    interval: Duration,
    deadline: Duration,
    log: &'a dyn DeviceLog,
}

impl<'a, C: SessionConnector> RebootSupervisor<'a, C> {
    pub fn new(
        connector: &'a C,
        interval: Duration,
        deadline: Duration,
        log: &'a dyn DeviceLog,
    ) -> Self {
        Self {
            connector,
            interval,
            deadline,
            log,
        }
    }

    /// Supervisor using the policy's probe interval and reboot timeout
    pub fn from_policy(connector: &'a C, policy: &GlobalPolicy, log: &'a dyn DeviceLog) -> Self {
        Self::new(connector, policy.probe_interval, policy.reboot_timeout, log)
    }

    /// Send the reboot (or downgrade) command
    ///
    /// The device usually drops the connection before answering, so an error
    /// here is reported and otherwise ignored; [`Self::wait_for_reconnect_since`]
    /// decides whether the reboot worked. The command gets no longer than the
    /// reboot deadline, and the returned instant is when that deadline started.
    pub async fn reboot<S: RemoteSession>(
        &self,
        session: &mut S,
        device: &Device,
        downgrade: bool,
    ) -> Instant {
        let command = if downgrade {
            self.log.info(&device.name, "downgrading packages and rebooting");
            commands::DOWNGRADE
        } else {
            self.log.info(&device.name, "rebooting");
            commands::REBOOT
        };

        let start = Instant::now();
        match tokio::time::timeout(self.deadline, session.run(command)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => self.log.warn(
                &device.name,
                &format!("reboot command returned an error: {e}"),
            ),
            Err(_) => self.log.warn(
                &device.name,
                &format!(
                    "reboot command did not return within {}s",
                    self.deadline.as_secs()
                ),
            ),
        }
        start
    }

    /// Poll until the device accepts a login again
    ///
    /// Returns how long the device took to come back.
    pub async fn wait_for_reconnect(&self, device: &Device) -> Result<Duration, RunError> {
        self.wait_for_reconnect_since(device, Instant::now()).await
    }

    /// Like [`Self::wait_for_reconnect`], with the deadline counted from `start`
    pub async fn wait_for_reconnect_since(
        &self,
        device: &Device,
        start: Instant,
    ) -> Result<Duration, RunError> {
        self.log.info(&device.name, "waiting for device to come back");
        let mut probes = 0u32;

        loop {
            let remaining = self.deadline.saturating_sub(start.elapsed());
            if remaining.is_zero() {
                tracing::debug!(device = %device.name, probes, "reboot deadline reached");
                return Err(RunError::RebootTimeout(self.deadline.as_secs()));
            }

            tokio::time::sleep(self.interval.min(remaining)).await;

            let remaining = self.deadline.saturating_sub(start.elapsed());
            if remaining.is_zero() {
                continue;
            }

            probes += 1;
            let reachable = tokio::time::timeout(remaining, self.connector.probe(device))
                .await
                .unwrap_or(false);
            if reachable {
                let elapsed = start.elapsed();
                self.log.info(
                    &device.name,
                    &format!("device is back after {}s", elapsed.as_secs()),
                );
                return Ok(elapsed);
            }
            tracing::debug!(device = %device.name, probes, "device not reachable yet");
        }
    }
}
