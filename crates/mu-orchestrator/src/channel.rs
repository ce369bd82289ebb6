//! Update channel negotiation and update checks
//!
//! Switching channels is a temporary side effect: [`ChannelNegotiator::check_for_updates`]
//! always puts the original channel back before returning, whether the check
//! succeeded or not, so repeated checks leave the device configuration as
//! they found it.

use mu_core::traits::{DeviceLog, RemoteSession};
use mu_core::Device;

use crate::error::RunError;
use crate::parse::{self, commands, UpdateCheck};

/// Reads, sets and restores the update channel of one device
pub struct ChannelNegotiator<'a> {
    device: &'a Device,
    log: &'a dyn DeviceLog,
}

impl<'a> ChannelNegotiator<'a> {
    pub fn new(device: &'a Device, log: &'a dyn DeviceLog) -> Self {
        Self { device, log }
    }

    /// Current channel, `None` when the device does not report one
    pub async fn get_channel<S: RemoteSession>(
        &self,
        session: &mut S,
    ) -> Result<Option<String>, RunError> {
        let output = session.run(commands::UPDATE_PRINT).await?;
        Ok(parse::field_value(&output, "channel").map(str::to_string))
    }

    /// Set the channel, failing if the device rejects the command
    pub async fn set_channel<S: RemoteSession>(
        &self,
        session: &mut S,
        channel: &str,
    ) -> Result<(), RunError> {
        let output = session.run(&commands::set_channel(channel)).await?;
        if parse::has_syntax_error(&output) {
            return Err(RunError::unexpected("setting update channel", &output));
        }
        Ok(())
    }

    /// Switch to `desired` if needed
    ///
    /// Returns the channel that was active before the switch, or `None` when
    /// nothing changed. A device that does not report its channel is left
    /// alone, since the switch could not be undone.
    pub async fn ensure_channel<S: RemoteSession>(
        &self,
        session: &mut S,
        desired: &str,
    ) -> Result<Option<String>, RunError> {
        let Some(current) = self.get_channel(session).await? else {
            self.log.warn(
                &self.device.name,
                &format!("current update channel unknown, not switching to {desired}"),
            );
            return Ok(None);
        };
        if current == desired {
            return Ok(None);
        }

        self.log.info(
            &self.device.name,
            &format!("setting desired update channel {desired}"),
        );
        self.set_channel(session, desired).await?;
        Ok(Some(current))
    }

    /// Re-apply a channel captured by [`ChannelNegotiator::ensure_channel`]
    pub async fn restore_channel<S: RemoteSession>(
        &self,
        session: &mut S,
        previous: Option<String>,
    ) -> Result<(), RunError> {
        let Some(previous) = previous else {
            return Ok(());
        };
        tracing::debug!(device = %self.device.name, channel = %previous, "restoring update channel");
        self.set_channel(session, &previous).await
    }

    /// Restore, surfacing a failure as a warning
    pub async fn restore_or_warn<S: RemoteSession>(&self, session: &mut S, previous: Option<String>) {
        let channel = previous.clone();
        if let Err(e) = self.restore_channel(session, previous).await {
            self.log.warn(
                &self.device.name,
                &format!(
                    "failed to restore update channel {}: {e}",
                    channel.as_deref().unwrap_or("?")
                ),
            );
        }
    }

    /// Run `check-for-updates` on the current channel
    pub async fn query_updates<S: RemoteSession>(
        &self,
        session: &mut S,
    ) -> Result<UpdateCheck, RunError> {
        let output = session.run(commands::CHECK_FOR_UPDATES).await?;
        let check = parse::parse_update_check(&output);
        if !check.is_conclusive() {
            return Err(RunError::unexpected("update check", &output));
        }
        if check.already_downloaded {
            self.log.warn(
                &self.device.name,
                "update already downloaded. reboot manually",
            );
        }
        Ok(check)
    }

    /// Check for updates on `desired`, then restore the original channel
    pub async fn check_for_updates<S: RemoteSession>(
        &self,
        session: &mut S,
        desired: &str,
    ) -> Result<UpdateCheck, RunError> {
        let previous = self.ensure_channel(session, desired).await?;
        let check = self.query_updates(session).await;
        self.restore_or_warn(session, previous).await;
        check
    }
}
