//! Sequential processing of a device list

use tokio_util::sync::CancellationToken;

use mu_core::traits::SessionConnector;
use mu_core::{Device, RunMode};

use crate::upgrade::{RunResult, UpgradeOrchestrator};

/// Runs the orchestrator over devices one at a time
///
/// A failing device never stops the batch. Cancellation is only checked
/// between devices, so a step that has started always runs to completion.
pub struct BatchRunner<C> {
    orchestrator: UpgradeOrchestrator<C>,
    cancel: CancellationToken,
}

impl<C: SessionConnector> BatchRunner<C> {
    pub fn new(orchestrator: UpgradeOrchestrator<C>) -> Self {
        Self {
            orchestrator,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop starting new devices once `token` is cancelled
    pub fn with_shutdown_token(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub async fn run(&self, devices: &[Device], mode: RunMode) -> Vec<RunResult> {
        tracing::info!(devices = devices.len(), %mode, "script started");
        let mut results = Vec::with_capacity(devices.len());

        for device in devices {
            if self.cancel.is_cancelled() {
                tracing::warn!(
                    skipped = devices.len() - results.len(),
                    "cancelled, remaining devices skipped"
                );
                break;
            }
            results.push(self.orchestrator.process_device(device, mode).await);
        }

        let failed = results.iter().filter(|r| !r.succeeded).count();
        tracing::info!(processed = results.len(), failed, "script completed");
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::commands;
    use crate::testing::ScriptedSession;
    use async_trait::async_trait;
    use mu_core::config::GlobalPolicy;
    use mu_core::error::ConnectError;
    use mu_core::traits::MemoryLog;
    use std::sync::Arc;

    /// Refuses connections to devices named `down*`
    struct Selective;

    #[async_trait]
    impl SessionConnector for Selective {
        type Session = ScriptedSession;

        async fn connect(&self, device: &Device) -> Result<ScriptedSession, ConnectError> {
            if device.name.starts_with("down") {
                Err(ConnectError::Refused(device.socket_address()))
            } else {
                Ok(ScriptedSession::new()
                    .respond(commands::UPDATE_PRINT, "  channel: stable")
                    .respond(
                        commands::CHECK_FOR_UPDATES,
                        "  installed-version: 7.16\n     latest-version: 7.16",
                    ))
            }
        }

        async fn probe(&self, _device: &Device) -> bool {
            true
        }
    }

    fn runner() -> BatchRunner<Selective> {
        let policy = GlobalPolicy::new("/tmp/mu-backups", "/dev/null");
        let orchestrator = UpgradeOrchestrator::new(
            Arc::new(Selective),
            Arc::new(policy),
            Arc::new(MemoryLog::new()),
        );
        BatchRunner::new(orchestrator)
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_batch() {
        let devices = vec![
            Device::new("down1", "10.0.0.1", "mu"),
            Device::new("gw2", "10.0.0.2", "mu"),
        ];

        let results = runner().run(&devices, RunMode::CheckOnly).await;

        assert_eq!(results.len(), 2);
        assert!(!results[0].succeeded);
        assert!(results[1].succeeded);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_processes_nothing() {
        let token = CancellationToken::new();
        token.cancel();
        let devices = vec![Device::new("gw1", "10.0.0.1", "mu")];

        let results = runner()
            .with_shutdown_token(token)
            .run(&devices, RunMode::CheckOnly)
            .await;

        assert!(results.is_empty());
    }
}
