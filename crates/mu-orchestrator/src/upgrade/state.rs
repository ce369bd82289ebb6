//! Per-device run state

use std::fmt;

use mu_core::{DeviceStatus, RunMode, VersionPair};

/// How firmware reaches the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquisition {
    Download,
    Upload,
}

/// Stage of a device run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Checking,
    BackingUp,
    Acquiring(Acquisition),
    Rebooting,
    Reconnecting,
    Verified,
    /// Terminal state after a failed step
    Aborted,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Checking => write!(f, "checking"),
            RunState::BackingUp => write!(f, "backup"),
            RunState::Acquiring(Acquisition::Download) => write!(f, "download"),
            RunState::Acquiring(Acquisition::Upload) => write!(f, "upload"),
            RunState::Rebooting => write!(f, "reboot"),
            RunState::Reconnecting => write!(f, "reconnect"),
            RunState::Verified => write!(f, "verified"),
            RunState::Aborted => write!(f, "aborted"),
        }
    }
}

/// Execution record of one device run
///
/// Created when processing of a device starts and consumed into a
/// [`RunResult`] at the end; never shared between devices.
#[derive(Debug)]
pub struct UpgradeRun {
    device: String,
    mode: RunMode,
    history: Vec<RunState>,
    failed_at: Option<RunState>,
    pub status: DeviceStatus,
    pub downgrade: bool,
    pub backed_up: bool,
    pub acquired: bool,
    pub reconnected: bool,
    notes: Vec<String>,
}

impl UpgradeRun {
    pub fn new(device: impl Into<String>, mode: RunMode) -> Self {
        Self {
            device: device.into(),
            mode,
            history: vec![RunState::Checking],
            failed_at: None,
            status: DeviceStatus::default(),
            downgrade: false,
            backed_up: false,
            acquired: false,
            reconnected: false,
            notes: Vec::new(),
        }
    }

    pub fn state(&self) -> RunState {
        self.history
            .last()
            .copied()
            .unwrap_or(RunState::Checking)
    }

    /// Move to the next stage; stages are never re-entered
    pub fn advance(&mut self, next: RunState) {
        debug_assert!(
            !self.history.contains(&next),
            "run for {} re-entered {next}",
            self.device
        );
        debug_assert!(self.state() != RunState::Aborted);
        tracing::debug!(device = %self.device, from = %self.state(), to = %next, "run state");
        self.history.push(next);
    }

    /// Record the failing stage and move to [`RunState::Aborted`]
    pub fn abort(&mut self, reason: impl Into<String>) {
        if self.state() == RunState::Aborted {
            return;
        }
        self.failed_at = Some(self.state());
        self.notes.push(reason.into());
        self.history.push(RunState::Aborted);
    }

    pub fn note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    pub fn finish(self) -> RunResult {
        let final_state = self.state();
        RunResult {
            device: self.device,
            mode: self.mode,
            succeeded: final_state != RunState::Aborted,
            final_state,
            failed_at: self.failed_at,
            status: self.status,
            downgrade: self.downgrade,
            notes: self.notes,
            states: self.history,
        }
    }
}

/// Outcome of processing one device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    pub device: String,
    pub mode: RunMode,
    pub succeeded: bool,
    pub final_state: RunState,
    /// Stage that failed, when the run was aborted
    pub failed_at: Option<RunState>,
    pub status: DeviceStatus,
    pub downgrade: bool,
    pub notes: Vec<String>,
    /// Every stage the run passed through, in order
    pub states: Vec<RunState>,
}

impl RunResult {
    pub fn versions(&self) -> Option<VersionPair> {
        self.status.versions()
    }

    /// Whether the run passed through `state`
    pub fn visited(&self, state: RunState) -> bool {
        self.states.contains(&state)
    }
}
