//! Device log backed by `tracing`

use mu_core::traits::DeviceLog;
use mu_core::Severity;

/// `tracing` target of device log events
pub const DEVICE_TARGET: &str = "mu::device";

/// Emits every line as a `tracing` event with the device as a field
///
/// Lines flagged for stdout are also printed, prefixed with the device name.
#[derive(Debug, Clone, Copy)]
pub struct TracingLog {
    echo: bool,
}

impl TracingLog {
    pub fn new() -> Self {
        Self { echo: true }
    }

    /// Never print to stdout, even when asked to
    pub fn quiet() -> Self {
        Self { echo: false }
    }
}

impl Default for TracingLog {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceLog for TracingLog {
    fn log(&self, severity: Severity, device: &str, message: &str, stdout: bool) {
        match severity {
            Severity::Debug => tracing::debug!(target: DEVICE_TARGET, device, "{message}"),
            Severity::Info => tracing::info!(target: DEVICE_TARGET, device, "{message}"),
            Severity::Warning => tracing::warn!(target: DEVICE_TARGET, device, "{message}"),
            Severity::Error => tracing::error!(target: DEVICE_TARGET, device, "{message}"),
        }
        if stdout && self.echo {
            println!("{device}: {message}");
        }
    }
}
