//! Device log for interactive runs

use mu_core::traits::DeviceLog;
use mu_core::Severity;
use mu_orchestrator::TracingLog;

use crate::output::{print_error, print_info, print_warning};

/// Colored terminal output on top of [`TracingLog`]
///
/// Every line still becomes a `tracing` event (and lands in the log file);
/// lines meant for the operator are additionally printed with a colored
/// prefix. In quiet mode only errors are printed.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleLog {
    events: TracingLog,
    quiet: bool,
}

impl ConsoleLog {
    pub fn new(quiet: bool) -> Self {
        Self {
            events: TracingLog::quiet(),
            quiet,
        }
    }
}

impl DeviceLog for ConsoleLog {
    fn log(&self, severity: Severity, device: &str, message: &str, stdout: bool) {
        self.events.log(severity, device, message, false);
        if !stdout {
            return;
        }

        let line = format!("{device}: {message}");
        match severity {
            Severity::Error => print_error(&line),
            Severity::Warning if !self.quiet => print_warning(&line),
            Severity::Info if !self.quiet => print_info(&line),
            _ => {}
        }
    }
}
