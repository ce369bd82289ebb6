//! Device log collaborator

use std::sync::Mutex;

use crate::types::Severity;

/// Audit log of what happened to each device
///
/// Logging is fire-and-forget: implementations must not fail the caller.
pub trait DeviceLog: Send + Sync {
    /// Record one line; `stdout` asks for the line to be echoed to the operator
    fn log(&self, severity: Severity, device: &str, message: &str, stdout: bool);

    fn info(&self, device: &str, message: &str) {
        self.log(Severity::Info, device, message, true);
    }

    fn warn(&self, device: &str, message: &str) {
        self.log(Severity::Warning, device, message, true);
    }

    fn error(&self, device: &str, message: &str) {
        self.log(Severity::Error, device, message, true);
    }
}

/// A recorded log line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub severity: Severity,
    pub device: String,
    pub message: String,
    pub stdout: bool,
}

/// In-memory log, used by tests and by callers that render logs themselves
#[derive(Debug, Default)]
pub struct MemoryLog {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything logged so far
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    /// Entries of one severity
    pub fn with_severity(&self, severity: Severity) -> Vec<LogEntry> {
        self.entries()
            .into_iter()
            .filter(|e| e.severity == severity)
            .collect()
    }

    /// Whether any message contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.entries().iter().any(|e| e.message.contains(needle))
    }
}

impl DeviceLog for MemoryLog {
    fn log(&self, severity: Severity, device: &str, message: &str, stdout: bool) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(LogEntry {
                severity,
                device: device.to_string(),
                message: message.to_string(),
                stdout,
            });
        }
    }
}
