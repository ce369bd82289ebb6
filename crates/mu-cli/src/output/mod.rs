//! Output formatting utilities for the CLI

use tabled::{
    settings::{Style, Width},
    Table, Tabled,
};

use mu_orchestrator::RunResult;

/// Format the outcome of every device run as a table
pub fn format_results(results: &[RunResult]) -> String {
    if results.is_empty() {
        return "No devices processed".to_string();
    }

    #[derive(Tabled)]
    struct ResultRow {
        #[tabled(rename = "DEVICE")]
        device: String,
        #[tabled(rename = "MODE")]
        mode: String,
        #[tabled(rename = "RESULT")]
        result: String,
        #[tabled(rename = "STAGE")]
        stage: String,
        #[tabled(rename = "INSTALLED")]
        installed: String,
        #[tabled(rename = "AVAILABLE")]
        available: String,
        #[tabled(rename = "BACKUP")]
        backup: String,
        #[tabled(rename = "NOTES")]
        notes: String,
    }

    let rows: Vec<ResultRow> = results
        .iter()
        .map(|r| ResultRow {
            device: r.device.clone(),
            mode: r.mode.to_string(),
            result: if r.succeeded { "ok" } else { "FAILED" }.to_string(),
            stage: r.failed_at.unwrap_or(r.final_state).to_string(),
            installed: or_dash(r.status.installed_version.as_deref()),
            available: or_dash(r.status.latest_version.as_deref()),
            backup: or_dash(r.status.backup_file_name.as_deref()),
            notes: truncate(&r.notes.join("; "), 60),
        })
        .collect();

    Table::new(rows)
        .with(Style::rounded())
        .with(Width::wrap(140))
        .to_string()
}

/// One-line totals printed under the table
pub fn format_totals(results: &[RunResult]) -> String {
    let failed = results.iter().filter(|r| !r.succeeded).count();
    format!(
        "{} device(s) processed, {} succeeded, {} failed",
        results.len(),
        results.len() - failed,
        failed
    )
}

fn or_dash(value: Option<&str>) -> String {
    value.unwrap_or("-").to_string()
}

/// Truncate a string with ellipsis if too long
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

/// Print a success message in green with a checkmark prefix
pub fn print_success(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stdout = std::io::stdout();
    let _ = crossterm::execute!(
        stdout,
        SetForegroundColor(Color::Green),
        Print("✓ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print an error message in red with an X prefix
///
/// Outputs to stderr.
pub fn print_error(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Red),
        Print("✗ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print a warning message in yellow with a warning symbol prefix
pub fn print_warning(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Yellow),
        Print("⚠ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print an informational message in cyan with an info symbol prefix
pub fn print_info(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stdout = std::io::stdout();
    let _ = crossterm::execute!(
        stdout,
        SetForegroundColor(Color::Cyan),
        Print("ℹ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use mu_core::{DeviceStatus, RunMode};
    use mu_orchestrator::RunState;

    fn result(device: &str, succeeded: bool) -> RunResult {
        RunResult {
            device: device.to_string(),
            mode: RunMode::Full,
            succeeded,
            final_state: if succeeded {
                RunState::Verified
            } else {
                RunState::Aborted
            },
            failed_at: (!succeeded).then_some(RunState::BackingUp),
            status: DeviceStatus {
                installed_version: Some("7.16".to_string()),
                ..DeviceStatus::default()
            },
            downgrade: false,
            notes: vec![],
            states: vec![],
        }
    }

    #[test]
    fn test_format_results() {
        let table = format_results(&[result("gw1", true), result("gw2", false)]);
        assert!(table.contains("gw1"));
        assert!(table.contains("verified"));
        assert!(table.contains("FAILED"));
        assert!(table.contains("backup"));
        assert!(table.contains("7.16"));
        assert_eq!(format_results(&[]), "No devices processed");
    }

    #[test]
    fn test_format_totals() {
        assert_eq!(
            format_totals(&[result("gw1", true), result("gw2", false)]),
            "2 device(s) processed, 1 succeeded, 1 failed"
        );
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a much longer note", 10), "a much ...");
    }
}
