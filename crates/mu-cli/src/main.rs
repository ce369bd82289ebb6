//! mu CLI
//!
//! Backs up and upgrades every RouterOS device listed in a configuration
//! file, one device at a time.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use mu::console::ConsoleLog;
use mu::output::{format_results, format_totals, print_error, print_success, print_warning};
use mu_core::config::{self, ConfigFile, GlobalPolicy};
use mu_core::traits::DeviceLog;
use mu_core::{Device, MuError, RunMode};
use mu_orchestrator::log::DEVICE_TARGET;
use mu_orchestrator::{BatchRunner, SshConnector, UpgradeOrchestrator};

#[derive(Parser)]
#[command(name = "mu")]
#[command(author, version, about = "Backup and firmware upgrade for RouterOS devices")]
struct Cli {
    /// Configuration file [default: ~/.config/mu/config.toml]
    config: Option<PathBuf>,

    /// Only report versions and packages, change nothing (overrides -U/-B)
    #[arg(short = 'D', long, visible_alias = "dry-run")]
    check_only: bool,

    /// Upgrade devices with an available update (still backs up first)
    #[arg(short = 'U', long, conflicts_with = "backup_only")]
    update_only: bool,

    /// Only take and download backups
    #[arg(short = 'B', long)]
    backup_only: bool,

    /// Process only this device (repeatable)
    #[arg(short = 'd', long = "device", value_name = "NAME")]
    devices: Vec<String>,

    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn mode(&self) -> RunMode {
        if self.check_only {
            RunMode::CheckOnly
        } else if self.backup_only {
            RunMode::BackupOnly
        } else if self.update_only {
            RunMode::UpdateOnly
        } else {
            RunMode::Full
        }
    }

    fn log_level(&self) -> &'static str {
        match (self.quiet, self.verbose) {
            (true, _) => "error",
            (false, 0) => "warn",
            (false, 1) => "info",
            (false, 2) => "debug",
            (false, _) => "trace",
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            print_error(&format!("{e:#}"));
            ExitCode::from(2)
        }
    }
}

/// Everything checked before the first device is touched
struct Setup {
    devices: Vec<Device>,
    policy: GlobalPolicy,
    connector: SshConnector,
}

impl Setup {
    fn load(path: &Path, names: &[String]) -> Result<Self, MuError> {
        let config = ConfigFile::load(path)?;
        let devices = config.select(names)?;
        let connector = SshConnector::from_policy(&config.global)?;
        Ok(Self {
            devices,
            policy: config.global,
            connector,
        })
    }
}

/// Returns whether every device run succeeded
async fn run(cli: Cli) -> Result<bool> {
    let path = cli
        .config
        .clone()
        .unwrap_or_else(config::default_config_path);
    let Setup {
        devices,
        policy,
        connector,
    } = Setup::load(&path, &cli.devices)
        .with_context(|| format!("Cannot start with {}", path.display()))?;

    init_logging(&cli, policy.log_dir().as_deref());
    let mode = cli.mode();
    tracing::info!(config = %path.display(), devices = devices.len(), %mode, "run started");

    let log: Arc<dyn DeviceLog> = Arc::new(ConsoleLog::new(cli.quiet));
    let orchestrator = UpgradeOrchestrator::new(Arc::new(connector), Arc::new(policy), log);

    let cancel = CancellationToken::new();
    let cancel_on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received");
            print_warning("Interrupted, stopping after the current device");
            cancel_on_signal.cancel();
        }
    });

    let results = BatchRunner::new(orchestrator)
        .with_shutdown_token(cancel)
        .run(&devices, mode)
        .await;
    let failed = results.iter().filter(|r| !r.succeeded).count();
    tracing::info!(processed = results.len(), failed, "run finished");

    if !cli.quiet {
        println!("{}", format_results(&results));
    }
    let all_succeeded =
        results.len() == devices.len() && results.iter().all(|r| r.succeeded);
    if all_succeeded {
        if !cli.quiet {
            print_success(&format_totals(&results));
        }
    } else {
        print_error(&format_totals(&results));
    }
    Ok(all_succeeded)
}

/// Install the tracing subscriber
///
/// Device log events are rendered by [`ConsoleLog`] on the terminal, so the
/// stderr layer skips them. The optional file layer records everything.
fn init_logging(cli: &Cli, log_dir: Option<&Path>) {
    let directives = std::env::var("RUST_LOG").unwrap_or_else(|_| cli.log_level().into());
    let console = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(format!("{directives},{DEVICE_TARGET}=off")));

    let mut file_error = None;
    let file = log_dir.and_then(|dir| match open_log_file(dir) {
        Ok(file) => Some(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .with_filter(EnvFilter::new(if cli.verbose > 1 { "debug" } else { "info" })),
        ),
        Err(e) => {
            file_error = Some(e);
            None
        }
    });

    tracing_subscriber::registry().with(console).with(file).init();

    if let Some(e) = file_error {
        print_warning(&format!("File logging disabled: {e:#}"));
    }
}

fn open_log_file(dir: &Path) -> Result<std::fs::File> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
    let path = dir.join("mu.log");
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open {}", path.display()))
}
