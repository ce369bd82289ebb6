//! In-memory RouterOS device for integration tests

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use mu_core::config::GlobalPolicy;
use mu_core::error::{ConnectError, SessionError, TransferError};
use mu_core::traits::{FileTransfer, MemoryLog, RemoteSession, SessionConnector};
use mu_core::Device;
use mu_orchestrator::parse::commands;
use mu_orchestrator::UpgradeOrchestrator;

pub const BACKUP_SAVED: &str = "Configuration backup saved";

/// Observable state of the simulated router
#[derive(Debug)]
pub struct Router {
    pub identity: String,
    pub channel: String,
    pub installed: String,
    pub latest: String,
    pub packages: Vec<(String, String)>,
    pub backup_reply: String,
    pub download_reply: String,
    pub downloaded: bool,
    /// Replaces the whole `check-for-updates` answer when set
    pub check_reply: Option<String>,
    /// The reboot command never returns
    pub reboot_hangs: bool,
    pub fail_uploads: bool,
    /// Probes from this one on succeed; `None` never
    pub probe_succeeds_at: Option<usize>,
    pub commands: Vec<String>,
    pub uploads: Vec<PathBuf>,
    pub downloads: Vec<String>,
    pub rebooted_at: Option<Instant>,
    /// Probe times, relative to the reboot
    pub probes: Vec<Duration>,
    pub sessions_opened: usize,
    pub sessions_closed: usize,
}

impl Default for Router {
    fn default() -> Self {
        Self {
            identity: "core".to_string(),
            channel: "stable".to_string(),
            installed: "7.15.2".to_string(),
            latest: "7.16".to_string(),
            packages: vec![
                ("routeros".to_string(), "7.15.2".to_string()),
                ("wireless".to_string(), "7.15.2".to_string()),
            ],
            backup_reply: BACKUP_SAVED.to_string(),
            download_reply: "  status: Downloaded, please reboot router to upgrade it"
                .to_string(),
            downloaded: false,
            check_reply: None,
            reboot_hangs: false,
            fail_uploads: false,
            probe_succeeds_at: Some(1),
            commands: vec![],
            uploads: vec![],
            downloads: vec![],
            rebooted_at: None,
            probes: vec![],
            sessions_opened: 0,
            sessions_closed: 0,
        }
    }
}

impl Router {
    pub fn count(&self, prefix: &str) -> usize {
        self.commands.iter().filter(|c| c.starts_with(prefix)).count()
    }

    pub fn reboots(&self) -> usize {
        self.count("system reboot") + self.count("system package downgrade")
    }

    fn answer(&mut self, command: &str) -> Vec<String> {
        let text = match command {
            commands::IDENTITY => format!("  name: {}", self.identity),
            commands::UPDATE_PRINT => format!(
                "            channel: {}\n  installed-version: {}",
                self.channel, self.installed
            ),
            commands::CHECK_FOR_UPDATES if self.check_reply.is_some() => {
                self.check_reply.clone().unwrap_or_default()
            }
            commands::CHECK_FOR_UPDATES => {
                let status = if self.installed == self.latest {
                    "System is already up to date"
                } else {
                    "New version is available"
                };
                format!(
                    "            channel: {}\n  installed-version: {}\n     latest-version: {}\n             status: {}",
                    self.channel, self.installed, self.latest, status
                )
            }
            commands::DOWNLOAD => {
                self.downloaded = self.download_reply.contains("Downloaded");
                self.download_reply.clone()
            }
            commands::PACKAGE_PRINT => {
                let mut rows = vec![
                    "Columns: NAME, VERSION, BUILD-TIME, SIZE".to_string(),
                    "#  NAME      VERSION  BUILD-TIME           SIZE".to_string(),
                ];
                for (i, (name, version)) in self.packages.iter().enumerate() {
                    rows.push(format!("{i}  {name}  {version}  2024-06-25 10:25:08  11.9MiB"));
                }
                rows.join("\n")
            }
            commands::REBOOT | commands::DOWNGRADE => {
                self.rebooted_at = Some(Instant::now());
                if self.downloaded {
                    self.installed = self.latest.clone();
                }
                String::new()
            }
            other => {
                if let Some(channel) = other.strip_prefix("system package update set channel=") {
                    self.channel = channel.to_string();
                    String::new()
                } else if other.starts_with("system backup save") {
                    self.backup_reply.clone()
                } else {
                    String::new()
                }
            }
        };
        text.lines().map(str::to_string).collect()
    }
}

pub type Shared = Arc<Mutex<Router>>;

pub fn lock(router: &Shared) -> MutexGuard<'_, Router> {
    router.lock().unwrap()
}

/// Session against the shared router
pub struct FakeSession {
    router: Shared,
}

#[async_trait]
impl RemoteSession for FakeSession {
    async fn run(&mut self, command: &str) -> Result<Vec<String>, SessionError> {
        let answer = {
            let mut router = lock(&self.router);
            router.commands.push(command.to_string());
            let answer = router.answer(command);
            let hangs = router.reboot_hangs
                && (command == commands::REBOOT || command == commands::DOWNGRADE);
            (!hangs).then_some(answer)
        };
        match answer {
            Some(lines) => Ok(lines),
            None => std::future::pending().await,
        }
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        lock(&self.router).sessions_closed += 1;
        Ok(())
    }
}

#[async_trait]
impl FileTransfer for FakeSession {
    async fn upload(&mut self, local: &Path, _remote_dir: &str) -> Result<(), TransferError> {
        if !local.exists() {
            return Err(TransferError::LocalFileMissing(local.to_path_buf()));
        }
        let mut router = lock(&self.router);
        if router.fail_uploads {
            return Err(TransferError::Protocol("scp: / : no space left".to_string()));
        }
        router.uploads.push(local.to_path_buf());
        Ok(())
    }

    async fn download(
        &mut self,
        remote_file: &str,
        local_dir: &Path,
    ) -> Result<PathBuf, TransferError> {
        lock(&self.router).downloads.push(remote_file.to_string());
        let target = local_dir.join(remote_file);
        std::fs::write(&target, b"backup")?;
        Ok(target)
    }
}

pub struct FakeConnector {
    pub router: Shared,
}

#[async_trait]
impl SessionConnector for FakeConnector {
    type Session = FakeSession;

    async fn connect(&self, _device: &Device) -> Result<FakeSession, ConnectError> {
        lock(&self.router).sessions_opened += 1;
        Ok(FakeSession {
            router: self.router.clone(),
        })
    }

    async fn probe(&self, _device: &Device) -> bool {
        let mut router = lock(&self.router);
        let since_reboot = router
            .rebooted_at
            .map(|t| t.elapsed())
            .unwrap_or_default();
        router.probes.push(since_reboot);
        let count = router.probes.len();
        router.probe_succeeds_at.is_some_and(|n| count >= n)
    }
}

/// Everything a scenario needs
pub struct Harness {
    pub router: Shared,
    pub log: Arc<MemoryLog>,
    pub orchestrator: UpgradeOrchestrator<FakeConnector>,
    pub backup_dir: tempfile::TempDir,
}

impl Harness {
    pub fn new(router: Router) -> Self {
        let backup_dir = tempfile::tempdir().unwrap();
        let router = Arc::new(Mutex::new(router));
        let log = Arc::new(MemoryLog::new());
        let mut policy = GlobalPolicy::new(backup_dir.path(), "/dev/null");
        policy.delete_backup_after_download = true;
        let orchestrator = UpgradeOrchestrator::new(
            Arc::new(FakeConnector {
                router: router.clone(),
            }),
            Arc::new(policy),
            log.clone(),
        );
        Self {
            router,
            log,
            orchestrator,
            backup_dir,
        }
    }

    pub fn router(&self) -> MutexGuard<'_, Router> {
        lock(&self.router)
    }
}

pub fn online_device() -> Device {
    Device::new("gw1", "192.168.88.1", "mu")
}
