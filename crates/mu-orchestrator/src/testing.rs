//! Scripted session used by unit tests

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use mu_core::error::{SessionError, TransferError};
use mu_core::traits::{FileTransfer, RemoteSession};

#[derive(Debug, Clone)]
enum Reply {
    Lines(Vec<String>),
    Fail,
    Hang,
}

/// Answers commands from a script and records everything it was asked to do
///
/// Unscripted commands succeed with no output. When several replies are
/// scripted for one command they are consumed in order and the last one
/// repeats.
#[derive(Debug, Default)]
pub struct ScriptedSession {
    replies: HashMap<String, VecDeque<Reply>>,
    commands: Vec<String>,
    downloads: Vec<String>,
    fail_downloads: bool,
}

impl ScriptedSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, command: &str, output: &str) -> Self {
        let lines = output.lines().map(str::to_string).collect();
        self.replies
            .entry(command.to_string())
            .or_default()
            .push_back(Reply::Lines(lines));
        self
    }

    pub fn fail(mut self, command: &str) -> Self {
        self.replies
            .entry(command.to_string())
            .or_default()
            .push_back(Reply::Fail);
        self
    }

    /// Never answer `command`, like a device that vanished mid-command
    pub fn hang(mut self, command: &str) -> Self {
        self.replies
            .entry(command.to_string())
            .or_default()
            .push_back(Reply::Hang);
        self
    }

    pub fn fail_downloads(mut self) -> Self {
        self.fail_downloads = true;
        self
    }

    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    pub fn commands_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.commands
            .iter()
            .filter(|c| c.starts_with(prefix))
            .cloned()
            .collect()
    }

    pub fn count_prefix(&self, prefix: &str) -> usize {
        self.commands_with_prefix(prefix).len()
    }

    pub fn downloads(&self) -> &[String] {
        &self.downloads
    }
}

#[async_trait]
impl RemoteSession for ScriptedSession {
    async fn run(&mut self, command: &str) -> Result<Vec<String>, SessionError> {
        self.commands.push(command.to_string());
        let reply = match self.replies.get_mut(command) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };
        match reply {
            Some(Reply::Lines(lines)) => Ok(lines),
            Some(Reply::Fail) => Err(SessionError::Exec {
                command: command.to_string(),
                message: "scripted failure".to_string(),
            }),
            Some(Reply::Hang) => std::future::pending().await,
            None => Ok(vec![]),
        }
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        Ok(())
    }
}

#[async_trait]
impl FileTransfer for ScriptedSession {
    async fn upload(&mut self, _local: &Path, _remote_dir: &str) -> Result<(), TransferError> {
        Ok(())
    }

    async fn download(
        &mut self,
        remote_file: &str,
        local_dir: &Path,
    ) -> Result<PathBuf, TransferError> {
        if self.fail_downloads {
            return Err(TransferError::Protocol(
                "scripted download failure".to_string(),
            ));
        }
        self.downloads.push(remote_file.to_string());
        let target = local_dir.join(remote_file);
        tokio::fs::write(&target, b"backup").await?;
        Ok(target)
    }
}
