//! Command execution over an SSH session

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use russh::client::{Handle, Msg};
use russh::{Channel, ChannelMsg, Disconnect};

use mu_core::error::{SessionError, TransferError};
use mu_core::traits::{FileTransfer, RemoteSession};

use super::connector::DeviceHandler;
use super::scp;

/// An authenticated session to one device
pub struct SshSession {
    handle: Handle<DeviceHandler>,
    device: String,
    closed: bool,
}

impl SshSession {
    pub(super) fn new(handle: Handle<DeviceHandler>, device: &str) -> Self {
        Self {
            handle,
            device: device.to_string(),
            closed: false,
        }
    }

    /// Open an exec channel running `command`
    pub(super) async fn exec(&self, command: &str) -> Result<Channel<Msg>, SessionError> {
        if self.closed {
            return Err(SessionError::Closed);
        }
        let exec_error = |e: russh::Error| SessionError::Exec {
            command: command.to_string(),
            message: e.to_string(),
        };
        let channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(exec_error)?;
        channel.exec(true, command).await.map_err(exec_error)?;
        Ok(channel)
    }
}

#[async_trait]
impl RemoteSession for SshSession {
    /// Run a command and collect its output
    ///
    /// The first line of `command` is executed; any further lines are fed
    /// to the command's stdin, which is how RouterOS confirmation prompts
    /// (`system reboot` followed by `y`) are answered.
    async fn run(&mut self, command: &str) -> Result<Vec<String>, SessionError> {
        let (line, input) = match command.split_once('\n') {
            Some((line, input)) => (line, Some(input)),
            None => (command, None),
        };
        tracing::debug!(device = %self.device, command = %line, "exec");

        let mut channel = self.exec(line).await?;
        if let Some(input) = input {
            let input = format!("{input}\n");
            channel
                .data(input.as_bytes())
                .await
                .map_err(|e| SessionError::Exec {
                    command: line.to_string(),
                    message: e.to_string(),
                })?;
            let _ = channel.eof().await;
        }

        let mut output = Vec::new();
        while let Some(msg) = channel.wait().await {
            match msg {
                ChannelMsg::Data { ref data } => output.extend_from_slice(data),
                ChannelMsg::ExtendedData { ref data, .. } => output.extend_from_slice(data),
                ChannelMsg::ExitStatus { exit_status } => {
                    tracing::trace!(device = %self.device, exit_status, "command finished");
                }
                ChannelMsg::Eof | ChannelMsg::Close => break,
                _ => {}
            }
        }

        let lines = split_lines(&String::from_utf8_lossy(&output));
        tracing::trace!(device = %self.device, lines = lines.len(), "output received");
        Ok(lines)
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
            .map_err(|e| SessionError::Exec {
                command: "disconnect".to_string(),
                message: e.to_string(),
            })
    }
}

#[async_trait]
impl FileTransfer for SshSession {
    async fn upload(&mut self, local: &Path, remote_dir: &str) -> Result<(), TransferError> {
        scp::upload(self, local, remote_dir).await
    }

    async fn download(
        &mut self,
        remote_file: &str,
        local_dir: &Path,
    ) -> Result<PathBuf, TransferError> {
        scp::download(self, remote_file, local_dir).await
    }
}

/// Split command output into lines, dropping `\r` and a trailing empty line
pub(super) fn split_lines(output: &str) -> Vec<String> {
    output
        .lines()
        .map(|line| line.trim_end_matches('\r').to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_lines() {
        assert_eq!(
            split_lines("  name: core\r\n\r\nstatus: ok\r\n"),
            vec!["  name: core", "", "status: ok"]
        );
        assert!(split_lines("").is_empty());
        assert_eq!(split_lines("no newline"), vec!["no newline"]);
    }
}
