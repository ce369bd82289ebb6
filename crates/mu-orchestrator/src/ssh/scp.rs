//! SCP sink/source protocol
//!
//! Upload runs `scp -t <dir>` on the device and streams one `C` record;
//! download runs `scp -f <file>` and reads one back. Every step is
//! acknowledged with a zero byte, `1` or `2` followed by a message line
//! signals a warning or fatal error.

use std::path::{Path, PathBuf};

use russh::client::Msg;
use russh::{Channel, ChannelMsg};

use mu_core::error::TransferError;

use super::session::SshSession;

const CHUNK_SIZE: usize = 32 * 1024;

/// A `C<mode> <size> <name>` header line
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct CopyHeader {
    pub mode: u32,
    pub size: u64,
    pub name: String,
}

/// Parse a copy header, without the trailing newline
pub(super) fn parse_copy_header(line: &str) -> Result<CopyHeader, TransferError> {
    let invalid = || TransferError::Protocol(format!("unexpected scp header: {line}"));

    let rest = line.strip_prefix('C').ok_or_else(invalid)?;
    let mut parts = rest.splitn(3, ' ');
    let mode = parts
        .next()
        .and_then(|m| u32::from_str_radix(m, 8).ok())
        .ok_or_else(invalid)?;
    let size = parts
        .next()
        .and_then(|s| s.parse::<u64>().ok())
        .ok_or_else(invalid)?;
    let name = parts
        .next()
        .filter(|n| !n.is_empty() && !n.contains('/'))
        .ok_or_else(invalid)?;

    Ok(CopyHeader {
        mode,
        size,
        name: name.to_string(),
    })
}

/// Buffered reader over the data messages of one channel
struct ChannelReader {
    channel: Channel<Msg>,
    pending: Vec<u8>,
    file: String,
}

impl ChannelReader {
    fn new(channel: Channel<Msg>, file: &str) -> Self {
        Self {
            channel,
            pending: Vec::new(),
            file: file.to_string(),
        }
    }

    async fn fill(&mut self) -> Result<(), TransferError> {
        loop {
            match self.channel.wait().await {
                Some(ChannelMsg::Data { ref data }) => {
                    self.pending.extend_from_slice(data);
                    return Ok(());
                }
                Some(ChannelMsg::ExtendedData { ref data, .. }) => {
                    tracing::debug!(
                        file = %self.file,
                        stderr = %String::from_utf8_lossy(data).trim_end(),
                        "scp"
                    );
                }
                Some(ChannelMsg::Eof) | Some(ChannelMsg::Close) | None => {
                    return Err(TransferError::Protocol(
                        "channel closed during transfer".to_string(),
                    ));
                }
                Some(_) => {}
            }
        }
    }

    async fn read_exact(&mut self, len: usize) -> Result<Vec<u8>, TransferError> {
        while self.pending.len() < len {
            self.fill().await?;
        }
        Ok(self.pending.drain(..len).collect())
    }

    async fn read_line(&mut self) -> Result<String, TransferError> {
        loop {
            if let Some(end) = self.pending.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = self.pending.drain(..=end).collect();
                return Ok(String::from_utf8_lossy(&line[..end]).into_owned());
            }
            self.fill().await?;
        }
    }

    /// Expect a zero byte, turning `1`/`2` replies into errors
    async fn read_ack(&mut self) -> Result<(), TransferError> {
        let status = self.read_exact(1).await?[0];
        match status {
            0 => Ok(()),
            1 | 2 => {
                let message = self.read_line().await?;
                Err(TransferError::Rejected {
                    file: self.file.clone(),
                    message,
                })
            }
            other => Err(TransferError::Protocol(format!(
                "unexpected scp status byte {other:#04x}"
            ))),
        }
    }

    async fn send(&self, data: &[u8]) -> Result<(), TransferError> {
        self.channel
            .data(data)
            .await
            .map_err(|e| TransferError::Protocol(e.to_string()))
    }

    async fn finish(mut self) {
        let _ = self.channel.eof().await;
        while let Some(msg) = self.channel.wait().await {
            if matches!(msg, ChannelMsg::Close) {
                break;
            }
        }
    }
}

pub(super) async fn upload(
    session: &SshSession,
    local: &Path,
    remote_dir: &str,
) -> Result<(), TransferError> {
    let metadata = tokio::fs::metadata(local)
        .await
        .map_err(|_| TransferError::LocalFileMissing(local.to_path_buf()))?;
    let name = local
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| TransferError::LocalFileMissing(local.to_path_buf()))?;
    let contents = tokio::fs::read(local).await?;

    let channel = session.exec(&format!("scp -t {remote_dir}")).await?;
    let mut reader = ChannelReader::new(channel, &name);
    reader.read_ack().await?;

    reader
        .send(format!("C0644 {} {}\n", metadata.len(), name).as_bytes())
        .await?;
    reader.read_ack().await?;

    for chunk in contents.chunks(CHUNK_SIZE) {
        reader.send(chunk).await?;
    }
    reader.send(&[0]).await?;
    reader.read_ack().await?;

    tracing::debug!(file = %name, bytes = contents.len(), "upload complete");
    reader.finish().await;
    Ok(())
}

pub(super) async fn download(
    session: &SshSession,
    remote_file: &str,
    local_dir: &Path,
) -> Result<PathBuf, TransferError> {
    let channel = session.exec(&format!("scp -f {remote_file}")).await?;
    let mut reader = ChannelReader::new(channel, remote_file);
    reader.send(&[0]).await?;

    let first = reader.read_exact(1).await?[0];
    let header = match first {
        b'C' => {
            let line = reader.read_line().await?;
            parse_copy_header(&format!("C{line}"))?
        }
        1 | 2 => {
            let message = reader.read_line().await?;
            return Err(TransferError::Rejected {
                file: remote_file.to_string(),
                message,
            });
        }
        other => {
            return Err(TransferError::Protocol(format!(
                "unexpected scp record {other:#04x}"
            )))
        }
    };
    reader.send(&[0]).await?;

    let size = usize::try_from(header.size)
        .map_err(|_| TransferError::Protocol(format!("file too large: {}", header.size)))?;
    let contents = reader.read_exact(size).await?;
    reader.read_ack().await?;
    reader.send(&[0]).await?;

    let target = local_dir.join(&header.name);
    tokio::fs::write(&target, &contents).await?;
    tracing::debug!(
        file = %header.name,
        mode = %format!("{:o}", header.mode),
        bytes = size,
        "download complete"
    );
    reader.finish().await;
    Ok(target)
}
