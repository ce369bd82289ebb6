//! Session connector

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use russh::client::{self, Config};
use russh_keys::key::{KeyPair, PublicKey};
use thiserror::Error;

use mu_core::config::GlobalPolicy;
use mu_core::error::ConnectError;
use mu_core::traits::{RemoteSession, SessionConnector};
use mu_core::Device;

use super::session::SshSession;

/// Raised from the handler when a pinned host key does not match
#[derive(Debug, Error)]
#[error("host key mismatch: expected {expected}, got {actual}")]
struct HostKeyMismatch {
    expected: String,
    actual: String,
}

/// Opens authenticated SSH sessions using one private key for every device
pub struct SshConnector {
    key: Arc<KeyPair>,
    connect_timeout: Duration,
}

impl SshConnector {
    /// Load the private key at `key_path`
    pub fn new(key_path: &Path, connect_timeout: Duration) -> Result<Self, ConnectError> {
        if !key_path.exists() {
            return Err(ConnectError::KeyLoad {
                path: key_path.to_path_buf(),
                message: "file does not exist".to_string(),
            });
        }
        let key = russh_keys::load_secret_key(key_path, None).map_err(|e| {
            ConnectError::KeyLoad {
                path: key_path.to_path_buf(),
                message: e.to_string(),
            }
        })?;

        Ok(Self {
            key: Arc::new(key),
            connect_timeout,
        })
    }

    /// Connector for the key and timeout configured in the policy
    pub fn from_policy(policy: &GlobalPolicy) -> Result<Self, ConnectError> {
        Self::new(&policy.private_key_file(), policy.connect_timeout)
    }

    async fn open(&self, device: &Device) -> Result<client::Handle<DeviceHandler>, ConnectError> {
        let config = Arc::new(Config {
            inactivity_timeout: Some(Duration::from_secs(600)),
            ..Default::default()
        });
        let handler = DeviceHandler::new(device.host_key.clone());
        let address = device.socket_address();

        tracing::debug!(device = %device.name, %address, "connecting");
        let mut handle = tokio::time::timeout(
            self.connect_timeout,
            client::connect(config, address.as_str(), handler),
        )
        .await
        .map_err(|_| ConnectError::TimedOut(self.connect_timeout.as_secs()))?
        .map_err(|e| match e.downcast::<HostKeyMismatch>() {
            Ok(mismatch) => ConnectError::HostKeyRejected {
                expected: mismatch.expected,
                actual: mismatch.actual,
            },
            Err(e) => ConnectError::Refused(format!("{address}: {e}")),
        })?;

        tracing::debug!(device = %device.name, user = %device.username, "authenticating");
        let authenticated = tokio::time::timeout(
            self.connect_timeout,
            handle.authenticate_publickey(&device.username, Arc::clone(&self.key)),
        )
        .await
        .map_err(|_| ConnectError::TimedOut(self.connect_timeout.as_secs()))?
        .map_err(|e| ConnectError::Refused(format!("{address}: {e}")))?;

        if !authenticated {
            return Err(ConnectError::AuthenticationFailed {
                username: device.username.clone(),
            });
        }
        Ok(handle)
    }
}

#[async_trait]
impl SessionConnector for SshConnector {
    type Session = SshSession;

    async fn connect(&self, device: &Device) -> Result<SshSession, ConnectError> {
        let handle = self.open(device).await?;
        tracing::debug!(device = %device.name, "session established");
        Ok(SshSession::new(handle, &device.name))
    }

    async fn probe(&self, device: &Device) -> bool {
        match self.open(device).await {
            Ok(handle) => {
                let mut session = SshSession::new(handle, &device.name);
                let _ = session.close().await;
                true
            }
            Err(e) => {
                tracing::trace!(device = %device.name, error = %e, "probe failed");
                false
            }
        }
    }
}

/// Strip an optional `SHA256:` prefix from a configured fingerprint
fn normalize_fingerprint(fingerprint: &str) -> &str {
    let fingerprint = fingerprint.trim();
    fingerprint
        .strip_prefix("SHA256:")
        .unwrap_or(fingerprint)
}

/// russh client handler with optional host key pinning
pub(super) struct DeviceHandler {
    expected_host_key: Option<String>,
}

impl DeviceHandler {
    fn new(expected_host_key: Option<String>) -> Self {
        Self { expected_host_key }
    }
}

#[async_trait]
impl client::Handler for DeviceHandler {
    type Error = anyhow::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        let fingerprint = server_public_key.fingerprint();
        tracing::debug!("server host key: SHA256:{}", fingerprint);

        match &self.expected_host_key {
            Some(expected) if normalize_fingerprint(expected) != fingerprint => {
                Err(HostKeyMismatch {
                    expected: expected.clone(),
                    actual: format!("SHA256:{fingerprint}"),
                }
                .into())
            }
            _ => Ok(true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_fingerprint() {
        assert_eq!(normalize_fingerprint("SHA256:abc+/="), "abc+/=");
        assert_eq!(normalize_fingerprint(" abc+/= "), "abc+/=");
    }

    #[test]
    fn test_missing_key_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("id_ed25519");
        let err = SshConnector::new(&missing, Duration::from_secs(5)).err().unwrap();
        assert!(matches!(err, ConnectError::KeyLoad { .. }));
    }

    #[test]
    fn test_unparseable_key_file() {
        let dir = tempfile::tempdir().unwrap();
        let key = dir.path().join("id_ed25519");
        std::fs::write(&key, "not a key").unwrap();
        let err = SshConnector::new(&key, Duration::from_secs(5)).err().unwrap();
        assert!(matches!(err, ConnectError::KeyLoad { .. }));
    }
}
