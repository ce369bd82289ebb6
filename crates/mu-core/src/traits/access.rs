//! Access provisioning seam

use async_trait::async_trait;

use crate::types::Device;

/// Outcome of an access provisioning attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessGrant {
    /// The login should now work; the caller may retry once
    Granted,
    /// Nothing changed
    Denied,
}

/// Repairs access to a device after an authentication failure
///
/// Invoked at most once per device run, and only when the device rejected
/// our credentials.
#[async_trait]
pub trait AccessProvisioner: Send + Sync {
    async fn ensure_access(&self, device: &Device) -> AccessGrant;
}

/// Provisioner for unattended runs: never grants access
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProvisioning;

#[async_trait]
impl AccessProvisioner for NoProvisioning {
    async fn ensure_access(&self, device: &Device) -> AccessGrant {
        tracing::debug!(device = %device.name, "no access provisioner configured");
        AccessGrant::Denied
    }
}
