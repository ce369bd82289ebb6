//! SSH transport for RouterOS devices
//!
//! [`SshConnector`] opens public-key authenticated sessions with `russh`.
//! Each command runs on its own exec channel; file transfers speak the SCP
//! sink/source protocol over an exec channel as well.

mod connector;
mod scp;
mod session;

pub use connector::SshConnector;
pub use session::SshSession;
