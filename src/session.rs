//! Session and connector seams.
//!
//! The inventory pipeline talks to the hypervisor through the [`XeSession`]
//! trait, and obtains sessions through the [`Connector`] trait. Production
//! code uses [`SshConnector`]; tests substitute fakes with canned command
//! output.

use std::future::Future;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::{Result, TransportError};
use crate::transport::{SshConfig, SshTransport, check_tcp_port};

/// Credentials for the XenServer administrative account.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user: String,
    pub password: SecretString,
}

/// An open remote command session against one hypervisor host.
pub trait XeSession: Send {
    /// Run a command and return its stdout as text.
    fn run(&mut self, command: &str) -> impl Future<Output = Result<String>> + Send;

    /// Close the session.
    fn close(self) -> impl Future<Output = Result<()>> + Send;
}

/// Factory for sessions, plus the pre-connect reachability probe.
pub trait Connector: Send + Sync {
    type Session: XeSession;

    /// The administrative port this connector targets. Reported in the
    /// port-closed error message.
    fn ssh_port(&self) -> u16;

    /// Check whether the administrative port is reachable. Must not perform
    /// any protocol handshake.
    fn probe(&self, host: &str) -> impl Future<Output = bool> + Send;

    /// Open an authenticated session to the host.
    fn connect(
        &self,
        host: &str,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<Self::Session>> + Send;
}

/// Production connector: TCP probe followed by an SSH connection.
#[derive(Debug, Clone)]
pub struct SshConnector {
    port: u16,
    probe_timeout: Duration,
    connect_timeout: Duration,
}

impl SshConnector {
    pub fn new() -> Self {
        Self {
            port: 22,
            probe_timeout: Duration::from_secs(1),
            connect_timeout: Duration::from_secs(30),
        }
    }

    /// Set the SSH port (default: 22).
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the reachability probe timeout (default: 1s).
    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Set the SSH connection timeout (default: 30s).
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

impl Default for SshConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl Connector for SshConnector {
    type Session = SshTransport;

    fn ssh_port(&self) -> u16 {
        self.port
    }

    async fn probe(&self, host: &str) -> bool {
        check_tcp_port(host, self.port, self.probe_timeout).await
    }

    async fn connect(&self, host: &str, credentials: &Credentials) -> Result<Self::Session> {
        let config = SshConfig {
            host: host.to_string(),
            port: self.port,
            username: credentials.user.clone(),
            password: credentials.password.clone(),
            timeout: self.connect_timeout,
        };
        SshTransport::connect(&config).await
    }
}

impl XeSession for SshTransport {
    async fn run(&mut self, command: &str) -> Result<String> {
        self.exec(command).await
    }

    async fn close(self) -> Result<()> {
        SshTransport::close(self).await
    }
}

/// Build the port-closed error for a failed probe.
pub(crate) fn port_closed(host: &str, port: u16) -> TransportError {
    TransportError::PortClosed {
        host: host.to_string(),
        port,
    }
}
