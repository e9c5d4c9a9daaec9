//! Error types for xenscan.

use std::io;
use thiserror::Error;

/// Main error type for scan operations.
///
/// Everything in here is an expected failure mode: the plugin converts it
/// into an error-status [`ScanResult`](crate::report::ScanResult) at the top
/// level rather than letting it escape to the orchestrator.
#[derive(Error, Debug)]
pub enum Error {
    /// SSH transport-level errors (connectivity, authentication).
    #[error("{0}")]
    Transport(#[from] TransportError),

    /// Domain and parsing errors from the inventory pipeline.
    #[error("{0}")]
    Scan(#[from] ScanError),
}

/// Transport layer errors (TCP probe, SSH connection, command execution).
#[derive(Error, Debug)]
pub enum TransportError {
    /// The administrative port did not accept a TCP connection. Raised by
    /// the pre-connect probe, before any SSH handshake is attempted.
    #[error("Port {port} closed on a XEN server.")]
    PortClosed { host: String, port: u16 },

    /// SSH handshake or protocol error.
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed.
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// Connection attempt timed out.
    #[error("Operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// A remote command exited with a nonzero status.
    #[error("Command '{command}' exited with status {status}")]
    CommandFailed { command: String, status: u32 },

    /// The exec channel closed before the command produced an exit status.
    #[error("Channel closed before command completion")]
    ChannelClosed,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Inventory pipeline errors: unresolvable host, or `xe` output that no
/// longer matches the expected shape. Parsing violations are surfaced, not
/// skipped - they mean the remote output format has changed.
#[derive(Error, Debug)]
pub enum ScanError {
    /// The queried address matched no block in the host list.
    #[error("Could not find this host UUID.")]
    HostUuidNotFound,

    /// A block or record was missing a field the command was asked to print.
    #[error("Missing field '{field}' in {context} output")]
    MissingField {
        field: &'static str,
        context: &'static str,
    },

    /// A numeric field failed to parse.
    #[error("Invalid value '{value}' for field '{field}'")]
    InvalidField { field: &'static str, value: String },

    /// A field arrived before the record context it belongs to was seen.
    #[error("Field '{field}' seen with no preceding {missing} in {context} output")]
    OrphanedField {
        field: &'static str,
        missing: &'static str,
        context: &'static str,
    },
}

/// Abstention signal: the target does not look like a XenServer host.
///
/// Distinct from [`Error`] on purpose - the orchestrator treats it as "try
/// the next plugin", not as a failed scan.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct NoMatch(pub String);

impl NoMatch {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// Result type alias using xenscan's Error.
pub type Result<T> = std::result::Result<T, Error>;
