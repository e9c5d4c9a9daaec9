//! SSH connection configuration.

use std::time::Duration;

use secrecy::SecretString;

/// SSH connection configuration for a scan target.
#[derive(Debug, Clone)]
pub struct SshConfig {
    /// Target host (hostname or IP address).
    pub host: String,

    /// SSH port (default: 22).
    pub port: u16,

    /// Username for authentication.
    pub username: String,

    /// Password for authentication.
    pub password: SecretString,

    /// Connection timeout.
    pub timeout: Duration,
}
