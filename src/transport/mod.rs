//! SSH transport layer wrapping russh.
//!
//! This module provides the low-level connection management: the TCP
//! reachability probe, connection setup, password authentication, and
//! per-command exec channels.

pub mod config;
mod ssh;

pub use config::SshConfig;
pub use ssh::{SshTransport, check_tcp_port};
