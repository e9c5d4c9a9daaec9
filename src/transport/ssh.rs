//! SSH transport implementation using russh.

use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use log::{debug, warn};
use russh::client::{self, Handle};
use russh::keys::PublicKey;
use russh::{ChannelMsg, Disconnect};
use secrecy::ExposeSecret;
use tokio::net::TcpStream;

use super::config::SshConfig;
use crate::error::{Result, TransportError};

/// Check whether `port` on `host` accepts a TCP connection within `timeout`.
///
/// Used as a fast-fail probe before the SSH handshake: when sweeping large
/// address ranges, hosts with the port closed must not cost a full
/// connection timeout each.
pub async fn check_tcp_port(host: &str, port: u16, timeout: Duration) -> bool {
    matches!(
        tokio::time::timeout(timeout, TcpStream::connect((host, port))).await,
        Ok(Ok(_))
    )
}

/// SSH transport wrapping a russh client session.
///
/// Commands run over one-shot exec channels on a single authenticated
/// connection, one at a time.
pub struct SshTransport {
    /// The russh session handle.
    session: Handle<SshHandler>,
}

impl SshTransport {
    /// Connect to the SSH server and authenticate with a password.
    pub async fn connect(config: &SshConfig) -> Result<Self> {
        let ssh_config = Arc::new(client::Config {
            inactivity_timeout: Some(config.timeout),
            ..Default::default()
        });

        let mut session = tokio::time::timeout(
            config.timeout,
            client::connect(
                ssh_config,
                (config.host.as_str(), config.port),
                SshHandler,
            ),
        )
        .await
        .map_err(|_| TransportError::Timeout(config.timeout))?
        .map_err(TransportError::Ssh)?;

        let authenticated = session
            .authenticate_password(&config.username, config.password.expose_secret())
            .await
            .map_err(TransportError::Ssh)?
            .success();

        if !authenticated {
            return Err(TransportError::AuthenticationFailed {
                user: config.username.clone(),
            }
            .into());
        }

        Ok(Self { session })
    }

    /// Run a command on a fresh exec channel and collect its stdout.
    ///
    /// Stderr is logged at debug level; a nonzero exit status is an error.
    pub async fn exec(&mut self, command: &str) -> Result<String> {
        let mut channel = self
            .session
            .channel_open_session()
            .await
            .map_err(TransportError::Ssh)?;

        channel
            .exec(true, command)
            .await
            .map_err(TransportError::Ssh)?;

        let mut output = BytesMut::new();
        let mut exit_status = None;

        while let Some(msg) = channel.wait().await {
            match msg {
                ChannelMsg::Data { ref data } => {
                    output.extend_from_slice(data);
                }
                ChannelMsg::ExtendedData { ref data, ext: 1 } => {
                    debug!(
                        "stderr from '{}': {}",
                        command,
                        String::from_utf8_lossy(data).trim_end()
                    );
                }
                ChannelMsg::ExitStatus { exit_status: code } => {
                    exit_status = Some(code);
                }
                _ => {}
            }
        }

        match exit_status {
            Some(0) => Ok(String::from_utf8_lossy(&output).into_owned()),
            Some(status) => Err(TransportError::CommandFailed {
                command: command.to_string(),
                status,
            }
            .into()),
            None => Err(TransportError::ChannelClosed.into()),
        }
    }

    /// Close the connection.
    pub async fn close(self) -> Result<()> {
        self.session
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
            .map_err(TransportError::Ssh)?;
        Ok(())
    }
}

/// SSH client handler for russh.
///
/// Host keys are accepted unconditionally: an inventory scanner typically
/// meets each host for the first time and has no known_hosts store to
/// consult. The key is still logged so operators can audit it.
struct SshHandler;

impl client::Handler for SshHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        let fingerprint = server_public_key.fingerprint(Default::default());
        warn!("Accepting unverified host key: {}", fingerprint);
        Ok(true)
    }
}
