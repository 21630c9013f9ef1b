//! SSH transport
//!
//! `SshRouter` establishes SSH sessions with publickey auth and runs
//! the remote tail producer by exec'ing the configured remote command
//! (`fantail remote-tail` by default) on a session channel. The tail
//! request travels as a single frame on channel stdin; line records
//! come back as frames on channel stdout.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use bytes::BytesMut;
use russh::client::{self, Msg};
use russh::{Channel, ChannelMsg, Disconnect};
use russh_keys::key::PublicKey;
use tokio::sync::{mpsc, Mutex};
use tokio_util::codec::{Decoder, Encoder};

use ft_core::{ConnectOptions, ConnectionError, Hostname};
use ft_protocol::{Message, MessageCodec, TailRequest};

use crate::router::{DispatchHandle, ExecutionContext, Router};

/// Router that reaches targets over SSH
pub struct SshRouter;

impl SshRouter {
    /// Create a new SSH router
    pub fn new() -> Self {
        Self
    }
}

impl Default for SshRouter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Router for SshRouter {
    async fn connect(
        &self,
        hostname: &Hostname,
        options: &ConnectOptions,
    ) -> Result<Box<dyn ExecutionContext>, ConnectionError> {
        let key_path = options.private_key_path();
        if !key_path.exists() {
            return Err(ConnectionError::KeyNotFound { path: key_path });
        }
        let key = russh_keys::load_secret_key(&key_path, None).map_err(|e| {
            ConnectionError::KeyInvalid {
                path: key_path.clone(),
                reason: e.to_string(),
            }
        })?;

        let ssh_config = Arc::new(client::Config::default());
        let address = format!("{}:{}", hostname, options.port);

        tracing::debug!(host = %hostname, %address, "Connecting");
        let mut session = tokio::time::timeout(
            options.connect_timeout(),
            client::connect(ssh_config, address.as_str(), ClientHandler),
        )
        .await
        .map_err(|_| ConnectionError::Unreachable {
            hostname: hostname.to_string(),
            reason: "connect timed out".to_string(),
        })?
        .map_err(|e| ConnectionError::Unreachable {
            hostname: hostname.to_string(),
            reason: e.to_string(),
        })?;

        let username = options.username();
        tracing::debug!(host = %hostname, user = %username, "Authenticating");
        let authenticated = session
            .authenticate_publickey(username, Arc::new(key))
            .await
            .map_err(|e| ConnectionError::Unreachable {
                hostname: hostname.to_string(),
                reason: format!("authentication error: {}", e),
            })?;

        if !authenticated {
            return Err(ConnectionError::AuthRejected {
                hostname: hostname.to_string(),
            });
        }

        Ok(Box::new(SshContext {
            hostname: hostname.clone(),
            session: Arc::new(Mutex::new(session)),
            remote_command: options.remote_command.clone(),
            run_as: None,
        }))
    }
}

/// A remote execution context backed by an SSH session
struct SshContext {
    hostname: Hostname,
    session: Arc<Mutex<client::Handle<ClientHandler>>>,
    remote_command: String,
    run_as: Option<String>,
}

#[async_trait]
impl ExecutionContext for SshContext {
    fn hostname(&self) -> &Hostname {
        &self.hostname
    }

    fn elevate(&mut self, identity: &str) -> Result<(), ConnectionError> {
        validate_identity(&self.hostname, identity)?;
        self.run_as = Some(identity.to_string());
        Ok(())
    }

    fn dispatch_tail(
        &mut self,
        request: TailRequest,
        events: mpsc::Sender<Message>,
    ) -> DispatchHandle {
        let hostname = self.hostname.clone();
        let session = Arc::clone(&self.session);
        let command = remote_command_line(&self.remote_command, self.run_as.as_deref());

        let task = tokio::spawn({
            let hostname = hostname.clone();
            async move {
                if let Err(error) = run_remote_tail(&session, &command, request, events).await {
                    tracing::warn!(host = %hostname, %error, "Remote tail call failed");
                }
            }
        });

        DispatchHandle::new(hostname, task)
    }

    async fn close(&mut self) -> Result<(), ConnectionError> {
        let session = self.session.lock().await;
        session
            .disconnect(Disconnect::ByApplication, "session complete", "en")
            .await
            .map_err(|e| ConnectionError::CloseFailed {
                hostname: self.hostname.to_string(),
                reason: e.to_string(),
            })
    }
}

/// The elevation identity is spliced into the exec'd command line, so
/// it must not be able to alter the command
fn validate_identity(hostname: &Hostname, identity: &str) -> Result<(), ConnectionError> {
    let valid = !identity.is_empty()
        && identity
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(ConnectionError::ElevationFailed {
            hostname: hostname.to_string(),
            identity: identity.to_string(),
            reason: "identity must be non-empty alphanumeric with - _ .".to_string(),
        })
    }
}

/// The exec command line, with the elevation prefix applied
fn remote_command_line(remote_command: &str, run_as: Option<&str>) -> String {
    match run_as {
        Some(identity) => format!("sudo -n -u {} {}", identity, remote_command),
        None => remote_command.to_string(),
    }
}

/// Run one remote tail call on a fresh session channel, forwarding
/// decoded frames into the target's channel until the remote stream
/// closes or the consumer goes away
async fn run_remote_tail(
    session: &Mutex<client::Handle<ClientHandler>>,
    command: &str,
    request: TailRequest,
    events: mpsc::Sender<Message>,
) -> Result<()> {
    // The lock guards channel setup only; the channel itself carries
    // the rest of the call
    let mut channel: Channel<Msg> = {
        let session = session.lock().await;
        session.channel_open_session().await?
    };
    channel.exec(true, command).await?;

    // The request is the only frame we send; EOF tells the producer
    // no further input is coming
    let mut codec = MessageCodec::new();
    let mut buf = BytesMut::new();
    codec.encode(Message::Request(request), &mut buf)?;
    channel.data(&buf[..]).await?;
    channel.eof().await?;

    let mut inbound = BytesMut::new();
    while let Some(msg) = channel.wait().await {
        match msg {
            ChannelMsg::Data { ref data } => {
                inbound.extend_from_slice(data);
                while let Some(message) = codec.decode(&mut inbound)? {
                    if events.send(message).await.is_err() {
                        // Consumer gone; stop forwarding
                        return Ok(());
                    }
                }
            }
            ChannelMsg::ExtendedData { ref data, ext: 1 } => {
                tracing::debug!(stderr = %String::from_utf8_lossy(data), "Remote stderr");
            }
            ChannelMsg::ExitStatus { exit_status } if exit_status != 0 => {
                tracing::warn!(code = exit_status, "Remote tail exited with non-zero status");
            }
            ChannelMsg::Eof | ChannelMsg::Close => break,
            _ => {}
        }
    }

    drain_stream_end(&mut codec, &mut inbound, &events).await;
    Ok(())
}

/// Forward frames still buffered when the channel closes. Bytes left
/// over after that are a frame severed mid-transfer.
async fn drain_stream_end(
    codec: &mut MessageCodec,
    inbound: &mut BytesMut,
    events: &mpsc::Sender<Message>,
) {
    loop {
        match codec.decode_eof(inbound) {
            Ok(Some(message)) => {
                if events.send(message).await.is_err() {
                    return;
                }
            }
            Ok(None) => return,
            Err(error) => {
                tracing::warn!(%error, "Discarding truncated frame at stream close");
                return;
            }
        }
    }
}

/// SSH client handler for outbound tail connections
struct ClientHandler;

#[async_trait]
impl client::Handler for ClientHandler {
    type Error = russh::Error;

    /// Host key verification is delegated to the operator's network
    /// trust model (ad-hoc tailing does not consult known_hosts); the
    /// fingerprint is logged for the record.
    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        tracing::debug!("Server host key: {}", server_public_key.fingerprint());
        Ok(true)
    }
}
