//! Session orchestration
//!
//! One `Session` covers one run: connect to every requested host
//! (skipping failures), register the healthy targets with a fan-in
//! multiplexer, dispatch the remote tail producer on each, drain the
//! multiplexer to the output stream, and tear everything down. The
//! shutdown phase is unconditional - it runs whether the stream phase
//! ended by exhaustion, interruption, or error.

use std::time::Duration;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

use ft_core::{ConnectOptions, Hostname, SessionError};
use ft_protocol::{Message, TailRequest};

use crate::mux::FanIn;
use crate::router::{DispatchHandle, Router};
use crate::target::Target;

/// Bound on waiting for any single teardown step
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing has happened yet
    Idle,
    /// Connecting to the requested hosts
    Connecting,
    /// Draining the multiplexer
    Streaming,
    /// Releasing connections
    ShuttingDown,
    /// Everything released
    Closed,
}

/// Outcome of a completed session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    /// Hosts that connected and were dispatched to
    pub hosts_connected: usize,
    /// Hosts excluded because connection setup failed
    pub hosts_failed: usize,
    /// Line records written to the output stream
    pub lines_emitted: u64,
}

/// The set of healthy targets plus the multiplexer bound to them
pub struct Session {
    targets: Vec<Target>,
    mux: FanIn,
    dispatches: Vec<DispatchHandle>,
    state: SessionState,
    hosts_failed: usize,
}

impl Session {
    /// Create an idle session
    pub fn new() -> Self {
        Self {
            targets: Vec::new(),
            mux: FanIn::new(),
            dispatches: Vec::new(),
            state: SessionState::Idle,
            hosts_failed: 0,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Run the full session: connect, register, dispatch, stream,
    /// shutdown. Cancelling `cancel` during the stream phase is a
    /// normal termination trigger, not an error; shutdown runs in
    /// every case.
    #[allow(clippy::too_many_arguments)]
    pub async fn run<W>(
        &mut self,
        hosts: &[Hostname],
        request: TailRequest,
        elevate_as: Option<&str>,
        router: &dyn Router,
        options: &ConnectOptions,
        cancel: CancellationToken,
        out: &mut W,
    ) -> Result<SessionSummary, SessionError>
    where
        W: AsyncWrite + Unpin,
    {
        if request.paths.is_empty() {
            return Err(SessionError::NoPaths);
        }

        self.connect(hosts, router, elevate_as, options).await;
        self.register();
        self.dispatch(&request)?;

        let hosts_connected = self.targets.len();
        let stream_result = self.stream(&cancel, out).await;

        // Unconditional: runs on exhaustion, interruption, and error alike
        self.shutdown().await;

        let lines_emitted = stream_result?;
        Ok(SessionSummary {
            hosts_connected,
            hosts_failed: self.hosts_failed,
            lines_emitted,
        })
    }

    /// Connect phase: sequential per host, failures logged and skipped
    async fn connect(
        &mut self,
        hosts: &[Hostname],
        router: &dyn Router,
        elevate_as: Option<&str>,
        options: &ConnectOptions,
    ) {
        self.state = SessionState::Connecting;

        for hostname in hosts {
            match Target::setup(hostname.clone(), router, elevate_as, options).await {
                Ok(target) => {
                    tracing::info!(host = %hostname, "Connected");
                    self.targets.push(target);
                }
                Err(error) => {
                    tracing::warn!(host = %hostname, %error, "Skipping host: connection failed");
                    self.hosts_failed += 1;
                }
            }
        }

        tracing::info!(
            connected = self.targets.len(),
            failed = self.hosts_failed,
            "Connect phase complete"
        );
    }

    /// Registration phase: bind every healthy target's channel to the
    /// multiplexer
    fn register(&mut self) {
        for target in &mut self.targets {
            let hostname = target.hostname().clone();
            if let Some(receiver) = target.take_receiver() {
                self.mux.register(hostname, receiver);
            }
        }
    }

    /// Dispatch phase: start the remote producer on every healthy
    /// target without blocking on any of them
    fn dispatch(&mut self, request: &TailRequest) -> Result<(), SessionError> {
        for target in &mut self.targets {
            tracing::info!(host = %target.hostname(), "Start tailing");
            let handle = target.dispatch(request.clone())?;
            self.dispatches.push(handle);
        }
        Ok(())
    }

    /// Stream phase: drain the multiplexer to the output stream until
    /// every channel has closed or the session is interrupted
    async fn stream<W>(
        &mut self,
        cancel: &CancellationToken,
        out: &mut W,
    ) -> Result<u64, SessionError>
    where
        W: AsyncWrite + Unpin,
    {
        self.state = SessionState::Streaming;
        let mut lines_emitted: u64 = 0;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Interrupted");
                    break;
                }
                next = self.mux.next() => {
                    match next {
                        None => {
                            tracing::debug!("All channels closed");
                            break;
                        }
                        Some((hostname, Message::Line(record))) => {
                            let line = format!(
                                "{}[{}]: {}\n",
                                hostname,
                                record.path.display(),
                                record.text_lossy()
                            );
                            out.write_all(line.as_bytes())
                                .await
                                .map_err(SessionError::Output)?;
                            out.flush().await.map_err(SessionError::Output)?;
                            lines_emitted += 1;
                        }
                        Some((hostname, Message::Skipped { path, reason })) => {
                            tracing::warn!(
                                host = %hostname,
                                path = %path.display(),
                                %reason,
                                "Path skipped on host"
                            );
                        }
                        Some((hostname, Message::Fatal { message })) => {
                            tracing::error!(host = %hostname, %message, "Remote tail failed");
                        }
                        Some((hostname, Message::Request(_))) => {
                            tracing::warn!(host = %hostname, "Unexpected request frame from target");
                        }
                    }
                }
            }
        }

        Ok(lines_emitted)
    }

    /// Shutdown phase: sever outstanding remote calls, then release
    /// every connection. A failure to release one target never stops
    /// the release of the rest.
    async fn shutdown(&mut self) {
        self.state = SessionState::ShuttingDown;
        tracing::info!("Shutting down");

        for handle in &self.dispatches {
            handle.abort();
        }
        for handle in self.dispatches.drain(..) {
            let _ = tokio::time::timeout(SHUTDOWN_TIMEOUT, handle.join()).await;
        }

        for target in &mut self.targets {
            let hostname = target.hostname().clone();
            match tokio::time::timeout(SHUTDOWN_TIMEOUT, target.close()).await {
                Ok(Ok(())) => tracing::debug!(host = %hostname, "Connection released"),
                Ok(Err(error)) => {
                    tracing::warn!(host = %hostname, %error, "Failed to release connection");
                }
                Err(_) => {
                    tracing::warn!(host = %hostname, "Timed out releasing connection");
                }
            }
        }
        self.targets.clear();

        self.state = SessionState::Closed;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_idle() {
        let session = Session::new();
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn test_empty_request_rejected() {
        let mut session = Session::new();
        let request = TailRequest::new(Vec::new());

        struct NoRouter;
        #[async_trait::async_trait]
        impl Router for NoRouter {
            async fn connect(
                &self,
                hostname: &Hostname,
                _options: &ConnectOptions,
            ) -> Result<Box<dyn crate::router::ExecutionContext>, ft_core::ConnectionError>
            {
                Err(ft_core::ConnectionError::Unreachable {
                    hostname: hostname.to_string(),
                    reason: "unused".to_string(),
                })
            }
        }

        let mut out = std::io::Cursor::new(Vec::new());
        let result = session
            .run(
                &[Hostname::from("h1")],
                request,
                None,
                &NoRouter,
                &ConnectOptions::default(),
                CancellationToken::new(),
                &mut out,
            )
            .await;
        assert!(matches!(result, Err(SessionError::NoPaths)));
    }
}
