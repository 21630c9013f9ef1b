//! Transport collaborator traits
//!
//! The engine treats the transport as an opaque concurrent engine: a
//! `Router` establishes remote execution contexts, and an
//! `ExecutionContext` can run exactly one remote tail operation whose
//! records arrive through the target's channel, not through the
//! dispatch handle. Tests substitute an in-process router; production
//! uses `SshRouter`.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use ft_core::{ConnectOptions, ConnectionError, Hostname};
use ft_protocol::{Message, TailRequest};

/// One outstanding asynchronous remote tail call.
///
/// Tracked for failure attribution and teardown only; results arrive
/// through the target's channel.
pub struct DispatchHandle {
    hostname: Hostname,
    task: JoinHandle<()>,
}

impl DispatchHandle {
    /// Wrap the forwarder task for a dispatched remote call
    pub fn new(hostname: Hostname, task: JoinHandle<()>) -> Self {
        Self { hostname, task }
    }

    /// The target this call was dispatched to
    pub fn hostname(&self) -> &Hostname {
        &self.hostname
    }

    /// Whether the remote call has completed
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Abort the forwarder task, severing the remote call
    pub fn abort(&self) {
        self.task.abort();
    }

    /// Wait for the forwarder task to finish (cancellation included)
    pub async fn join(self) {
        let _ = self.task.await;
    }
}

/// A remote execution context on one target host
#[async_trait]
pub trait ExecutionContext: Send {
    /// The host this context runs on
    fn hostname(&self) -> &Hostname;

    /// Layer a privilege-elevation identity over the context. All
    /// subsequent dispatches run as this identity.
    fn elevate(&mut self, identity: &str) -> Result<(), ConnectionError>;

    /// Start the remote tail operation asynchronously. Records flow
    /// into `events`; the sender is dropped when the remote stream
    /// closes, which is the producer's end-of-stream signal.
    fn dispatch_tail(
        &mut self,
        request: TailRequest,
        events: mpsc::Sender<Message>,
    ) -> DispatchHandle;

    /// Close the context, releasing the underlying connection
    async fn close(&mut self) -> Result<(), ConnectionError>;
}

/// Establishes remote execution contexts for hostnames
#[async_trait]
pub trait Router: Send + Sync {
    /// Establish a remote execution context on `hostname`
    async fn connect(
        &self,
        hostname: &Hostname,
        options: &ConnectOptions,
    ) -> Result<Box<dyn ExecutionContext>, ConnectionError>;

    /// Wrap a context in a privilege-elevation layer. The elevated
    /// context replaces the original for all subsequent calls.
    async fn elevate(
        &self,
        mut context: Box<dyn ExecutionContext>,
        identity: &str,
    ) -> Result<Box<dyn ExecutionContext>, ConnectionError> {
        context.elevate(identity)?;
        Ok(context)
    }
}
