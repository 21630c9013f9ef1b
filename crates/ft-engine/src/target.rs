//! Target connection lifecycle
//!
//! A `Target` owns one remote host's execution context and its inbound
//! channel exclusively. The receiver moves into the multiplexer at
//! registration; the sender moves into the dispatched remote call so
//! the channel closes exactly when the producer's stream does.

use tokio::sync::mpsc;

use ft_core::{ConnectOptions, ConnectionError, Hostname, SessionError};
use ft_protocol::{Message, TailRequest};

use crate::router::{DispatchHandle, ExecutionContext, Router};

/// Capacity of a target's inbound channel.
///
/// Holds decoded records between the transport's forwarder task and
/// the multiplexer. 256 gives bursty producers headroom without letting
/// a stalled consumer buffer unboundedly.
pub const TARGET_CHANNEL_CAPACITY: usize = 256;

/// One managed remote host
pub struct Target {
    hostname: Hostname,
    context: Box<dyn ExecutionContext>,
    sender: Option<mpsc::Sender<Message>>,
    receiver: Option<mpsc::Receiver<Message>>,
}

impl Target {
    /// Establish the execution context for `hostname` and allocate its
    /// inbound channel. Elevation, when requested, is layered on top of
    /// the base connection before anything is dispatched.
    pub async fn setup(
        hostname: Hostname,
        router: &dyn Router,
        elevate_as: Option<&str>,
        options: &ConnectOptions,
    ) -> Result<Self, ConnectionError> {
        let mut context = router.connect(&hostname, options).await?;
        if let Some(identity) = elevate_as {
            context = router.elevate(context, identity).await?;
        }

        let (sender, receiver) = mpsc::channel(TARGET_CHANNEL_CAPACITY);

        Ok(Self {
            hostname,
            context,
            sender: Some(sender),
            receiver: Some(receiver),
        })
    }

    /// The host this target manages
    pub fn hostname(&self) -> &Hostname {
        &self.hostname
    }

    /// Take the inbound receiver for registration with the multiplexer
    pub fn take_receiver(&mut self) -> Option<mpsc::Receiver<Message>> {
        self.receiver.take()
    }

    /// Dispatch the remote tail call, handing the channel's sender to
    /// the transport. Consumes the sender: once the remote stream ends
    /// the channel closes and the multiplexer drops this target.
    pub fn dispatch(&mut self, request: TailRequest) -> Result<DispatchHandle, SessionError> {
        let sender = self
            .sender
            .take()
            .ok_or_else(|| SessionError::AlreadyDispatched(self.hostname.to_string()))?;
        Ok(self.context.dispatch_tail(request, sender))
    }

    /// Release the connection
    pub async fn close(&mut self) -> Result<(), ConnectionError> {
        // Drop an undispatched sender so the channel closes either way
        self.sender = None;
        self.context.close().await
    }
}
