//! Fan-in multiplexer
//!
//! Merges the inbound channels of every registered target into a single
//! stream of host-attributed messages. Backed by `StreamMap`, which
//! polls ready streams without starving any of them and drops a stream
//! once its channel closes. No ordering is guaranteed across hosts;
//! within a host the channel's FIFO order is preserved.

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{StreamExt, StreamMap};

use ft_core::Hostname;
use ft_protocol::Message;

/// Single consumer over many per-target channels
pub struct FanIn {
    streams: StreamMap<Hostname, ReceiverStream<Message>>,
}

impl FanIn {
    /// Create an empty multiplexer
    pub fn new() -> Self {
        Self {
            streams: StreamMap::new(),
        }
    }

    /// Add a target's channel to the watch set. Must be called before
    /// the drain loop starts; dynamic registration is not supported.
    pub fn register(&mut self, hostname: Hostname, receiver: mpsc::Receiver<Message>) {
        self.streams.insert(hostname, ReceiverStream::new(receiver));
    }

    /// Next available message from any registered channel, blocking
    /// until one is ready. Returns `None` once every channel has
    /// closed - or immediately if none were registered.
    pub async fn next(&mut self) -> Option<(Hostname, Message)> {
        self.streams.next().await
    }

    /// Number of channels still open
    pub fn len(&self) -> usize {
        self.streams.len()
    }

    /// Whether any channels remain open
    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }
}

impl Default for FanIn {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ft_protocol::LineRecord;
    use std::collections::HashMap;

    fn line(text: &str) -> Message {
        Message::Line(LineRecord::new("/var/log/a", text.as_bytes().to_vec()))
    }

    #[tokio::test]
    async fn test_all_records_delivered_exactly_once() {
        let mut mux = FanIn::new();

        let (tx1, rx1) = mpsc::channel(8);
        let (tx2, rx2) = mpsc::channel(8);
        mux.register(Hostname::from("h1"), rx1);
        mux.register(Hostname::from("h2"), rx2);

        for i in 0..3 {
            tx1.send(line(&format!("a{}\n", i))).await.unwrap();
            tx2.send(line(&format!("b{}\n", i))).await.unwrap();
        }
        drop(tx1);
        drop(tx2);

        let mut per_host: HashMap<String, Vec<Message>> = HashMap::new();
        while let Some((hostname, message)) = mux.next().await {
            per_host.entry(hostname.to_string()).or_default().push(message);
        }

        // Every record arrives exactly once, attributed to its host,
        // in per-host order
        let h1 = per_host.remove("h1").unwrap();
        let h2 = per_host.remove("h2").unwrap();
        assert!(per_host.is_empty());
        assert_eq!(h1, vec![line("a0\n"), line("a1\n"), line("a2\n")]);
        assert_eq!(h2, vec![line("b0\n"), line("b1\n"), line("b2\n")]);
    }

    #[tokio::test]
    async fn test_closed_channel_dropped_others_keep_serving() {
        let mut mux = FanIn::new();

        let (tx1, rx1) = mpsc::channel(8);
        let (tx2, rx2) = mpsc::channel(8);
        mux.register(Hostname::from("h1"), rx1);
        mux.register(Hostname::from("h2"), rx2);

        drop(tx1);
        tx2.send(line("still here\n")).await.unwrap();

        let (hostname, _) = mux.next().await.unwrap();
        assert_eq!(hostname, Hostname::from("h2"));

        drop(tx2);
        assert!(mux.next().await.is_none());
    }

    #[tokio::test]
    async fn test_empty_mux_closes_immediately() {
        let mut mux = FanIn::new();
        assert!(mux.is_empty());
        assert!(mux.next().await.is_none());
    }
}
