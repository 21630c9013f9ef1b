//! ft-remote: Remote tail producer
//!
//! The producer runs on the target host (inside the `remote-tail` CLI
//! mode, executed over SSH) and streams framed line records back to the
//! controller over its stdout.

pub mod producer;

pub use producer::{stream_paths, ProducerError};
