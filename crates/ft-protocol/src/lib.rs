//! ft-protocol: Wire protocol for fantail remote tail streaming
//!
//! This crate defines the binary protocol spoken between the local
//! controller and the remote tail producer over the transport's stdio
//! channel. The controller sends a single `Request` frame; the producer
//! answers with a stream of `Line`, `Skipped`, and `Fatal` frames until
//! it exits and the stream closes.

pub mod codec;
pub mod error;
pub mod frame;
pub mod message;
pub mod record;

pub use codec::MessageCodec;
pub use error::ProtocolError;
pub use frame::{FrameHeader, HEADER_SIZE, MAX_PAYLOAD_SIZE};
pub use message::{Message, MessageType, SkipReason};
pub use record::{LineRecord, SeekWhence, TailRequest};
