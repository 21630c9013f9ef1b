//! Message types for the fantail protocol
//!
//! A single `Message` enum covers both directions of the stdio stream.
//! The controller sends exactly one `Request` frame after starting the
//! remote producer; the producer answers with any number of `Line`,
//! `Skipped`, and `Fatal` frames. There is no explicit end-of-stream
//! message - the producer exiting (and the transport closing its
//! stdout) is the close signal.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::record::{LineRecord, TailRequest};

/// Message type identifier, the first byte of every frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    /// Tail request (controller -> producer)
    Request = 0x01,
    /// A line read from a tailed file
    Line = 0x02,
    /// A path was skipped without being opened
    Skipped = 0x03,
    /// The producer hit an unrecoverable error and is terminating
    Fatal = 0x04,
}

impl MessageType {
    /// Convert to u8
    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    /// Convert from u8
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(Self::Request),
            0x02 => Some(Self::Line),
            0x03 => Some(Self::Skipped),
            0x04 => Some(Self::Fatal),
            _ => None,
        }
    }
}

/// Why a path was skipped rather than tailed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// The path does not exist
    NotFound,
    /// The path exists but is not a regular file
    NotRegular,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "does not exist"),
            Self::NotRegular => write!(f, "is not a regular file"),
        }
    }
}

/// Protocol messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    /// Tail request, sent once by the controller
    Request(TailRequest),

    /// One line read from a tailed file
    Line(LineRecord),

    /// A path was skipped without being opened.
    ///
    /// Advisory: the producer continues with the remaining paths.
    Skipped {
        /// The path that was skipped
        path: PathBuf,
        /// Why it was skipped
        reason: SkipReason,
    },

    /// The producer hit an unrecoverable I/O error.
    ///
    /// Sent as the last frame before the producer terminates, so the
    /// controller sees a structured error instead of a bare early
    /// close of the stream.
    Fatal {
        /// Human-readable description of the error
        message: String,
    },
}

impl Message {
    /// The frame type tag for this message
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::Request(_) => MessageType::Request,
            Self::Line(_) => MessageType::Line,
            Self::Skipped { .. } => MessageType::Skipped,
            Self::Fatal { .. } => MessageType::Fatal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_type_roundtrip() {
        for message_type in [
            MessageType::Request,
            MessageType::Line,
            MessageType::Skipped,
            MessageType::Fatal,
        ] {
            assert_eq!(
                MessageType::from_u8(message_type.as_u8()),
                Some(message_type)
            );
        }
        assert_eq!(MessageType::from_u8(0x00), None);
        assert_eq!(MessageType::from_u8(0xFF), None);
    }

    #[test]
    fn test_message_type_tags() {
        let line = Message::Line(LineRecord::new("/var/log/a", &b"x\n"[..]));
        assert_eq!(line.message_type(), MessageType::Line);

        let skipped = Message::Skipped {
            path: PathBuf::from("/gone"),
            reason: SkipReason::NotFound,
        };
        assert_eq!(skipped.message_type(), MessageType::Skipped);
    }
}
