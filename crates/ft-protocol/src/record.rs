//! Tail request and line record types

use std::io::SeekFrom;
use std::path::PathBuf;
use std::time::Duration;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Default interval between end-of-file probes in follow mode.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 250;

/// Origin for the initial seek before reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeekWhence {
    /// Seek relative to the beginning of the file
    Start,
    /// Seek relative to the current position
    Current,
    /// Seek relative to the end of the file
    End,
}

impl SeekWhence {
    /// Combine with an offset into a `SeekFrom` for the initial seek
    pub fn seek_from(self, offset: i64) -> SeekFrom {
        match self {
            // SeekFrom::Start takes an unsigned offset; negative offsets
            // relative to the start clamp to the beginning of the file.
            Self::Start => SeekFrom::Start(offset.max(0) as u64),
            Self::Current => SeekFrom::Current(offset),
            Self::End => SeekFrom::End(offset),
        }
    }
}

impl Default for SeekWhence {
    fn default() -> Self {
        Self::End
    }
}

/// Parameters for one remote tail invocation.
///
/// Immutable once dispatched; every target of a session receives the
/// same request. The elevation identity is not part of the request -
/// it is applied by the connection layer before the producer starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TailRequest {
    /// Files to tail, processed in order
    pub paths: Vec<PathBuf>,
    /// Byte offset for the initial seek
    pub seek_offset: i64,
    /// Origin the offset is relative to
    pub seek_whence: SeekWhence,
    /// Keep polling for new data after end-of-file
    pub follow: bool,
    /// Milliseconds to sleep between end-of-file probes when following
    pub poll_interval_ms: u64,
}

impl TailRequest {
    /// Create a request with default seek and follow behavior
    /// (seek to end, follow)
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self {
            paths,
            seek_offset: 0,
            seek_whence: SeekWhence::End,
            follow: true,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }

    /// Follow-mode sleep between end-of-file probes
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// The initial seek position
    pub fn seek_from(&self) -> SeekFrom {
        self.seek_whence.seek_from(self.seek_offset)
    }
}

/// One line read from a tailed file.
///
/// The payload is the raw bytes as read, trailing line terminator
/// included; the consumer strips it before display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRecord {
    /// Path the line was read from
    pub path: PathBuf,
    /// Raw line bytes, terminator included
    pub payload: Bytes,
}

impl LineRecord {
    /// Create a new line record
    pub fn new(path: impl Into<PathBuf>, payload: impl Into<Bytes>) -> Self {
        Self {
            path: path.into(),
            payload: payload.into(),
        }
    }

    /// Lossy UTF-8 text of the payload with the trailing terminator
    /// stripped. Undecodable bytes are replaced, never fatal.
    pub fn text_lossy(&self) -> String {
        let text = String::from_utf8_lossy(&self.payload);
        let text = text.strip_suffix('\n').unwrap_or(&text);
        let text = text.strip_suffix('\r').unwrap_or(text);
        text.to_string()
    }
}
