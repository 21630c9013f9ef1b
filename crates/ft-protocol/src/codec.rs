//! Tokio codec for framed protocol messages

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::ProtocolError;
use crate::frame::{FrameHeader, MAX_PAYLOAD_SIZE};
use crate::message::Message;

/// Codec for encoding/decoding protocol messages
#[derive(Debug, Default)]
pub struct MessageCodec {
    /// Current header being decoded (if any)
    pending_header: Option<FrameHeader>,
}

impl MessageCodec {
    /// Create a new codec
    pub fn new() -> Self {
        Self {
            pending_header: None,
        }
    }
}

impl Decoder for MessageCodec {
    type Item = Message;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // Try to decode header if we don't have one
        let header = match self.pending_header.take() {
            Some(h) => h,
            None => match FrameHeader::decode(src)? {
                Some(h) => h,
                None => return Ok(None), // Need more data
            },
        };

        // Check payload length
        let payload_len = header.payload_length as usize;
        if payload_len > MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::PayloadTooLarge {
                size: payload_len,
                max: MAX_PAYLOAD_SIZE,
            });
        }

        // Check if we have enough data for the payload
        if src.len() < payload_len {
            // Save header and wait for more data
            self.pending_header = Some(header);
            return Ok(None);
        }

        // Extract payload
        let payload_bytes = src.split_to(payload_len).freeze();

        // Deserialize message
        let message: Message = bincode::deserialize(&payload_bytes)?;

        Ok(Some(message))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(message) => Ok(Some(message)),
            None if src.is_empty() && self.pending_header.is_none() => Ok(None),
            // Stream closed with a partial frame buffered
            None => Err(ProtocolError::TruncatedFrame),
        }
    }
}

impl Encoder<Message> for MessageCodec {
    type Error = ProtocolError;

    fn encode(&mut self, message: Message, dst: &mut BytesMut) -> Result<(), Self::Error> {
        // Serialize the message
        let payload = bincode::serialize(&message)?;
        let payload_len = payload.len();

        // Check payload size
        if payload_len > MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::PayloadTooLarge {
                size: payload_len,
                max: MAX_PAYLOAD_SIZE,
            });
        }

        // Encode header
        let header = FrameHeader::new(message.message_type(), payload_len as u32);
        header.encode(dst);

        // Append payload
        dst.extend_from_slice(&payload);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::SkipReason;
    use crate::record::{LineRecord, SeekWhence, TailRequest};
    use std::path::PathBuf;

    #[test]
    fn test_codec_roundtrip_request() {
        let mut codec = MessageCodec::new();

        let mut request = TailRequest::new(vec![
            PathBuf::from("/var/log/syslog"),
            PathBuf::from("/var/log/auth.log"),
        ]);
        request.seek_offset = -512;
        request.seek_whence = SeekWhence::End;
        request.follow = false;

        let mut buf = BytesMut::new();
        codec
            .encode(Message::Request(request.clone()), &mut buf)
            .unwrap();

        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded, Message::Request(request));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_codec_roundtrip_line() {
        let mut codec = MessageCodec::new();

        let message = Message::Line(LineRecord::new("/var/log/syslog", &b"boot ok\n"[..]));

        let mut buf = BytesMut::new();
        codec.encode(message.clone(), &mut buf).unwrap();

        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn test_codec_partial_frame() {
        let mut codec = MessageCodec::new();

        let message = Message::Skipped {
            path: PathBuf::from("/gone"),
            reason: SkipReason::NotFound,
        };

        let mut buf = BytesMut::new();
        codec.encode(message.clone(), &mut buf).unwrap();

        // Feed the codec one byte at a time; it must not yield a message
        // until the full frame has arrived
        let full = buf.split();
        let mut feed = BytesMut::new();
        for (i, byte) in full.iter().enumerate() {
            feed.extend_from_slice(&[*byte]);
            let result = codec.decode(&mut feed).unwrap();
            if i + 1 < full.len() {
                assert!(result.is_none());
            } else {
                assert_eq!(result.unwrap(), message);
            }
        }
    }

    #[test]
    fn test_codec_multiple_frames_in_buffer() {
        let mut codec = MessageCodec::new();

        let first = Message::Line(LineRecord::new("/a", &b"1\n"[..]));
        let second = Message::Line(LineRecord::new("/a", &b"2\n"[..]));

        let mut buf = BytesMut::new();
        codec.encode(first.clone(), &mut buf).unwrap();
        codec.encode(second.clone(), &mut buf).unwrap();

        assert_eq!(codec.decode(&mut buf).unwrap().unwrap(), first);
        assert_eq!(codec.decode(&mut buf).unwrap().unwrap(), second);
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_codec_eof_with_partial_frame() {
        let mut codec = MessageCodec::new();

        let mut buf = BytesMut::new();
        codec
            .encode(Message::Line(LineRecord::new("/a", &b"1\n"[..])), &mut buf)
            .unwrap();
        buf.truncate(buf.len() - 1);

        // Header consumed, payload incomplete, stream closed
        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert!(matches!(
            codec.decode_eof(&mut buf),
            Err(ProtocolError::TruncatedFrame)
        ));
    }
}
