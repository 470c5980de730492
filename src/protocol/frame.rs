//! The wire frame (spec.md §4.1):
//!
//! ```text
//! [tag: i32 BE][type: i32 BE][length: i32 BE][payload: length bytes]
//! ```
//!
//! `tag` is the client-chosen correlation id, echoed verbatim by the server.
//! `type` is an operation code on a request and a status code (200/500) on
//! a response. A `length` of zero is a valid, empty payload.

use crate::constants::MAX_FRAME_PAYLOAD;
use crate::error::Error;
use std::io::{self, Read, Write};

pub const STATUS_OK: i32 = 200;
pub const STATUS_ERR: i32 = 500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub tag: i32,
    pub kind: i32,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn new(tag: i32, kind: i32, payload: Vec<u8>) -> Self {
        Self { tag, kind, payload }
    }

    pub fn err(tag: i32, message: &str) -> Self {
        Self::new(tag, STATUS_ERR, message.as_bytes().to_vec())
    }

    pub fn ok(tag: i32, payload: Vec<u8>) -> Self {
        Self::new(tag, STATUS_OK, payload)
    }

    /// Writes this frame to `w` as a single contiguous buffer so that a
    /// concurrent write from another frame can never interleave with it at
    /// the byte level (callers additionally hold a write mutex for the
    /// cross-thread guarantee; this only prevents a single `write` call
    /// from being split into several `write_all` calls).
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let len: i32 = self
            .payload
            .len()
            .try_into()
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "payload too large"))?;
        let mut buf = Vec::with_capacity(12 + self.payload.len());
        buf.extend_from_slice(&self.tag.to_be_bytes());
        buf.extend_from_slice(&self.kind.to_be_bytes());
        buf.extend_from_slice(&len.to_be_bytes());
        buf.extend_from_slice(&self.payload);
        w.write_all(&buf)
    }

    /// Blocks until one complete frame has been read, or returns an error
    /// on EOF, a malformed header, or an oversized payload. EOF on the very
    /// first byte of the header is reported the same as any other read
    /// failure — the caller (the connection's reader, or the client demux's
    /// reader) treats it as a terminal stream error per spec.md §4.1.
    pub fn read_from<R: Read>(r: &mut R) -> Result<Self, Error> {
        let mut header = [0u8; 12];
        r.read_exact(&mut header)
            .map_err(|e| Error::Protocol(format!("stream closed or truncated frame: {e}")))?;

        let tag = i32::from_be_bytes(header[0..4].try_into().unwrap());
        let kind = i32::from_be_bytes(header[4..8].try_into().unwrap());
        let length = i32::from_be_bytes(header[8..12].try_into().unwrap());

        if length < 0 {
            return Err(Error::Protocol(format!("negative frame length: {length}")));
        }
        let length = length as usize;
        if length > MAX_FRAME_PAYLOAD {
            return Err(Error::Protocol(format!(
                "frame payload too large: {length} bytes (max {MAX_FRAME_PAYLOAD})"
            )));
        }

        let mut payload = vec![0u8; length];
        r.read_exact(&mut payload)
            .map_err(|e| Error::Protocol(format!("truncated frame payload: {e}")))?;

        Ok(Frame { tag, kind, payload })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trips_tag_type_payload() {
        let frame = Frame::new(42, 7, b"hello".to_vec());
        let mut buf = Vec::new();
        frame.write_to(&mut buf).unwrap();

        let mut cursor = Cursor::new(buf);
        let decoded = Frame::read_from(&mut cursor).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn empty_payload_is_valid() {
        let frame = Frame::new(1, 200, Vec::new());
        let mut buf = Vec::new();
        frame.write_to(&mut buf).unwrap();

        let mut cursor = Cursor::new(buf);
        let decoded = Frame::read_from(&mut cursor).unwrap();
        assert_eq!(decoded.payload.len(), 0);
    }

    #[test]
    fn negative_tag_round_trips() {
        let frame = Frame::new(-1, -1, vec![1, 2, 3]);
        let mut buf = Vec::new();
        frame.write_to(&mut buf).unwrap();

        let mut cursor = Cursor::new(buf);
        let decoded = Frame::read_from(&mut cursor).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn truncated_header_is_an_error() {
        let mut cursor = Cursor::new(vec![0u8; 4]);
        assert!(Frame::read_from(&mut cursor).is_err());
    }

    #[test]
    fn truncated_payload_is_an_error() {
        let frame = Frame::new(1, 1, vec![1, 2, 3, 4, 5]);
        let mut buf = Vec::new();
        frame.write_to(&mut buf).unwrap();
        buf.truncate(buf.len() - 2);

        let mut cursor = Cursor::new(buf);
        assert!(Frame::read_from(&mut cursor).is_err());
    }

    #[test]
    fn oversized_payload_rejected() {
        let mut header = Vec::new();
        header.extend_from_slice(&1i32.to_be_bytes());
        header.extend_from_slice(&1i32.to_be_bytes());
        header.extend_from_slice(&((MAX_FRAME_PAYLOAD as i32) + 1).to_be_bytes());

        let mut cursor = Cursor::new(header);
        assert!(Frame::read_from(&mut cursor).is_err());
    }
}
