//! Length-Delimited Frame Codec
//!
//! Every message, in both directions, is one text line wrapped in a frame:
//!
//! ```text
//! ┌───────────────────────┬──────────────────────────────┐
//! │ length: u32 big-endian│ payload: UTF-8, `length` B   │
//! └───────────────────────┴──────────────────────────────┘
//! ```
//!
//! The parser is incremental. It returns:
//! - `Ok(Some((line, consumed)))` - a whole frame was decoded
//! - `Ok(None)` - need more data
//! - `Err(ParseError)` - the stream is unusable

use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

/// Size of the length prefix.
pub const HEADER_LEN: usize = 4;

/// Largest payload accepted (1 MiB).
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Errors that can occur while decoding frames.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    /// The declared payload length exceeds [`MAX_FRAME_SIZE`]
    #[error("frame too large: {size} bytes (max: {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// The payload is not valid UTF-8
    #[error("invalid UTF-8: {0}")]
    InvalidUtf8(String),
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Incremental frame decoder.
#[derive(Debug, Default)]
pub struct FrameParser;

impl FrameParser {
    pub fn new() -> Self {
        Self
    }

    /// Attempts to decode one frame from the front of `buf`.
    pub fn parse(&mut self, buf: &[u8]) -> ParseResult<Option<(String, usize)>> {
        parse_frame(buf)
    }
}

/// Decodes one frame from the front of `buf`.
pub fn parse_frame(buf: &[u8]) -> ParseResult<Option<(String, usize)>> {
    if buf.len() < HEADER_LEN {
        return Ok(None);
    }

    let mut header = [0u8; HEADER_LEN];
    header.copy_from_slice(&buf[..HEADER_LEN]);
    let len = u32::from_be_bytes(header) as usize;

    if len > MAX_FRAME_SIZE {
        return Err(ParseError::FrameTooLarge {
            size: len,
            max: MAX_FRAME_SIZE,
        });
    }

    let end = HEADER_LEN + len;
    if buf.len() < end {
        return Ok(None);
    }

    let line = std::str::from_utf8(&buf[HEADER_LEN..end])
        .map_err(|e| ParseError::InvalidUtf8(e.to_string()))?;

    Ok(Some((line.to_string(), end)))
}

/// Encodes one line as a frame.
///
/// Lines longer than [`MAX_FRAME_SIZE`] are the caller's problem: the peer
/// will reject them.
pub fn encode_frame(line: &str) -> Bytes {
    let mut buf = BytesMut::with_capacity(HEADER_LEN + line.len());
    buf.put_u32(line.len() as u32);
    buf.put_slice(line.as_bytes());
    buf.freeze()
}
