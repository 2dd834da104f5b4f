//! Reply values sent back to clients.
//!
//! Each reply is rendered as a single text line and then framed:
//!
//! - `OK` / `PONG` - acknowledgements
//! - `<value>` - a stored value
//! - `(nil)` - key absent or expired
//! - `<integer>` - counts, booleans, TTLs
//! - `ERR <message>` - the command was rejected; the connection stays open

use crate::protocol::frame::encode_frame;
use bytes::Bytes;
use std::fmt;

/// Marker line for a missing value.
pub const NIL: &str = "(nil)";

/// Represents a reply to one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Successful mutation
    Ok,

    /// Answer to PING
    Pong,

    /// A stored value
    Value(Bytes),

    /// Missing or expired key
    Nil,

    /// Integer result
    Integer(i64),

    /// Free-form informational line (INFO)
    Text(String),

    /// Rejected request
    Error(String),
}

impl Reply {
    /// Creates a new error reply.
    pub fn error(s: impl Into<String>) -> Self {
        Reply::Error(s.into())
    }

    /// Boolean as `1` / `0`.
    pub fn boolean(b: bool) -> Self {
        Reply::Integer(b as i64)
    }

    /// Renders the reply as its wire line.
    pub fn serialize(&self) -> String {
        self.to_string()
    }

    /// Renders the reply as a ready-to-send frame.
    pub fn to_frame(&self) -> Bytes {
        encode_frame(&self.serialize())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Ok => write!(f, "OK"),
            Reply::Pong => write!(f, "PONG"),
            Reply::Value(data) => write!(f, "{}", String::from_utf8_lossy(data)),
            Reply::Nil => write!(f, "{}", NIL),
            Reply::Integer(n) => write!(f, "{}", n),
            Reply::Text(s) => write!(f, "{}", s),
            Reply::Error(s) => write!(f, "ERR {}", s),
        }
    }
}
