//! Wire Protocol
//!
//! Requests and replies are single text lines carried in length-delimited
//! frames over a persistent TCP connection.
//!
//! ## Modules
//!
//! - `frame`: the length-prefix codec
//! - `types`: the `Reply` enum and its wire rendering
//! - `request`: client-side relative-TTL conversion
//!
//! ## Example
//!
//! ```
//! use gridkv::protocol::{absolutize_ttl, encode_frame, parse_frame};
//!
//! let line = absolutize_ttl("SET session abc EX 60", 1_000).unwrap();
//! assert_eq!(line, "SET session abc EX 1060");
//!
//! let frame = encode_frame(&line);
//! let (decoded, consumed) = parse_frame(&frame).unwrap().unwrap();
//! assert_eq!(decoded, line);
//! assert_eq!(consumed, frame.len());
//! ```

pub mod frame;
pub mod request;
pub mod types;

pub use frame::{encode_frame, parse_frame, FrameParser, ParseError, ParseResult};
pub use request::{absolutize_ttl, RequestError};
pub use types::Reply;
