//! Async client for a GridKV server.
//!
//! [`Client`] sends one request line per frame and waits for the reply
//! frame. A five-field line is treated as carrying a relative TTL and is
//! rewritten with [`absolutize_ttl`] before it leaves the client.

use crate::protocol::{absolutize_ttl, encode_frame, parse_frame, ParseError, RequestError};
use crate::storage::unix_now;
use bytes::BytesMut;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};
use tracing::trace;

/// Errors that can occur while talking to a server.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bad request: {0}")]
    Request(#[from] RequestError),

    #[error("bad reply: {0}")]
    Parse(#[from] ParseError),

    /// The server closed the connection before replying
    #[error("connection closed by server")]
    ConnectionClosed,
}

/// A connection to a server over any byte stream.
pub struct Client<S> {
    stream: S,
    buffer: BytesMut,
}

impl Client<TcpStream> {
    /// Connects to the server at `addr`.
    pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Self::new(stream))
    }
}

impl<S> Client<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            buffer: BytesMut::with_capacity(4096),
        }
    }

    /// Sends `line` and returns the server's reply line.
    pub async fn send(&mut self, line: &str) -> Result<String, ClientError> {
        self.send_at(line, unix_now()).await
    }

    /// Like [`send`](Self::send), with relative TTLs resolved against
    /// `now_unix`.
    pub async fn send_at(&mut self, line: &str, now_unix: u64) -> Result<String, ClientError> {
        let request = absolutize_ttl(line, now_unix)?;
        trace!(request = %request, "Sending request");

        self.stream.write_all(&encode_frame(&request)).await?;
        self.stream.flush().await?;

        self.read_reply().await
    }

    async fn read_reply(&mut self) -> Result<String, ClientError> {
        loop {
            if let Some((line, consumed)) = parse_frame(&self.buffer)? {
                let _ = self.buffer.split_to(consumed);
                return Ok(line);
            }

            if self.stream.read_buf(&mut self.buffer).await? == 0 {
                return Err(ClientError::ConnectionClosed);
            }
        }
    }
}
