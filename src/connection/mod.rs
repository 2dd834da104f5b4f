//! Connection Handling
//!
//! Each accepted TCP connection gets its own task running a
//! [`ConnectionHandler`]. Requests on one connection are answered in order;
//! any number of connections run concurrently against the shared store.
//!
//! ```text
//! TcpListener (main.rs)
//!      │ accept()
//!      ▼
//! tokio::spawn(handle_connection(..))
//!      │
//!      ▼
//! ┌─────────────────────────────────────────────────────┐
//! │ ConnectionHandler                                   │
//! │  read bytes ──> decode frame ──> CommandHandler     │
//! │       ▲                                │            │
//! │       └────────── write reply frame <──┘            │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use gridkv::commands::CommandHandler;
//! use gridkv::connection::{handle_connection, ConnectionStats};
//!
//! let stats = Arc::new(ConnectionStats::new());
//! let handler = CommandHandler::new(Arc::clone(store.frontier()));
//!
//! let (stream, addr) = listener.accept().await?;
//! tokio::spawn(handle_connection(stream, addr, handler, stats));
//! ```

pub mod handler;

pub use handler::{handle_connection, ConnectionError, ConnectionHandler, ConnectionStats};
