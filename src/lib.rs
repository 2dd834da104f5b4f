//! # GridKV - An In-Memory Key-Value Store with Online Resharding
//!
//! GridKV keeps byte-string keys and values in memory, spread over a
//! two-level grid of locked shards. When the grid fills past its load
//! factor, a larger grid is built next to it and keys migrate over in small
//! batches while the store keeps answering reads and writes.
//!
//! ## Features
//!
//! - **Two-level sharding**: managers hold shards, each shard has its own
//!   `RwLock`, so unrelated keys never contend
//! - **Online resize**: a `current` and a `next` generation coexist during
//!   migration; reads check `next` then `current`
//! - **TTL Support**: absolute expiry per key, lazy on read plus a background
//!   sweeper
//! - **Async I/O**: Tokio accept loop, one task per connection
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                               GridKV                                    │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │ TCP Server  │───>│ Connection  │───>│  Command    │                  │
//! │  │ (Listener)  │    │  Handler    │    │  Handler    │                  │
//! │  └─────────────┘    └─────────────┘    └──────┬──────┘                  │
//! │                                               │                         │
//! │                                               ▼                         │
//! │                     ┌──────────────────────────────────────────────┐    │
//! │                     │               StoreFrontier                  │    │
//! │                     │   current Generation ──> next Generation     │    │
//! │                     │   (managers x shards)    (managers x shards) │    │
//! │                     └──────────────────────────────────────────────┘    │
//! │                           ▲                              ▲              │
//! │                 ┌─────────┴────────┐          ┌──────────┴────────┐     │
//! │                 │  ExpirySweeper   │          │     Migrator      │     │
//! │                 └──────────────────┘          └───────────────────┘     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use gridkv::commands::CommandHandler;
//! use gridkv::connection::{handle_connection, ConnectionStats};
//! use gridkv::storage::{Store, StoreConfig};
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = Store::open(StoreConfig::default());
//!     let stats = Arc::new(ConnectionStats::new());
//!     let listener = TcpListener::bind("127.0.0.1:8080").await.unwrap();
//!
//!     loop {
//!         let (stream, addr) = listener.accept().await.unwrap();
//!         let handler = CommandHandler::new(Arc::clone(store.frontier()));
//!         tokio::spawn(handle_connection(stream, addr, handler, Arc::clone(&stats)));
//!     }
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`storage`]: shards, generations, the frontier and its background tasks
//! - [`protocol`]: frame codec, replies and client-side TTL conversion
//! - [`commands`]: request line dispatch
//! - [`connection`]: per-client connection loop
//! - [`client`]: async client

pub mod client;
pub mod commands;
pub mod connection;
pub mod protocol;
pub mod storage;

pub use client::{Client, ClientError};
pub use commands::CommandHandler;
pub use connection::{handle_connection, ConnectionStats};
pub use protocol::{ParseError, Reply};
pub use storage::{Store, StoreConfig, StoreError, StoreFrontier};

/// The default port GridKV listens on
pub const DEFAULT_PORT: u16 = 8080;

/// The default host GridKV binds to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Version of GridKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
