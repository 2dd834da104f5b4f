//! Storage Module
//!
//! The core of GridKV: a sharded, expiring key-value store that can grow its
//! shard topology while it keeps serving.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                        StoreFrontier                           │
//! │   ┌──────────────────────────┐   ┌──────────────────────────┐  │
//! │   │   current: Generation    │   │  next: Generation (opt)  │  │
//! │   │  ┌────────┐  ┌────────┐  │   │  ┌────────┐  ┌────────┐  │  │
//! │   │  │Manager0│  │Manager1│  │──>│  │Manager0│..│ManagerN│  │  │
//! │   │  │ Shards │  │ Shards │  │   │  │ Shards │  │ Shards │  │  │
//! │   │  └────────┘  └────────┘  │   │  └────────┘  └────────┘  │  │
//! │   └──────────────────────────┘   └──────────────────────────┘  │
//! └────────────────────────────────────────────────────────────────┘
//!            ▲                                  ▲
//!   ┌────────┴────────┐               ┌─────────┴────────┐
//!   │  ExpirySweeper  │               │     Migrator     │
//!   └─────────────────┘               └──────────────────┘
//! ```
//!
//! - **Two-level striping**: a key routes to one shard of one manager; only
//!   that shard's RwLock is taken for the data access.
//! - **Online resize**: a larger `next` generation is filled incrementally
//!   while reads check `next` first and fall back to `current`.
//! - **Lazy + active expiry**: reads hide expired entries, the sweeper
//!   reclaims them.
//!
//! ## Example
//!
//! ```
//! use gridkv::storage::{ResizePolicy, StoreFrontier, Topology};
//! use bytes::Bytes;
//! use std::time::Duration;
//!
//! let store = StoreFrontier::with_topology(
//!     Topology::new(2, 2).unwrap(),
//!     64,
//!     ResizePolicy::default(),
//! );
//! store.set(Bytes::from("name"), Bytes::from("gridkv"), None);
//! store.set_with_ttl(Bytes::from("session"), Bytes::from("abc"), Duration::from_secs(60));
//!
//! store.resize_to(Topology::new(4, 4).unwrap()).unwrap();
//! store.migrate_all(128).unwrap();
//! assert_eq!(store.get(b"name"), Some(Bytes::from("gridkv")));
//! ```

pub mod entry;
pub mod error;
pub mod expiry;
pub mod frontier;
pub mod generation;
pub mod manager;
pub mod migration;
pub mod router;
pub mod shard;
pub mod store;

pub use entry::{unix_now, unix_to_system_time, Entry};
pub use error::{StoreError, StoreResult};
pub use expiry::{ExpiryConfig, ExpirySweeper};
pub use frontier::{MigrationStep, ResizeState, StoreFrontier, StoreStats};
pub use generation::{Generation, ResizePolicy, Topology};
pub use manager::ShardManager;
pub use migration::{MigrationConfig, Migrator};
pub use shard::Shard;
pub use store::{Store, StoreConfig};
