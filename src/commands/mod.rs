//! Command Module
//!
//! Turns decoded request lines into calls on the [`StoreFrontier`] and
//! wraps the outcome in a [`Reply`](crate::protocol::Reply).
//!
//! ```text
//! request line ──> CommandHandler ──> StoreFrontier
//!                   - split fields
//!                   - dispatch
//!                   - execute
//! ```
//!
//! [`StoreFrontier`]: crate::storage::StoreFrontier

pub mod handler;

pub use handler::{CommandError, CommandHandler};
