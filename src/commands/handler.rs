//! Command Handler
//!
//! Splits a request line into whitespace-separated fields, dispatches on the
//! (case-insensitive) command name and runs it against the frontier.
//!
//! ## Supported Commands
//!
//! - `PING` - Test connection
//! - `GET key` - Get a key's value
//! - `SET key value` - Set a key that never expires
//! - `SET key value EX unix-seconds` - Set a key with an absolute expiry
//! - `DEL key` - Delete a key
//! - `EXISTS key` - Check if a key exists
//! - `TTL key` - Remaining seconds, `-1` without expiry, `-2` when absent
//! - `DBSIZE` - Approximate number of keys
//! - `INFO` - One-line server summary
//! - `RESIZE` - Start growing the shard topology

use crate::protocol::Reply;
use crate::storage::{unix_to_system_time, ResizeState, StoreError, StoreFrontier};
use bytes::Bytes;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Reasons a request line is rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,

    #[error("unknown command '{0}'")]
    Unknown(String),

    #[error("wrong number of arguments for '{0}' command")]
    WrongArity(&'static str),

    #[error("syntax error near '{0}'")]
    Syntax(String),

    #[error("invalid expire timestamp '{0}'")]
    InvalidTimestamp(String),

    #[error("{0}")]
    Store(#[from] StoreError),
}

type CommandResult = Result<Reply, CommandError>;

/// Executes request lines against a shared [`StoreFrontier`].
#[derive(Clone)]
pub struct CommandHandler {
    store: Arc<StoreFrontier>,
    /// Server start time for INFO
    start_time: Instant,
}

impl CommandHandler {
    /// Creates a new command handler with the given store.
    pub fn new(store: Arc<StoreFrontier>) -> Self {
        Self {
            store,
            start_time: Instant::now(),
        }
    }

    /// Time since this handler, or the one it was cloned from, was created.
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Executes one request line and returns the reply.
    ///
    /// Rejections come back as [`Reply::Error`]; nothing here is fatal to
    /// the connection.
    pub fn execute(&self, line: &str) -> Reply {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let result = match fields.split_first() {
            None => Err(CommandError::Empty),
            Some((name, args)) => self.dispatch(&name.to_uppercase(), args),
        };
        result.unwrap_or_else(|e| Reply::error(e.to_string()))
    }

    fn dispatch(&self, cmd: &str, args: &[&str]) -> CommandResult {
        match cmd {
            "PING" => Ok(Reply::Pong),
            "GET" => self.cmd_get(args),
            "SET" => self.cmd_set(args),
            "DEL" => self.cmd_del(args),
            "EXISTS" => self.cmd_exists(args),
            "TTL" => self.cmd_ttl(args),
            "DBSIZE" => Ok(Reply::Integer(self.store.len() as i64)),
            "INFO" => Ok(self.cmd_info()),
            "RESIZE" => self.cmd_resize(),
            _ => Err(CommandError::Unknown(cmd.to_string())),
        }
    }

    fn single_key<'a>(args: &[&'a str], name: &'static str) -> Result<&'a str, CommandError> {
        match args {
            [key] => Ok(key),
            _ => Err(CommandError::WrongArity(name)),
        }
    }

    fn cmd_get(&self, args: &[&str]) -> CommandResult {
        let key = Self::single_key(args, "get")?;
        Ok(self
            .store
            .get(key.as_bytes())
            .map(Reply::Value)
            .unwrap_or(Reply::Nil))
    }

    fn cmd_set(&self, args: &[&str]) -> CommandResult {
        let (key, value, expires_at) = match args {
            [key, value] => (key, value, None),
            [key, value, flag, at] => {
                if !flag.eq_ignore_ascii_case("EX") && !flag.eq_ignore_ascii_case("EXAT") {
                    return Err(CommandError::Syntax(flag.to_string()));
                }
                let expires_at = at
                    .parse::<u64>()
                    .ok()
                    .and_then(unix_to_system_time)
                    .ok_or_else(|| CommandError::InvalidTimestamp(at.to_string()))?;
                (key, value, Some(expires_at))
            }
            _ => return Err(CommandError::WrongArity("set")),
        };

        self.store.set(
            Bytes::copy_from_slice(key.as_bytes()),
            Bytes::copy_from_slice(value.as_bytes()),
            expires_at,
        );
        Ok(Reply::Ok)
    }

    fn cmd_del(&self, args: &[&str]) -> CommandResult {
        let key = Self::single_key(args, "del")?;
        Ok(Reply::boolean(self.store.delete(key.as_bytes())))
    }

    fn cmd_exists(&self, args: &[&str]) -> CommandResult {
        let key = Self::single_key(args, "exists")?;
        Ok(Reply::boolean(self.store.exists(key.as_bytes())))
    }

    fn cmd_ttl(&self, args: &[&str]) -> CommandResult {
        let key = Self::single_key(args, "ttl")?;
        Ok(Reply::Integer(self.store.ttl(key.as_bytes()).unwrap_or(-2)))
    }

    fn cmd_resize(&self) -> CommandResult {
        self.store.begin_resize()?;
        Ok(Reply::Ok)
    }

    fn cmd_info(&self) -> Reply {
        let stats = self.store.stats();
        let state = match self.store.state() {
            ResizeState::Stable => "stable",
            ResizeState::Migrating => "migrating",
        };
        let next = self
            .store
            .next_topology()
            .map(|t| t.to_string())
            .unwrap_or_else(|| "-".to_string());

        Reply::Text(format!(
            "state:{} topology:{} next:{} keys:{} gets:{} sets:{} dels:{} expired:{} migrated:{} uptime:{}",
            state,
            self.store.topology(),
            next,
            stats.keys,
            stats.get_ops,
            stats.set_ops,
            stats.del_ops,
            stats.expired,
            stats.migrated,
            self.uptime().as_secs()
        ))
    }
}
