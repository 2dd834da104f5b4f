//! Client-side request preparation.
//!
//! A typed line with exactly five whitespace-separated fields is a mutating
//! command whose last field is a relative TTL in seconds, e.g.
//! `SET session abc EX 60`. Before sending, the TTL is replaced with the
//! absolute Unix timestamp `now + ttl`, so the store only ever sees
//! absolute expiries. Lines with any other field count pass through as-is.

use thiserror::Error;

/// Number of fields that marks a line as carrying a relative TTL.
pub const TTL_FIELDS: usize = 5;

/// Errors raised while preparing a request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// The TTL field is not an integer
    #[error("invalid ttl '{0}': expected whole seconds")]
    InvalidTtl(String),
}

/// Rewrites a five-field line's relative TTL into an absolute timestamp.
pub fn absolutize_ttl(line: &str, now_unix: u64) -> Result<String, RequestError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != TTL_FIELDS {
        return Ok(line.trim_end_matches(&['\r', '\n'][..]).to_string());
    }

    let ttl: i64 = fields[4]
        .parse()
        .map_err(|_| RequestError::InvalidTtl(fields[4].to_string()))?;
    let expires_at = (now_unix as i64).saturating_add(ttl).max(0);

    Ok(format!("{} {}", fields[..4].join(" "), expires_at))
}
