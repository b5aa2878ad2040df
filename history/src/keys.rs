//! Key layout:
//!
//! ```text
//! hist:{user}:msg:{ts_ns:020}   → msgpack Message
//! ```
//!
//! Timestamps are zero-padded so lexicographic order is chronological.

use crate::error::HistoryError;

pub fn msg_key(user: &str, ts: i64) -> String {
    format!("hist:{user}:msg:{ts:020}")
}

pub fn msg_prefix(user: &str) -> String {
    format!("hist:{user}:msg:")
}

/// User IDs become key segments, so they must be non-empty and free of `:`.
pub fn check_user(user: &str) -> Result<(), HistoryError> {
    if user.is_empty() || user.contains(':') {
        return Err(HistoryError::InvalidUser(user.to_string()));
    }
    Ok(())
}

/// Exclusive upper bound for keys starting with `prefix`.
/// Every prefix built here ends with `:`, which is bumped to `;`.
pub(crate) fn prefix_end(prefix: &str) -> String {
    let mut end = prefix.to_string();
    if let Some(last) = end.pop() {
        end.push(char::from_u32(last as u32 + 1).unwrap_or(char::MAX));
    }
    end
}
