use std::path::Path;

use tracing::debug;

use crate::backend::{Backend, MemoryBackend, RedbBackend};
use crate::error::HistoryError;
use crate::keys::{check_user, msg_key, msg_prefix, prefix_end};
use crate::types::{Message, now_nano};

/// Per-user message log on top of an ordered [`Backend`].
pub struct History {
    backend: Box<dyn Backend>,
}

impl History {
    pub fn new(backend: Box<dyn Backend>) -> Self {
        Self { backend }
    }

    pub fn memory() -> Self {
        Self::new(Box::new(MemoryBackend::new()))
    }

    /// Open (or create) the redb database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, HistoryError> {
        Ok(Self::new(Box::new(RedbBackend::open(path)?)))
    }

    pub(crate) fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    /// Store a message for `user`. A zero timestamp is filled with the
    /// current time; on a key collision the timestamp is nudged forward so
    /// two messages in the same nanosecond keep their append order.
    pub fn append(&self, user: &str, mut msg: Message) -> Result<Message, HistoryError> {
        check_user(user)?;
        if msg.timestamp == 0 {
            msg.timestamp = now_nano();
        }

        loop {
            let data = rmp_serde::to_vec_named(&msg)
                .map_err(|e| HistoryError::Serialization(e.to_string()))?;
            if self.backend.insert_new(&msg_key(user, msg.timestamp), &data)? {
                break;
            }
            msg.timestamp += 1;
        }

        debug!(
            user,
            role = msg.role.as_str(),
            chars = msg.content.chars().count(),
            "history: appended"
        );
        Ok(msg)
    }

    /// The `limit` most recent messages for `user`, oldest first.
    pub fn recent(&self, user: &str, limit: usize) -> Result<Vec<Message>, HistoryError> {
        check_user(user)?;
        if limit == 0 {
            return Ok(vec![]);
        }
        let prefix = msg_prefix(user);
        let mut entries = self
            .backend
            .range_rev(&prefix, &prefix_end(&prefix), limit)?;
        entries.reverse();
        Ok(decode_all(entries))
    }

    /// Every message for `user`, oldest first.
    pub fn all(&self, user: &str) -> Result<Vec<Message>, HistoryError> {
        check_user(user)?;
        let prefix = msg_prefix(user);
        let entries = self.backend.range(&prefix, &prefix_end(&prefix))?;
        Ok(decode_all(entries))
    }

    pub fn count(&self, user: &str) -> Result<usize, HistoryError> {
        check_user(user)?;
        let prefix = msg_prefix(user);
        Ok(self.backend.range(&prefix, &prefix_end(&prefix))?.len())
    }

    /// Forget everything `user` said and was told. Returns the number of
    /// messages removed.
    pub fn clear(&self, user: &str) -> Result<usize, HistoryError> {
        check_user(user)?;
        let prefix = msg_prefix(user);
        self.backend.delete_range(&prefix, &prefix_end(&prefix))
    }
}

/// Undecodable entries are skipped rather than failing the whole read.
fn decode_all(entries: Vec<(String, Vec<u8>)>) -> Vec<Message> {
    entries
        .into_iter()
        .filter_map(|(key, value)| match rmp_serde::from_slice::<Message>(&value) {
            Ok(msg) => Some(msg),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "history: skipping undecodable entry");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;

    fn at(msg: Message, ts: i64) -> Message {
        Message { timestamp: ts, ..msg }
    }

    #[test]
    fn test_recent_is_chronological() {
        let h = History::memory();
        for i in 1..=5 {
            h.append("ou_a", at(Message::user(format!("m{i}")), i * 10))
                .unwrap();
        }

        let recent = h.recent("ou_a", 3).unwrap();
        let contents: Vec<_> = recent.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m3", "m4", "m5"]);

        assert_eq!(h.recent("ou_a", 10).unwrap().len(), 5);
        assert!(h.recent("ou_a", 0).unwrap().is_empty());
    }

    #[test]
    fn test_users_isolated() {
        let h = History::memory();
        h.append("ou_a", Message::user("hi from a")).unwrap();
        h.append("ou_b", Message::user("hi from b")).unwrap();
        h.append("ou_b", Message::assistant("hello b").with_tokens(7))
            .unwrap();

        assert_eq!(h.count("ou_a").unwrap(), 1);
        assert_eq!(h.count("ou_b").unwrap(), 2);

        let b = h.all("ou_b").unwrap();
        assert_eq!(b[1].role, Role::Assistant);
        assert_eq!(b[1].tokens_used, 7);

        assert_eq!(h.clear("ou_b").unwrap(), 2);
        assert_eq!(h.count("ou_b").unwrap(), 0);
        assert_eq!(h.count("ou_a").unwrap(), 1);
    }

    #[test]
    fn test_prefix_user_not_leaking() {
        // "ou_a" must not see "ou_ab"'s messages.
        let h = History::memory();
        h.append("ou_ab", Message::user("x")).unwrap();
        assert_eq!(h.count("ou_a").unwrap(), 0);
    }

    #[test]
    fn test_same_timestamp_keeps_order() {
        let h = History::memory();
        let first = h.append("ou_a", at(Message::user("q"), 100)).unwrap();
        let second = h
            .append("ou_a", at(Message::assistant("a"), 100))
            .unwrap();
        assert_eq!(first.timestamp, 100);
        assert_eq!(second.timestamp, 101);

        let all = h.all("ou_a").unwrap();
        assert_eq!(all[0].content, "q");
        assert_eq!(all[1].content, "a");
    }

    #[test]
    fn test_timestamp_filled() {
        let h = History::memory();
        let m = h.append("ou_a", Message::user("now")).unwrap();
        assert!(m.timestamp > 0);
    }

    #[test]
    fn test_invalid_user() {
        let h = History::memory();
        assert!(matches!(
            h.append("", Message::user("x")),
            Err(HistoryError::InvalidUser(_))
        ));
        assert!(h.recent("a:b", 1).is_err());
    }

    #[test]
    fn test_redb_history() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.redb");
        {
            let h = History::open(&path).unwrap();
            h.append("ou_a", Message::user("持久化")).unwrap();
        }
        let h = History::open(&path).unwrap();
        assert_eq!(h.recent("ou_a", 6).unwrap()[0].content, "持久化");
    }
}
