//! Per-user chat history.
//!
//! Messages live in an ordered key-value backend under
//! `hist:{user}:msg:{ts_ns}` and are MessagePack-encoded. [`History`] is the
//! only entry point; the backend is either in-memory (tests, dry runs) or a
//! redb file.

pub mod backend;
pub mod backup;
pub mod error;
pub mod history;
pub mod keys;
pub mod types;

pub use backend::{Backend, MemoryBackend, RedbBackend};
pub use backup::{BackupReport, backup, prune_backups};
pub use error::HistoryError;
pub use history::History;
pub use types::{Message, Role, now_nano};
