use thiserror::Error;

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("history: invalid user id {0:?}")]
    InvalidUser(String),

    #[error("history: storage error: {0}")]
    Storage(String),

    #[error("history: serialization error: {0}")]
    Serialization(String),

    #[error("history: io: {0}")]
    Io(#[from] std::io::Error),
}

pub(crate) fn storage(e: impl std::fmt::Display) -> HistoryError {
    HistoryError::Storage(e.to_string())
}
