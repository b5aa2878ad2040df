use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("chat: http: {0}")]
    Http(#[from] reqwest::Error),

    #[error("chat: API error: HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("chat: empty response")]
    EmptyResponse,
}
