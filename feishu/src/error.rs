use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeishuError {
    #[error("feishu: http: {0}")]
    Http(#[from] reqwest::Error),

    #[error("feishu: API error {code}: {msg}")]
    Api { code: i64, msg: String },

    #[error("feishu: response missing {0}")]
    MissingField(&'static str),

    #[error("feishu: invalid callback: {0}")]
    InvalidCallback(#[from] serde_json::Error),

    #[error("feishu: io: {0}")]
    Io(#[from] std::io::Error),
}
