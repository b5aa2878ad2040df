use serde::{Deserialize, Serialize};

use crate::error::ChatError;

/// One turn in the request transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new("assistant", content)
    }
}

/// Generated reply and what it cost.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub total_tokens: u32,
}

/// A model that continues a conversation.
#[async_trait::async_trait]
pub trait ChatModel: Send + Sync {
    /// Reply to `user` given the system prompt and prior turns
    /// (oldest first).
    async fn complete(
        &self,
        system: &str,
        history: &[ChatMessage],
        user: &str,
    ) -> Result<Reply, ChatError>;
}
