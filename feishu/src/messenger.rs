use std::path::Path;

use crate::error::FeishuError;

/// Outbound side of the chat platform.
#[async_trait::async_trait]
pub trait Messenger: Send + Sync {
    /// Send a plain text message to the user.
    async fn send_text(&self, open_id: &str, text: &str) -> Result<(), FeishuError>;

    /// Upload the clip at `path` and send it to the user as an audio message.
    async fn send_audio(&self, open_id: &str, path: &Path) -> Result<(), FeishuError>;

    /// Check that the platform API is reachable with the configured
    /// credentials.
    async fn ping(&self) -> Result<(), FeishuError> {
        Ok(())
    }
}
