//! One conversation turn: history, reply, text message, optional voice clip.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::{Local, Utc};
use cuncun_chat::{ChatMessage, ChatModel, Reply, build_system_prompt, load_persona};
use cuncun_feishu::{Event, Messenger};
use cuncun_history::{History, Message, Role};
use cuncun_voicematch::VoiceMatcher;
use tracing::{debug, error, info, warn};

/// Reply when no chat model is configured.
pub const NOT_CONNECTED_REPLY: &str = "AI 未连接";
/// Reply when the chat model call fails.
pub const TIRED_REPLY: &str = "我有点累了，稍等一下。";
/// Sent before a long message is answered.
pub const LONG_MESSAGE_NOTICE: &str =
    "喔唷，今天写了这么多心里话呀，我正在认真读呢，稍微等我一下喔... ☕️";
/// Messages longer than this many characters get [`LONG_MESSAGE_NOTICE`].
pub const LONG_MESSAGE_CHARS: usize = 50;

pub struct Bot {
    pub history: Arc<History>,
    pub chat: Option<Arc<dyn ChatModel>>,
    pub matcher: Arc<VoiceMatcher>,
    pub messenger: Arc<dyn Messenger>,
    pub persona_path: PathBuf,
    pub history_limit: usize,
    pub admin_open_id: Option<String>,
}

impl Bot {
    /// Handle a platform event. Failures are logged and reported to the
    /// admin; nothing is returned to the caller.
    pub async fn handle_event(&self, event: Event) {
        let Some(text) = event.message.as_ref().and_then(|m| m.text()) else {
            debug!(event_id = %event.event_id, "bot: ignoring non-text event");
            return;
        };
        if event.sender_open_id.is_empty() {
            warn!(event_id = %event.event_id, "bot: event without sender");
            return;
        }

        if let Err(e) = self.converse(&event.sender_open_id, &text).await {
            error!(open_id = %event.sender_open_id, error = %format!("{e:#}"), "bot: conversation failed");
            self.alert(&format!("Core Logic Error: {e:#}")).await;
        }
    }

    pub async fn converse(&self, open_id: &str, text: &str) -> Result<()> {
        info!(open_id, chars = text.chars().count(), "bot: user message");

        let past = self
            .history
            .recent(open_id, self.history_limit)
            .context("load history")?;
        self.history
            .append(open_id, Message::user(text))
            .context("save user message")?;
        debug!(open_id, history_count = past.len(), "bot: history loaded");

        if text.chars().count() > LONG_MESSAGE_CHARS
            && let Err(e) = self.messenger.send_text(open_id, LONG_MESSAGE_NOTICE).await
        {
            warn!(open_id, error = %e, "bot: long-message notice failed");
        }

        let reply = self.reply(text, &past).await;
        self.history
            .append(
                open_id,
                Message::assistant(&reply.text).with_tokens(reply.total_tokens),
            )
            .context("save reply")?;

        self.messenger
            .send_text(open_id, &reply.text)
            .await
            .context("send reply")?;
        info!(open_id, tokens = reply.total_tokens, "bot: reply sent");

        if let Some(clip) = self.matcher.match_voice(&reply.text).await {
            match self.messenger.send_audio(open_id, &clip).await {
                Ok(()) => info!(open_id, clip = %clip.display(), "bot: voice sent"),
                Err(e) => warn!(open_id, clip = %clip.display(), error = %e, "bot: voice send failed"),
            }
        }
        Ok(())
    }

    /// Generate a reply. Never fails; a missing or failing model yields a
    /// fixed fallback text.
    pub async fn reply(&self, text: &str, past: &[Message]) -> Reply {
        let Some(chat) = self.chat.as_ref() else {
            return Reply {
                text: NOT_CONNECTED_REPLY.to_string(),
                total_tokens: 0,
            };
        };

        let system = build_system_prompt(&load_persona(&self.persona_path), Utc::now());
        let transcript: Vec<ChatMessage> = past
            .iter()
            .map(|m| match m.role {
                Role::User => ChatMessage::user(&m.content),
                Role::Assistant => ChatMessage::assistant(&m.content),
            })
            .collect();

        let start = Instant::now();
        match chat.complete(&system, &transcript, text).await {
            Ok(reply) => {
                info!(
                    latency_ms = start.elapsed().as_millis() as u64,
                    tokens = reply.total_tokens,
                    "bot: model replied"
                );
                reply
            }
            Err(e) => {
                error!(error = %e, latency_ms = start.elapsed().as_millis() as u64, "bot: model call failed");
                Reply {
                    text: TIRED_REPLY.to_string(),
                    total_tokens: 0,
                }
            }
        }
    }

    async fn alert(&self, detail: &str) {
        let Some(admin) = self.admin_open_id.as_deref() else {
            return;
        };
        let text = format!(
            "⚠️ 【存存系统告警】\n时间：{}\n内容：{detail}",
            Local::now().format("%Y-%m-%d %H:%M:%S")
        );
        match self.messenger.send_text(admin, &text).await {
            Ok(()) => info!("bot: alert sent to admin"),
            Err(e) => warn!(error = %e, "bot: alert delivery failed"),
        }
    }
}
