//! OpenAI-compatible chat completions.
//!
//! The bot talks to DeepSeek, which speaks the OpenAI Chat Completions
//! protocol; [`OpenAIChatConfig::deepseek`] carries the tuned sampling
//! parameters.
//!
//! ```rust,ignore
//! use cuncun_chat::{ChatModel, OpenAIChat, OpenAIChatConfig};
//!
//! let model = OpenAIChat::new(OpenAIChatConfig::deepseek("sk-xxx"))?;
//! let reply = model.complete("You are helpful.", &[], "Hello!").await?;
//! ```

use std::time::{Duration, Instant};

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ChatError;
use crate::model::{ChatMessage, ChatModel, Reply};

const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";
const DEEPSEEK_MODEL: &str = "deepseek-chat";

/// Connection and sampling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIChatConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub presence_penalty: f32,
    pub frequency_penalty: f32,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl OpenAIChatConfig {
    /// DeepSeek chat with the persona's sampling parameters.
    pub fn deepseek(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            base_url: DEEPSEEK_BASE_URL.to_string(),
            model: DEEPSEEK_MODEL.to_string(),
            temperature: 0.9,
            max_tokens: 2048,
            presence_penalty: 0.6,
            frequency_penalty: 0.5,
            timeout_secs: 60,
        }
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    presence_penalty: f32,
    frequency_penalty: f32,
    stream: bool,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    #[serde(default)]
    total_tokens: u32,
}

/// Chat Completions client.
pub struct OpenAIChat {
    client: Client,
    config: OpenAIChatConfig,
}

impl OpenAIChat {
    pub fn new(config: OpenAIChatConfig) -> Result<Self, ChatError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &OpenAIChatConfig {
        &self.config
    }

    fn build_request(
        &self,
        system: &str,
        history: &[ChatMessage],
        user: &str,
    ) -> CompletionRequest<'_> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(system));
        messages.extend_from_slice(history);
        messages.push(ChatMessage::user(user));

        CompletionRequest {
            model: &self.config.model,
            messages,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            presence_penalty: self.config.presence_penalty,
            frequency_penalty: self.config.frequency_penalty,
            stream: false,
        }
    }
}

#[async_trait::async_trait]
impl ChatModel for OpenAIChat {
    async fn complete(
        &self,
        system: &str,
        history: &[ChatMessage],
        user: &str,
    ) -> Result<Reply, ChatError> {
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        let body = self.build_request(system, history, user);

        let start = Instant::now();
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ChatError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let data: CompletionResponse = resp.json().await?;
        let reply = parse_reply(data)?;
        info!(
            model = %self.config.model,
            duration_ms = start.elapsed().as_millis() as u64,
            tokens = reply.total_tokens,
            "chat: completion ok"
        );
        Ok(reply)
    }
}

fn parse_reply(data: CompletionResponse) -> Result<Reply, ChatError> {
    let text = data
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|t| !t.trim().is_empty())
        .ok_or(ChatError::EmptyResponse)?;
    Ok(Reply {
        text,
        total_tokens: data.usage.map(|u| u.total_tokens).unwrap_or(0),
    })
}
