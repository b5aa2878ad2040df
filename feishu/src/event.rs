//! Event-subscription callback bodies (schema 2.0).

use serde::Deserialize;

use crate::error::FeishuError;

/// What a callback body asks of us.
#[derive(Debug, Clone, PartialEq)]
pub enum Callback {
    /// Body is encrypted with the app's encrypt key. Decryption is not
    /// supported; the subscription must be configured without encryption.
    Encrypted,
    /// URL verification handshake; echo the challenge back.
    Challenge(String),
    /// A delivered event.
    Event(Event),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub event_id: String,
    pub event_type: String,
    /// Verification token the platform attached to the event.
    pub token: String,
    pub sender_open_id: String,
    pub message: Option<EventMessage>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct EventMessage {
    #[serde(default)]
    pub message_id: String,
    #[serde(default)]
    pub message_type: String,
    /// JSON-encoded content; for text messages `{"text": "..."}`.
    #[serde(default)]
    pub content: String,
}

impl EventMessage {
    /// Trimmed text of a `text` message; `None` for any other type or
    /// malformed content.
    pub fn text(&self) -> Option<String> {
        if self.message_type != "text" {
            return None;
        }
        #[derive(Deserialize)]
        struct TextContent {
            text: String,
        }
        serde_json::from_str::<TextContent>(&self.content)
            .ok()
            .map(|c| c.text.trim().to_string())
    }
}

#[derive(Deserialize)]
struct RawCallback {
    encrypt: Option<String>,
    challenge: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    header: Option<RawHeader>,
    event: Option<RawEvent>,
}

#[derive(Deserialize)]
struct RawHeader {
    #[serde(default)]
    event_id: String,
    #[serde(default)]
    event_type: String,
    #[serde(default)]
    token: String,
}

#[derive(Deserialize)]
struct RawEvent {
    sender: Option<RawSender>,
    message: Option<EventMessage>,
}

#[derive(Deserialize)]
struct RawSender {
    sender_id: Option<RawSenderId>,
}

#[derive(Deserialize)]
struct RawSenderId {
    #[serde(default)]
    open_id: String,
}

/// Classify a raw callback body.
pub fn parse_callback(body: &[u8]) -> Result<Callback, FeishuError> {
    let raw: RawCallback = serde_json::from_slice(body)?;

    if raw.encrypt.is_some() {
        return Ok(Callback::Encrypted);
    }
    if raw.challenge.is_some() || raw.kind.as_deref() == Some("url_verification") {
        return Ok(Callback::Challenge(raw.challenge.unwrap_or_default()));
    }

    let header = raw.header.unwrap_or(RawHeader {
        event_id: String::new(),
        event_type: String::new(),
        token: String::new(),
    });
    let (sender_open_id, message) = match raw.event {
        Some(ev) => (
            ev.sender
                .and_then(|s| s.sender_id)
                .map(|id| id.open_id)
                .unwrap_or_default(),
            ev.message,
        ),
        None => (String::new(), None),
    };

    Ok(Callback::Event(Event {
        event_id: header.event_id,
        event_type: header.event_type,
        token: header.token,
        sender_open_id,
        message,
    }))
}
