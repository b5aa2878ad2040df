use std::path::Path;

use chrono::{DateTime, FixedOffset, Utc};
use tracing::warn;

/// Persona used when the prompt file is missing or unreadable.
pub const DEFAULT_PERSONA: &str = "我是存存，也可以叫我存宝。一个顶尖化妆师。";

const BEIJING_OFFSET_SECS: i32 = 8 * 3600;

/// Read the persona prompt, falling back to [`DEFAULT_PERSONA`].
pub fn load_persona(path: &Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
        Ok(_) => {
            warn!(path = %path.display(), "prompt: file is empty, using default persona");
            DEFAULT_PERSONA.to_string()
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "prompt: read failed, using default persona");
            DEFAULT_PERSONA.to_string()
        }
    }
}

/// Persona followed by the current Beijing time (UTC+8).
pub fn build_system_prompt(persona: &str, now: DateTime<Utc>) -> String {
    let beijing = FixedOffset::east_opt(BEIJING_OFFSET_SECS)
        .map(|tz| now.with_timezone(&tz).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| now.format("%Y-%m-%d %H:%M:%S").to_string());
    format!("{persona}\n当前时间: {beijing}")
}
