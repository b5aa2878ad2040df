//! Wiring from [`Config`] to live collaborators.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use cuncun_chat::{ChatModel, OpenAIChat, OpenAIChatConfig};
use cuncun_embed::{Embedder, OpenAI};
use cuncun_feishu::FeishuClient;
use cuncun_history::History;
use cuncun_vecstore::{MemoryIndex, load_library};
use cuncun_voicematch::{MatchConfig, VoiceMatcher};
use tracing::{info, warn};

use crate::bot::Bot;
use crate::config::Config;

pub fn open_history(cfg: &Config) -> Result<History> {
    History::open(&cfg.db_path).with_context(|| format!("open history {}", cfg.db_path.display()))
}

/// `None` when no DeepSeek key is configured.
pub fn chat_model(cfg: &Config) -> Result<Option<Arc<dyn ChatModel>>> {
    if cfg.deepseek_api_key.is_empty() {
        warn!("app: DEEPSEEK_API_KEY not set, replies will be a fixed notice");
        return Ok(None);
    }
    let chat = OpenAIChat::new(OpenAIChatConfig::deepseek(&cfg.deepseek_api_key))?;
    Ok(Some(Arc::new(chat)))
}

/// `None` when no SiliconFlow key is configured.
pub fn embedder(cfg: &Config) -> Result<Option<Arc<dyn Embedder>>> {
    if cfg.siliconflow_api_key.is_empty() {
        warn!("app: SILICONFLOW_API_KEY not set, voice matching disabled");
        return Ok(None);
    }
    Ok(Some(Arc::new(OpenAI::siliconflow(&cfg.siliconflow_api_key)?)))
}

/// Load the voice-library index. A missing file is not an error.
pub fn voice_index(path: &Path) -> Result<Option<MemoryIndex>> {
    let mut file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "app: voice library not found, voice matching disabled");
            return Ok(None);
        }
        Err(e) => return Err(e).with_context(|| format!("open {}", path.display())),
    };
    let (header, index) =
        load_library(&mut file).with_context(|| format!("load {}", path.display()))?;
    info!(
        path = %path.display(),
        model = %header.model,
        dim = header.dim,
        clips = header.count,
        "app: voice library loaded"
    );
    Ok(Some(index))
}

pub fn voice_matcher(cfg: &Config) -> Result<VoiceMatcher> {
    let config = MatchConfig::new(&cfg.voice_lib).with_threshold(cfg.voice_match_threshold);
    let mut matcher = VoiceMatcher::new(config);
    if let Some(embedder) = embedder(cfg)? {
        matcher = matcher.with_embedder(embedder);
    }
    if let Some(index) = voice_index(&cfg.voice_index_path)? {
        matcher = matcher.with_index(Arc::new(index));
    }
    Ok(matcher)
}

pub fn bot(cfg: &Config) -> Result<Bot> {
    if cfg.feishu_app_id.is_empty() || cfg.feishu_app_secret.is_empty() {
        warn!("app: FEISHU_APP_ID / FEISHU_APP_SECRET not set, outbound messages will fail");
    }
    let messenger = FeishuClient::new(&cfg.feishu_app_id, &cfg.feishu_app_secret)?;

    Ok(Bot {
        history: Arc::new(open_history(cfg)?),
        chat: chat_model(cfg)?,
        matcher: Arc::new(voice_matcher(cfg)?),
        messenger: Arc::new(messenger),
        persona_path: cfg.prompt_path.clone(),
        history_limit: cfg.history_limit,
        admin_open_id: cfg.admin().map(str::to_string),
    })
}

#[cfg(test)]
mod tests {
    use cuncun_vecstore::{VecIndex, save_library};

    use super::*;

    #[test]
    fn test_missing_index_disables_matching() {
        let dir = tempfile::tempdir().unwrap();
        assert!(voice_index(&dir.path().join("none.vlib")).unwrap().is_none());
    }

    #[test]
    fn test_index_round_trip_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("voices.vlib");
        let index = MemoryIndex::new();
        index.insert("a.opus", &[0.6, 0.8]).unwrap();
        save_library(&index, "table", &mut File::create(&path).unwrap()).unwrap();

        let loaded = voice_index(&path).unwrap().unwrap();
        assert_eq!(loaded.len(), 1);
    }

    #[test]
    fn test_corrupt_index_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("voices.vlib");
        std::fs::write(&path, b"garbage").unwrap();
        assert!(voice_index(&path).is_err());
    }

    #[test]
    fn test_matcher_without_keys() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config {
            voice_index_path: dir.path().join("none.vlib"),
            ..Config::default()
        };
        let m = voice_matcher(&cfg).unwrap();
        assert!(m.library_size().is_none());
        assert!(chat_model(&cfg).unwrap().is_none());
    }
}
