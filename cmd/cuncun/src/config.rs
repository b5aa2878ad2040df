//! Bot configuration.
//!
//! Layers, later wins: built-in defaults, an optional YAML file, then
//! environment variables. [`load_dotenv`] reads `.env` into the environment
//! before [`Config::load`] runs.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub feishu_app_id: String,
    pub feishu_app_secret: String,
    pub feishu_verify_token: String,
    /// Signing key for webhook requests. Empty disables verification.
    pub feishu_encrypt_key: String,
    pub deepseek_api_key: String,
    pub siliconflow_api_key: String,

    pub db_path: PathBuf,
    pub prompt_path: PathBuf,
    pub voice_index_path: PathBuf,
    pub voice_lib: PathBuf,
    pub log_file: Option<PathBuf>,
    pub backup_dir: PathBuf,
    pub admin_open_id: String,

    pub port: u16,
    pub voice_match_threshold: f32,
    pub backup_retention_days: u64,
    pub history_limit: usize,
    pub worker_pool_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feishu_app_id: String::new(),
            feishu_app_secret: String::new(),
            feishu_verify_token: String::new(),
            feishu_encrypt_key: String::new(),
            deepseek_api_key: String::new(),
            siliconflow_api_key: String::new(),
            db_path: PathBuf::from("data/memory.redb"),
            prompt_path: PathBuf::from("prompt_template.txt"),
            voice_index_path: PathBuf::from("data/voice_library.vlib"),
            voice_lib: PathBuf::from("assets/voices"),
            log_file: Some(PathBuf::from("logs/cuncun.log")),
            backup_dir: PathBuf::from("backups"),
            admin_open_id: String::new(),
            port: 8081,
            voice_match_threshold: cuncun_voicematch::DEFAULT_THRESHOLD,
            backup_retention_days: 7,
            history_limit: 6,
            worker_pool_size: 3,
        }
    }
}

impl Config {
    /// Load the YAML file if given, then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut cfg = match path {
            Some(p) => Self::from_yaml_file(p)?,
            None => Self::default(),
        };
        cfg.apply_env(|key| std::env::var(key).ok())?;
        Ok(cfg)
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        serde_yaml::from_str(&data).with_context(|| format!("parse config {}", path.display()))
    }

    /// Override fields from variables returned by `lookup`. Empty values
    /// are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        for (key, field) in [
            ("FEISHU_APP_ID", &mut self.feishu_app_id),
            ("FEISHU_APP_SECRET", &mut self.feishu_app_secret),
            ("FEISHU_VERIFY_TOKEN", &mut self.feishu_verify_token),
            ("FEISHU_ENCRYPT_KEY", &mut self.feishu_encrypt_key),
            ("DEEPSEEK_API_KEY", &mut self.deepseek_api_key),
            ("SILICONFLOW_API_KEY", &mut self.siliconflow_api_key),
            ("ADMIN_OPEN_ID", &mut self.admin_open_id),
        ] {
            if let Some(v) = get(key) {
                *field = v;
            }
        }

        for (key, field) in [
            ("DB_PATH", &mut self.db_path),
            ("PROMPT_PATH", &mut self.prompt_path),
            ("VOICE_INDEX_PATH", &mut self.voice_index_path),
            ("VOICE_LIB", &mut self.voice_lib),
            ("BACKUP_DIR", &mut self.backup_dir),
        ] {
            if let Some(v) = get(key) {
                *field = PathBuf::from(v);
            }
        }
        if let Some(v) = get("LOG_FILE") {
            self.log_file = Some(PathBuf::from(v));
        }

        if let Some(v) = get("PORT") {
            self.port = parse("PORT", &v)?;
        }
        if let Some(v) = get("VOICE_MATCH_THRESHOLD") {
            self.voice_match_threshold = parse("VOICE_MATCH_THRESHOLD", &v)?;
        }
        if let Some(v) = get("BACKUP_RETENTION_DAYS") {
            self.backup_retention_days = parse("BACKUP_RETENTION_DAYS", &v)?;
        }
        if let Some(v) = get("HISTORY_LIMIT") {
            self.history_limit = parse("HISTORY_LIMIT", &v)?;
        }
        if let Some(v) = get("WORKER_POOL_SIZE") {
            self.worker_pool_size = parse("WORKER_POOL_SIZE", &v)?;
        }
        Ok(())
    }

    pub fn backup_retention(&self) -> Duration {
        Duration::from_secs(self.backup_retention_days * 86400)
    }

    pub fn admin(&self) -> Option<&str> {
        Some(self.admin_open_id.as_str()).filter(|s| !s.is_empty())
    }

    pub fn encrypt_key(&self) -> Option<&str> {
        Some(self.feishu_encrypt_key.as_str()).filter(|s| !s.is_empty())
    }
}

/// Read a `.env` file into the process environment: `path`, or the first
/// `.env` found from the working directory upwards. A missing file is not an
/// error. Other failures are returned rather than logged, since this runs
/// before the subscriber is installed.
pub fn load_dotenv(path: Option<&Path>) -> Option<dotenvy::Error> {
    let result = match path {
        Some(p) => dotenvy::from_path(p),
        None => dotenvy::dotenv().map(|_| ()),
    };
    result.err().filter(|e| !e.not_found())
}

fn parse<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("invalid {key}: {value:?}"))
}
