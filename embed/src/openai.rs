use std::time::Duration;

use reqwest::Client;

use crate::config::EmbedConfig;
use crate::embed::Embedder;
use crate::error::EmbedError;

/// SiliconFlow-hosted BGE model used to build the voice library.
pub const MODEL_BGE_LARGE_ZH: &str = "BAAI/bge-large-zh-v1.5";

const SILICONFLOW_BASE_URL: &str = "https://api.siliconflow.cn/v1";
const MAX_BATCH: usize = 32;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Embedder for the OpenAI embeddings API and compatible providers.
pub struct OpenAI {
    client: Client,
    api_key: String,
    model: String,
    dim: usize,
    base_url: String,
}

impl OpenAI {
    /// SiliconFlow with `BAAI/bge-large-zh-v1.5`.
    pub fn siliconflow(api_key: &str) -> Result<Self, EmbedError> {
        Self::with_config(
            api_key,
            EmbedConfig::default()
                .with_model(MODEL_BGE_LARGE_ZH)
                .with_base_url(SILICONFLOW_BASE_URL),
        )
    }

    /// Empty model or base URL fields fall back to the SiliconFlow preset.
    pub fn with_config(api_key: &str, cfg: EmbedConfig) -> Result<Self, EmbedError> {
        let client = Client::builder()
            .timeout(cfg.timeout.unwrap_or(DEFAULT_TIMEOUT))
            .build()?;
        Ok(Self {
            client,
            api_key: api_key.to_string(),
            model: if cfg.model.is_empty() {
                MODEL_BGE_LARGE_ZH.to_string()
            } else {
                cfg.model
            },
            dim: cfg.dimension,
            base_url: if cfg.base_url.is_empty() {
                SILICONFLOW_BASE_URL.to_string()
            } else {
                cfg.base_url
            },
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait::async_trait]
impl Embedder for OpenAI {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        if text.is_empty() {
            return Err(EmbedError::EmptyInput);
        }
        let vecs = self.embed_batch(&[text]).await?;
        vecs.into_iter().next().ok_or(EmbedError::MissingIndex(0))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
        if texts.is_empty() {
            return Err(EmbedError::EmptyInput);
        }

        let mut result = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(MAX_BATCH) {
            let vecs = crate::openai_compat::call_embedding_api(
                &self.client,
                &self.api_key,
                &self.base_url,
                &self.model,
                self.dim,
                chunk,
            )
            .await?;
            result.extend(vecs);
        }
        Ok(result)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_siliconflow_preset() {
        let e = OpenAI::siliconflow("sk-test").unwrap();
        assert_eq!(e.model(), MODEL_BGE_LARGE_ZH);
        assert_eq!(e.base_url(), SILICONFLOW_BASE_URL);
        assert_eq!(e.dim, 0);
    }

    #[test]
    fn test_empty_model_falls_back() {
        let e = OpenAI::with_config("k", EmbedConfig::default()).unwrap();
        assert_eq!(e.model(), MODEL_BGE_LARGE_ZH);
        assert_eq!(e.base_url(), SILICONFLOW_BASE_URL);

        let e = OpenAI::with_config(
            "k",
            EmbedConfig::default()
                .with_model("bge-m3")
                .with_base_url("http://127.0.0.1:9/v1"),
        )
        .unwrap();
        assert_eq!(e.model(), "bge-m3");
        assert_eq!(e.base_url(), "http://127.0.0.1:9/v1");
    }

    #[tokio::test]
    async fn test_empty_text_rejected() {
        let e = OpenAI::siliconflow("k").unwrap();
        assert!(matches!(e.embed("").await, Err(EmbedError::EmptyInput)));
        assert!(matches!(e.embed_batch(&[]).await, Err(EmbedError::EmptyInput)));
    }
}
