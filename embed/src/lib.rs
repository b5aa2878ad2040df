//! Text embedding clients.
//!
//! The voice library is indexed with `BAAI/bge-large-zh-v1.5` served by
//! SiliconFlow, so [`OpenAI::siliconflow`] is the preset the bot uses. Any
//! other OpenAI-compatible provider works through [`EmbedConfig`].

pub mod config;
pub mod embed;
pub mod error;
pub mod openai;
pub(crate) mod openai_compat;

pub use config::EmbedConfig;
pub use embed::Embedder;
pub use error::EmbedError;
pub use openai::OpenAI;
