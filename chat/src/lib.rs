//! Reply generation for the bot persona.

pub mod error;
pub mod model;
pub mod openai;
pub mod prompt;

pub use error::ChatError;
pub use model::{ChatMessage, ChatModel, Reply};
pub use openai::{OpenAIChat, OpenAIChatConfig};
pub use prompt::{DEFAULT_PERSONA, build_system_prompt, load_persona};
