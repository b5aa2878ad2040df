//! Feishu (Lark) platform glue: callback parsing, request signatures and
//! outbound text/audio messages.

pub mod client;
pub mod error;
pub mod event;
pub mod messenger;
pub mod signature;

pub use client::{FEISHU_BASE_URL, FeishuClient};
pub use error::FeishuError;
pub use event::{Callback, Event, EventMessage, parse_callback};
pub use messenger::Messenger;
pub use signature::{SignatureError, verify_signature};
