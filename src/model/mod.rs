//! Model client module for chat completions.

mod client;
mod message;
mod stream;

pub use client::{
    ChatModel, ModelClient, ModelConfig, ModelError, DEFAULT_BASE_URL, DEFAULT_MAX_RETRIES,
    DEFAULT_RETRY_DELAY_SECS,
};
pub use message::{ChatMessage, ChatRequest, Role};
pub use stream::{collect_response, event_fragments, parse_chunk, FragmentStream};
