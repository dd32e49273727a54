// src/llm/mod.rs
// Chat messages, message composition and the streaming completion provider

pub mod compose;
pub mod message;
pub mod openai;
pub mod provider;
pub mod stream;

pub use compose::{compose_messages, context_message};
pub use message::{ChatMessage, ContentPart, ImageUrl, MessageContent, Role};
pub use openai::OpenAiClient;
pub use provider::{CompletionProvider, CompletionRequest};
pub use stream::{SseFrame, TokenStream, token_stream};
