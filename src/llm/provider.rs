// src/llm/provider.rs
// Completion provider trait and request type

use async_trait::async_trait;
use serde::Serialize;

use super::message::ChatMessage;
use super::stream::TokenStream;
use crate::error::Result;

/// Chat completion request (OpenAI-compatible format). Always streamed.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            stream: true,
            max_tokens: None,
        }
    }

    /// Set maximum output tokens
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// A hosted model that answers a conversation as a token stream
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Provider name for logging
    fn name(&self) -> &'static str;

    /// Start a streamed completion.
    ///
    /// Errors returned here happen before any token exists. Errors after the
    /// stream has started arrive as items of the returned stream. Dropping the
    /// stream must release the upstream connection.
    async fn stream_chat(&self, request: CompletionRequest) -> Result<TokenStream>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let req = CompletionRequest::new("gpt-4o", vec![ChatMessage::user("hi")]).with_max_tokens(1500);
        let value = serde_json::to_value(&req).unwrap();

        assert_eq!(value["model"], "gpt-4o");
        assert_eq!(value["stream"], true);
        assert_eq!(value["max_tokens"], 1500);
        assert_eq!(value["messages"][0]["role"], "user");
    }

    #[test]
    fn test_max_tokens_omitted_by_default() {
        let value = serde_json::to_value(CompletionRequest::new("m", vec![])).unwrap();
        assert!(value.get("max_tokens").is_none());
    }
}
