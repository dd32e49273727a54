// src/services/chat.rs
// Chat turn orchestration: context fetch, prompt composition, streamed completion

use std::sync::Arc;
use tracing::{debug, info};

use crate::api::types::ChatRequest;
use crate::context::{ContextSource, top_context};
use crate::error::{QuestError, Result};
use crate::llm::{CompletionProvider, CompletionRequest, TokenStream, compose_messages};
use crate::prompt::SystemPrompt;

/// Runs one chat turn. Holds no per-request state; every call is independent.
pub struct ChatService {
    context: Arc<dyn ContextSource>,
    provider: Arc<dyn CompletionProvider>,
    model: String,
    max_tokens: u32,
}

impl ChatService {
    pub fn new(
        context: Arc<dyn ContextSource>,
        provider: Arc<dyn CompletionProvider>,
        model: impl Into<String>,
        max_tokens: u32,
    ) -> Self {
        Self {
            context,
            provider,
            model: model.into(),
            max_tokens,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Fetch context and build the outbound completion request.
    ///
    /// The context fetch completes (or fails) before anything is sent to the
    /// provider.
    pub async fn prepare(&self, request: ChatRequest) -> Result<CompletionRequest> {
        let ChatRequest { mut messages, data } = request;

        let current = messages
            .pop()
            .ok_or_else(|| QuestError::InvalidRequest("no messages supplied".to_string()))?;
        let first_image = data.base64_images.first().ok_or_else(|| {
            QuestError::InvalidRequest("at least one image attachment is required".to_string())
        })?;

        let results = self.context.fetch(first_image).await?;
        debug!(results = results.len(), "Context fetched");
        let context = top_context(results)?;

        let system_prompt = SystemPrompt::new(data.user_profile.as_ref()).build();
        let composed = compose_messages(
            system_prompt,
            &context,
            messages,
            current,
            &data.base64_images,
        )?;

        info!(
            messages = composed.len(),
            images = data.base64_images.len(),
            personalized = data.user_profile.is_some(),
            "Composed completion request"
        );

        Ok(CompletionRequest::new(self.model.clone(), composed).with_max_tokens(self.max_tokens))
    }

    /// Prepare the request and open the provider stream. Any error returned
    /// here happens before the first token.
    pub async fn start(&self, request: ChatRequest) -> Result<TokenStream> {
        let completion = self.prepare(request).await?;
        self.provider.stream_chat(completion).await
    }
}
