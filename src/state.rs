// src/state.rs
// Shared application state handed to every handler

use std::sync::Arc;

use crate::config::QuestConfig;
use crate::context::ContextClient;
use crate::error::Result;
use crate::http::create_shared_client;
use crate::llm::OpenAiClient;
use crate::search::ImageSearchClient;
use crate::services::ChatService;

/// Shared application state. Cheap to clone; nothing in here is mutated
/// after startup.
#[derive(Clone)]
pub struct AppState {
    pub chat: Arc<ChatService>,
    pub image_search: ImageSearchClient,
}

impl AppState {
    pub fn new(chat: Arc<ChatService>, image_search: ImageSearchClient) -> Self {
        Self { chat, image_search }
    }

    /// Wire the production clients from configuration
    pub fn from_config(config: &QuestConfig) -> Result<Self> {
        let client = create_shared_client(config.connect_timeout());

        let context = Arc::new(ContextClient::new(client.clone(), config.context_url.clone()));
        let provider = Arc::new(OpenAiClient::from_config(client.clone(), config)?);
        let chat = Arc::new(ChatService::new(
            context,
            provider,
            config.model.clone(),
            config.max_tokens,
        ));
        let image_search = ImageSearchClient::new(client, config.image_search_url.clone());

        Ok(Self::new(chat, image_search))
    }
}
