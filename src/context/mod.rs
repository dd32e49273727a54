// src/context/mod.rs
// Context fetcher: retrieves reference material for similar artifacts so the
// model's answer can be grounded in it

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error};

use crate::attachment::DataUri;
use crate::error::{QuestError, Result};

/// Question sent alongside the image to the context service
pub const CONTEXT_QUESTION: &str = "Find similar context";

/// One ranked reference item. `text` is free-form descriptive metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextResult {
    pub text: Value,
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

#[derive(Debug, Serialize)]
struct ContextRequest<'a> {
    question: &'a str,
    image_data: &'a str,
}

/// Anything that can produce ranked context for an image
#[async_trait]
pub trait ContextSource: Send + Sync {
    /// Ranked results, best first. May be empty.
    async fn fetch(&self, image: &DataUri) -> Result<Vec<ContextResult>>;
}

/// HTTP client for the external "find similar context" service
#[derive(Clone)]
pub struct ContextClient {
    client: reqwest::Client,
    url: String,
}

impl ContextClient {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ContextSource for ContextClient {
    async fn fetch(&self, image: &DataUri) -> Result<Vec<ContextResult>> {
        let body = ContextRequest {
            question: CONTEXT_QUESTION,
            image_data: image.body(),
        };

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(url = %self.url, error = %e, "Error fetching context messages");
                QuestError::ContextFetch(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let status_text = status.canonical_reason().unwrap_or("unknown status");
            error!(url = %self.url, status = %status, "Context service returned an error");
            return Err(QuestError::ContextFetch(status_text.to_string()));
        }

        let results: Vec<ContextResult> = response.json().await.map_err(|e| {
            error!(url = %self.url, error = %e, "Context service returned an unreadable body");
            QuestError::ContextFetch(e.to_string())
        })?;

        debug!(count = results.len(), "Fetched context results");
        Ok(results)
    }
}

/// The best-ranked result. An empty list is an error, never a silent default.
pub fn top_context(results: Vec<ContextResult>) -> Result<ContextResult> {
    results.into_iter().next().ok_or_else(|| {
        QuestError::MalformedContext("context service returned no results".to_string())
    })
}
