// src/search.rs
// Image similarity search against the external artwork index

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{error, info};

use crate::attachment::DataUri;
use crate::error::{QuestError, Result};

/// Descriptive metadata attached to an indexed artwork. Every field is
/// optional; fields the index adds later are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArtworkMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub school: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technique: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeframe: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ArtworkMetadata {
    /// Title, falling back to name, then "Untitled"
    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or("Untitled")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarArtwork {
    pub image: String,
    pub score: f64,
    pub text: ArtworkMetadata,
}

impl SimilarArtwork {
    /// Score as a percentage with one decimal, e.g. "87.5% match"
    pub fn match_label(&self) -> String {
        format!("{:.1}% match", self.score * 100.0)
    }
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    question: &'a str,
    image_data: &'a str,
}

/// HTTP client for the image similarity service
#[derive(Clone)]
pub struct ImageSearchClient {
    client: reqwest::Client,
    url: String,
}

impl ImageSearchClient {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub async fn search(&self, image: &DataUri) -> Result<Vec<SimilarArtwork>> {
        let body = SearchRequest {
            question: "",
            image_data: image.body(),
        };

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(url = %self.url, error = %e, "Error fetching similar images");
                QuestError::ImageSearch(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            error!(url = %self.url, status = %status, "Image search returned an error");
            return Err(QuestError::ImageSearch(format!(
                "image search service returned {}",
                status
            )));
        }

        let results: Vec<SimilarArtwork> = response
            .json()
            .await
            .map_err(|e| QuestError::ImageSearch(format!("unreadable response: {e}")))?;

        info!(count = results.len(), "Image search complete");
        Ok(results)
    }
}
