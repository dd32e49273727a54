// src/client/mod.rs
// HTTP client for a running quest server

pub mod repl;
pub mod session;

pub use session::{ChatPayload, ChatSession};

use futures::StreamExt;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::api::types::ImageSearchRequest;
use crate::attachment::DataUri;
use crate::error::{QuestError, Result};
use crate::search::SimilarArtwork;

/// Error body produced by the server's `ApiError`
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(default)]
    error_code: Option<String>,
}

#[derive(Clone)]
pub struct ChatClient {
    client: reqwest::Client,
    base_url: String,
}

impl ChatClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Run one chat turn, feeding each decoded chunk to `on_token` and into
    /// the session transcript as it arrives.
    ///
    /// On failure the turn is aborted; any partial answer already streamed is
    /// kept in the transcript.
    pub async fn send<F>(&self, session: &mut ChatSession, text: &str, mut on_token: F) -> Result<String>
    where
        F: FnMut(&str),
    {
        let payload = session.begin_turn(text)?;

        match self.stream_turn(session, &payload, &mut on_token).await {
            Ok(()) => {
                session.finish_turn();
                Ok(session.last_reply().unwrap_or_default())
            }
            Err(e) => {
                session.abort_turn();
                Err(e)
            }
        }
    }

    async fn stream_turn<F>(
        &self,
        session: &mut ChatSession,
        payload: &ChatPayload,
        on_token: &mut F,
    ) -> Result<()>
    where
        F: FnMut(&str),
    {
        let url = format!("{}/api/chat-with-vision", self.base_url);
        let response = self.client.post(&url).json(payload).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(error_from_response(status, response).await);
        }

        let mut body = response.bytes_stream();
        let mut pending: Vec<u8> = Vec::new();

        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| {
                warn!(error = %e, "Answer stream interrupted");
                QuestError::UpstreamStream(e.to_string())
            })?;
            pending.extend_from_slice(&chunk);

            let text = take_utf8_prefix(&mut pending);
            if !text.is_empty() {
                session.push_token(&text);
                on_token(&text);
            }
        }

        if !pending.is_empty() {
            let rest = String::from_utf8_lossy(&pending).into_owned();
            session.push_token(&rest);
            on_token(&rest);
        }

        debug!("Answer stream finished");
        Ok(())
    }

    /// Find indexed artworks similar to `image`
    pub async fn search(&self, image: &DataUri) -> Result<Vec<SimilarArtwork>> {
        let url = format!("{}/api/image-search", self.base_url);
        let request = ImageSearchRequest {
            image_data: image.to_string(),
        };
        let response = self.client.post(&url).json(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(error_from_response(status, response).await);
        }
        Ok(response.json().await?)
    }
}

/// Split off the longest valid UTF-8 prefix, leaving an incomplete trailing
/// sequence in `buf` for the next chunk.
fn take_utf8_prefix(buf: &mut Vec<u8>) -> String {
    let valid = match std::str::from_utf8(buf.as_slice()) {
        Ok(_) => buf.len(),
        Err(e) if e.error_len().is_none() => e.valid_up_to(),
        // Invalid bytes mid-buffer: decode everything lossily
        Err(_) => buf.len(),
    };
    let rest = buf.split_off(valid);
    let text = String::from_utf8_lossy(buf.as_slice()).into_owned();
    *buf = rest;
    text
}

async fn error_from_response(status: reqwest::StatusCode, response: reqwest::Response) -> QuestError {
    let text = response.text().await.unwrap_or_default();
    classify_error(status, &text)
}

/// Rebuild the server-side error from a status and an `ApiError` body
fn classify_error(status: reqwest::StatusCode, text: &str) -> QuestError {
    let (message, error_code) = match serde_json::from_str::<ErrorBody>(text) {
        Ok(body) => (body.message, body.error_code),
        Err(_) => (text.to_string(), None),
    };

    match error_code.as_deref() {
        Some("CONTEXT_FETCH_FAILED") => rewrap(QuestError::ContextFetch, message),
        Some("MALFORMED_CONTEXT") => rewrap(QuestError::MalformedContext, message),
        Some("COMPLETION_FAILED") => rewrap(QuestError::Completion, message),
        Some("UPSTREAM_ERROR") => rewrap(QuestError::ImageSearch, message),
        _ if status.is_client_error() => rewrap(QuestError::InvalidRequest, message),
        _ => QuestError::Completion(format!("server error {status}: {message}")),
    }
}

/// The server sends the error's Display text; drop its prefix so it is not
/// repeated when the same variant is displayed here.
fn rewrap(variant: fn(String) -> QuestError, message: String) -> QuestError {
    let prefix = variant(String::new()).to_string();
    match message.strip_prefix(&prefix) {
        Some(detail) => variant(detail.to_string()),
        None => variant(message),
    }
}
