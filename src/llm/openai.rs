// src/llm/openai.rs
// OpenAI chat completions client (streaming)

use async_trait::async_trait;
use reqwest::{Client, header};
use tracing::{debug, error, info};

use super::provider::{CompletionProvider, CompletionRequest};
use super::stream::{TokenStream, token_stream};
use crate::config::QuestConfig;
use crate::error::{QuestError, Result};

pub struct OpenAiClient {
    client: Client,
    api_key: String,
    url: String,
}

impl OpenAiClient {
    pub fn new(client: Client, api_key: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            url: url.into(),
        }
    }

    pub fn from_config(client: Client, config: &QuestConfig) -> Result<Self> {
        if !config.has_api_key() {
            return Err(QuestError::Config("OPENAI_API_KEY not set".to_string()));
        }
        Ok(Self::new(client, config.openai_api_key.clone(), config.completions_url()))
    }
}

#[async_trait]
impl CompletionProvider for OpenAiClient {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn stream_chat(&self, request: CompletionRequest) -> Result<TokenStream> {
        info!(
            model = %request.model,
            messages = request.messages.len(),
            "Starting streamed completion"
        );

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .header(header::ACCEPT, "text/event-stream")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Completion request failed to send");
                QuestError::Completion(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|_| "<no body>".into());
            error!(status = %status, body = %body, "Completion provider rejected the request");
            return Err(QuestError::Completion(format!("API error {}: {}", status, body)));
        }

        debug!("SSE stream opened");
        // The token stream owns the response; dropping it closes the connection
        Ok(token_stream(response.bytes_stream()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::message::ChatMessage;
    use axum::{
        Json, Router,
        http::{HeaderMap, StatusCode},
        response::IntoResponse,
        routing::post,
    };
    use futures::StreamExt;
    use serde_json::Value;

    async fn spawn_provider(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/v1/chat/completions", addr)
    }

    async fn canned_sse(headers: HeaderMap, Json(body): Json<Value>) -> impl IntoResponse {
        if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some("Bearer sk-test") {
            return (StatusCode::UNAUTHORIZED, "bad key".to_string()).into_response();
        }
        assert_eq!(body["stream"], true);
        assert_eq!(body["max_tokens"], 1500);

        let mut sse = String::new();
        for token in ["A", "B", "C"] {
            sse.push_str(&format!(
                "data: {{\"choices\":[{{\"delta\":{{\"content\":\"{token}\"}}}}]}}\n\n"
            ));
        }
        sse.push_str("data: [DONE]\n\n");
        ([(header::CONTENT_TYPE, "text/event-stream")], sse).into_response()
    }

    fn request() -> CompletionRequest {
        CompletionRequest::new("gpt-4o", vec![ChatMessage::user("hi")]).with_max_tokens(1500)
    }

    #[tokio::test]
    async fn test_streams_tokens() {
        let url = spawn_provider(Router::new().route("/v1/chat/completions", post(canned_sse))).await;
        let client = OpenAiClient::new(Client::new(), "sk-test", url);

        let tokens: Vec<String> = client
            .stream_chat(request())
            .await
            .unwrap()
            .map(|r| r.unwrap())
            .collect()
            .await;

        assert_eq!(tokens.concat(), "ABC");
    }

    #[tokio::test]
    async fn test_rejection_before_first_byte() {
        let url = spawn_provider(Router::new().route("/v1/chat/completions", post(canned_sse))).await;
        let client = OpenAiClient::new(Client::new(), "wrong", url);

        let err = match client.stream_chat(request()).await {
            Ok(_) => panic!("expected rejection"),
            Err(e) => e,
        };
        assert!(matches!(&err, QuestError::Completion(msg) if msg.contains("401")));
    }

    #[test]
    fn test_from_config_requires_key() {
        let config = QuestConfig::from_lookup(|_| None);
        assert!(matches!(
            OpenAiClient::from_config(Client::new(), &config),
            Err(QuestError::Config(_))
        ));
    }
}
