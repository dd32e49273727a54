// src/api/http/chat.rs
// Streaming chat endpoint: relays provider tokens as a chunked text body

use axum::{
    Json,
    body::Body,
    extract::{State, rejection::JsonRejection},
    http::{HeaderValue, header},
    response::Response,
};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use crate::api::error::ApiResult;
use crate::api::types::ChatRequest;
use crate::error::QuestError;
use crate::llm::TokenStream;
use crate::state::AppState;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// `POST /api/chat-with-vision`
///
/// Errors before the first token produce a JSON error response. After that
/// the answer is streamed as it arrives.
pub async fn chat_with_vision(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(request) = payload?;
    let request_id = Uuid::new_v4();
    let span = info_span!("chat", %request_id);

    let tokens = state
        .chat
        .start(request)
        .instrument(span)
        .await?;

    let body = Body::from_stream(relay(tokens, request_id));
    let mut response = Response::new(body);
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    Ok(response)
}

/// Logs how a relay ended. Dropped while unfinished means the client went away
/// and the upstream stream was torn down with it.
struct RelayGuard {
    request_id: Uuid,
    tokens: usize,
    bytes: usize,
    finished: bool,
}

impl Drop for RelayGuard {
    fn drop(&mut self) {
        if !self.finished {
            warn!(
                request_id = %self.request_id,
                tokens = self.tokens,
                bytes = self.bytes,
                "Client disconnected mid-stream, upstream stream dropped"
            );
        }
    }
}

/// Forward each token as its own body chunk.
///
/// An upstream failure ends the body with an error so the chunked response
/// is aborted rather than closed cleanly. Tokens relayed before the failure
/// still reach the client.
fn relay(
    mut tokens: TokenStream,
    request_id: Uuid,
) -> impl Stream<Item = Result<Bytes, QuestError>> + Send {
    async_stream::stream! {
        let mut guard = RelayGuard { request_id, tokens: 0, bytes: 0, finished: false };

        while let Some(item) = tokens.next().await {
            match item {
                Ok(token) => {
                    guard.tokens += 1;
                    guard.bytes += token.len();
                    yield Ok(Bytes::from(token));
                }
                Err(e) => {
                    guard.finished = true;
                    error!(
                        request_id = %guard.request_id,
                        tokens = guard.tokens,
                        bytes = guard.bytes,
                        error = %e,
                        "Completion stream failed after streaming started"
                    );
                    // Return Pending once so hyper writes out the headers and
                    // tokens it has buffered before the error resets the connection.
                    tokio::task::yield_now().await;
                    yield Err(e);
                    break;
                }
            }
        }

        if !guard.finished {
            guard.finished = true;
            info!(
                request_id = %guard.request_id,
                tokens = guard.tokens,
                bytes = guard.bytes,
                "Completion stream finished"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    #[tokio::test]
    async fn test_relay_forwards_each_token() {
        let tokens: TokenStream = Box::pin(stream::iter(
            ["A", "B", "C"].map(|t| Ok::<String, QuestError>(t.to_string())),
        ));
        let chunks: Vec<Bytes> = relay(tokens, Uuid::nil()).map(|c| c.unwrap()).collect().await;
        assert_eq!(chunks, vec![Bytes::from("A"), Bytes::from("B"), Bytes::from("C")]);
    }

    #[tokio::test]
    async fn test_relay_stops_at_first_error() {
        let tokens: TokenStream = Box::pin(stream::iter(vec![
            Ok("A".to_string()),
            Err(QuestError::UpstreamStream("reset".into())),
            Ok("never".to_string()),
        ]));
        let items: Vec<Result<Bytes, QuestError>> = relay(tokens, Uuid::nil()).collect().await;

        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(matches!(items[1], Err(QuestError::UpstreamStream(_))));
    }
}
