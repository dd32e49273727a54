// src/llm/stream.rs
// SSE parsing for OpenAI-compatible chat completion streams

use bytes::Bytes;
use futures::{Stream, StreamExt, stream::unfold};
use serde::Deserialize;
use std::pin::Pin;
use tracing::warn;

use crate::error::{QuestError, Result};

/// Incremental answer text, one item per upstream delta
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseFrame {
    /// Text delta - forward to client immediately
    Delta(String),
    /// Frame without text (role announcement, finish_reason, keep-alive)
    Empty,
    /// `data: [DONE]`
    Done,
    /// Provider reported an error inside the stream
    Error(String),
}

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    error: Option<StreamError>,
}

#[derive(Deserialize)]
struct StreamChoice {
    delta: Option<StreamDelta>,
}

#[derive(Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

#[derive(Deserialize)]
struct StreamError {
    message: String,
}

/// Interpret one line of an SSE body. Non-data lines (comments, `event:`,
/// blanks) yield `None`.
pub fn parse_sse_line(line: &str) -> Option<SseFrame> {
    let line = line.trim_end_matches('\r');
    let data = line.strip_prefix("data:")?.trim_start();

    if data == "[DONE]" {
        return Some(SseFrame::Done);
    }

    let chunk: StreamChunk = match serde_json::from_str(data) {
        Ok(chunk) => chunk,
        Err(e) => {
            warn!(error = %e, "Skipping unparsable SSE frame");
            return Some(SseFrame::Empty);
        }
    };

    if let Some(err) = chunk.error {
        return Some(SseFrame::Error(err.message));
    }

    let text: String = chunk
        .choices
        .into_iter()
        .filter_map(|c| c.delta.and_then(|d| d.content))
        .collect();

    if text.is_empty() {
        Some(SseFrame::Empty)
    } else {
        Some(SseFrame::Delta(text))
    }
}

struct SseState<S> {
    bytes: Pin<Box<S>>,
    /// Raw bytes not yet terminated by a newline. Kept as bytes so a
    /// multi-byte character split across chunks is reassembled intact.
    buffer: Vec<u8>,
    finished: bool,
}

/// Turn a raw SSE byte stream into a stream of text deltas.
///
/// Ends cleanly on `[DONE]` or end of body. An in-stream error frame or a
/// transport error yields one `UpstreamStream` error and ends the stream.
pub fn token_stream<S, E>(bytes: S) -> TokenStream
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let state = SseState {
        bytes: Box::pin(bytes),
        buffer: Vec::new(),
        finished: false,
    };

    let stream = unfold(state, |mut state| async move {
        loop {
            if state.finished {
                return None;
            }

            // Drain complete lines first
            while let Some(pos) = state.buffer.iter().position(|b| *b == b'\n') {
                let line_bytes: Vec<u8> = state.buffer.drain(..=pos).collect();
                let line = String::from_utf8_lossy(&line_bytes[..line_bytes.len() - 1]).into_owned();

                match parse_sse_line(&line) {
                    Some(SseFrame::Delta(text)) => return Some((Ok(text), state)),
                    Some(SseFrame::Done) => {
                        state.finished = true;
                        return None;
                    }
                    Some(SseFrame::Error(message)) => {
                        state.finished = true;
                        return Some((Err(QuestError::UpstreamStream(message)), state));
                    }
                    Some(SseFrame::Empty) | None => {}
                }
            }

            match state.bytes.next().await {
                Some(Ok(chunk)) => state.buffer.extend_from_slice(&chunk),
                Some(Err(e)) => {
                    state.finished = true;
                    return Some((Err(QuestError::UpstreamStream(e.to_string())), state));
                }
                None => {
                    state.finished = true;
                    // Body ended without a trailing newline
                    let rest = String::from_utf8_lossy(&state.buffer).into_owned();
                    state.buffer.clear();
                    match parse_sse_line(rest.trim()) {
                        Some(SseFrame::Delta(text)) => return Some((Ok(text), state)),
                        Some(SseFrame::Error(message)) => {
                            return Some((Err(QuestError::UpstreamStream(message)), state));
                        }
                        _ => {
                            if !rest.trim().is_empty() {
                                warn!("Stream ended with unparsed data in buffer: {}", rest);
                            }
                            return None;
                        }
                    }
                }
            }
        }
    });

    Box::pin(stream)
}
