// src/llm/compose.rs
// Assembles the ordered message list sent to the completion provider

use crate::attachment::DataUri;
use crate::context::ContextResult;
use crate::error::{QuestError, Result};

use super::message::{ChatMessage, ContentPart, Role};

const CONTEXT_PREFIX: &str = "Additional context for reference: These images and text are from a similar artist or style. You can use these references to provide a better answer to the user question : - ";

/// The synthetic user turn carrying the top-ranked reference item
pub fn context_message(context: &ContextResult) -> ChatMessage {
    ChatMessage::user_parts(vec![
        ContentPart::text(format!("{CONTEXT_PREFIX}{}", context.text)),
        ContentPart::image(context.image.clone()),
    ])
}

/// Build the full message list:
/// 1. system prompt
/// 2. synthetic context turn
/// 3. prior turns, verbatim
/// 4. current turn's content plus one image part per attachment
pub fn compose_messages(
    system_prompt: String,
    context: &ContextResult,
    history: Vec<ChatMessage>,
    current: ChatMessage,
    attachments: &[DataUri],
) -> Result<Vec<ChatMessage>> {
    if current.role() != Role::User {
        return Err(QuestError::InvalidRequest(format!(
            "the last message must come from the user, got '{}'",
            current.role().as_str()
        )));
    }

    let mut parts = current.content.into_parts();
    parts.extend(
        attachments
            .iter()
            .map(|image| ContentPart::image(image.to_string())),
    );

    let mut messages = Vec::with_capacity(history.len() + 3);
    messages.push(ChatMessage::system(system_prompt));
    messages.push(context_message(context));
    messages.extend(history);
    messages.push(ChatMessage::user_parts(parts));

    Ok(messages)
}
