// src/client/session.rs
// Client-side conversation state: attachments, transcript and the busy flag

use std::path::Path;

use crate::api::types::{ChatData, ChatRequest};
use crate::attachment::ImageAttachment;
use crate::error::{QuestError, Result};
use crate::llm::{ChatMessage, Role};
use crate::prompt::UserProfile;

/// Request body produced for one turn
pub type ChatPayload = ChatRequest;

/// State for one interactive conversation.
///
/// At most one turn is in flight at a time. Attachments persist across turns
/// until removed, so every turn re-sends the current set.
#[derive(Debug, Default)]
pub struct ChatSession {
    attachments: Vec<ImageAttachment>,
    transcript: Vec<ChatMessage>,
    profile: Option<UserProfile>,
    busy: bool,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile(mut self, profile: UserProfile) -> Self {
        self.profile = Some(profile);
        self
    }

    pub fn attach(&mut self, attachment: ImageAttachment) {
        self.attachments.push(attachment);
    }

    /// Read, encode and attach an image file
    pub async fn attach_file(&mut self, path: impl AsRef<Path>) -> Result<&ImageAttachment> {
        let attachment = ImageAttachment::from_path(path).await?;
        self.attachments.push(attachment);
        let last = self.attachments.len() - 1;
        Ok(&self.attachments[last])
    }

    /// Remove the attachment at `index`. Out-of-range indices are a no-op.
    pub fn remove_attachment(&mut self, index: usize) -> Option<ImageAttachment> {
        (index < self.attachments.len()).then(|| self.attachments.remove(index))
    }

    pub fn attachments(&self) -> &[ImageAttachment] {
        &self.attachments
    }

    /// Start a turn: record the user message, open an empty assistant message
    /// for streamed tokens, and build the request body.
    pub fn begin_turn(&mut self, text: &str) -> Result<ChatPayload> {
        if self.busy {
            return Err(QuestError::Busy);
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(QuestError::InvalidRequest("message text is empty".into()));
        }

        self.transcript.push(ChatMessage::user(text));
        let payload = ChatRequest {
            messages: self.transcript.clone(),
            data: ChatData {
                base64_images: self
                    .attachments
                    .iter()
                    .map(|a| a.payload().clone())
                    .collect(),
                user_profile: self.profile.clone(),
            },
        };

        self.transcript.push(ChatMessage::assistant(""));
        self.busy = true;
        Ok(payload)
    }

    /// Append a streamed token to the open assistant message
    pub fn push_token(&mut self, token: &str) {
        if !self.busy {
            return;
        }
        if let Some(last) = self.transcript.last_mut() {
            if last.role() == Role::Assistant {
                last.push_text(token);
            }
        }
    }

    pub fn finish_turn(&mut self) {
        self.busy = false;
    }

    /// End a failed turn. A partial answer stays in the transcript; an empty
    /// placeholder is dropped.
    pub fn abort_turn(&mut self) {
        self.busy = false;
        let empty_reply = self
            .transcript
            .last()
            .is_some_and(|m| m.role() == Role::Assistant && m.content.text().is_empty());
        if empty_reply {
            self.transcript.pop();
        }
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    /// Text of the latest assistant message, if any
    pub fn last_reply(&self) -> Option<String> {
        self.transcript
            .iter()
            .rev()
            .find(|m| m.role() == Role::Assistant)
            .map(|m| m.content.text())
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn profile(&self) -> Option<&UserProfile> {
        self.profile.as_ref()
    }

    pub fn set_profile(&mut self, profile: Option<UserProfile>) {
        self.profile = profile;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachment::DataUri;
    use std::io::Write;

    fn attachment(name: &str) -> ImageAttachment {
        ImageAttachment::new(name, DataUri::from_bytes("image/png", name.as_bytes()))
    }

    #[test]
    fn test_begin_turn_builds_payload() {
        let mut session = ChatSession::new().with_profile(UserProfile::new("Andes", "Quechua"));
        session.attach(attachment("a.png"));
        session.attach(attachment("b.png"));

        let payload = session.begin_turn("  What is this?  ").unwrap();

        assert_eq!(payload.messages, vec![ChatMessage::user("What is this?")]);
        assert_eq!(payload.data.base64_images.len(), 2);
        assert_eq!(payload.data.user_profile.as_ref().unwrap().region, "Andes");

        assert!(session.is_busy());
        assert_eq!(session.transcript().len(), 2);
        assert_eq!(session.transcript()[1], ChatMessage::assistant(""));
    }

    #[test]
    fn test_single_turn_in_flight() {
        let mut session = ChatSession::new();
        session.begin_turn("first").unwrap();

        assert!(matches!(session.begin_turn("second"), Err(QuestError::Busy)));
        assert_eq!(session.transcript().len(), 2);

        session.finish_turn();
        assert!(session.begin_turn("second").is_ok());
    }

    #[test]
    fn test_empty_text_rejected() {
        let mut session = ChatSession::new();
        assert!(matches!(
            session.begin_turn("   "),
            Err(QuestError::InvalidRequest(_))
        ));
        assert!(!session.is_busy());
        assert!(session.transcript().is_empty());
    }

    #[test]
    fn test_tokens_accumulate_in_reply() {
        let mut session = ChatSession::new();
        session.begin_turn("hi").unwrap();
        for token in ["A", "B", "C"] {
            session.push_token(token);
        }
        session.finish_turn();

        assert_eq!(session.last_reply().as_deref(), Some("ABC"));
        assert!(!session.is_busy());

        // Ignored outside a turn
        session.push_token("D");
        assert_eq!(session.last_reply().as_deref(), Some("ABC"));
    }

    #[test]
    fn test_history_sent_on_next_turn() {
        let mut session = ChatSession::new();
        session.begin_turn("first").unwrap();
        session.push_token("reply");
        session.finish_turn();

        let payload = session.begin_turn("second").unwrap();
        assert_eq!(
            payload.messages,
            vec![
                ChatMessage::user("first"),
                ChatMessage::assistant("reply"),
                ChatMessage::user("second"),
            ]
        );
    }

    #[test]
    fn test_abort_drops_empty_reply_only() {
        let mut session = ChatSession::new();
        session.begin_turn("one").unwrap();
        session.abort_turn();
        assert_eq!(session.transcript(), &[ChatMessage::user("one")]);

        session.begin_turn("two").unwrap();
        session.push_token("partial");
        session.abort_turn();
        assert_eq!(session.last_reply().as_deref(), Some("partial"));
        assert!(!session.is_busy());
    }

    #[test]
    fn test_remove_attachment() {
        let mut session = ChatSession::new();
        session.attach(attachment("a.png"));
        session.attach(attachment("b.png"));

        assert!(session.remove_attachment(5).is_none());
        let removed = session.remove_attachment(0).unwrap();
        assert_eq!(removed.preview(), "a.png");
        assert_eq!(session.attachments().len(), 1);
        assert_eq!(session.attachments()[0].preview(), "b.png");
    }

    #[tokio::test]
    async fn test_attach_file() {
        let mut file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        file.write_all(b"not really a png").unwrap();

        let mut session = ChatSession::new();
        let attached = session.attach_file(file.path()).await.unwrap();
        assert_eq!(attached.payload().mime(), "image/png");
        assert_eq!(session.attachments().len(), 1);
    }

    #[test]
    fn test_profile_accessors() {
        let mut session = ChatSession::new();
        assert!(session.profile().is_none());
        session.set_profile(Some(UserProfile::new("Levant", "Phoenician")));
        assert_eq!(session.profile().unwrap().cultural_background, "Phoenician");
    }
}
