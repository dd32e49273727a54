// tests/client_session.rs
// ChatClient against a live server on an ephemeral port

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::json;

use quest::api::create_router;
use quest::attachment::{DataUri, ImageAttachment};
use quest::client::{ChatClient, ChatSession};
use quest::config::QuestConfig;
use quest::context::{ContextResult, ContextSource};
use quest::error::{QuestError, Result};
use quest::llm::{ChatMessage, CompletionProvider, CompletionRequest, TokenStream};
use quest::prompt::UserProfile;
use quest::search::ImageSearchClient;
use quest::services::ChatService;
use quest::state::AppState;

struct OneReference;

#[async_trait]
impl ContextSource for OneReference {
    async fn fetch(&self, _image: &DataUri) -> Result<Vec<ContextResult>> {
        Ok(vec![ContextResult {
            text: json!({"title": "Terracotta Army"}),
            image: "https://example.org/warrior.jpg".into(),
            score: None,
        }])
    }
}

/// Answers every request with "A", "B", "C"
struct Abc;

#[async_trait]
impl CompletionProvider for Abc {
    fn name(&self) -> &'static str {
        "abc"
    }

    async fn stream_chat(&self, _request: CompletionRequest) -> Result<TokenStream> {
        let tokens = ["A", "B", "C"].map(|t| Ok::<String, QuestError>(t.to_string()));
        Ok(Box::pin(futures::stream::iter(tokens)))
    }
}

/// Streams "A", then fails in the same poll
struct FailsAfterA;

#[async_trait]
impl CompletionProvider for FailsAfterA {
    fn name(&self) -> &'static str {
        "fails-after-a"
    }

    async fn stream_chat(&self, _request: CompletionRequest) -> Result<TokenStream> {
        let items = vec![
            Ok("A".to_string()),
            Err(QuestError::UpstreamStream("connection reset by peer".into())),
        ];
        Ok(Box::pin(futures::stream::iter(items)))
    }
}

/// Sets its flag when dropped
struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Streams "A", then never finishes
struct HangsAfterA {
    dropped: Arc<AtomicBool>,
}

#[async_trait]
impl CompletionProvider for HangsAfterA {
    fn name(&self) -> &'static str {
        "hangs-after-a"
    }

    async fn stream_chat(&self, _request: CompletionRequest) -> Result<TokenStream> {
        let flag = DropFlag(self.dropped.clone());
        Ok(Box::pin(async_stream::stream! {
            let _flag = flag;
            yield Ok::<String, QuestError>("A".to_string());
            futures::future::pending::<()>().await;
        }))
    }
}

async fn start_server() -> String {
    start_server_with(Arc::new(Abc)).await
}

async fn start_server_with(provider: Arc<dyn CompletionProvider>) -> String {
    let chat = Arc::new(ChatService::new(Arc::new(OneReference), provider, "gpt-4o", 1500));
    let search = ImageSearchClient::new(reqwest::Client::new(), "http://127.0.0.1:9/unused");
    let router = create_router(
        AppState::new(chat, search),
        &QuestConfig::from_lookup(|_| None),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

fn warrior() -> ImageAttachment {
    ImageAttachment::new("warrior.jpg", DataUri::from_bytes("image/jpeg", &[0xff, 0xd8, 0xff]))
}

#[tokio::test]
async fn test_turn_streams_into_transcript() {
    let client = ChatClient::new(reqwest::Client::new(), start_server().await);
    let mut session = ChatSession::new().with_profile(UserProfile::new("East Asia", "Han Chinese"));
    session.attach(warrior());

    let mut seen = String::new();
    let reply = client
        .send(&mut session, "Who made this?", |token| seen.push_str(token))
        .await
        .unwrap();

    assert_eq!(reply, "ABC");
    assert_eq!(seen, "ABC");
    assert!(!session.is_busy());
    assert_eq!(
        session.transcript(),
        &[ChatMessage::user("Who made this?"), ChatMessage::assistant("ABC")]
    );
}

#[tokio::test]
async fn test_follow_up_turn() {
    let client = ChatClient::new(reqwest::Client::new(), start_server().await);
    let mut session = ChatSession::new();
    session.attach(warrior());

    client.send(&mut session, "Who made this?", |_| {}).await.unwrap();
    client.send(&mut session, "When?", |_| {}).await.unwrap();

    assert_eq!(session.transcript().len(), 4);
    assert_eq!(session.last_reply().as_deref(), Some("ABC"));
}

#[tokio::test]
async fn test_server_rejection_aborts_turn() {
    let client = ChatClient::new(reqwest::Client::new(), start_server().await);
    let mut session = ChatSession::new();

    // No attachment: the server answers 400
    let err = client
        .send(&mut session, "Who made this?", |_| {})
        .await
        .unwrap_err();

    assert!(matches!(err, QuestError::InvalidRequest(_)));
    assert!(!session.is_busy());
    assert_eq!(session.transcript(), &[ChatMessage::user("Who made this?")]);
}

#[tokio::test]
async fn test_partial_answer_kept_when_upstream_fails() {
    let client = ChatClient::new(reqwest::Client::new(), start_server_with(Arc::new(FailsAfterA)).await);
    let mut session = ChatSession::new();
    session.attach(warrior());

    let err = client
        .send(&mut session, "Who made this?", |_| {})
        .await
        .unwrap_err();

    assert!(matches!(err, QuestError::UpstreamStream(_)), "got {err:?}");
    assert_eq!(session.last_reply().as_deref(), Some("A"));
    assert!(!session.is_busy());
}

#[tokio::test]
async fn test_client_disconnect_drops_upstream_stream() {
    let dropped = Arc::new(AtomicBool::new(false));
    let base = start_server_with(Arc::new(HangsAfterA {
        dropped: dropped.clone(),
    }))
    .await;

    let mut session = ChatSession::new();
    session.attach(warrior());
    let payload = session.begin_turn("Who made this?").unwrap();

    let response = reqwest::Client::new()
        .post(format!("{base}/api/chat-with-vision"))
        .json(&payload)
        .send()
        .await
        .unwrap();
    let mut body = response.bytes_stream();

    let first = body.next().await.unwrap().unwrap();
    assert_eq!(&first[..], b"A");
    assert!(!dropped.load(Ordering::SeqCst));

    drop(body);

    for _ in 0..100 {
        if dropped.load(Ordering::SeqCst) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(dropped.load(Ordering::SeqCst), "upstream stream still alive after disconnect");
}
