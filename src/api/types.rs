// src/api/types.rs
// Wire types shared by the HTTP handlers and the chat client

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::attachment::DataUri;
use crate::llm::ChatMessage;
use crate::prompt::UserProfile;

/// Body of `POST /api/chat-with-vision`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub data: ChatData,
}

/// Per-turn side data. The browser client sends both fields as JSON-encoded
/// strings; already-decoded values are accepted too.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatData {
    #[serde(
        default,
        deserialize_with = "json_encoded",
        serialize_with = "encode_json"
    )]
    pub base64_images: Vec<DataUri>,
    #[serde(
        default,
        deserialize_with = "json_encoded",
        serialize_with = "encode_json_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub user_profile: Option<UserProfile>,
}

/// Body of `POST /api/image-search`: a data URI or a bare base64 body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSearchRequest {
    pub image_data: String,
}

/// Body of `POST /api/sections`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionsRequest {
    pub text: String,
}

fn json_encoded<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Value::deserialize(deserializer)? {
        Value::String(encoded) => serde_json::from_str(&encoded).map_err(serde::de::Error::custom),
        other => serde_json::from_value(other).map_err(serde::de::Error::custom),
    }
}

fn encode_json<S, T>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: Serialize,
{
    let encoded = serde_json::to_string(value).map_err(serde::ser::Error::custom)?;
    serializer.serialize_str(&encoded)
}

fn encode_json_opt<S, T>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: Serialize,
{
    match value {
        Some(inner) => encode_json(inner, serializer),
        None => serializer.serialize_none(),
    }
}
