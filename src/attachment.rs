// src/attachment.rs
// Image intake: data-URI payloads and the attachments built from them

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::Path;

use crate::error::{QuestError, Result};

/// A `data:<mime>;base64,<body>` image payload.
///
/// The body is kept exactly as received so that re-prefixing it reproduces the
/// original string byte for byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    mime: String,
    body: String,
}

impl DataUri {
    /// Parse a base64 data URI. The body is validated as base64 but not kept decoded.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let rest = trimmed
            .strip_prefix("data:")
            .ok_or_else(|| QuestError::InvalidAttachment("payload is not a data URI".into()))?;
        let (header, body) = rest
            .split_once(',')
            .ok_or_else(|| QuestError::InvalidAttachment("data URI has no ',' separator".into()))?;
        let mime = header.strip_suffix(";base64").ok_or_else(|| {
            QuestError::InvalidAttachment("only base64 data URIs are supported".into())
        })?;
        if body.is_empty() {
            return Err(QuestError::InvalidAttachment("data URI body is empty".into()));
        }
        BASE64
            .decode(body)
            .map_err(|e| QuestError::InvalidAttachment(format!("invalid base64 body: {e}")))?;

        Ok(Self {
            mime: mime.to_string(),
            body: body.to_string(),
        })
    }

    /// Accept either a full data URI or a bare base64 body (assumed JPEG).
    pub fn parse_lenient(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.starts_with("data:") {
            return Self::parse(trimmed);
        }
        Self::parse(&format!("data:image/jpeg;base64,{trimmed}"))
    }

    pub fn from_bytes(mime: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            mime: mime.into(),
            body: BASE64.encode(bytes),
        }
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    /// Base64 text with the `data:...;base64,` header stripped
    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn decode(&self) -> Result<Vec<u8>> {
        BASE64
            .decode(&self.body)
            .map_err(|e| QuestError::InvalidAttachment(format!("invalid base64 body: {e}")))
    }
}

impl fmt::Display for DataUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "data:{};base64,{}", self.mime, self.body)
    }
}

impl Serialize for DataUri {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DataUri {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DataUri::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// One uploaded image: something to show the user plus the encoded payload
/// that travels with every chat turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAttachment {
    preview: String,
    payload: DataUri,
}

impl ImageAttachment {
    pub fn new(preview: impl Into<String>, payload: DataUri) -> Self {
        Self {
            preview: preview.into(),
            payload,
        }
    }

    /// Read an image file and encode it. The MIME type comes from the extension.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let mime = mime_guess::from_path(path).first_or_octet_stream();
        if mime.type_() != mime_guess::mime::IMAGE {
            return Err(QuestError::InvalidAttachment(format!(
                "{} is not an image ({})",
                path.display(),
                mime
            )));
        }
        Ok(Self::new(
            path.display().to_string(),
            DataUri::from_bytes(mime.essence_str(), &bytes),
        ))
    }

    pub fn preview(&self) -> &str {
        &self.preview
    }

    pub fn payload(&self) -> &DataUri {
        &self.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0xff, 0x00];

    #[test]
    fn test_parse_data_uri() {
        let uri = DataUri::parse("data:image/png;base64,aGVsbG8=").unwrap();
        assert_eq!(uri.mime(), "image/png");
        assert_eq!(uri.body(), "aGVsbG8=");
        assert_eq!(uri.decode().unwrap(), b"hello");
    }

    #[test]
    fn test_strip_and_reprefix_is_lossless() {
        let uri = DataUri::from_bytes("image/png", PNG_HEADER);
        let original = uri.to_string();

        let body = original.split_once(',').unwrap().1;
        assert_eq!(body, uri.body());

        let rebuilt = DataUri::parse(&format!("data:image/png;base64,{body}")).unwrap();
        assert_eq!(rebuilt.to_string(), original);
        assert_eq!(rebuilt.decode().unwrap(), PNG_HEADER);
    }

    #[test]
    fn test_rejects_non_data_uri() {
        let err = DataUri::parse("https://example.com/a.png").unwrap_err();
        assert!(matches!(err, QuestError::InvalidAttachment(_)));
    }

    #[test]
    fn test_rejects_non_base64_uri() {
        assert!(DataUri::parse("data:text/plain,hello").is_err());
        assert!(DataUri::parse("data:image/png;base64,").is_err());
        assert!(DataUri::parse("data:image/png;base64,@@@").is_err());
    }

    #[test]
    fn test_parse_lenient_accepts_bare_body() {
        let uri = DataUri::parse_lenient("aGVsbG8=").unwrap();
        assert_eq!(uri.mime(), "image/jpeg");
        assert_eq!(uri.body(), "aGVsbG8=");
    }

    #[test]
    fn test_serde_as_string() {
        let uri = DataUri::from_bytes("image/jpeg", b"abc");
        let json = serde_json::to_string(&uri).unwrap();
        assert_eq!(json, "\"data:image/jpeg;base64,YWJj\"");
        let back: DataUri = serde_json::from_str(&json).unwrap();
        assert_eq!(back, uri);
    }

    #[tokio::test]
    async fn test_attachment_from_path() {
        let mut file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        file.write_all(PNG_HEADER).unwrap();

        let attachment = ImageAttachment::from_path(file.path()).await.unwrap();
        assert_eq!(attachment.payload().mime(), "image/png");
        assert_eq!(attachment.payload().decode().unwrap(), PNG_HEADER);
        assert!(attachment.preview().ends_with(".png"));
    }

    #[tokio::test]
    async fn test_attachment_rejects_non_image() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        file.write_all(b"not an image").unwrap();

        let err = ImageAttachment::from_path(file.path()).await.unwrap_err();
        assert!(matches!(err, QuestError::InvalidAttachment(_)));
    }
}
