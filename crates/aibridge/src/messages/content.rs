use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::metadata::ProviderMetadata;
use crate::error::Error;

/// One turn of a conversation in the vendor-neutral model.
///
/// The variant *is* the role: there is no separate role field that could
/// drift out of sync with the payload shape. On the wire a message is a
/// JSON object discriminated by a `"role"` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Message {
    System(SystemMessage),
    User(UserMessage),
    Assistant(AssistantMessage),
    Tool(ToolMessage),
}

impl Message {
    pub fn role(&self) -> Role {
        match self {
            Self::System(_) => Role::System,
            Self::User(_) => Role::User,
            Self::Assistant(_) => Role::Assistant,
            Self::Tool(_) => Role::Tool,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::System(SystemMessage {
            content: content.into(),
            provider_metadata: ProviderMetadata::new(),
        })
    }

    pub fn user(content: Vec<ContentBlock>) -> Self {
        Self::User(UserMessage {
            content,
            provider_metadata: ProviderMetadata::new(),
        })
    }

    pub fn assistant(content: Vec<ContentBlock>) -> Self {
        Self::Assistant(AssistantMessage {
            content,
            provider_metadata: ProviderMetadata::new(),
        })
    }

    pub fn tool(content: Vec<ToolResultBlock>) -> Self {
        Self::Tool(ToolMessage {
            content,
            provider_metadata: ProviderMetadata::new(),
        })
    }
}

/// The role of a message, derived from its variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// Instructions that frame the conversation. Plain text only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemMessage {
    pub content: String,

    #[serde(default, skip_serializing_if = "ProviderMetadata::is_empty")]
    pub provider_metadata: ProviderMetadata,
}

/// Input from the end user: text plus optional images and files.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserMessage {
    pub content: Vec<ContentBlock>,

    #[serde(default, skip_serializing_if = "ProviderMetadata::is_empty")]
    pub provider_metadata: ProviderMetadata,
}

/// A model turn: generated text, reasoning, and tool invocations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssistantMessage {
    pub content: Vec<ContentBlock>,

    #[serde(default, skip_serializing_if = "ProviderMetadata::is_empty")]
    pub provider_metadata: ProviderMetadata,
}

/// Results of tool invocations the assistant requested.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolMessage {
    pub content: Vec<ToolResultBlock>,

    #[serde(default, skip_serializing_if = "ProviderMetadata::is_empty")]
    pub provider_metadata: ProviderMetadata,
}

/// One typed unit of message content.
///
/// Discriminated on the wire by a `"type"` field; every consumption site in
/// the codecs matches exhaustively, so adding a variant is a compile-checked
/// exercise across the crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ContentBlock {
    Text(TextBlock),
    Image(ImageBlock),
    File(FileBlock),
    ToolCall(ToolCallBlock),
    ToolResult(ToolResultBlock),
    Reasoning(ReasoningBlock),
    RedactedReasoning(RedactedReasoningBlock),
    Source(SourceBlock),
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(TextBlock {
            text: text.into(),
            provider_metadata: ProviderMetadata::new(),
        })
    }

    /// Whether this block carries model reasoning, visible or redacted.
    pub fn is_reasoning(&self) -> bool {
        matches!(self, Self::Reasoning(_) | Self::RedactedReasoning(_))
    }

    pub fn provider_metadata(&self) -> &ProviderMetadata {
        match self {
            Self::Text(b) => &b.provider_metadata,
            Self::Image(b) => &b.provider_metadata,
            Self::File(b) => &b.provider_metadata,
            Self::ToolCall(b) => &b.provider_metadata,
            Self::ToolResult(b) => &b.provider_metadata,
            Self::Reasoning(b) => &b.provider_metadata,
            Self::RedactedReasoning(b) => &b.provider_metadata,
            Self::Source(b) => &b.provider_metadata,
        }
    }

    pub(crate) fn provider_metadata_mut(&mut self) -> &mut ProviderMetadata {
        match self {
            Self::Text(b) => &mut b.provider_metadata,
            Self::Image(b) => &mut b.provider_metadata,
            Self::File(b) => &mut b.provider_metadata,
            Self::ToolCall(b) => &mut b.provider_metadata,
            Self::ToolResult(b) => &mut b.provider_metadata,
            Self::Reasoning(b) => &mut b.provider_metadata,
            Self::RedactedReasoning(b) => &mut b.provider_metadata,
            Self::Source(b) => &mut b.provider_metadata,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub text: String,

    #[serde(default, skip_serializing_if = "ProviderMetadata::is_empty")]
    pub provider_metadata: ProviderMetadata,
}

/// An image, referenced by URL or carried inline as base64 data.
///
/// Exactly one of `url` and `data` must be set; [`ImageBlock::source`]
/// enforces the invariant at encode time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageBlock {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Raw image bytes, base64-encoded on the wire.
    #[serde(default, with = "base64_data", skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<u8>>,

    /// IANA media type of the inline data, e.g. `image/png`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,

    #[serde(default, skip_serializing_if = "ProviderMetadata::is_empty")]
    pub provider_metadata: ProviderMetadata,
}

impl ImageBlock {
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn from_data(data: Vec<u8>, media_type: impl Into<String>) -> Self {
        Self {
            data: Some(data),
            media_type: Some(media_type.into()),
            ..Default::default()
        }
    }

    /// Resolve the url-or-data union, rejecting both-set and neither-set.
    pub fn source(&self) -> crate::Result<MediaSource<'_>> {
        media_source(self.url.as_deref(), self.data.as_deref(), self.media_type.as_deref(), "image")
    }
}

/// A document, referenced by URL or carried inline, with an optional
/// client-side filename. The filename is input-only; vendors do not echo it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileBlock {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Raw file bytes, base64-encoded on the wire.
    #[serde(default, with = "base64_data", skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<u8>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,

    #[serde(default, skip_serializing_if = "ProviderMetadata::is_empty")]
    pub provider_metadata: ProviderMetadata,
}

impl FileBlock {
    /// Resolve the url-or-data union, rejecting both-set and neither-set.
    pub fn source(&self) -> crate::Result<MediaSource<'_>> {
        media_source(self.url.as_deref(), self.data.as_deref(), self.media_type.as_deref(), "file")
    }
}

/// A resolved media source, after XOR validation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MediaSource<'a> {
    Url(&'a str),
    Data { data: &'a [u8], media_type: &'a str },
}

fn media_source<'a>(
    url: Option<&'a str>,
    data: Option<&'a [u8]>,
    media_type: Option<&'a str>,
    kind: &str,
) -> crate::Result<MediaSource<'a>> {
    match (url, data) {
        (Some(_), Some(_)) => Err(Error::invalid_prompt(format!(
            "{kind} block must not set both url and data"
        ))),
        (Some(url), None) => Ok(MediaSource::Url(url)),
        (None, Some(data)) => {
            let media_type = media_type
                .ok_or_else(|| Error::invalid_prompt(format!("{kind} block with inline data requires media_type")))?;
            Ok(MediaSource::Data { data, media_type })
        }
        (None, None) => Err(Error::invalid_prompt(format!("{kind} block has neither url nor data"))),
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolCallBlock {
    pub tool_call_id: String,
    pub tool_name: String,

    /// Model-generated arguments. Kept as raw JSON: the model may produce
    /// output that deserializes into no particular shape.
    pub args: Value,

    #[serde(default, skip_serializing_if = "ProviderMetadata::is_empty")]
    pub provider_metadata: ProviderMetadata,
}

/// The outcome of executing a tool call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolResultBlock {
    pub tool_call_id: String,
    pub tool_name: String,

    /// Plain result payload. Ignored by every consumer when `content` is
    /// populated; the block list is the richer representation.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub result: Value,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,

    /// Optional multi-part result (text and images).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<ContentBlock>>,

    #[serde(default, skip_serializing_if = "ProviderMetadata::is_empty")]
    pub provider_metadata: ProviderMetadata,
}

/// Visible model reasoning, optionally signed by the vendor so it can be
/// replayed verbatim in a later turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReasoningBlock {
    pub text: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,

    #[serde(default, skip_serializing_if = "ProviderMetadata::is_empty")]
    pub provider_metadata: ProviderMetadata,
}

/// Reasoning the vendor withheld, returned as an opaque blob that must be
/// passed back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RedactedReasoningBlock {
    pub data: String,

    #[serde(default, skip_serializing_if = "ProviderMetadata::is_empty")]
    pub provider_metadata: ProviderMetadata,
}

/// A citation the model attached to its output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceBlock {
    pub id: String,
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "ProviderMetadata::is_empty")]
    pub provider_metadata: ProviderMetadata,
}

mod base64_data {
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

    pub fn serialize<S: Serializer>(data: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
        match data {
            Some(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error> {
        let encoded = Option::<String>::deserialize(deserializer)?;
        encoded
            .map(|s| STANDARD.decode(s).map_err(D::Error::custom))
            .transpose()
    }
}
