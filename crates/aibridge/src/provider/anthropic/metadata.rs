use serde::{Deserialize, Serialize};

use crate::messages::ProviderMetadata;

/// Namespace key for Anthropic entries in a [`ProviderMetadata`] bag.
pub const NAMESPACE: &str = "anthropic";

/// Anthropic-specific settings read from (requests) and written to
/// (responses) the `"anthropic"` metadata namespace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnthropicMetadata {
    /// Prompt caching directive for the carrying block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_control: Option<CacheControl>,

    /// Extended-thinking configuration, meaningful on [`CallOptions`]
    /// metadata only.
    ///
    /// [`CallOptions`]: crate::messages::CallOptions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking: Option<ThinkingConfig>,

    /// Cache token accounting, set on decoded responses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<CacheUsage>,
}

impl AnthropicMetadata {
    /// Read the Anthropic namespace from a bag, defaulting when absent.
    pub fn from_bag(bag: &ProviderMetadata) -> Self {
        bag.get(NAMESPACE).unwrap_or_default()
    }
}

/// The only cache directive Anthropic currently accepts is
/// `{"type": "ephemeral"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheControl {
    #[serde(rename = "type")]
    pub kind: String,
}

impl CacheControl {
    pub fn ephemeral() -> Self {
        Self {
            kind: "ephemeral".to_string(),
        }
    }
}

/// Extended thinking: the model reasons before answering, spending up to
/// `budget_tokens` on the hidden scratchpad.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThinkingConfig {
    pub enabled: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_tokens: Option<u32>,
}

/// Cache read/write token counts reported by the Messages API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheUsage {
    #[serde(default)]
    pub cache_creation_input_tokens: u32,

    #[serde(default)]
    pub cache_read_input_tokens: u32,
}

/// Extract a block-level cache directive from its metadata bag.
pub(super) fn cache_control_from(bag: &ProviderMetadata) -> Option<CacheControl> {
    AnthropicMetadata::from_bag(bag).cache_control
}
