use serde::{Deserialize, Serialize};

use crate::messages::ProviderMetadata;

/// Namespace key for OpenAI entries in a [`ProviderMetadata`] bag.
pub const NAMESPACE: &str = "openai";

/// OpenAI-specific settings read from (requests and blocks) and written to
/// (responses) the `"openai"` metadata namespace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpenAiMetadata {
    /// Whether the model may run tool calls in parallel. OpenAI defaults
    /// this to true when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallel_tool_calls: Option<bool>,

    /// ID of the previous response, for server-side multi-turn state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_response_id: Option<String>,

    /// Whether to store the generated response for later retrieval.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store: Option<bool>,

    /// End-user identifier for abuse monitoring.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    /// System message inserted server-side as the first context item.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,

    /// Whether generated output must follow tool and response schemas
    /// exactly. Defaults to true.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strict_schemas: Option<bool>,

    /// Reasoning effort for o-series models: `low`, `medium` or `high`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_effort: Option<String>,

    /// Reasoning summary detail: `concise` or `detailed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_summary: Option<String>,

    /// Image processing detail hint, meaningful on image block metadata:
    /// `high`, `low` or `auto`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_detail: Option<String>,

    /// Response ID, set on decoded responses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_id: Option<String>,

    /// Detailed token accounting, set on decoded responses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<OpenAiUsage>,
}

impl OpenAiMetadata {
    /// Read the OpenAI namespace from a bag, defaulting when absent.
    pub fn from_bag(bag: &ProviderMetadata) -> Self {
        bag.get(NAMESPACE).unwrap_or_default()
    }

    /// Effective strictness flag for schema-constrained output.
    pub(super) fn strict(&self) -> bool {
        self.strict_schemas.unwrap_or(true)
    }
}

/// Token usage details as OpenAI reports them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenAiUsage {
    #[serde(default)]
    pub input_tokens: u32,

    #[serde(default)]
    pub output_tokens: u32,

    /// Input tokens served from the prompt cache.
    #[serde(default)]
    pub cached_tokens: u32,

    /// Output tokens spent on hidden reasoning.
    #[serde(default)]
    pub reasoning_tokens: u32,
}
