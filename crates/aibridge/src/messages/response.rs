use serde::{Deserialize, Serialize};

use super::content::ContentBlock;
use super::metadata::ProviderMetadata;
use super::options::ToolDefinition;

/// A complete, non-streaming model response in the unified representation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Generated content blocks, in vendor order.
    pub content: Vec<ContentBlock>,

    pub finish_reason: FinishReason,

    pub usage: Usage,

    /// Non-fatal issues collected while encoding the request, e.g. settings
    /// the vendor ignores.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<CallWarning>,

    /// Vendor extras (response IDs, cache token counts, ...) under the
    /// producing codec's namespace.
    #[serde(default, skip_serializing_if = "ProviderMetadata::is_empty")]
    pub provider_metadata: ProviderMetadata,

    /// Vendor-assigned response ID, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// The model that actually served the request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Why generation stopped, normalized across vendors.
///
/// Unrecognized vendor values map to `Unknown` rather than failing decode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FinishReason {
    /// The model finished naturally or hit a stop sequence.
    Stop,
    /// The token limit was reached.
    Length,
    /// Content was withheld by a safety filter.
    ContentFilter,
    /// The model stopped to invoke one or more tools.
    ToolCalls,
    /// Generation aborted with an error.
    Error,
    /// A vendor-specific reason with no unified equivalent.
    Other,
    #[default]
    Unknown,
}

/// Token accounting for one call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,

    /// Reported by the vendor when available, otherwise computed as
    /// `input + output`.
    pub total_tokens: u32,

    /// Tokens spent on hidden reasoning, when the vendor reports them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_tokens: Option<u32>,

    /// Input tokens served from the vendor's prompt cache.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_input_tokens: Option<u32>,
}

impl Usage {
    /// Build a usage record, computing the total when the vendor omits it.
    pub fn totaled(input_tokens: u32, output_tokens: u32, total_tokens: Option<u32>) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens: total_tokens.filter(|t| *t > 0).unwrap_or(input_tokens + output_tokens),
            reasoning_tokens: None,
            cached_input_tokens: None,
        }
    }
}

/// A non-fatal problem found while preparing a vendor request.
///
/// Warnings are informational: the call proceeds and they surface on
/// [`Response::warnings`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum CallWarning {
    /// A call option the vendor cannot honor; the setting is dropped.
    UnsupportedSetting {
        setting: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        details: Option<String>,
    },
    /// A tool the vendor cannot offer; the tool is dropped.
    UnsupportedTool {
        tool: ToolDefinition,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        details: Option<String>,
    },
    /// Anything else worth telling the caller about.
    Other { message: String },
}

impl CallWarning {
    pub fn unsupported_setting(setting: impl Into<String>) -> Self {
        Self::UnsupportedSetting {
            setting: setting.into(),
            details: None,
        }
    }

    pub fn unsupported_setting_because(setting: impl Into<String>, details: impl Into<String>) -> Self {
        Self::UnsupportedSetting {
            setting: setting.into(),
            details: Some(details.into()),
        }
    }

    pub fn unsupported_tool(tool: ToolDefinition) -> Self {
        Self::UnsupportedTool { tool, details: None }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}
