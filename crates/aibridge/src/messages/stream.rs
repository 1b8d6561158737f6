use std::pin::Pin;

use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::content::SourceBlock;
use super::metadata::ProviderMetadata;
use super::response::{CallWarning, FinishReason, Usage};

/// A lazily-produced, forward-only sequence of stream events.
///
/// Consuming it may block on vendor I/O. Dropping the stream releases the
/// underlying connection; there is no resynchronization after an error.
pub type EventStream = Pin<Box<dyn Stream<Item = crate::Result<StreamEvent>> + Send>>;

/// A streaming call: the event sequence plus the warnings collected while
/// encoding the request.
pub struct StreamResponse {
    pub events: EventStream,
    pub warnings: Vec<CallWarning>,
}

/// One typed event in a streaming response.
///
/// Events arrive in vendor order. Tool-call arguments arrive as raw string
/// fragments keyed by `tool_call_id`; consumers accumulate them and parse
/// only once the matching [`StreamEvent::ToolCall`] (or the terminal
/// [`StreamEvent::Finish`]) signals completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum StreamEvent {
    /// Vendor-assigned identifiers, sent once near the start of the stream.
    ResponseMetadata {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        model: Option<String>,
    },

    /// A fragment of generated text.
    TextDelta { text: String },

    /// A fragment of visible reasoning.
    ReasoningDelta { text: String },

    /// The vendor's signature over a completed reasoning block.
    ReasoningSignature { signature: String },

    /// An opaque redacted-reasoning blob.
    RedactedReasoning { data: String },

    /// A citation attached to the output.
    Source { source: SourceBlock },

    /// A fragment of tool-call arguments. `args_delta` is raw, possibly
    /// partial JSON text; do not parse until the call completes.
    ToolCallDelta {
        tool_call_id: String,
        tool_name: String,
        args_delta: String,
    },

    /// A tool call whose arguments are now complete.
    ToolCall {
        tool_call_id: String,
        tool_name: String,
        args: Value,
    },

    /// Terminal event: generation finished.
    Finish {
        finish_reason: FinishReason,
        usage: Usage,
        #[serde(default, skip_serializing_if = "ProviderMetadata::is_empty")]
        provider_metadata: ProviderMetadata,
    },

    /// Terminal event: the vendor reported an in-stream error.
    Error { message: String },
}
