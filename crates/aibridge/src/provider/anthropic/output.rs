//! Decoding of Messages API responses and server-sent events into the
//! unified representation.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use super::metadata::{CacheUsage, NAMESPACE};
use crate::messages::{
    ContentBlock, FinishReason, ProviderMetadata, ReasoningBlock, RedactedReasoningBlock, Response, StreamEvent,
    TextBlock, ToolCallBlock, Usage,
};

/// Response body of `POST /v1/messages`.
///
/// The content enum is closed on purpose: a block type we do not know about
/// fails deserialization instead of being silently dropped.
#[derive(Debug, Deserialize)]
pub(crate) struct AnthropicResponse {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub model: Option<String>,

    pub content: Vec<AnthropicResponseBlock>,

    #[serde(default)]
    pub stop_reason: Option<StopReason>,

    #[serde(default)]
    pub usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum AnthropicResponseBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    Thinking {
        thinking: String,
        #[serde(default)]
        signature: Option<String>,
    },
    RedactedThinking {
        data: String,
    },
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum StopReason {
    EndTurn,
    MaxTokens,
    StopSequence,
    ToolUse,
    Refusal,
    #[serde(other)]
    Other,
}

impl StopReason {
    fn finish_reason(self) -> FinishReason {
        match self {
            Self::EndTurn | Self::StopSequence => FinishReason::Stop,
            Self::MaxTokens => FinishReason::Length,
            Self::ToolUse => FinishReason::ToolCalls,
            Self::Refusal => FinishReason::ContentFilter,
            Self::Other => FinishReason::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub(crate) struct AnthropicUsage {
    #[serde(default)]
    pub input_tokens: u32,

    #[serde(default)]
    pub output_tokens: u32,

    #[serde(default)]
    pub cache_creation_input_tokens: Option<u32>,

    #[serde(default)]
    pub cache_read_input_tokens: Option<u32>,
}

impl AnthropicUsage {
    fn unified(&self) -> Usage {
        let mut usage = Usage::totaled(self.input_tokens, self.output_tokens, None);
        usage.cached_input_tokens = self.cache_read_input_tokens;
        usage
    }

    fn cache_metadata(&self) -> Option<ProviderMetadata> {
        if self.cache_creation_input_tokens.is_none() && self.cache_read_input_tokens.is_none() {
            return None;
        }

        let mut bag = ProviderMetadata::new();
        bag.insert(
            NAMESPACE,
            &serde_json::json!({
                "usage": CacheUsage {
                    cache_creation_input_tokens: self.cache_creation_input_tokens.unwrap_or_default(),
                    cache_read_input_tokens: self.cache_read_input_tokens.unwrap_or_default(),
                }
            }),
        );
        Some(bag)
    }
}

/// Decode a complete response into the unified model.
///
/// Empty text, thinking and redacted-thinking blocks are dropped; the
/// Messages API sends them when a block closed without producing content.
pub(crate) fn decode_response(response: AnthropicResponse) -> Response {
    let mut content = Vec::with_capacity(response.content.len());

    for block in response.content {
        match block {
            AnthropicResponseBlock::Text { text } => {
                if !text.is_empty() {
                    content.push(ContentBlock::Text(TextBlock {
                        text,
                        ..Default::default()
                    }));
                }
            }
            AnthropicResponseBlock::ToolUse { id, name, input } => {
                content.push(ContentBlock::ToolCall(ToolCallBlock {
                    tool_call_id: id,
                    tool_name: name,
                    args: if input.is_null() { Value::Object(Default::default()) } else { input },
                    ..Default::default()
                }));
            }
            AnthropicResponseBlock::Thinking { thinking, signature } => {
                if !thinking.is_empty() {
                    content.push(ContentBlock::Reasoning(ReasoningBlock {
                        text: thinking,
                        signature,
                        ..Default::default()
                    }));
                }
            }
            AnthropicResponseBlock::RedactedThinking { data } => {
                if !data.is_empty() {
                    content.push(ContentBlock::RedactedReasoning(RedactedReasoningBlock {
                        data,
                        ..Default::default()
                    }));
                }
            }
        }
    }

    Response {
        content,
        finish_reason: response
            .stop_reason
            .map(StopReason::finish_reason)
            .unwrap_or_default(),
        usage: response.usage.unified(),
        warnings: Vec::new(),
        provider_metadata: response.usage.cache_metadata().unwrap_or_default(),
        id: response.id,
        model: response.model,
    }
}

/// One server-sent event of a streaming Messages API call.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum AnthropicStreamEvent {
    MessageStart {
        message: StreamMessageStart,
    },
    ContentBlockStart {
        index: usize,
        content_block: StreamContentBlock,
    },
    ContentBlockDelta {
        index: usize,
        delta: StreamDelta,
    },
    ContentBlockStop {
        index: usize,
    },
    MessageDelta {
        delta: MessageDeltaBody,
        #[serde(default)]
        usage: Option<AnthropicUsage>,
    },
    MessageStop,
    Ping,
    Error {
        error: StreamError,
    },
}

#[derive(Debug, Deserialize)]
pub(crate) struct StreamMessageStart {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub model: Option<String>,

    #[serde(default)]
    pub usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum StreamContentBlock {
    Text {
        #[serde(default)]
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
    },
    Thinking {
        #[serde(default)]
        thinking: String,
    },
    RedactedThinking {
        data: String,
    },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum StreamDelta {
    TextDelta { text: String },
    InputJsonDelta { partial_json: String },
    ThinkingDelta { thinking: String },
    SignatureDelta { signature: String },
}

#[derive(Debug, Deserialize)]
pub(crate) struct MessageDeltaBody {
    #[serde(default)]
    pub stop_reason: Option<StopReason>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StreamError {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub message: String,
}

/// A tool call under construction, keyed by its content block index.
#[derive(Debug)]
struct ToolCallBuilder {
    id: String,
    name: String,
    args_json: String,
}

/// Incremental translator from Messages API stream events to unified
/// [`StreamEvent`]s.
///
/// Feed vendor events in arrival order; each one yields zero or more
/// unified events. The processor tracks per-index tool-call builders and
/// the running usage so the terminal `Finish` event can report totals.
#[derive(Debug, Default)]
pub(crate) struct AnthropicStreamProcessor {
    tool_calls: BTreeMap<usize, ToolCallBuilder>,
    usage: AnthropicUsage,
    stop_reason: Option<StopReason>,
    has_tool_calls: bool,
}

impl AnthropicStreamProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process(&mut self, event: AnthropicStreamEvent) -> Vec<StreamEvent> {
        match event {
            AnthropicStreamEvent::MessageStart { message } => {
                self.usage.input_tokens = message.usage.input_tokens;
                self.usage.cache_creation_input_tokens = message.usage.cache_creation_input_tokens;
                self.usage.cache_read_input_tokens = message.usage.cache_read_input_tokens;

                vec![StreamEvent::ResponseMetadata {
                    id: message.id,
                    model: message.model,
                }]
            }
            AnthropicStreamEvent::ContentBlockStart { index, content_block } => match content_block {
                StreamContentBlock::ToolUse { id, name } => {
                    self.has_tool_calls = true;
                    self.tool_calls.insert(
                        index,
                        ToolCallBuilder {
                            id,
                            name,
                            args_json: String::new(),
                        },
                    );
                    Vec::new()
                }
                StreamContentBlock::RedactedThinking { data } => {
                    vec![StreamEvent::RedactedReasoning { data }]
                }
                StreamContentBlock::Text { text } if !text.is_empty() => {
                    vec![StreamEvent::TextDelta { text }]
                }
                StreamContentBlock::Thinking { thinking } if !thinking.is_empty() => {
                    vec![StreamEvent::ReasoningDelta { text: thinking }]
                }
                StreamContentBlock::Text { .. } | StreamContentBlock::Thinking { .. } => Vec::new(),
            },
            AnthropicStreamEvent::ContentBlockDelta { index, delta } => match delta {
                StreamDelta::TextDelta { text } => vec![StreamEvent::TextDelta { text }],
                StreamDelta::ThinkingDelta { thinking } => vec![StreamEvent::ReasoningDelta { text: thinking }],
                StreamDelta::SignatureDelta { signature } => vec![StreamEvent::ReasoningSignature { signature }],
                StreamDelta::InputJsonDelta { partial_json } => {
                    let Some(builder) = self.tool_calls.get_mut(&index) else {
                        log::warn!("input_json_delta for unknown content block index {index}");
                        return Vec::new();
                    };
                    builder.args_json.push_str(&partial_json);

                    vec![StreamEvent::ToolCallDelta {
                        tool_call_id: builder.id.clone(),
                        tool_name: builder.name.clone(),
                        args_delta: partial_json,
                    }]
                }
            },
            AnthropicStreamEvent::ContentBlockStop { index } => {
                let Some(builder) = self.tool_calls.remove(&index) else {
                    return Vec::new();
                };

                let args = if builder.args_json.is_empty() {
                    Value::Object(Default::default())
                } else {
                    match sonic_rs::from_str(&builder.args_json) {
                        Ok(args) => args,
                        Err(err) => {
                            log::warn!("malformed tool call arguments for {}: {err}", builder.name);
                            Value::Object(Default::default())
                        }
                    }
                };

                vec![StreamEvent::ToolCall {
                    tool_call_id: builder.id,
                    tool_name: builder.name,
                    args,
                }]
            }
            AnthropicStreamEvent::MessageDelta { delta, usage } => {
                if let Some(usage) = usage {
                    self.usage.output_tokens = usage.output_tokens;
                }
                if delta.stop_reason.is_some() {
                    self.stop_reason = delta.stop_reason;
                }
                Vec::new()
            }
            AnthropicStreamEvent::MessageStop => {
                let finish_reason = match self.stop_reason {
                    Some(reason) => reason.finish_reason(),
                    None if self.has_tool_calls => FinishReason::ToolCalls,
                    None => FinishReason::Unknown,
                };

                vec![StreamEvent::Finish {
                    finish_reason,
                    usage: self.usage.unified(),
                    provider_metadata: self.usage.cache_metadata().unwrap_or_default(),
                }]
            }
            AnthropicStreamEvent::Ping => Vec::new(),
            AnthropicStreamEvent::Error { error } => {
                vec![StreamEvent::Error {
                    message: format!("{}: {}", error.kind, error.message),
                }]
            }
        }
    }
}
