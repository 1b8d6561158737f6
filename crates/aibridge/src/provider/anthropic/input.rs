//! Encoding of the unified prompt and call options into a Messages API
//! request.

use std::collections::BTreeSet;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Serialize;
use serde_json::Value;

use super::metadata::{AnthropicMetadata, CacheControl, cache_control_from};
use super::tools::{AnthropicTool, AnthropicToolChoice, encode_tools};
use crate::error::Error;
use crate::messages::{
    CallOptions, CallWarning, ContentBlock, MediaSource, Message, ResponseFormat, ToolResultBlock, merge_messages,
};

const DEFAULT_MAX_TOKENS: u32 = 4096;
const BETA_PDFS: &str = "pdfs-2024-09-25";

/// A fully encoded call: the wire request, the betas it must declare, and
/// the warnings to attach to the eventual response.
#[derive(Debug)]
pub(crate) struct EncodedRequest {
    pub request: AnthropicRequest,
    pub betas: BTreeSet<String>,
    pub warnings: Vec<CallWarning>,
}

/// Request body for `POST /v1/messages`.
#[derive(Debug, Serialize)]
pub(crate) struct AnthropicRequest {
    pub model: String,
    pub max_tokens: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<Vec<SystemBlock>>,

    pub messages: Vec<AnthropicMessage>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<AnthropicTool>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<AnthropicToolChoice>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking: Option<ThinkingParam>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SystemBlock {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_control: Option<CacheControl>,
}

#[derive(Debug, Serialize)]
pub(crate) struct AnthropicMessage {
    pub role: &'static str,
    pub content: Vec<AnthropicContentBlock>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum AnthropicContentBlock {
    Text {
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        cache_control: Option<CacheControl>,
    },
    Image {
        source: MediaSourceParam,
        #[serde(skip_serializing_if = "Option::is_none")]
        cache_control: Option<CacheControl>,
    },
    Document {
        source: MediaSourceParam,
        #[serde(skip_serializing_if = "Option::is_none")]
        cache_control: Option<CacheControl>,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
        #[serde(skip_serializing_if = "Option::is_none")]
        cache_control: Option<CacheControl>,
    },
    Thinking {
        thinking: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        signature: Option<String>,
    },
    RedactedThinking {
        data: String,
    },
    ToolResult {
        tool_use_id: String,
        content: ToolResultContent,
        #[serde(skip_serializing_if = "Option::is_none")]
        is_error: Option<bool>,
        #[serde(skip_serializing_if = "Option::is_none")]
        cache_control: Option<CacheControl>,
    },
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum MediaSourceParam {
    Base64 { media_type: String, data: String },
    Url { url: String },
}

impl MediaSourceParam {
    fn from_media_source(source: MediaSource<'_>) -> Self {
        match source {
            MediaSource::Url(url) => Self::Url { url: url.to_string() },
            MediaSource::Data { data, media_type } => Self::Base64 {
                media_type: media_type.to_string(),
                data: BASE64.encode(data),
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub(crate) enum ToolResultContent {
    Text(String),
    Blocks(Vec<AnthropicContentBlock>),
}

#[derive(Debug, Serialize)]
pub(crate) struct ThinkingParam {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub budget_tokens: u32,
}

/// Encode `(messages, options)` for one model into a Messages API request.
///
/// Runs the normalization pass first, then translates messages, sampling
/// parameters, thinking configuration and tools, collecting betas and
/// warnings along the way. Fatal invariant violations abort before any
/// network I/O.
pub(crate) fn encode_request(
    model: &str,
    messages: Vec<Message>,
    options: &CallOptions,
) -> crate::Result<EncodedRequest> {
    let mut betas = BTreeSet::new();
    let mut warnings = Vec::new();

    let (system, wire_messages) = encode_prompt(merge_messages(messages), &mut betas)?;

    let thinking = encode_thinking(options, &mut warnings)?;
    let thinking_enabled = thinking.is_some();

    let mut max_tokens = options.max_output_tokens.unwrap_or(DEFAULT_MAX_TOKENS);
    if let Some(thinking) = &thinking {
        // The budget is reserved on top of the requested output tokens.
        max_tokens += thinking.budget_tokens;
    }

    for (setting, set) in [
        ("frequency_penalty", options.frequency_penalty.is_some()),
        ("presence_penalty", options.presence_penalty.is_some()),
        ("seed", options.seed.is_some()),
    ] {
        if set {
            warnings.push(CallWarning::unsupported_setting(setting));
        }
    }

    if let Some(format) = &options.response_format
        && !matches!(format, ResponseFormat::Text)
    {
        warnings.push(CallWarning::unsupported_setting_because(
            "response_format",
            "JSON response format is not supported",
        ));
    }

    let mut encoded_tools = encode_tools(&options.tools, options.tool_choice.as_ref())?;
    betas.extend(std::mem::take(&mut encoded_tools.betas));
    warnings.append(&mut encoded_tools.warnings);

    let request = AnthropicRequest {
        model: model.to_string(),
        max_tokens,
        system,
        messages: wire_messages,
        temperature: if thinking_enabled { None } else { options.temperature },
        top_p: if thinking_enabled { None } else { options.top_p },
        top_k: if thinking_enabled { None } else { options.top_k },
        stop_sequences: (!options.stop_sequences.is_empty()).then(|| options.stop_sequences.clone()),
        tools: (!encoded_tools.tools.is_empty()).then_some(encoded_tools.tools),
        tool_choice: encoded_tools.tool_choice,
        thinking,
        stream: None,
    };

    Ok(EncodedRequest {
        request,
        betas,
        warnings,
    })
}

/// Read the thinking configuration from the `"anthropic"` options metadata.
///
/// Sampling parameters are incompatible with thinking; each one that is set
/// becomes a warning and is omitted from the request by the caller.
fn encode_thinking(options: &CallOptions, warnings: &mut Vec<CallWarning>) -> crate::Result<Option<ThinkingParam>> {
    let metadata = AnthropicMetadata::from_bag(&options.provider_metadata);

    let Some(thinking) = metadata.thinking.filter(|t| t.enabled) else {
        return Ok(None);
    };

    let Some(budget_tokens) = thinking.budget_tokens.filter(|b| *b > 0) else {
        return Err(Error::InvalidRequest("thinking requires a budget".to_string()));
    };

    for (setting, set) in [
        ("temperature", options.temperature.is_some()),
        ("top_k", options.top_k.is_some()),
        ("top_p", options.top_p.is_some()),
    ] {
        if set {
            warnings.push(CallWarning::unsupported_setting_because(
                setting,
                "not supported when thinking is enabled",
            ));
        }
    }

    Ok(Some(ThinkingParam {
        kind: "enabled",
        budget_tokens,
    }))
}

/// Split the merged prompt into system blocks and conversation messages.
///
/// System messages are only legal before the first non-system turn; the
/// Messages API has a dedicated top-level field for them.
fn encode_prompt(
    merged: Vec<Message>,
    betas: &mut BTreeSet<String>,
) -> crate::Result<(Option<Vec<SystemBlock>>, Vec<AnthropicMessage>)> {
    let mut system = Vec::new();
    let mut messages = Vec::new();

    for message in merged {
        match message {
            Message::System(sys) => {
                if !messages.is_empty() {
                    return Err(Error::invalid_prompt(
                        "system messages are only supported at the beginning of the conversation",
                    ));
                }
                system.push(SystemBlock {
                    kind: "text",
                    text: sys.content,
                    cache_control: cache_control_from(&sys.provider_metadata),
                });
            }
            Message::User(user) => {
                let content = user
                    .content
                    .iter()
                    .map(|block| encode_user_block(block, betas))
                    .collect::<crate::Result<Vec<_>>>()?;
                messages.push(AnthropicMessage { role: "user", content });
            }
            Message::Assistant(assistant) => {
                let content = assistant
                    .content
                    .iter()
                    .map(encode_assistant_block)
                    .collect::<crate::Result<Vec<_>>>()?;
                messages.push(AnthropicMessage {
                    role: "assistant",
                    content,
                });
            }
            Message::Tool(tool) => {
                // Tool results travel back to the model as a user turn.
                let content = tool
                    .content
                    .iter()
                    .map(|block| encode_tool_result(block, betas))
                    .collect::<crate::Result<Vec<_>>>()?;
                messages.push(AnthropicMessage { role: "user", content });
            }
        }
    }

    Ok(((!system.is_empty()).then_some(system), messages))
}

fn encode_user_block(block: &ContentBlock, betas: &mut BTreeSet<String>) -> crate::Result<AnthropicContentBlock> {
    match block {
        ContentBlock::Text(text) => Ok(AnthropicContentBlock::Text {
            text: text.text.clone(),
            cache_control: cache_control_from(&text.provider_metadata),
        }),
        ContentBlock::Image(image) => Ok(AnthropicContentBlock::Image {
            source: MediaSourceParam::from_media_source(image.source()?),
            cache_control: cache_control_from(&image.provider_metadata),
        }),
        ContentBlock::File(file) => {
            let source = file.source()?;

            if let MediaSource::Data { media_type, .. } = source
                && media_type != "application/pdf"
            {
                return Err(Error::unsupported(
                    "anthropic",
                    format!("file media type {media_type}, only application/pdf documents are supported"),
                ));
            }

            betas.insert(BETA_PDFS.to_string());

            Ok(AnthropicContentBlock::Document {
                source: MediaSourceParam::from_media_source(source),
                cache_control: cache_control_from(&file.provider_metadata),
            })
        }
        ContentBlock::ToolCall(_)
        | ContentBlock::ToolResult(_)
        | ContentBlock::Reasoning(_)
        | ContentBlock::RedactedReasoning(_)
        | ContentBlock::Source(_) => Err(Error::invalid_prompt(format!(
            "content block {} is not supported in user messages",
            block_name(block)
        ))),
    }
}

fn encode_assistant_block(block: &ContentBlock) -> crate::Result<AnthropicContentBlock> {
    match block {
        ContentBlock::Text(text) => Ok(AnthropicContentBlock::Text {
            text: text.text.clone(),
            cache_control: cache_control_from(&text.provider_metadata),
        }),
        ContentBlock::ToolCall(call) => {
            if call.tool_call_id.is_empty() {
                return Err(Error::invalid_prompt("tool call block with an empty tool_call_id"));
            }
            Ok(AnthropicContentBlock::ToolUse {
                id: call.tool_call_id.clone(),
                name: call.tool_name.clone(),
                input: call.args.clone(),
                cache_control: cache_control_from(&call.provider_metadata),
            })
        }
        ContentBlock::Reasoning(reasoning) => Ok(AnthropicContentBlock::Thinking {
            thinking: reasoning.text.clone(),
            signature: reasoning.signature.clone(),
        }),
        ContentBlock::RedactedReasoning(redacted) => Ok(AnthropicContentBlock::RedactedThinking {
            data: redacted.data.clone(),
        }),
        ContentBlock::Image(_) | ContentBlock::File(_) | ContentBlock::ToolResult(_) | ContentBlock::Source(_) => {
            Err(Error::invalid_prompt(format!(
                "content block {} is not supported in assistant messages",
                block_name(block)
            )))
        }
    }
}

fn encode_tool_result(block: &ToolResultBlock, betas: &mut BTreeSet<String>) -> crate::Result<AnthropicContentBlock> {
    if block.tool_call_id.is_empty() {
        return Err(Error::invalid_prompt("tool result block with an empty tool_call_id"));
    }

    // A populated content list is the richer representation and wins over
    // the plain result value.
    let content = match &block.content {
        Some(blocks) => {
            let encoded = blocks
                .iter()
                .map(|inner| encode_user_block(inner, betas))
                .collect::<crate::Result<Vec<_>>>()?;
            ToolResultContent::Blocks(encoded)
        }
        None => ToolResultContent::Text(serde_json::to_string(&block.result).unwrap_or_default()),
    };

    Ok(AnthropicContentBlock::ToolResult {
        tool_use_id: block.tool_call_id.clone(),
        content,
        is_error: block.is_error.then_some(true),
        cache_control: cache_control_from(&block.provider_metadata),
    })
}

fn block_name(block: &ContentBlock) -> &'static str {
    match block {
        ContentBlock::Text(_) => "text",
        ContentBlock::Image(_) => "image",
        ContentBlock::File(_) => "file",
        ContentBlock::ToolCall(_) => "tool-call",
        ContentBlock::ToolResult(_) => "tool-result",
        ContentBlock::Reasoning(_) => "reasoning",
        ContentBlock::RedactedReasoning(_) => "redacted-reasoning",
        ContentBlock::Source(_) => "source",
    }
}
