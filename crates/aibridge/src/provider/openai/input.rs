//! Encoding of the unified prompt and call options into a Responses API
//! request.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Serialize;

use super::metadata::OpenAiMetadata;
use super::tools::{OpenAiTool, OpenAiToolChoice, encode_tools};
use crate::error::Error;
use crate::messages::{
    CallOptions, CallWarning, ContentBlock, MediaSource, Message, ResponseFormat, ToolResultBlock, merge_messages,
};
use crate::schema::normalize_not_sentinels;

/// How a model family accepts system messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum SystemMessageMode {
    System,
    Developer,
    Remove,
}

/// Per-model-family request constraints.
#[derive(Debug, Clone, Copy)]
pub(super) struct ModelConfig {
    pub is_reasoning_model: bool,
    pub system_message_mode: SystemMessageMode,
}

/// Classify a model ID into its request constraints.
///
/// The o-series reasoning models reject sampling parameters and take system
/// prompts as `developer` messages; the earliest previews drop them
/// entirely.
pub(super) fn model_config(model: &str) -> ModelConfig {
    if model.starts_with('o') {
        if model.starts_with("o1-mini") || model.starts_with("o1-preview") {
            return ModelConfig {
                is_reasoning_model: true,
                system_message_mode: SystemMessageMode::Remove,
            };
        }

        return ModelConfig {
            is_reasoning_model: true,
            system_message_mode: SystemMessageMode::Developer,
        };
    }

    ModelConfig {
        is_reasoning_model: false,
        system_message_mode: SystemMessageMode::System,
    }
}

/// A fully encoded call: the wire request plus the warnings to attach to
/// the eventual response.
#[derive(Debug)]
pub(crate) struct EncodedRequest {
    pub request: OpenAiRequest,
    pub warnings: Vec<CallWarning>,
}

/// Request body for `POST /v1/responses`.
#[derive(Debug, Serialize)]
pub(crate) struct OpenAiRequest {
    pub model: String,
    pub input: Vec<OpenAiInputItem>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<TextConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<OpenAiTool>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<OpenAiToolChoice>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel_tool_calls: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_response_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<ReasoningParam>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ReasoningParam {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effort: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct TextConfig {
    pub format: TextFormat,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum TextFormat {
    JsonSchema {
        name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        schema: serde_json::Value,
        strict: bool,
    },
    JsonObject,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum OpenAiInputItem {
    Message {
        role: &'static str,
        content: MessageContent,
    },
    FunctionCall {
        call_id: String,
        name: String,
        arguments: String,
    },
    FunctionCallOutput {
        call_id: String,
        output: String,
    },
    ComputerCallOutput {
        call_id: String,
        output: ComputerScreenshot,
    },
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub(crate) enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum ContentPart {
    InputText {
        text: String,
    },
    InputImage {
        image_url: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
    InputFile {
        filename: String,
        file_data: String,
    },
    OutputText {
        text: String,
    },
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum ComputerScreenshot {
    ComputerScreenshot { image_url: String },
}

/// Encode `(messages, options)` for one model into a Responses API request.
pub(crate) fn encode_request(
    model: &str,
    messages: Vec<Message>,
    options: &CallOptions,
) -> crate::Result<EncodedRequest> {
    let model_config = model_config(model);
    let metadata = OpenAiMetadata::from_bag(&options.provider_metadata);

    let mut warnings = Vec::new();

    for (setting, set) in [
        ("frequency_penalty", options.frequency_penalty.is_some()),
        ("presence_penalty", options.presence_penalty.is_some()),
        ("top_k", options.top_k.is_some()),
        ("seed", options.seed.is_some()),
        ("stop_sequences", !options.stop_sequences.is_empty()),
    ] {
        if set {
            warnings.push(CallWarning::unsupported_setting(setting));
        }
    }

    let mut temperature = options.temperature;
    let mut top_p = options.top_p;

    if model_config.is_reasoning_model {
        if temperature.take().is_some() {
            warnings.push(CallWarning::unsupported_setting_because(
                "temperature",
                "not supported for reasoning models",
            ));
        }
        if top_p.take().is_some() {
            warnings.push(CallWarning::unsupported_setting_because(
                "top_p",
                "not supported for reasoning models",
            ));
        }
    }

    let input = encode_prompt(merge_messages(messages), model_config, &mut warnings)?;

    let text = options
        .response_format
        .as_ref()
        .and_then(|format| encode_response_format(format, metadata.strict()));

    let mut encoded_tools = encode_tools(&options.tools, options.tool_choice.as_ref(), metadata.strict())?;
    warnings.append(&mut encoded_tools.warnings);

    let reasoning = if model_config.is_reasoning_model
        && (metadata.reasoning_effort.is_some() || metadata.reasoning_summary.is_some())
    {
        Some(ReasoningParam {
            effort: metadata.reasoning_effort.clone(),
            summary: metadata.reasoning_summary.clone(),
        })
    } else {
        None
    };

    let request = OpenAiRequest {
        model: model.to_string(),
        input,
        max_output_tokens: options.max_output_tokens,
        temperature,
        top_p,
        text,
        tools: (!encoded_tools.tools.is_empty()).then_some(encoded_tools.tools),
        tool_choice: encoded_tools.tool_choice,
        parallel_tool_calls: metadata.parallel_tool_calls,
        store: metadata.store,
        user: metadata.user.clone(),
        instructions: metadata.instructions.clone(),
        previous_response_id: metadata.previous_response_id.clone(),
        reasoning,
        stream: None,
    };

    Ok(EncodedRequest { request, warnings })
}

fn encode_response_format(format: &ResponseFormat, strict: bool) -> Option<TextConfig> {
    match format {
        ResponseFormat::Text => None,
        ResponseFormat::Json {
            schema,
            name,
            description,
        } => {
            let format = match schema {
                Some(schema) => {
                    let mut schema = schema.clone();
                    normalize_not_sentinels(&mut schema);
                    TextFormat::JsonSchema {
                        name: name.clone().unwrap_or_else(|| "response".to_string()),
                        description: description.clone(),
                        schema,
                        strict,
                    }
                }
                None => TextFormat::JsonObject,
            };
            Some(TextConfig { format })
        }
    }
}

fn encode_prompt(
    merged: Vec<Message>,
    model_config: ModelConfig,
    warnings: &mut Vec<CallWarning>,
) -> crate::Result<Vec<OpenAiInputItem>> {
    let mut items = Vec::new();

    for message in merged {
        match message {
            Message::System(sys) => match model_config.system_message_mode {
                SystemMessageMode::System => items.push(OpenAiInputItem::Message {
                    role: "system",
                    content: MessageContent::Text(sys.content),
                }),
                SystemMessageMode::Developer => items.push(OpenAiInputItem::Message {
                    role: "developer",
                    content: MessageContent::Text(sys.content),
                }),
                SystemMessageMode::Remove => {
                    warnings.push(CallWarning::other("system messages are removed for this model"));
                }
            },
            Message::User(user) => {
                let parts = user
                    .content
                    .iter()
                    .map(encode_user_block)
                    .collect::<crate::Result<Vec<_>>>()?;
                items.push(OpenAiInputItem::Message {
                    role: "user",
                    content: MessageContent::Parts(parts),
                });
            }
            Message::Assistant(assistant) => {
                for block in &assistant.content {
                    items.push(encode_assistant_block(block)?);
                }
            }
            Message::Tool(tool) => {
                for block in &tool.content {
                    items.push(encode_tool_result(block)?);
                }
            }
        }
    }

    Ok(items)
}

fn encode_user_block(block: &ContentBlock) -> crate::Result<ContentPart> {
    match block {
        ContentBlock::Text(text) => Ok(ContentPart::InputText {
            text: text.text.clone(),
        }),
        ContentBlock::Image(image) => {
            let metadata = OpenAiMetadata::from_bag(&image.provider_metadata);

            let detail = match metadata.image_detail.as_deref() {
                None => None,
                Some(level @ ("high" | "low" | "auto")) => Some(level.to_string()),
                Some(other) => {
                    return Err(Error::InvalidRequest(format!(
                        "invalid image detail level: {other} (must be one of 'high', 'low', or 'auto')"
                    )));
                }
            };

            let image_url = match image.source()? {
                MediaSource::Url(url) => url.to_string(),
                MediaSource::Data { data, media_type } => data_url(data, media_type),
            };

            Ok(ContentPart::InputImage { image_url, detail })
        }
        ContentBlock::File(file) => match file.source()? {
            MediaSource::Url(_) => Err(Error::unsupported(
                "openai",
                "file URLs in user messages; upload the file and reference it instead",
            )),
            MediaSource::Data { data, media_type } => {
                if media_type != "application/pdf" {
                    return Err(Error::unsupported(
                        "openai",
                        format!("file media type {media_type}, only application/pdf documents are supported"),
                    ));
                }

                Ok(ContentPart::InputFile {
                    filename: file.filename.clone().unwrap_or_else(|| "file.pdf".to_string()),
                    file_data: data_url(data, media_type),
                })
            }
        },
        ContentBlock::ToolCall(_)
        | ContentBlock::ToolResult(_)
        | ContentBlock::Reasoning(_)
        | ContentBlock::RedactedReasoning(_)
        | ContentBlock::Source(_) => Err(Error::invalid_prompt(
            "only text, image, and file blocks are supported in user messages",
        )),
    }
}

fn encode_assistant_block(block: &ContentBlock) -> crate::Result<OpenAiInputItem> {
    match block {
        ContentBlock::Text(text) => Ok(OpenAiInputItem::Message {
            role: "assistant",
            content: MessageContent::Parts(vec![ContentPart::OutputText {
                text: text.text.clone(),
            }]),
        }),
        ContentBlock::ToolCall(call) => {
            if call.tool_call_id.is_empty() {
                return Err(Error::invalid_prompt("tool call block with an empty tool_call_id"));
            }
            if call.tool_name.is_empty() {
                return Err(Error::invalid_prompt("tool call block with an empty tool_name"));
            }

            let arguments = serde_json::to_string(&call.args).map_err(|e| {
                log::error!("Failed to serialize tool call arguments: {e}");
                Error::Internal(None)
            })?;

            Ok(OpenAiInputItem::FunctionCall {
                call_id: call.tool_call_id.clone(),
                name: call.tool_name.clone(),
                arguments,
            })
        }
        _ => Err(Error::invalid_prompt(
            "only text and tool call blocks are supported in assistant messages",
        )),
    }
}

fn encode_tool_result(block: &ToolResultBlock) -> crate::Result<OpenAiInputItem> {
    if block.tool_call_id.is_empty() {
        return Err(Error::invalid_prompt("tool result block with an empty tool_call_id"));
    }

    // Computer use results carry a screenshot rather than a JSON payload.
    if block.tool_name == "openai.computer_use_preview" {
        return encode_computer_result(block);
    }

    let output = serde_json::to_string(&block.result).map_err(|e| {
        log::error!("Failed to serialize tool result: {e}");
        Error::Internal(None)
    })?;

    Ok(OpenAiInputItem::FunctionCallOutput {
        call_id: block.tool_call_id.clone(),
        output,
    })
}

fn encode_computer_result(block: &ToolResultBlock) -> crate::Result<OpenAiInputItem> {
    let [ContentBlock::Image(image)] = block.content.as_deref().unwrap_or_default() else {
        return Err(Error::invalid_prompt(
            "computer use tool results must contain exactly one image block",
        ));
    };

    let MediaSource::Data { data, media_type } = image.source()? else {
        return Err(Error::invalid_prompt(
            "computer use screenshots must carry inline image data",
        ));
    };

    Ok(OpenAiInputItem::ComputerCallOutput {
        call_id: block.tool_call_id.clone(),
        output: ComputerScreenshot::ComputerScreenshot {
            image_url: data_url(data, media_type),
        },
    })
}

fn data_url(data: &[u8], media_type: &str) -> String {
    format!("data:{media_type};base64,{}", BASE64.encode(data))
}
