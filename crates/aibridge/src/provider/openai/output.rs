//! Decoding of Responses API payloads and server-sent events into the
//! unified representation.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{Map, Value};

use super::metadata::{NAMESPACE, OpenAiMetadata, OpenAiUsage};
use crate::error::Error;
use crate::messages::{
    ContentBlock, FinishReason, ProviderMetadata, ReasoningBlock, Response, SourceBlock, StreamEvent, TextBlock,
    ToolCallBlock, Usage,
};

/// Response body of `POST /v1/responses`.
///
/// The output item enum is closed on purpose: an item type we do not know
/// about fails deserialization instead of being silently dropped.
#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiResponse {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub model: Option<String>,

    #[serde(default)]
    pub output: Vec<OpenAiOutputItem>,

    #[serde(default)]
    pub usage: OpenAiResponseUsage,

    #[serde(default)]
    pub incomplete_details: Option<IncompleteDetails>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct IncompleteDetails {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum OpenAiOutputItem {
    Message {
        #[serde(default)]
        content: Vec<OutputContentPart>,
    },
    FunctionCall {
        call_id: String,
        name: String,
        #[serde(default)]
        arguments: String,
    },
    FileSearchCall {
        id: String,
        #[serde(flatten)]
        rest: Map<String, Value>,
    },
    WebSearchCall {
        id: String,
        #[serde(flatten)]
        rest: Map<String, Value>,
    },
    ComputerCall {
        id: String,
        #[serde(flatten)]
        rest: Map<String, Value>,
    },
    Reasoning {
        #[serde(default)]
        summary: Vec<SummaryPart>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum OutputContentPart {
    OutputText {
        #[serde(default)]
        text: String,
        #[serde(default)]
        annotations: Vec<Annotation>,
    },
    Refusal {
        #[serde(default)]
        refusal: String,
    },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum Annotation {
    UrlCitation {
        url: String,
        #[serde(default)]
        title: Option<String>,
    },
    // file_citation, file_path and future annotation kinds.
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub(crate) struct OpenAiResponseUsage {
    #[serde(default)]
    pub input_tokens: u32,

    #[serde(default)]
    pub output_tokens: u32,

    #[serde(default)]
    pub total_tokens: u32,

    #[serde(default)]
    pub input_tokens_details: TokenDetails,

    #[serde(default)]
    pub output_tokens_details: TokenDetails,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub(crate) struct TokenDetails {
    #[serde(default)]
    pub cached_tokens: u32,

    #[serde(default)]
    pub reasoning_tokens: u32,
}

impl OpenAiResponseUsage {
    fn unified(&self) -> Usage {
        let mut usage = Usage::totaled(
            self.input_tokens,
            self.output_tokens,
            Some(self.total_tokens),
        );
        usage.reasoning_tokens = Some(self.output_tokens_details.reasoning_tokens);
        usage.cached_input_tokens = Some(self.input_tokens_details.cached_tokens);
        usage
    }

    fn detailed(&self) -> OpenAiUsage {
        OpenAiUsage {
            input_tokens: self.input_tokens,
            output_tokens: self.output_tokens,
            cached_tokens: self.input_tokens_details.cached_tokens,
            reasoning_tokens: self.output_tokens_details.reasoning_tokens,
        }
    }
}

fn response_metadata(response_id: Option<String>, usage: OpenAiUsage) -> ProviderMetadata {
    let mut bag = ProviderMetadata::new();
    bag.insert(
        NAMESPACE,
        &OpenAiMetadata {
            response_id,
            usage: Some(usage),
            ..Default::default()
        },
    );
    bag
}

fn finish_reason(incomplete_reason: Option<&str>, has_tool_calls: bool) -> FinishReason {
    match incomplete_reason {
        Some("max_output_tokens") => FinishReason::Length,
        Some("content_filter") => FinishReason::ContentFilter,
        None | Some("") if has_tool_calls => FinishReason::ToolCalls,
        None | Some("") => FinishReason::Stop,
        Some(_) if has_tool_calls => FinishReason::ToolCalls,
        Some(_) => FinishReason::Unknown,
    }
}

/// Decode a complete response into the unified model.
pub(crate) fn decode_response(response: OpenAiResponse) -> crate::Result<Response> {
    let mut content = Vec::new();
    let mut has_tool_calls = false;
    let mut source_counter = 0usize;

    for item in response.output {
        match item {
            OpenAiOutputItem::Message { content: parts } => {
                for part in parts {
                    let OutputContentPart::OutputText { text, annotations } = part else {
                        continue;
                    };

                    if !text.is_empty() {
                        content.push(ContentBlock::Text(TextBlock {
                            text,
                            ..Default::default()
                        }));
                    }

                    for annotation in annotations {
                        let Annotation::UrlCitation { url, title } = annotation else {
                            continue;
                        };
                        content.push(ContentBlock::Source(SourceBlock {
                            id: format!("source-{source_counter}"),
                            url,
                            title,
                            ..Default::default()
                        }));
                        source_counter += 1;
                    }
                }
            }
            OpenAiOutputItem::FunctionCall {
                call_id,
                name,
                arguments,
            } => {
                if name.is_empty() {
                    return Err(Error::StreamProtocol("function call missing name".to_string()));
                }
                if call_id.is_empty() {
                    return Err(Error::StreamProtocol("function call missing call_id".to_string()));
                }

                content.push(ContentBlock::ToolCall(ToolCallBlock {
                    tool_call_id: call_id,
                    tool_name: name,
                    args: parse_arguments(&arguments),
                    ..Default::default()
                }));
                has_tool_calls = true;
            }
            OpenAiOutputItem::FileSearchCall { id, rest } => {
                content.push(builtin_tool_call(id, "openai.file_search", rest));
                has_tool_calls = true;
            }
            OpenAiOutputItem::WebSearchCall { id, rest } => {
                content.push(builtin_tool_call(id, "openai.web_search_preview", rest));
                has_tool_calls = true;
            }
            OpenAiOutputItem::ComputerCall { id, rest } => {
                content.push(builtin_tool_call(id, "openai.computer_use_preview", rest));
                has_tool_calls = true;
            }
            OpenAiOutputItem::Reasoning { summary } => {
                let texts: Vec<&str> = summary
                    .iter()
                    .map(|part| part.text.as_str())
                    .filter(|text| !text.is_empty())
                    .collect();
                if !texts.is_empty() {
                    content.push(ContentBlock::Reasoning(ReasoningBlock {
                        text: texts.join("\n"),
                        ..Default::default()
                    }));
                }
            }
        }
    }

    let incomplete_reason = response
        .incomplete_details
        .as_ref()
        .and_then(|details| details.reason.as_deref());

    Ok(Response {
        content,
        finish_reason: finish_reason(incomplete_reason, has_tool_calls),
        usage: response.usage.unified(),
        warnings: Vec::new(),
        provider_metadata: response_metadata(response.id.clone(), response.usage.detailed()),
        id: response.id,
        model: response.model,
    })
}

#[derive(Debug, Deserialize)]
pub(crate) struct SummaryPart {
    #[serde(default)]
    pub text: String,
}

fn builtin_tool_call(id: String, tool_name: &str, rest: Map<String, Value>) -> ContentBlock {
    // The raw item payload doubles as the arguments for built-in calls the
    // vendor already executed.
    ContentBlock::ToolCall(ToolCallBlock {
        tool_call_id: id,
        tool_name: tool_name.to_string(),
        args: Value::Object(rest),
        ..Default::default()
    })
}

fn parse_arguments(raw: &str) -> Value {
    if raw.is_empty() {
        return Value::Object(Map::new());
    }

    match sonic_rs::from_str(raw) {
        Ok(args) => args,
        Err(err) => {
            log::warn!("malformed function call arguments: {err}");
            Value::Object(Map::new())
        }
    }
}

/// One server-sent event of a streaming Responses API call.
///
/// Event types the decoder is aware of but does not expose, and any future
/// types, fall into `Ignored`.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub(crate) enum OpenAiStreamEvent {
    #[serde(rename = "response.created")]
    Created { response: StreamResponseInfo },

    #[serde(rename = "response.output_text.delta")]
    OutputTextDelta { delta: String },

    #[serde(rename = "response.output_item.added")]
    OutputItemAdded {
        output_index: u64,
        item: StreamOutputItem,
    },

    #[serde(rename = "response.function_call_arguments.delta")]
    FunctionCallArgumentsDelta { output_index: u64, delta: String },

    #[serde(rename = "response.output_item.done")]
    OutputItemDone {
        output_index: u64,
        item: StreamOutputItem,
    },

    #[serde(rename = "response.reasoning_summary_text.delta")]
    ReasoningSummaryTextDelta { delta: String },

    #[serde(rename = "response.output_text.annotation.added")]
    AnnotationAdded { annotation: Annotation },

    #[serde(rename = "response.completed")]
    Completed { response: StreamCompletionInfo },

    #[serde(rename = "response.failed")]
    Failed { response: StreamCompletionInfo },

    #[serde(rename = "response.incomplete")]
    Incomplete { response: StreamCompletionInfo },

    #[serde(rename = "error")]
    Error {
        #[serde(default)]
        code: Option<String>,
        #[serde(default)]
        message: String,
    },

    #[serde(other)]
    Ignored,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StreamResponseInfo {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StreamCompletionInfo {
    #[serde(default)]
    pub usage: Option<OpenAiResponseUsage>,

    #[serde(default)]
    pub incomplete_details: Option<IncompleteDetails>,
}

/// Output items as they appear inside stream events. Only function calls
/// carry data the decoder acts on.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum StreamOutputItem {
    FunctionCall {
        call_id: String,
        name: String,
        #[serde(default)]
        arguments: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone)]
struct ToolCallInfo {
    call_id: String,
    name: String,
}

/// Incremental translator from Responses API stream events to unified
/// [`StreamEvent`]s.
///
/// Unlike the blocking decode, usage and finish reason only become known
/// from the terminal `response.completed`/`failed`/`incomplete` events;
/// call [`finish`](Self::finish) once the vendor stream ends to obtain the
/// final `Finish` event.
#[derive(Debug, Default)]
pub(crate) struct OpenAiStreamProcessor {
    ongoing_tool_calls: BTreeMap<u64, ToolCallInfo>,
    response_id: Option<String>,
    usage: OpenAiResponseUsage,
    has_tool_calls: bool,
    incomplete_reason: Option<String>,
    annotation_counter: usize,
}

impl OpenAiStreamProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process(&mut self, event: OpenAiStreamEvent) -> Vec<StreamEvent> {
        match event {
            OpenAiStreamEvent::Created { response } => {
                self.response_id = response.id.clone();

                vec![StreamEvent::ResponseMetadata {
                    id: response.id,
                    model: response.model,
                }]
            }
            OpenAiStreamEvent::OutputTextDelta { delta } => vec![StreamEvent::TextDelta { text: delta }],
            OpenAiStreamEvent::OutputItemAdded { output_index, item } => {
                let StreamOutputItem::FunctionCall {
                    call_id,
                    name,
                    arguments,
                } = item
                else {
                    return Vec::new();
                };

                self.has_tool_calls = true;
                self.ongoing_tool_calls.insert(
                    output_index,
                    ToolCallInfo {
                        call_id: call_id.clone(),
                        name: name.clone(),
                    },
                );

                vec![StreamEvent::ToolCallDelta {
                    tool_call_id: call_id,
                    tool_name: name,
                    args_delta: arguments,
                }]
            }
            OpenAiStreamEvent::FunctionCallArgumentsDelta { output_index, delta } => {
                let Some(info) = self.ongoing_tool_calls.get(&output_index) else {
                    return vec![StreamEvent::Error {
                        message: format!("function call arguments delta for unknown output index {output_index}"),
                    }];
                };

                vec![StreamEvent::ToolCallDelta {
                    tool_call_id: info.call_id.clone(),
                    tool_name: info.name.clone(),
                    args_delta: delta,
                }]
            }
            OpenAiStreamEvent::OutputItemDone { output_index, item } => {
                let StreamOutputItem::FunctionCall {
                    call_id,
                    name,
                    arguments,
                } = item
                else {
                    return Vec::new();
                };

                self.ongoing_tool_calls.remove(&output_index);

                vec![StreamEvent::ToolCall {
                    tool_call_id: call_id,
                    tool_name: name,
                    args: parse_arguments(&arguments),
                }]
            }
            OpenAiStreamEvent::ReasoningSummaryTextDelta { delta } => {
                vec![StreamEvent::ReasoningDelta { text: delta }]
            }
            OpenAiStreamEvent::AnnotationAdded { annotation } => {
                let Annotation::UrlCitation { url, title } = annotation else {
                    return Vec::new();
                };

                let event = StreamEvent::Source {
                    source: SourceBlock {
                        id: format!("source-{}", self.annotation_counter),
                        url,
                        title,
                        ..Default::default()
                    },
                };
                self.annotation_counter += 1;
                vec![event]
            }
            OpenAiStreamEvent::Completed { response }
            | OpenAiStreamEvent::Failed { response }
            | OpenAiStreamEvent::Incomplete { response } => {
                if let Some(usage) = response.usage {
                    self.usage = usage;
                }
                if let Some(reason) = response.incomplete_details.and_then(|details| details.reason) {
                    self.incomplete_reason = Some(reason);
                }
                Vec::new()
            }
            OpenAiStreamEvent::Error { code, message } => {
                vec![StreamEvent::Error {
                    message: match code {
                        Some(code) => format!("{code}: {message}"),
                        None => message,
                    },
                }]
            }
            OpenAiStreamEvent::Ignored => Vec::new(),
        }
    }

    /// Terminal `Finish` event, built from the accumulated state.
    pub fn finish(&self) -> StreamEvent {
        StreamEvent::Finish {
            finish_reason: finish_reason(self.incomplete_reason.as_deref(), self.has_tool_calls),
            usage: self.usage.unified(),
            provider_metadata: response_metadata(self.response_id.clone(), self.usage.detailed()),
        }
    }
}

#[cfg(test)]
mod tests {
    use insta::assert_json_snapshot;
    use serde_json::json;

    use super::*;

    fn parse(raw: serde_json::Value) -> OpenAiResponse {
        serde_json::from_value(raw).unwrap()
    }

    fn parse_event(raw: serde_json::Value) -> OpenAiStreamEvent {
        serde_json::from_value(raw).unwrap()
    }

    #[test]
    fn message_output_decodes_text_and_citations() {
        let response = parse(json!({
            "id": "resp_1",
            "model": "gpt-4o",
            "output": [{
                "type": "message",
                "content": [{
                    "type": "output_text",
                    "text": "The answer is 42.",
                    "annotations": [
                        {"type": "url_citation", "url": "https://example.com", "title": "Example"},
                        {"type": "file_citation", "file_id": "file_1"}
                    ]
                }]
            }],
            "usage": {"input_tokens": 10, "output_tokens": 5, "total_tokens": 15}
        }));

        let decoded = decode_response(response).unwrap();

        assert_eq!(decoded.finish_reason, FinishReason::Stop);
        assert_json_snapshot!(decoded.content, @r###"
        [
          {
            "type": "text",
            "text": "The answer is 42."
          },
          {
            "type": "source",
            "id": "source-0",
            "url": "https://example.com",
            "title": "Example"
          }
        ]
        "###);
    }

    #[test]
    fn function_calls_decode_with_parsed_arguments() {
        let response = parse(json!({
            "output": [{
                "type": "function_call",
                "call_id": "call_1",
                "name": "get_weather",
                "arguments": "{\"city\":\"Oslo\"}"
            }],
            "usage": {"input_tokens": 1, "output_tokens": 1}
        }));

        let decoded = decode_response(response).unwrap();

        assert_eq!(decoded.finish_reason, FinishReason::ToolCalls);
        let ContentBlock::ToolCall(call) = &decoded.content[0] else {
            panic!("expected a tool call");
        };
        assert_eq!(call.args, json!({"city": "Oslo"}));
    }

    #[test]
    fn builtin_calls_decode_under_namespaced_names() {
        let response = parse(json!({
            "output": [
                {"type": "web_search_call", "id": "ws_1", "status": "completed"},
                {"type": "file_search_call", "id": "fs_1", "queries": ["weather"]},
                {"type": "computer_call", "id": "cu_1", "action": {"type": "screenshot"}}
            ],
            "usage": {"input_tokens": 1, "output_tokens": 1}
        }));

        let decoded = decode_response(response).unwrap();

        let names: Vec<_> = decoded
            .content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::ToolCall(call) => Some(call.tool_name.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(
            names,
            ["openai.web_search_preview", "openai.file_search", "openai.computer_use_preview"]
        );
        assert_eq!(decoded.finish_reason, FinishReason::ToolCalls);
    }

    #[test]
    fn reasoning_summaries_join_into_one_block() {
        let response = parse(json!({
            "output": [{
                "type": "reasoning",
                "summary": [
                    {"type": "summary_text", "text": "first"},
                    {"type": "summary_text", "text": "second"}
                ]
            }],
            "usage": {"input_tokens": 1, "output_tokens": 1}
        }));

        let decoded = decode_response(response).unwrap();
        assert!(matches!(&decoded.content[0], ContentBlock::Reasoning(r) if r.text == "first\nsecond"));
    }

    #[test]
    fn unknown_output_item_type_fails_decode() {
        let raw = json!({
            "output": [{"type": "hologram_call", "id": "h_1"}],
            "usage": {"input_tokens": 1, "output_tokens": 1}
        });

        assert!(serde_json::from_value::<OpenAiResponse>(raw).is_err());
    }

    #[test]
    fn incomplete_reasons_map_onto_finish_reasons() {
        assert_eq!(finish_reason(Some("max_output_tokens"), false), FinishReason::Length);
        assert_eq!(finish_reason(Some("content_filter"), true), FinishReason::ContentFilter);
        assert_eq!(finish_reason(None, true), FinishReason::ToolCalls);
        assert_eq!(finish_reason(None, false), FinishReason::Stop);
        assert_eq!(finish_reason(Some("solar_flare"), false), FinishReason::Unknown);
        assert_eq!(finish_reason(Some("solar_flare"), true), FinishReason::ToolCalls);
    }

    #[test]
    fn usage_carries_reasoning_and_cache_details() {
        let response = parse(json!({
            "id": "resp_9",
            "output": [],
            "usage": {
                "input_tokens": 100,
                "output_tokens": 50,
                "total_tokens": 0,
                "input_tokens_details": {"cached_tokens": 80},
                "output_tokens_details": {"reasoning_tokens": 30}
            }
        }));

        let decoded = decode_response(response).unwrap();

        assert_eq!(decoded.usage.total_tokens, 150);
        assert_eq!(decoded.usage.reasoning_tokens, Some(30));
        assert_eq!(decoded.usage.cached_input_tokens, Some(80));

        assert_json_snapshot!(decoded.provider_metadata, @r###"
        {
          "openai": {
            "response_id": "resp_9",
            "usage": {
              "input_tokens": 100,
              "output_tokens": 50,
              "cached_tokens": 80,
              "reasoning_tokens": 30
            }
          }
        }
        "###);
    }

    #[test]
    fn stream_produces_metadata_text_and_finish() {
        let mut processor = OpenAiStreamProcessor::new();
        let mut events = Vec::new();

        for raw in [
            json!({"type": "response.created", "response": {"id": "resp_1", "model": "gpt-4o"}}),
            json!({"type": "response.in_progress", "response": {}}),
            json!({"type": "response.output_text.delta", "delta": "Hel"}),
            json!({"type": "response.output_text.delta", "delta": "lo"}),
            json!({"type": "response.completed", "response": {"usage": {"input_tokens": 7, "output_tokens": 2, "total_tokens": 9}}}),
        ] {
            events.extend(processor.process(parse_event(raw)));
        }
        events.push(processor.finish());

        assert_json_snapshot!(events, @r###"
        [
          {
            "type": "response-metadata",
            "id": "resp_1",
            "model": "gpt-4o"
          },
          {
            "type": "text-delta",
            "text": "Hel"
          },
          {
            "type": "text-delta",
            "text": "lo"
          },
          {
            "type": "finish",
            "finish_reason": "stop",
            "usage": {
              "input_tokens": 7,
              "output_tokens": 2,
              "total_tokens": 9,
              "reasoning_tokens": 0,
              "cached_input_tokens": 0
            },
            "provider_metadata": {
              "openai": {
                "response_id": "resp_1",
                "usage": {
                  "input_tokens": 7,
                  "output_tokens": 2,
                  "cached_tokens": 0,
                  "reasoning_tokens": 0
                }
              }
            }
          }
        ]
        "###);
    }

    #[test]
    fn stream_tracks_tool_calls_by_output_index() {
        let mut processor = OpenAiStreamProcessor::new();
        let mut events = Vec::new();

        for raw in [
            json!({"type": "response.output_item.added", "output_index": 0, "item": {
                "type": "function_call", "call_id": "call_1", "name": "get_weather", "arguments": ""
            }}),
            json!({"type": "response.function_call_arguments.delta", "output_index": 0, "delta": "{\"city\":"}),
            json!({"type": "response.function_call_arguments.delta", "output_index": 0, "delta": "\"Oslo\"}"}),
            json!({"type": "response.output_item.done", "output_index": 0, "item": {
                "type": "function_call", "call_id": "call_1", "name": "get_weather", "arguments": "{\"city\":\"Oslo\"}"
            }}),
        ] {
            events.extend(processor.process(parse_event(raw)));
        }
        events.push(processor.finish());

        assert_json_snapshot!(events, @r###"
        [
          {
            "type": "tool-call-delta",
            "tool_call_id": "call_1",
            "tool_name": "get_weather",
            "args_delta": ""
          },
          {
            "type": "tool-call-delta",
            "tool_call_id": "call_1",
            "tool_name": "get_weather",
            "args_delta": "{\"city\":"
          },
          {
            "type": "tool-call-delta",
            "tool_call_id": "call_1",
            "tool_name": "get_weather",
            "args_delta": "\"Oslo\"}"
          },
          {
            "type": "tool-call",
            "tool_call_id": "call_1",
            "tool_name": "get_weather",
            "args": {
              "city": "Oslo"
            }
          },
          {
            "type": "finish",
            "finish_reason": "tool-calls",
            "usage": {
              "input_tokens": 0,
              "output_tokens": 0,
              "total_tokens": 0,
              "reasoning_tokens": 0,
              "cached_input_tokens": 0
            },
            "provider_metadata": {
              "openai": {
                "usage": {
                  "input_tokens": 0,
                  "output_tokens": 0,
                  "cached_tokens": 0,
                  "reasoning_tokens": 0
                }
              }
            }
          }
        ]
        "###);
    }

    #[test]
    fn arguments_delta_for_unknown_index_is_an_error() {
        let mut processor = OpenAiStreamProcessor::new();
        let events = processor.process(parse_event(json!({
            "type": "response.function_call_arguments.delta", "output_index": 3, "delta": "{"
        })));

        assert!(matches!(&events[0], StreamEvent::Error { message } if message.contains("output index 3")));
    }

    #[test]
    fn stream_annotations_become_source_events() {
        let mut processor = OpenAiStreamProcessor::new();

        let events = processor.process(parse_event(json!({
            "type": "response.output_text.annotation.added",
            "annotation": {"type": "url_citation", "url": "https://example.com", "title": "Example"}
        })));
        assert!(matches!(&events[0], StreamEvent::Source { source } if source.id == "source-0"));

        let events = processor.process(parse_event(json!({
            "type": "response.output_text.annotation.added",
            "annotation": {"type": "url_citation", "url": "https://example.org"}
        })));
        assert!(matches!(&events[0], StreamEvent::Source { source } if source.id == "source-1"));
    }

    #[test]
    fn stream_reasoning_deltas_and_incomplete_reason() {
        let mut processor = OpenAiStreamProcessor::new();
        let mut events = Vec::new();

        for raw in [
            json!({"type": "response.reasoning_summary_text.delta", "delta": "thinking"}),
            json!({"type": "response.incomplete", "response": {
                "usage": {"input_tokens": 4, "output_tokens": 9, "total_tokens": 13},
                "incomplete_details": {"reason": "max_output_tokens"}
            }}),
        ] {
            events.extend(processor.process(parse_event(raw)));
        }
        events.push(processor.finish());

        assert!(matches!(&events[0], StreamEvent::ReasoningDelta { text } if text == "thinking"));
        assert!(matches!(
            &events[1],
            StreamEvent::Finish {
                finish_reason: FinishReason::Length,
                ..
            }
        ));
    }

    #[test]
    fn unknown_stream_event_types_are_ignored() {
        let mut processor = OpenAiStreamProcessor::new();
        let events = processor.process(parse_event(json!({
            "type": "response.audio.delta", "delta": "zzz"
        })));
        assert!(events.is_empty());
    }

    #[test]
    fn stream_error_events_carry_code_and_message() {
        let mut processor = OpenAiStreamProcessor::new();
        let events = processor.process(parse_event(json!({
            "type": "error", "code": "server_error", "message": "boom"
        })));

        assert_eq!(
            events,
            vec![StreamEvent::Error {
                message: "server_error: boom".into()
            }]
        );
    }
}
