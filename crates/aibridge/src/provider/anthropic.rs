mod input;
pub mod metadata;
mod output;
mod tools;

use std::collections::VecDeque;

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use http::{HeaderMap, header::CONTENT_TYPE};
use reqwest::Client;
use secrecy::ExposeSecret;

use self::input::encode_request;
use self::output::{AnthropicResponse, AnthropicStreamEvent, AnthropicStreamProcessor, decode_response};

use super::http_client::default_http_client_builder;
use crate::error::Error;
use crate::messages::{CallOptions, Message, Response, StreamEvent, StreamResponse};
use crate::provider::Provider;

const DEFAULT_ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Messages API client for Anthropic and Anthropic-compatible endpoints.
pub struct AnthropicProvider {
    client: Client,
    base_url: String,
    name: String,
    config: config::ProviderConfig,
}

impl AnthropicProvider {
    pub fn new(name: String, config: config::ProviderConfig) -> crate::Result<Self> {
        let mut headers = HeaderMap::new();

        headers.insert(
            "anthropic-version",
            ANTHROPIC_VERSION.parse().map_err(|e| {
                log::error!("Failed to parse Anthropic version header: {e}");
                Error::Internal(None)
            })?,
        );

        for (key, value) in &config.headers {
            let name: http::HeaderName = key.parse().map_err(|e| {
                log::error!("Invalid configured header name '{key}' for provider {name}: {e}");
                Error::Internal(None)
            })?;
            let value = value.parse().map_err(|e| {
                log::error!("Invalid configured header value for '{key}' on provider {name}: {e}");
                Error::Internal(None)
            })?;
            headers.insert(name, value);
        }

        let client = default_http_client_builder(headers).build().map_err(|e| {
            log::error!("Failed to create HTTP client for Anthropic provider: {e}");
            Error::Internal(None)
        })?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_ANTHROPIC_API_URL.to_string());

        Ok(Self {
            client,
            base_url,
            name,
            config,
        })
    }

    fn request_builder(&self, options: &CallOptions) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", self.config.api_key.expose_secret())
            .header(CONTENT_TYPE, "application/json");

        for (key, value) in &options.headers {
            builder = builder.header(key, value);
        }

        builder
    }

    async fn send(&self, builder: reqwest::RequestBuilder, body: Vec<u8>) -> crate::Result<reqwest::Response> {
        let response = builder
            .body(body)
            .send()
            .await
            .map_err(|e| Error::ConnectionError(format!("Failed to send request to {}: {e}", self.name)))?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            log::error!("Anthropic API error ({status}): {error_text}");
            return Err(Error::from_status(status.as_u16(), error_text));
        }

        Ok(response)
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, model: &str, messages: Vec<Message>, options: CallOptions) -> crate::Result<Response> {
        let model = self.config.resolve_model(model);
        let encoded = encode_request(&model, messages, &options)?;

        let mut builder = self.request_builder(&options);

        if !encoded.betas.is_empty() {
            builder = builder.header(
                "anthropic-beta",
                encoded.betas.iter().cloned().collect::<Vec<_>>().join(","),
            );
        }

        let body = sonic_rs::to_vec(&encoded.request).map_err(|e| {
            log::error!("Failed to serialize Anthropic request: {e}");
            Error::Internal(None)
        })?;

        let response = self.send(builder, body).await?;

        let response_text = response.text().await.map_err(|e| {
            log::error!("Failed to read Anthropic response body: {e}");
            Error::Internal(None)
        })?;

        let anthropic_response: AnthropicResponse = sonic_rs::from_str(&response_text).map_err(|e| {
            log::error!("Failed to parse Anthropic response: {e}");
            log::error!("Raw response that failed to parse: {response_text}");
            Error::response_parse("anthropic", e, &response_text)
        })?;

        let mut response = decode_response(anthropic_response);
        response.warnings = encoded.warnings;

        Ok(response)
    }

    async fn stream(
        &self,
        model: &str,
        messages: Vec<Message>,
        options: CallOptions,
    ) -> crate::Result<StreamResponse> {
        let model = self.config.resolve_model(model);
        let mut encoded = encode_request(&model, messages, &options)?;
        encoded.request.stream = Some(true);

        let mut builder = self.request_builder(&options);

        if !encoded.betas.is_empty() {
            builder = builder.header(
                "anthropic-beta",
                encoded.betas.iter().cloned().collect::<Vec<_>>().join(","),
            );
        }

        let body = sonic_rs::to_vec(&encoded.request).map_err(|e| {
            log::error!("Failed to serialize Anthropic streaming request: {e}");
            Error::Internal(None)
        })?;

        let response = self.send(builder, body).await?;

        let event_stream = response.bytes_stream().eventsource();

        let events = futures::stream::unfold(
            StreamState {
                stream: Box::pin(event_stream),
                processor: AnthropicStreamProcessor::new(),
                pending: VecDeque::new(),
                done: false,
            },
            |mut state| async move {
                loop {
                    if state.done {
                        return None;
                    }

                    if let Some(event) = state.pending.pop_front() {
                        // An in-stream error is terminal: surface it and stop.
                        if matches!(event, StreamEvent::Error { .. }) {
                            state.done = true;
                        }
                        return Some((Ok(event), state));
                    }

                    let event = state.stream.next().await?;

                    let Ok(event) = event else {
                        log::warn!("SSE parsing error in Anthropic stream");
                        continue;
                    };

                    let Ok(anthropic_event) = sonic_rs::from_str::<AnthropicStreamEvent>(&event.data) else {
                        log::warn!("Failed to parse Anthropic streaming event: {}", event.event);
                        continue;
                    };

                    state.pending.extend(state.processor.process(anthropic_event));
                }
            },
        );

        Ok(StreamResponse {
            events: Box::pin(events),
            warnings: encoded.warnings,
        })
    }
}

struct StreamState {
    stream: std::pin::Pin<Box<dyn futures::Stream<Item = Result<eventsource_stream::Event, eventsource_stream::EventStreamError<reqwest::Error>>> + Send>>,
    processor: AnthropicStreamProcessor,
    pending: VecDeque<StreamEvent>,
    done: bool,
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};

    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::post;
    use axum::{Json, Router};
    use futures::StreamExt;
    use secrecy::SecretString;
    use serde_json::{Value, json};
    use tokio::net::TcpListener;

    use super::*;
    use crate::messages::{ContentBlock, FinishReason};

    #[derive(Clone)]
    struct CaptureState {
        captured: Arc<Mutex<Option<(HeaderMap, Value)>>>,
    }

    async fn handle_messages(
        State(state): State<CaptureState>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> impl IntoResponse {
        *state.captured.lock().unwrap() = Some((headers.clone(), body.clone()));

        (
            StatusCode::OK,
            Json(json!({
                "id": "msg_01",
                "model": "claude-sonnet-4",
                "content": [{"type": "text", "text": "Hello there"}],
                "stop_reason": "end_turn",
                "usage": {"input_tokens": 9, "output_tokens": 3}
            })),
        )
    }

    async fn start_capture_server(state: CaptureState) -> String {
        let app = Router::new()
            .route("/v1/messages", post(handle_messages))
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{address}/v1")
    }

    fn provider_config(base_url: String) -> config::ProviderConfig {
        config::ProviderConfig {
            protocol: config::ProviderProtocol::Anthropic,
            api_key: SecretString::from("test-key".to_string()),
            base_url: Some(base_url),
            headers: BTreeMap::new(),
            models: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn generate_sends_credentials_and_decodes_the_response() {
        let state = CaptureState {
            captured: Arc::new(Mutex::new(None)),
        };
        let base_url = start_capture_server(state.clone()).await;

        let provider = AnthropicProvider::new("anthropic".to_string(), provider_config(base_url)).unwrap();

        let response = provider
            .generate(
                "claude-sonnet-4",
                vec![Message::user(vec![ContentBlock::text("Hi")])],
                CallOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(response.finish_reason, FinishReason::Stop);
        assert_eq!(response.id.as_deref(), Some("msg_01"));
        assert!(matches!(&response.content[0], ContentBlock::Text(t) if t.text == "Hello there"));

        let captured = state.captured.lock().unwrap().clone().expect("captured request");
        let (headers, body) = captured;

        assert_eq!(headers.get("x-api-key").unwrap(), "test-key");
        assert_eq!(headers.get("anthropic-version").unwrap(), "2023-06-01");
        assert_eq!(body.get("model").and_then(Value::as_str), Some("claude-sonnet-4"));
        assert_eq!(body.get("max_tokens").and_then(Value::as_u64), Some(4096));
    }

    #[tokio::test]
    async fn generate_resolves_configured_model_aliases() {
        let state = CaptureState {
            captured: Arc::new(Mutex::new(None)),
        };
        let base_url = start_capture_server(state.clone()).await;

        let mut config = provider_config(base_url);
        config.models.insert(
            "workspace-sonnet".to_string(),
            config::ModelConfig {
                rename: Some("claude-sonnet-4".to_string()),
            },
        );

        let provider = AnthropicProvider::new("anthropic".to_string(), config).unwrap();

        provider
            .generate(
                "workspace-sonnet",
                vec![Message::user(vec![ContentBlock::text("Hi")])],
                CallOptions::default(),
            )
            .await
            .unwrap();

        let captured = state.captured.lock().unwrap().clone().expect("captured request");
        assert_eq!(captured.1.get("model").and_then(Value::as_str), Some("claude-sonnet-4"));
    }

    #[tokio::test]
    async fn error_status_maps_onto_the_error_taxonomy() {
        async fn unauthorized() -> impl IntoResponse {
            (StatusCode::UNAUTHORIZED, "invalid x-api-key")
        }

        let app = Router::new().route("/v1/messages", post(unauthorized));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let provider =
            AnthropicProvider::new("anthropic".to_string(), provider_config(format!("http://{address}/v1"))).unwrap();

        let err = provider
            .generate(
                "claude-sonnet-4",
                vec![Message::user(vec![ContentBlock::text("Hi")])],
                CallOptions::default(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, Error::AuthenticationFailed(_)));
    }

    #[tokio::test]
    async fn stream_translates_sse_events_and_stops_after_message_stop() {
        async fn handle_stream(headers: HeaderMap, Json(body): Json<Value>) -> impl IntoResponse {
            assert_eq!(headers.get("x-api-key").unwrap(), "test-key");
            assert_eq!(body.get("stream"), Some(&Value::Bool(true)));

            let frames = [
                r#"{"type":"message_start","message":{"id":"msg_01","model":"claude-sonnet-4","usage":{"input_tokens":6,"output_tokens":0}}}"#,
                r#"{"type":"content_block_start","index":0,"content_block":{"type":"text","text":""}}"#,
                r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hi"}}"#,
                r#"{"type":"content_block_stop","index":0}"#,
                r#"{"type":"message_delta","delta":{"stop_reason":"end_turn"},"usage":{"output_tokens":2}}"#,
                r#"{"type":"message_stop"}"#,
            ];
            let body: String = frames.iter().map(|frame| format!("data: {frame}\n\n")).collect();

            ([("content-type", "text/event-stream")], body)
        }

        let app = Router::new().route("/v1/messages", post(handle_stream));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let provider =
            AnthropicProvider::new("anthropic".to_string(), provider_config(format!("http://{address}/v1"))).unwrap();

        let response = provider
            .stream(
                "claude-sonnet-4",
                vec![Message::user(vec![ContentBlock::text("Hi")])],
                CallOptions::default(),
            )
            .await
            .unwrap();

        let events: Vec<_> = response.events.map(Result::unwrap).collect().await;

        assert_eq!(
            events,
            vec![
                StreamEvent::ResponseMetadata {
                    id: Some("msg_01".into()),
                    model: Some("claude-sonnet-4".into()),
                },
                StreamEvent::TextDelta { text: "Hi".into() },
                StreamEvent::Finish {
                    finish_reason: FinishReason::Stop,
                    usage: crate::messages::Usage::totaled(6, 2, None),
                    provider_metadata: Default::default(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn stream_error_event_is_terminal() {
        async fn handle_stream() -> impl IntoResponse {
            let frames = [
                r#"{"type":"message_start","message":{"id":"msg_01","model":"claude-sonnet-4","usage":{"input_tokens":6,"output_tokens":0}}}"#,
                r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#,
                r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"never seen"}}"#,
            ];
            let body: String = frames.iter().map(|frame| format!("data: {frame}\n\n")).collect();

            ([("content-type", "text/event-stream")], body)
        }

        let app = Router::new().route("/v1/messages", post(handle_stream));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let provider =
            AnthropicProvider::new("anthropic".to_string(), provider_config(format!("http://{address}/v1"))).unwrap();

        let response = provider
            .stream(
                "claude-sonnet-4",
                vec![Message::user(vec![ContentBlock::text("Hi")])],
                CallOptions::default(),
            )
            .await
            .unwrap();

        let events: Vec<_> = response.events.map(Result::unwrap).collect().await;

        assert_eq!(events.len(), 2);
        assert!(matches!(
            &events[1],
            StreamEvent::Error { message } if message.contains("Overloaded")
        ));
    }

    #[tokio::test]
    async fn builtin_tools_send_the_beta_header() {
        let state = CaptureState {
            captured: Arc::new(Mutex::new(None)),
        };
        let base_url = start_capture_server(state.clone()).await;

        let provider = AnthropicProvider::new("anthropic".to_string(), provider_config(base_url)).unwrap();

        let options = CallOptions {
            tools: vec![crate::messages::ToolDefinition::ProviderDefined(
                crate::messages::ProviderDefinedTool {
                    id: "anthropic.bash".into(),
                    name: "bash".into(),
                    args: Value::Null,
                },
            )],
            ..Default::default()
        };

        provider
            .generate(
                "claude-sonnet-4",
                vec![Message::user(vec![ContentBlock::text("ls")])],
                options,
            )
            .await
            .unwrap();

        let captured = state.captured.lock().unwrap().clone().expect("captured request");
        assert_eq!(captured.0.get("anthropic-beta").unwrap(), "computer-use-2025-01-24");
    }
}
