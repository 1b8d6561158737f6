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
use self::output::{OpenAiResponse, OpenAiStreamEvent, OpenAiStreamProcessor, decode_response};

use super::http_client::default_http_client_builder;
use crate::error::Error;
use crate::messages::{CallOptions, Message, Response, StreamEvent, StreamResponse};
use crate::provider::Provider;

const DEFAULT_OPENAI_API_URL: &str = "https://api.openai.com/v1";

/// Responses API client for OpenAI and OpenAI-compatible endpoints.
pub struct OpenAiProvider {
    client: Client,
    base_url: String,
    name: String,
    config: config::ProviderConfig,
}

impl OpenAiProvider {
    pub fn new(name: String, config: config::ProviderConfig) -> crate::Result<Self> {
        let mut headers = HeaderMap::new();

        for (key, value) in &config.headers {
            let header_name: http::HeaderName = key.parse().map_err(|e| {
                log::error!("Invalid configured header name '{key}' for provider {name}: {e}");
                Error::Internal(None)
            })?;
            let value = value.parse().map_err(|e| {
                log::error!("Invalid configured header value for '{key}' on provider {name}: {e}");
                Error::Internal(None)
            })?;
            headers.insert(header_name, value);
        }

        let client = default_http_client_builder(headers).build().map_err(|e| {
            log::error!("Failed to create HTTP client for OpenAI provider: {e}");
            Error::Internal(None)
        })?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_OPENAI_API_URL.to_string());

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
            .post(format!("{}/responses", self.base_url))
            .header(
                http::header::AUTHORIZATION,
                format!("Bearer {}", self.config.api_key.expose_secret()),
            )
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
            log::error!("OpenAI API error ({status}): {error_text}");
            return Err(Error::from_status(status.as_u16(), error_text));
        }

        Ok(response)
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, model: &str, messages: Vec<Message>, options: CallOptions) -> crate::Result<Response> {
        let model = self.config.resolve_model(model);
        let encoded = encode_request(&model, messages, &options)?;

        let body = sonic_rs::to_vec(&encoded.request).map_err(|e| {
            log::error!("Failed to serialize OpenAI request: {e}");
            Error::Internal(None)
        })?;

        let response = self.send(self.request_builder(&options), body).await?;

        let response_text = response.text().await.map_err(|e| {
            log::error!("Failed to read OpenAI response body: {e}");
            Error::Internal(None)
        })?;

        let openai_response: OpenAiResponse = sonic_rs::from_str(&response_text).map_err(|e| {
            log::error!("Failed to parse OpenAI response: {e}");
            log::error!("Raw response that failed to parse: {response_text}");
            Error::response_parse("openai", e, &response_text)
        })?;

        let mut response = decode_response(openai_response)?;
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

        let body = sonic_rs::to_vec(&encoded.request).map_err(|e| {
            log::error!("Failed to serialize OpenAI streaming request: {e}");
            Error::Internal(None)
        })?;

        let response = self.send(self.request_builder(&options), body).await?;

        let event_stream = response.bytes_stream().eventsource();

        let events = futures::stream::unfold(
            StreamState {
                stream: Box::pin(event_stream),
                processor: OpenAiStreamProcessor::new(),
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

                    let Some(event) = state.stream.next().await else {
                        // Finish carries usage and stop reason, which only
                        // arrive in the terminal completion event. Emit it
                        // once the vendor stream ends.
                        state.done = true;
                        return Some((Ok(state.processor.finish()), state));
                    };

                    let Ok(event) = event else {
                        log::warn!("SSE parsing error in OpenAI stream");
                        continue;
                    };

                    if event.data == "[DONE]" {
                        continue;
                    }

                    let Ok(openai_event) = sonic_rs::from_str::<OpenAiStreamEvent>(&event.data) else {
                        log::warn!("Failed to parse OpenAI streaming event: {}", event.event);
                        continue;
                    };

                    state.pending.extend(state.processor.process(openai_event));
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
    stream: std::pin::Pin<
        Box<
            dyn futures::Stream<Item = Result<eventsource_stream::Event, eventsource_stream::EventStreamError<reqwest::Error>>>
                + Send,
        >,
    >,
    processor: OpenAiStreamProcessor,
    pending: VecDeque<StreamEvent>,
    done: bool,
}
