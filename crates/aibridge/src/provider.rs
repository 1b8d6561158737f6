//! Vendor providers: the transport boundary plus the per-vendor codecs.

pub mod anthropic;
mod http_client;
pub mod openai;

use async_trait::async_trait;

pub use anthropic::AnthropicProvider;
pub use openai::OpenAiProvider;

use crate::messages::{CallOptions, Message, Response, StreamResponse};

/// A configured connection to one LLM vendor.
///
/// Implementations own a pre-built HTTP client and credentials; the codec
/// itself never reads the environment. All per-call state is local to the
/// call, so one provider value can serve concurrent calls without locking.
#[async_trait]
pub trait Provider: Send + Sync {
    /// The configured provider name, used in logs and error messages.
    fn name(&self) -> &str;

    /// Encode the prompt, perform one blocking completion call, and decode
    /// the vendor response. Warnings collected during encoding are attached
    /// to the returned response.
    async fn generate(&self, model: &str, messages: Vec<Message>, options: CallOptions) -> crate::Result<Response>;

    /// Like [`generate`](Self::generate), but returns a lazy event stream.
    /// Dropping the stream aborts the underlying request.
    async fn stream(&self, model: &str, messages: Vec<Message>, options: CallOptions)
    -> crate::Result<StreamResponse>;
}

/// Build a provider for a configured endpoint, dispatching on its protocol.
pub fn from_config(name: &str, config: &config::ProviderConfig) -> crate::Result<Box<dyn Provider>> {
    match config.protocol {
        config::ProviderProtocol::Anthropic => Ok(Box::new(AnthropicProvider::new(name.to_string(), config.clone())?)),
        config::ProviderProtocol::Openai => Ok(Box::new(OpenAiProvider::new(name.to_string(), config.clone())?)),
    }
}
