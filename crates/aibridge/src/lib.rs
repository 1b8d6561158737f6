//! Provider-agnostic LLM conversations.
//!
//! The crate is split along a single seam: a vendor-neutral conversation
//! model ([`messages`]) and per-vendor codecs behind the [`Provider`]
//! trait ([`provider`]). Callers build [`Message`]s and [`CallOptions`]
//! once and run them against any configured vendor; vendor-specific knobs
//! travel through namespaced [`ProviderMetadata`] bags instead of leaking
//! into the core types.
//!
//! ```no_run
//! use aibridge::{CallOptions, ContentBlock, Message, provider};
//!
//! # async fn demo(config: &config::ProviderConfig) -> aibridge::Result<()> {
//! let provider = provider::from_config("anthropic", config)?;
//!
//! let response = provider
//!     .generate(
//!         "claude-sonnet-4",
//!         vec![Message::user(vec![ContentBlock::text("Hello!")])],
//!         CallOptions::default(),
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod messages;
pub mod provider;
mod schema;

pub use error::{Error, Result};
pub use messages::{
    CallOptions, CallWarning, ContentBlock, EventStream, FinishReason, Message, ProviderMetadata, Response,
    StreamEvent, StreamResponse, ToolChoice, ToolDefinition, Usage, merge_messages,
};
pub use provider::{Provider, from_config};
