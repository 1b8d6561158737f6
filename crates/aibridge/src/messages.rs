//! The vendor-neutral conversation model and its normalization pass.

pub mod content;
pub mod merge;
pub mod metadata;
pub mod options;
pub mod response;
pub mod stream;

pub use content::{
    AssistantMessage, ContentBlock, FileBlock, ImageBlock, MediaSource, Message, ReasoningBlock,
    RedactedReasoningBlock, Role, SourceBlock, SystemMessage, TextBlock, ToolCallBlock, ToolMessage, ToolResultBlock,
    UserMessage,
};
pub use merge::merge_messages;
pub use metadata::ProviderMetadata;
pub use options::{CallOptions, FunctionTool, ProviderDefinedTool, ResponseFormat, ToolChoice, ToolDefinition};
pub use response::{CallWarning, FinishReason, Response, Usage};
pub use stream::{EventStream, StreamEvent, StreamResponse};
