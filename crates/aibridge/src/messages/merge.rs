//! Same-role run merging, the normalization pass every vendor encoder runs
//! before translating a prompt.
//!
//! Vendors reject or mangle conversations with consecutive same-role turns,
//! so each maximal run of equal-role messages collapses into one message.
//! The pass is pure and idempotent; on input that is already merge-maximal
//! it is the identity.

use super::content::{ContentBlock, Message, Role, SystemMessage, ToolMessage, UserMessage};
use super::metadata::ProviderMetadata;

/// Merge every maximal run of same-role messages into a single message.
///
/// Merge rules per role:
/// - **system**: contents are joined with `"\n"`; the merged message keeps
///   the *last* message's metadata. Earlier metadata is discarded, which is
///   a documented policy rather than an accident.
/// - **user / assistant**: content block lists are concatenated in order.
///   Per-block metadata is untouched, except that the last block of the run
///   inherits the last message's message-level metadata when the block has
///   none of its own. Message-level intent would otherwise be lost in the
///   merge.
/// - **tool**: the same rule, applied to the tool-result list.
///
/// A run of length one passes through without any merge processing.
pub fn merge_messages(messages: Vec<Message>) -> Vec<Message> {
    let mut merged = Vec::with_capacity(messages.len());
    let mut iter = messages.into_iter().peekable();

    while let Some(first) = iter.next() {
        let role = first.role();
        let mut run = vec![first];

        while let Some(next) = iter.next_if(|m| m.role() == role) {
            run.push(next);
        }

        merged.push(merge_run(role, run));
    }

    merged
}

fn merge_run(role: Role, mut run: Vec<Message>) -> Message {
    if run.len() == 1 {
        return run.remove(0);
    }

    match role {
        Role::System => merge_system_run(run),
        Role::User => {
            let (content, provider_metadata) = merge_blocks(run.into_iter().filter_map(|message| match message {
                Message::User(user) => Some((user.content, user.provider_metadata)),
                _ => None,
            }));
            Message::User(UserMessage {
                content,
                provider_metadata,
            })
        }
        Role::Assistant => {
            let (content, provider_metadata) = merge_blocks(run.into_iter().filter_map(|message| match message {
                Message::Assistant(assistant) => Some((assistant.content, assistant.provider_metadata)),
                _ => None,
            }));
            Message::assistant(content).with_metadata(provider_metadata)
        }
        Role::Tool => merge_tool_run(run),
    }
}

fn merge_system_run(run: Vec<Message>) -> Message {
    let mut content = String::new();
    let mut provider_metadata = ProviderMetadata::new();

    for (i, message) in run.into_iter().enumerate() {
        let Message::System(system) = message else {
            continue;
        };

        if i > 0 {
            content.push('\n');
        }

        content.push_str(&system.content);
        provider_metadata = system.provider_metadata;
    }

    Message::System(SystemMessage {
        content,
        provider_metadata,
    })
}

/// Concatenate block lists and back-fill the run's final block with the last
/// message-level metadata when that block carries none of its own.
fn merge_blocks(
    parts: impl Iterator<Item = (Vec<ContentBlock>, ProviderMetadata)>,
) -> (Vec<ContentBlock>, ProviderMetadata) {
    let mut content = Vec::new();
    let mut provider_metadata = ProviderMetadata::new();

    for (blocks, metadata) in parts {
        content.extend(blocks);
        provider_metadata = metadata;
    }

    if let Some(last) = content.last_mut()
        && last.provider_metadata().is_empty()
        && !provider_metadata.is_empty()
    {
        *last.provider_metadata_mut() = provider_metadata.clone();
    }

    (content, provider_metadata)
}

fn merge_tool_run(run: Vec<Message>) -> Message {
    let mut content = Vec::new();
    let mut provider_metadata = ProviderMetadata::new();

    for message in run {
        let Message::Tool(tool) = message else {
            continue;
        };

        content.extend(tool.content);
        provider_metadata = tool.provider_metadata;
    }

    if let Some(last) = content.last_mut()
        && last.provider_metadata.is_empty()
        && !provider_metadata.is_empty()
    {
        last.provider_metadata = provider_metadata.clone();
    }

    Message::Tool(ToolMessage {
        content,
        provider_metadata,
    })
}

impl Message {
    fn with_metadata(mut self, metadata: ProviderMetadata) -> Self {
        match &mut self {
            Self::System(m) => m.provider_metadata = metadata,
            Self::User(m) => m.provider_metadata = metadata,
            Self::Assistant(m) => m.provider_metadata = metadata,
            Self::Tool(m) => m.provider_metadata = metadata,
        }
        self
    }
}
