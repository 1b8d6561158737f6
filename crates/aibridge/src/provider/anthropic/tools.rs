//! Tool and tool-choice encoding for the Messages API, including the
//! computer-use family of built-ins and their beta flags.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;
use crate::messages::{CallWarning, ProviderDefinedTool, ToolChoice, ToolDefinition};
use crate::schema::translate_object_schema;

pub(super) const BETA_COMPUTER_USE_2025_01_24: &str = "computer-use-2025-01-24";
pub(super) const BETA_COMPUTER_USE_2024_10_22: &str = "computer-use-2024-10-22";

/// The tool section of an encoded request: the wire tools, the choice, the
/// betas they require, and any warnings raised while encoding.
#[derive(Debug, Default)]
pub(super) struct EncodedTools {
    pub tools: Vec<AnthropicTool>,
    pub tool_choice: Option<AnthropicToolChoice>,
    pub betas: BTreeSet<String>,
    pub warnings: Vec<CallWarning>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub(crate) enum AnthropicTool {
    /// A user-defined function with a JSON schema.
    Custom(CustomTool),
    /// Computer control, with display geometry.
    Computer(ComputerTool),
    /// Built-ins that only need a versioned type and a fixed name.
    Builtin(BuiltinTool),
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct CustomTool {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub input_schema: Value,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ComputerTool {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub display_width_px: u32,
    pub display_height_px: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_number: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct BuiltinTool {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum AnthropicToolChoice {
    Auto,
    Any,
    Tool { name: String },
}

/// Arguments accepted by the `anthropic.computer` built-in.
#[derive(Debug, Clone, Default, Deserialize)]
struct ComputerToolArgs {
    display_width_px: u32,
    display_height_px: u32,

    #[serde(default)]
    display_number: Option<u32>,

    #[serde(default)]
    version: Option<String>,
}

/// Arguments shared by the versioned built-ins without extra settings.
#[derive(Debug, Clone, Default, Deserialize)]
struct VersionedToolArgs {
    #[serde(default)]
    version: Option<String>,
}

/// Encode the tool list and tool-choice policy.
///
/// A `none` policy has no Messages API representation, so it is simulated:
/// the tool list is dropped entirely while betas and warnings already
/// collected are kept.
pub(super) fn encode_tools(tools: &[ToolDefinition], tool_choice: Option<&ToolChoice>) -> crate::Result<EncodedTools> {
    let mut encoded = EncodedTools::default();

    if tools.is_empty() && tool_choice.is_none() {
        return Ok(encoded);
    }

    for tool in tools {
        match tool {
            ToolDefinition::Function(function) => {
                let input_schema = translate_object_schema(&function.input_schema)?.into_json();
                encoded.tools.push(AnthropicTool::Custom(CustomTool {
                    name: function.name.clone(),
                    description: function.description.clone(),
                    input_schema,
                }));
            }
            ToolDefinition::ProviderDefined(provider_tool) => {
                if let Some(wire_tool) = encode_provider_defined_tool(provider_tool, &mut encoded)? {
                    encoded.tools.push(wire_tool);
                }
            }
        }
    }

    if let Some(ToolChoice::None) = tool_choice {
        // No native "none": drop the tools so the model cannot call any,
        // keeping betas and warnings gathered above.
        encoded.tools.clear();
        encoded.tool_choice = None;
        return Ok(encoded);
    }

    encoded.tool_choice = match tool_choice {
        None => None,
        Some(ToolChoice::Auto) => Some(AnthropicToolChoice::Auto),
        Some(ToolChoice::Required) => Some(AnthropicToolChoice::Any),
        Some(ToolChoice::Tool { tool_name }) => Some(AnthropicToolChoice::Tool {
            name: tool_name.clone(),
        }),
        Some(ToolChoice::None) => None,
    };

    Ok(encoded)
}

/// Dispatch a provider-defined tool by its namespaced ID.
///
/// Unrecognized IDs degrade to an `unsupported-tool` warning and are
/// dropped; a recognized ID with bad arguments is a hard failure.
fn encode_provider_defined_tool(
    tool: &ProviderDefinedTool,
    encoded: &mut EncodedTools,
) -> crate::Result<Option<AnthropicTool>> {
    match tool.id.as_str() {
        "anthropic.computer" => {
            let args: ComputerToolArgs = parse_tool_args(&tool.id, &tool.args)?;
            let version = version_suffix(&tool.id, args.version.as_deref(), encoded)?;

            Ok(Some(AnthropicTool::Computer(ComputerTool {
                kind: format!("computer_{version}"),
                name: "computer".to_string(),
                display_width_px: args.display_width_px,
                display_height_px: args.display_height_px,
                display_number: args.display_number,
            })))
        }
        "anthropic.text_editor" => {
            let args: VersionedToolArgs = parse_tool_args(&tool.id, &tool.args)?;
            let version = version_suffix(&tool.id, args.version.as_deref(), encoded)?;

            Ok(Some(AnthropicTool::Builtin(BuiltinTool {
                kind: format!("text_editor_{version}"),
                name: "str_replace_editor".to_string(),
            })))
        }
        "anthropic.bash" => {
            let args: VersionedToolArgs = parse_tool_args(&tool.id, &tool.args)?;
            let version = version_suffix(&tool.id, args.version.as_deref(), encoded)?;

            Ok(Some(AnthropicTool::Builtin(BuiltinTool {
                kind: format!("bash_{version}"),
                name: "bash".to_string(),
            })))
        }
        _ => {
            encoded
                .warnings
                .push(CallWarning::unsupported_tool(ToolDefinition::ProviderDefined(tool.clone())));
            Ok(None)
        }
    }
}

fn parse_tool_args<T: serde::de::DeserializeOwned + Default>(id: &str, args: &Value) -> crate::Result<T> {
    if args.is_null() {
        return Ok(T::default());
    }

    serde_json::from_value(args.clone())
        .map_err(|e| Error::InvalidRequest(format!("invalid arguments for {id} tool: {e}")))
}

/// Map a built-in tool version onto its type suffix and required beta.
fn version_suffix(id: &str, version: Option<&str>, encoded: &mut EncodedTools) -> crate::Result<&'static str> {
    match version {
        None | Some("") | Some("20250124") => {
            encoded.betas.insert(BETA_COMPUTER_USE_2025_01_24.to_string());
            Ok("20250124")
        }
        Some("20241022") => {
            encoded.betas.insert(BETA_COMPUTER_USE_2024_10_22.to_string());
            Ok("20241022")
        }
        Some(other) => Err(Error::InvalidRequest(format!("unsupported {id} tool version: {other}"))),
    }
}
