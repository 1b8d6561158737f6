//! Tool and tool-choice encoding for the Responses API, including the
//! hosted built-in tools.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;
use crate::messages::{CallWarning, ProviderDefinedTool, ToolChoice, ToolDefinition};
use crate::schema::translate_object_schema;

/// The tool section of an encoded request.
#[derive(Debug, Default)]
pub(super) struct EncodedTools {
    pub tools: Vec<OpenAiTool>,
    pub tool_choice: Option<OpenAiToolChoice>,
    pub warnings: Vec<CallWarning>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum OpenAiTool {
    Function {
        name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        parameters: Value,
        strict: bool,
    },
    FileSearch {
        vector_store_ids: Vec<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        max_num_results: Option<u32>,
    },
    WebSearchPreview {
        #[serde(skip_serializing_if = "Option::is_none")]
        search_context_size: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        user_location: Option<WebSearchUserLocation>,
    },
    ComputerUsePreview {
        display_width: u32,
        display_height: u32,
        environment: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct WebSearchUserLocation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

/// Tool choice on the wire: a bare mode string, or an object naming either
/// a hosted tool type or a function.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub(crate) enum OpenAiToolChoice {
    Mode(&'static str),
    Hosted {
        #[serde(rename = "type")]
        kind: String,
    },
    Function {
        #[serde(rename = "type")]
        kind: &'static str,
        name: String,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
struct FileSearchArgs {
    #[serde(default)]
    vector_store_ids: Vec<String>,

    #[serde(default)]
    max_num_results: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct WebSearchArgs {
    #[serde(default)]
    search_context_size: Option<String>,

    #[serde(default)]
    user_location: Option<WebSearchUserLocation>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ComputerUseArgs {
    display_width: u32,
    display_height: u32,

    #[serde(default)]
    environment: String,
}

/// Tool names that select a hosted tool rather than a function when used
/// in a `tool` choice.
const HOSTED_TOOL_NAMES: &[&str] = &["file_search", "web_search_preview", "computer_use_preview"];

pub(super) fn encode_tools(
    tools: &[ToolDefinition],
    tool_choice: Option<&ToolChoice>,
    strict: bool,
) -> crate::Result<EncodedTools> {
    let mut encoded = EncodedTools::default();

    if tools.is_empty() && tool_choice.is_none() {
        return Ok(encoded);
    }

    for tool in tools {
        match tool {
            ToolDefinition::Function(function) => {
                let parameters = translate_object_schema(&function.input_schema)?.into_json();
                encoded.tools.push(OpenAiTool::Function {
                    name: function.name.clone(),
                    description: function.description.clone(),
                    parameters,
                    strict,
                });
            }
            ToolDefinition::ProviderDefined(provider_tool) => {
                if let Some(wire_tool) = encode_provider_defined_tool(provider_tool, &mut encoded.warnings)? {
                    encoded.tools.push(wire_tool);
                }
            }
        }
    }

    encoded.tool_choice = tool_choice.map(encode_tool_choice);

    Ok(encoded)
}

fn encode_provider_defined_tool(
    tool: &ProviderDefinedTool,
    warnings: &mut Vec<CallWarning>,
) -> crate::Result<Option<OpenAiTool>> {
    match tool.id.as_str() {
        "openai.file_search" => {
            let args: FileSearchArgs = parse_tool_args(&tool.id, &tool.args)?;

            Ok(Some(OpenAiTool::FileSearch {
                vector_store_ids: args.vector_store_ids,
                max_num_results: args.max_num_results,
            }))
        }
        "openai.web_search_preview" => {
            let args: WebSearchArgs = parse_tool_args(&tool.id, &tool.args)?;

            Ok(Some(OpenAiTool::WebSearchPreview {
                search_context_size: args.search_context_size,
                user_location: args.user_location,
            }))
        }
        "openai.computer_use_preview" => {
            let args: ComputerUseArgs = parse_tool_args(&tool.id, &tool.args)?;

            if args.display_width == 0 || args.display_height == 0 {
                return Err(Error::InvalidRequest(
                    "computer use tool requires positive display dimensions".to_string(),
                ));
            }

            if !matches!(args.environment.as_str(), "mac" | "windows" | "ubuntu" | "browser") {
                return Err(Error::InvalidRequest(format!(
                    "computer use environment must be one of mac, windows, ubuntu, browser; got '{}'",
                    args.environment
                )));
            }

            Ok(Some(OpenAiTool::ComputerUsePreview {
                display_width: args.display_width,
                display_height: args.display_height,
                environment: args.environment,
            }))
        }
        _ => {
            warnings.push(CallWarning::unsupported_tool(ToolDefinition::ProviderDefined(
                tool.clone(),
            )));
            Ok(None)
        }
    }
}

fn encode_tool_choice(choice: &ToolChoice) -> OpenAiToolChoice {
    match choice {
        ToolChoice::Auto => OpenAiToolChoice::Mode("auto"),
        ToolChoice::None => OpenAiToolChoice::Mode("none"),
        ToolChoice::Required => OpenAiToolChoice::Mode("required"),
        ToolChoice::Tool { tool_name } => {
            if HOSTED_TOOL_NAMES.contains(&tool_name.as_str()) {
                OpenAiToolChoice::Hosted {
                    kind: tool_name.clone(),
                }
            } else {
                OpenAiToolChoice::Function {
                    kind: "function",
                    name: tool_name.clone(),
                }
            }
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

#[cfg(test)]
mod tests {
    use insta::assert_json_snapshot;
    use serde_json::json;

    use super::*;
    use crate::messages::FunctionTool;

    fn weather_tool() -> ToolDefinition {
        ToolDefinition::Function(FunctionTool {
            name: "get_weather".into(),
            description: Some("Current weather".into()),
            input_schema: json!({
                "type": "object",
                "properties": {"city": {"type": "string"}},
                "required": ["city"]
            }),
        })
    }

    #[test]
    fn function_tool_carries_the_strict_flag() {
        let encoded = encode_tools(&[weather_tool()], None, true).unwrap();

        assert_json_snapshot!(encoded.tools, @r###"
        [
          {
            "type": "function",
            "name": "get_weather",
            "description": "Current weather",
            "parameters": {
              "type": "object",
              "properties": {
                "city": {
                  "type": "string"
                }
              },
              "required": [
                "city"
              ]
            },
            "strict": true
          }
        ]
        "###);

        let relaxed = encode_tools(&[weather_tool()], None, false).unwrap();
        assert!(matches!(&relaxed.tools[0], OpenAiTool::Function { strict: false, .. }));
    }

    #[test]
    fn builtin_tools_encode_by_namespaced_id() {
        let tools = vec![
            ToolDefinition::ProviderDefined(ProviderDefinedTool {
                id: "openai.file_search".into(),
                name: "file_search".into(),
                args: json!({"vector_store_ids": ["vs_1"], "max_num_results": 5}),
            }),
            ToolDefinition::ProviderDefined(ProviderDefinedTool {
                id: "openai.web_search_preview".into(),
                name: "web_search_preview".into(),
                args: json!({"search_context_size": "high", "user_location": {"city": "Berlin", "country": "DE"}}),
            }),
            ToolDefinition::ProviderDefined(ProviderDefinedTool {
                id: "openai.computer_use_preview".into(),
                name: "computer_use_preview".into(),
                args: json!({"display_width": 1280, "display_height": 800, "environment": "browser"}),
            }),
        ];

        let encoded = encode_tools(&tools, None, true).unwrap();

        assert_json_snapshot!(encoded.tools, @r###"
        [
          {
            "type": "file_search",
            "vector_store_ids": [
              "vs_1"
            ],
            "max_num_results": 5
          },
          {
            "type": "web_search_preview",
            "search_context_size": "high",
            "user_location": {
              "city": "Berlin",
              "country": "DE"
            }
          },
          {
            "type": "computer_use_preview",
            "display_width": 1280,
            "display_height": 800,
            "environment": "browser"
          }
        ]
        "###);
    }

    #[test]
    fn computer_use_validates_geometry_and_environment() {
        let no_geometry = ToolDefinition::ProviderDefined(ProviderDefinedTool {
            id: "openai.computer_use_preview".into(),
            name: "computer_use_preview".into(),
            args: json!({"environment": "browser"}),
        });
        assert!(encode_tools(&[no_geometry], None, true).is_err());

        let bad_env = ToolDefinition::ProviderDefined(ProviderDefinedTool {
            id: "openai.computer_use_preview".into(),
            name: "computer_use_preview".into(),
            args: json!({"display_width": 100, "display_height": 100, "environment": "amiga"}),
        });
        assert!(encode_tools(&[bad_env], None, true).is_err());
    }

    #[test]
    fn unknown_builtin_id_warns_and_is_dropped() {
        let alien = ToolDefinition::ProviderDefined(ProviderDefinedTool {
            id: "anthropic.bash".into(),
            name: "bash".into(),
            args: Value::Null,
        });

        let encoded = encode_tools(&[weather_tool(), alien], None, true).unwrap();
        assert_eq!(encoded.tools.len(), 1);
        assert!(matches!(&encoded.warnings[0], CallWarning::UnsupportedTool { .. }));
    }

    #[test]
    fn tool_choice_distinguishes_hosted_tools_from_functions() {
        let choices = [
            encode_tool_choice(&ToolChoice::Auto),
            encode_tool_choice(&ToolChoice::None),
            encode_tool_choice(&ToolChoice::Required),
            encode_tool_choice(&ToolChoice::Tool {
                tool_name: "web_search_preview".into(),
            }),
            encode_tool_choice(&ToolChoice::Tool {
                tool_name: "get_weather".into(),
            }),
        ];

        assert_json_snapshot!(choices, @r###"
        [
          "auto",
          "none",
          "required",
          {
            "type": "web_search_preview"
          },
          {
            "type": "function",
            "name": "get_weather"
          }
        ]
        "###);
    }
}
