use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::metadata::ProviderMetadata;

/// Per-call settings shared by every provider.
///
/// Every field is optional; a vendor encoder turns the fields it cannot
/// honor into structured warnings rather than failing the call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallOptions {
    /// Maximum number of tokens to generate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,

    /// Sampling temperature. Set either this or `top_p`, not both.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Nucleus sampling cutoff.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    /// Limit sampling to the top K candidates per token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,

    /// Sequences that stop generation when produced.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop_sequences: Vec<String>,

    /// Seed for deterministic sampling, where the vendor supports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,

    /// Extra HTTP headers for this call. Only meaningful for HTTP providers.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,

    /// Tools the model may invoke, in the order they should be offered.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,

    /// How the model should select a tool. Defaults to `auto`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,

    /// Requested output shape: plain text or JSON, optionally schema-guided.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,

    /// Vendor-specific knobs, keyed by provider namespace.
    #[serde(default, skip_serializing_if = "ProviderMetadata::is_empty")]
    pub provider_metadata: ProviderMetadata,
}

/// A tool offered to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ToolDefinition {
    /// A user-defined function described by a JSON schema.
    Function(FunctionTool),
    /// A vendor built-in, selected by its namespaced ID.
    ProviderDefined(ProviderDefinedTool),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionTool {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// JSON-schema-like description of the arguments object.
    pub input_schema: Value,
}

/// A vendor built-in tool, e.g. computer control or a bash shell.
///
/// `id` is namespaced `"<vendor>.<tool-name>"` and is the sole dispatch key
/// a vendor encoder uses to pick a concrete implementation. IDs a vendor
/// does not recognize degrade to a warning, never a hard failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderDefinedTool {
    pub id: String,
    pub name: String,

    /// Implementation-specific settings, interpreted by the owning vendor.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub args: Value,
}

/// Whether and which tool the model must invoke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolChoice {
    /// The model decides on its own.
    Auto,
    /// The model must not call any tool.
    None,
    /// The model must call some tool.
    Required,
    /// The model must call the named tool.
    Tool { tool_name: String },
}

/// Requested response format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ResponseFormat {
    Text,
    Json {
        /// Optional schema to constrain the output object.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        schema: Option<Value>,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use insta::assert_json_snapshot;
    use serde_json::json;

    use super::*;

    #[test]
    fn tools_deserialize_by_type_discriminant() {
        let wire = json!([
            {
                "type": "function",
                "name": "get_weather",
                "description": "Current weather for a city",
                "input_schema": {"type": "object", "properties": {"city": {"type": "string"}}}
            },
            {
                "type": "provider-defined",
                "id": "anthropic.bash",
                "name": "bash",
                "args": {"version": "20250124"}
            }
        ]);

        let tools: Vec<ToolDefinition> = serde_json::from_value(wire).unwrap();
        assert!(matches!(&tools[0], ToolDefinition::Function(t) if t.name == "get_weather"));
        assert!(matches!(&tools[1], ToolDefinition::ProviderDefined(t) if t.id == "anthropic.bash"));
    }

    #[test]
    fn call_options_round_trip_including_metadata() {
        let mut provider_metadata = ProviderMetadata::new();
        provider_metadata.insert("anthropic", &json!({"thinking": {"enabled": true, "budget_tokens": 2048}}));

        let options = CallOptions {
            max_output_tokens: Some(1024),
            temperature: Some(0.7),
            stop_sequences: vec!["END".into()],
            tool_choice: Some(ToolChoice::Tool {
                tool_name: "get_weather".into(),
            }),
            response_format: Some(ResponseFormat::Json {
                schema: Some(json!({"type": "object"})),
                name: Some("weather".into()),
                description: None,
            }),
            provider_metadata,
            ..Default::default()
        };

        let wire = serde_json::to_string(&options).unwrap();
        let back: CallOptions = serde_json::from_str(&wire).unwrap();
        assert_eq!(back, options);
    }

    #[test]
    fn defaulted_options_serialize_to_an_empty_object() {
        assert_json_snapshot!(CallOptions::default(), @"{}");
    }

    #[test]
    fn tool_choice_wire_shapes() {
        assert_json_snapshot!(
            vec![
                ToolChoice::Auto,
                ToolChoice::None,
                ToolChoice::Required,
                ToolChoice::Tool { tool_name: "search".into() },
            ],
            @r###"
        [
          {
            "type": "auto"
          },
          {
            "type": "none"
          },
          {
            "type": "required"
          },
          {
            "type": "tool",
            "tool_name": "search"
          }
        ]
        "###);
    }
}
