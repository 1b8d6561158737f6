//! Configuration for LLM provider endpoints, loaded from TOML.

mod error;
mod loader;

use std::collections::BTreeMap;
use std::path::Path;

use secrecy::SecretString;
use serde::Deserialize;

pub use error::Error;

pub(crate) type Result<T> = std::result::Result<T, error::Error>;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Configured provider endpoints, keyed by the caller-facing name.
    #[serde(default)]
    pub providers: BTreeMap<String, ProviderConfig>,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> crate::Result<Config> {
        loader::load(path)
    }
}

/// One vendor endpoint: which wire protocol it speaks, how to authenticate,
/// and optional per-model overrides.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    pub protocol: ProviderProtocol,

    pub api_key: SecretString,

    /// Override for the vendor's default API URL, e.g. for a compatible
    /// proxy. No trailing slash.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Extra headers sent with every request to this provider.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Per-model settings, keyed by the caller-facing model name.
    #[serde(default)]
    pub models: BTreeMap<String, ModelConfig>,
}

impl ProviderConfig {
    /// Map a caller-facing model name to the name the vendor knows.
    /// Unconfigured models pass through unchanged.
    pub fn resolve_model(&self, model: &str) -> String {
        self.models
            .get(model)
            .and_then(|config| config.rename.clone())
            .unwrap_or_else(|| model.to_string())
    }
}

/// The wire protocol a provider endpoint speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderProtocol {
    Anthropic,
    Openai,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    /// The actual vendor model name, when it differs from the configured
    /// alias.
    #[serde(default)]
    pub rename: Option<String>,
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn full_provider_configuration() {
        let config = indoc! {r#"
            [providers.anthropic]
            protocol = "anthropic"
            api_key = "sk-ant-test"
            base_url = "http://localhost:8080/v1"

            [providers.anthropic.headers]
            x-team = "platform"

            [providers.anthropic.models.workspace-sonnet]
            rename = "claude-sonnet-4"

            [providers.openai]
            protocol = "openai"
            api_key = "sk-test"
        "#};

        let config: Config = toml::from_str(config).unwrap();

        let anthropic = &config.providers["anthropic"];
        assert_eq!(anthropic.protocol, ProviderProtocol::Anthropic);
        assert_eq!(anthropic.api_key.expose_secret(), "sk-ant-test");
        assert_eq!(anthropic.base_url.as_deref(), Some("http://localhost:8080/v1"));
        assert_eq!(anthropic.headers["x-team"], "platform");
        assert_eq!(anthropic.resolve_model("workspace-sonnet"), "claude-sonnet-4");
        assert_eq!(anthropic.resolve_model("claude-opus-4"), "claude-opus-4");

        let openai = &config.providers["openai"];
        assert_eq!(openai.protocol, ProviderProtocol::Openai);
        assert!(openai.base_url.is_none());
        assert!(openai.models.is_empty());
    }

    #[test]
    fn empty_configuration_has_no_providers() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.providers.is_empty());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let config = indoc! {r#"
            [providers.openai]
            protocol = "openai"
            api_key = "sk-test"
            api_version = "2024-01-01"
        "#};

        let error = toml::from_str::<Config>(config).unwrap_err();
        assert!(error.to_string().contains("api_version"));
    }

    #[test]
    fn missing_api_key_is_rejected() {
        let config = indoc! {r#"
            [providers.openai]
            protocol = "openai"
        "#};

        assert!(toml::from_str::<Config>(config).is_err());
    }
}
