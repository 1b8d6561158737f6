use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while encoding prompts, decoding vendor payloads, or
/// talking to a provider.
///
/// Validation failures are raised before any network I/O; upstream API
/// failures are passed through with their original status and message.
#[derive(Debug, Error)]
pub enum Error {
    /// The unified prompt violates a structural invariant, for example an
    /// image block carrying both a URL and inline data, or a tool result
    /// without a tool call ID.
    #[error("Invalid prompt: {0}")]
    InvalidPrompt(String),

    /// The requested capability has no representation on this provider and
    /// cannot be degraded to a warning.
    #[error("'{functionality}' is not supported by {provider}")]
    UnsupportedFunctionality { provider: &'static str, functionality: String },

    /// A tool input schema the provider cannot express, such as a non-object
    /// or union-typed schema.
    #[error("Invalid tool schema: {0}")]
    InvalidToolSchema(String),

    /// A vendor payload that is not valid JSON, or does not match the wire
    /// shape we expect. The raw payload is retained for debugging.
    #[error("Failed to parse {provider} response: {message}")]
    ResponseParse {
        provider: &'static str,
        message: String,
        raw: String,
    },

    /// The vendor returned a success status with no usable body.
    #[error("{0} returned an empty response")]
    EmptyResponse(&'static str),

    /// A malformed or out-of-order server-sent event in a vendor stream.
    #[error("Stream protocol error: {0}")]
    StreamProtocol(String),

    /// Authentication failed (missing or invalid API key).
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Insufficient quota or credits.
    #[error("Insufficient quota: {0}")]
    InsufficientQuota(String),

    /// Model not found at the provider.
    #[error("{0}")]
    ModelNotFound(String),

    /// Rate limit exceeded.
    #[error("Rate limit exceeded: {message}")]
    RateLimitExceeded { message: String },

    /// The provider rejected the request as malformed.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Provider API returned an error we have no specific mapping for.
    #[error("Provider API error ({status}): {message}")]
    ProviderApiError { status: u16, message: String },

    /// Network or connection error.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Internal error. If `Some(message)`, it came from a provider and can
    /// be shown; if `None`, details should not leak to API consumers.
    #[error("Internal error")]
    Internal(Option<String>),
}

impl Error {
    pub(crate) fn invalid_prompt(message: impl Into<String>) -> Self {
        Self::InvalidPrompt(message.into())
    }

    pub(crate) fn unsupported(provider: &'static str, functionality: impl Into<String>) -> Self {
        Self::UnsupportedFunctionality {
            provider,
            functionality: functionality.into(),
        }
    }

    pub(crate) fn response_parse(provider: &'static str, error: impl std::fmt::Display, raw: &str) -> Self {
        Self::ResponseParse {
            provider,
            message: error.to_string(),
            raw: raw.to_string(),
        }
    }

    /// Map a non-success provider HTTP status onto the error taxonomy.
    pub(crate) fn from_status(status: u16, message: String) -> Self {
        match status {
            400 => Self::InvalidRequest(message),
            401 => Self::AuthenticationFailed(message),
            403 => Self::InsufficientQuota(message),
            404 => Self::ModelNotFound(message),
            429 => Self::RateLimitExceeded { message },
            500 => Self::Internal(Some(message)),
            _ => Self::ProviderApiError { status, message },
        }
    }

    /// Machine-readable error kind, stable across message changes.
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::InvalidPrompt(_) | Self::InvalidToolSchema(_) | Self::InvalidRequest(_) => "invalid_request_error",
            Self::UnsupportedFunctionality { .. } => "unsupported_functionality",
            Self::ResponseParse { .. } | Self::EmptyResponse(_) | Self::StreamProtocol(_) => "decode_error",
            Self::AuthenticationFailed(_) => "authentication_error",
            Self::InsufficientQuota(_) => "insufficient_quota",
            Self::ModelNotFound(_) => "not_found_error",
            Self::RateLimitExceeded { .. } => "rate_limit_error",
            Self::ConnectionError(_) | Self::ProviderApiError { .. } => "api_error",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Message that is safe to expose to API consumers.
    pub fn client_message(&self) -> String {
        match self {
            Self::Internal(Some(provider_msg)) => provider_msg.clone(),
            Self::Internal(None) => "Internal error".to_string(),
            Self::ResponseParse { provider, message, .. } => {
                format!("Failed to parse {provider} response: {message}")
            }
            _ => self.to_string(),
        }
    }
}
