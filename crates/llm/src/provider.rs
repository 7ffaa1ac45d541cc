use std::time::Duration;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use snafu::Snafu;

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const DEFAULT_API_KEY: &str = "YOUR_API_KEY";
pub const DEFAULT_MODEL_NAME: &str = "deepseek/deepseek-r1:free";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const DEFAULT_MAX_TOKENS: u64 = 1000;

/// Chat speaker role as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub base_url: String,
    pub api_key: String,
    pub model_name: String,
    pub request_timeout: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL, DEFAULT_API_KEY, DEFAULT_MODEL_NAME)
    }
}

impl ProviderConfig {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model_name: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim().to_string(),
            api_key: api_key.into().trim().to_string(),
            model_name: model_name.into().trim().to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderMessage {
    pub role: Role,
    pub content: String,
}

impl ProviderMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// One whole-response completion call.
///
/// `messages` must already exclude loading placeholders; the provider forwards
/// them 1:1 in order.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub messages: Vec<ProviderMessage>,
    pub temperature: f64,
    pub max_tokens: u64,
}

impl CompletionRequest {
    pub fn new(messages: Vec<ProviderMessage>) -> Self {
        Self {
            messages,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ProviderError {
    #[snafu(display("http client failed on `{stage}`, {source}"))]
    HttpClient {
        stage: &'static str,
        source: reqwest::Error,
    },
    #[snafu(display("invalid payload format on `{stage}`, {source}"))]
    InvalidFormat {
        stage: &'static str,
        source: serde_json::Error,
    },
    #[snafu(display("network request failed on `{stage}`, {source}"))]
    Network {
        stage: &'static str,
        source: reqwest::Error,
    },
    #[snafu(display("completion endpoint error on `{stage}`: {detail}"))]
    Api { stage: &'static str, detail: String },
}

pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &str;
    fn model_name(&self) -> &str;
    /// Performs a single completion attempt. Implementations never retry.
    fn complete(&self, request: CompletionRequest) -> BoxFuture<'_, ProviderResult<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_point_at_openrouter() {
        let config = ProviderConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.api_key, DEFAULT_API_KEY);
        assert_eq!(config.model_name, DEFAULT_MODEL_NAME);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn config_trims_but_never_rejects_values() {
        let config = ProviderConfig::new("  http://localhost:9/x ", " ", "\tm\n");
        assert_eq!(config.base_url, "http://localhost:9/x");
        assert_eq!(config.api_key, "");
        assert_eq!(config.model_name, "m");
    }

    #[test]
    fn completion_request_uses_fixed_sampling_values() {
        let request = CompletionRequest::new(vec![ProviderMessage::new(Role::User, "hi")]);
        assert_eq!(request.temperature, 0.7);
        assert_eq!(request.max_tokens, 1000);
    }
}
