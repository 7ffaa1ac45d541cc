use std::sync::Arc;

mod completions;
mod provider;
mod wire;

pub use completions::{CHAT_COMPLETIONS_PROVIDER_NAME, ChatCompletionsProvider};
pub use provider::{
    CompletionRequest, DEFAULT_API_KEY, DEFAULT_BASE_URL, DEFAULT_MAX_TOKENS, DEFAULT_MODEL_NAME,
    DEFAULT_REQUEST_TIMEOUT, DEFAULT_TEMPERATURE, LlmProvider, ProviderConfig, ProviderError,
    ProviderMessage, ProviderResult, Role,
};

pub fn create_provider(config: &ProviderConfig) -> ProviderResult<Arc<dyn LlmProvider>> {
    Ok(Arc::new(ChatCompletionsProvider::new(config)?))
}
