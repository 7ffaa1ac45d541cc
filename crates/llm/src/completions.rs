use futures::FutureExt;
use futures::future::BoxFuture;
use reqwest::header::CONTENT_TYPE;
use snafu::{OptionExt, ResultExt};

use super::provider::{
    ApiSnafu, CompletionRequest, HttpClientSnafu, InvalidFormatSnafu, LlmProvider, NetworkSnafu,
    ProviderConfig, ProviderResult,
};
use super::wire::{ChatCompletionPayload, ChatCompletionResponse};

pub const CHAT_COMPLETIONS_PROVIDER_NAME: &str = "chat-completions";

/// OpenAI-compatible `/chat/completions` client (OpenRouter by default).
pub struct ChatCompletionsProvider {
    config: ProviderConfig,
    client: reqwest::Client,
}

impl ChatCompletionsProvider {
    pub fn new(config: &ProviderConfig) -> ProviderResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context(HttpClientSnafu {
                stage: "build-client",
            })?;

        Ok(Self {
            config: config.clone(),
            client,
        })
    }

    async fn send_completion(&self, request: CompletionRequest) -> ProviderResult<String> {
        let payload = ChatCompletionPayload::new(&self.config.model_name, &request);
        let body = serde_json::to_vec(&payload).context(InvalidFormatSnafu {
            stage: "serialize-request",
        })?;

        tracing::debug!(
            model = %self.config.model_name,
            message_count = request.messages.len(),
            "sending completion request"
        );

        let response = self
            .client
            .post(self.config.base_url.as_str())
            .header(CONTENT_TYPE, "application/json")
            .bearer_auth(&self.config.api_key)
            .body(body)
            .send()
            .await
            .context(NetworkSnafu {
                stage: "send-request",
            })?;

        let status = response.status();
        let payload = response.bytes().await.context(NetworkSnafu {
            stage: "read-response",
        })?;

        if !status.is_success() {
            return ApiSnafu {
                stage: "response-status",
                detail: format!(
                    "status {}: {}",
                    status.as_u16(),
                    String::from_utf8_lossy(&payload)
                ),
            }
            .fail();
        }

        let completion: ChatCompletionResponse =
            serde_json::from_slice(&payload).context(InvalidFormatSnafu {
                stage: "decode-response",
            })?;

        tracing::debug!(
            response_id = ?completion.id,
            response_model = ?completion.model,
            "completion received"
        );

        let choice = completion.into_first_choice().context(ApiSnafu {
            stage: "extract-choice",
            detail: "empty response",
        })?;
        tracing::debug!(finish_reason = ?choice.finish_reason, "using first choice");

        Ok(choice.message.content.unwrap_or_default())
    }
}

impl LlmProvider for ChatCompletionsProvider {
    fn name(&self) -> &str {
        CHAT_COMPLETIONS_PROVIDER_NAME
    }

    fn model_name(&self) -> &str {
        &self.config.model_name
    }

    fn complete(&self, request: CompletionRequest) -> BoxFuture<'_, ProviderResult<String>> {
        self.send_completion(request).boxed()
    }
}
