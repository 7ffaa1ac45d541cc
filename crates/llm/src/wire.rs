//! JSON shapes of the chat-completions endpoint.

use serde::{Deserialize, Serialize};

use super::provider::{CompletionRequest, Role};

#[derive(Debug, Serialize)]
pub(crate) struct ChatCompletionPayload<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    stream: bool,
    temperature: f64,
    max_tokens: u64,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: Role,
    content: &'a str,
}

impl<'a> ChatCompletionPayload<'a> {
    pub(crate) fn new(model: &'a str, request: &'a CompletionRequest) -> Self {
        Self {
            model,
            messages: request
                .messages
                .iter()
                .map(|message| WireMessage {
                    role: message.role,
                    content: &message.content,
                })
                .collect(),
            stream: false,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        }
    }
}

// A missing or null `choices` still decodes, so the caller reports an empty
// response instead of a format error.
#[derive(Debug, Deserialize)]
pub(crate) struct ChatCompletionResponse {
    #[serde(default)]
    pub(crate) id: Option<String>,
    #[serde(default)]
    pub(crate) model: Option<String>,
    #[serde(default)]
    choices: Option<Vec<ChatCompletionChoice>>,
}

impl ChatCompletionResponse {
    pub(crate) fn into_first_choice(self) -> Option<ChatCompletionChoice> {
        self.choices.unwrap_or_default().into_iter().next()
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatCompletionChoice {
    pub(crate) message: ChoiceMessage,
    #[serde(default)]
    pub(crate) finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChoiceMessage {
    #[serde(default)]
    pub(crate) content: Option<String>,
}
