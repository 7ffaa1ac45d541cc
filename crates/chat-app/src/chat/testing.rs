//! Scripted `LlmProvider` double for controller tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use futures::FutureExt;
use futures::future::BoxFuture;
use murmur_llm::{CompletionRequest, LlmProvider, ProviderError, ProviderResult};
use tokio::sync::Semaphore;

/// Replies with queued results in order and records every request.
///
/// A gated provider holds each call until a permit is added, keeping the turn
/// in flight for as long as a test needs.
pub(crate) struct ScriptedProvider {
    replies: Mutex<VecDeque<ProviderResult<String>>>,
    requests: Mutex<Vec<CompletionRequest>>,
    gate: Option<Arc<Semaphore>>,
}

impl ScriptedProvider {
    pub(crate) fn replying(replies: Vec<ProviderResult<String>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::default(),
            gate: None,
        })
    }

    pub(crate) fn gated(replies: Vec<ProviderResult<String>>, gate: Arc<Semaphore>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::default(),
            gate: Some(gate),
        })
    }

    pub(crate) fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model_name(&self) -> &str {
        "scripted-model"
    }

    fn complete(&self, request: CompletionRequest) -> BoxFuture<'_, ProviderResult<String>> {
        async move {
            self.requests.lock().unwrap().push(request);
            if let Some(gate) = &self.gate {
                gate.acquire().await.expect("gate stays open").forget();
            }
            let reply = self.replies.lock().unwrap().pop_front();
            reply.unwrap_or_else(|| Ok(String::new()))
        }
        .boxed()
    }
}

/// Panics from inside the completion future.
pub(crate) struct PanickingProvider {
    pub(crate) message: &'static str,
}

impl LlmProvider for PanickingProvider {
    fn name(&self) -> &str {
        "panicking"
    }

    fn model_name(&self) -> &str {
        "panicking-model"
    }

    fn complete(&self, _request: CompletionRequest) -> BoxFuture<'_, ProviderResult<String>> {
        async move { explode(self.message) }.boxed()
    }
}

fn explode(message: &str) -> ProviderResult<String> {
    panic!("{message}")
}

/// What the transport reports when the endpoint returns a non-JSON body.
pub(crate) fn malformed_body_error() -> ProviderError {
    let source = serde_json::from_str::<serde_json::Value>("<html>oops</html>")
        .expect_err("html is not json");
    ProviderError::InvalidFormat {
        stage: "decode-response",
        source,
    }
}
