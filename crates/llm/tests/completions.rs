//! Exercises `ChatCompletionsProvider` against a real local axum endpoint.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::http::{HeaderMap, StatusCode, header};
use axum::routing::post;
use murmur_llm::{
    ChatCompletionsProvider, CompletionRequest, LlmProvider, ProviderConfig, ProviderError,
    ProviderMessage, Role,
};
use serde_json::{Value, json};
use tokio::net::TcpListener;

const COMPLETIONS_PATH: &str = "/api/v1/chat/completions";

#[derive(Debug, Clone)]
struct CapturedRequest {
    authorization: Option<String>,
    content_type: Option<String>,
    body: Value,
}

#[derive(Clone)]
struct ScriptedReply {
    status: StatusCode,
    body: &'static str,
    delay: Duration,
}

impl ScriptedReply {
    fn ok(body: &'static str) -> Self {
        Self {
            status: StatusCode::OK,
            body,
            delay: Duration::ZERO,
        }
    }
}

type Captured = Arc<Mutex<Vec<CapturedRequest>>>;

/// Bind to 127.0.0.1:0 and serve one scripted completions route.
async fn start_endpoint(reply: ScriptedReply) -> (String, Captured) {
    let captured: Captured = Arc::default();
    let sink = captured.clone();

    let app = Router::new().route(
        COMPLETIONS_PATH,
        post(move |headers: HeaderMap, body: String| {
            let sink = sink.clone();
            let reply = reply.clone();
            async move {
                let header_value = |name: header::HeaderName| {
                    headers
                        .get(name)
                        .and_then(|value| value.to_str().ok())
                        .map(str::to_string)
                };
                sink.lock().unwrap().push(CapturedRequest {
                    authorization: header_value(header::AUTHORIZATION),
                    content_type: header_value(header::CONTENT_TYPE),
                    body: serde_json::from_str(&body).unwrap_or(Value::Null),
                });

                if !reply.delay.is_zero() {
                    tokio::time::sleep(reply.delay).await;
                }

                (
                    reply.status,
                    [(header::CONTENT_TYPE, "application/json")],
                    reply.body,
                )
            }
        }),
    );

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind to port 0");
    let addr: SocketAddr = listener.local_addr().expect("get local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    (format!("http://{addr}{COMPLETIONS_PATH}"), captured)
}

fn provider_for(url: &str) -> ChatCompletionsProvider {
    let config = ProviderConfig::new(url, "test-key", "deepseek/deepseek-r1:free");
    ChatCompletionsProvider::new(&config).expect("client builds")
}

fn hello_request() -> CompletionRequest {
    CompletionRequest::new(vec![
        ProviderMessage::new(Role::Assistant, "Hello! How can I help you today?"),
        ProviderMessage::new(Role::User, "Hello"),
    ])
}

#[tokio::test]
async fn success_returns_first_choice_and_sends_expected_request() {
    let (url, captured) = start_endpoint(ScriptedReply::ok(
        r#"{
            "id": "gen-1",
            "model": "deepseek/deepseek-r1:free",
            "choices": [
                {"message": {"role": "assistant", "content": "Hi there!"}, "finish_reason": "stop"},
                {"message": {"role": "assistant", "content": "ignored"}, "finish_reason": "stop"}
            ]
        }"#,
    ))
    .await;

    let reply = provider_for(&url)
        .complete(hello_request())
        .await
        .expect("completion succeeds");
    assert_eq!(reply, "Hi there!");

    let requests = captured.lock().unwrap().clone();
    assert_eq!(requests.len(), 1, "exactly one POST per call");
    let request = &requests[0];
    assert_eq!(request.authorization.as_deref(), Some("Bearer test-key"));
    assert_eq!(request.content_type.as_deref(), Some("application/json"));
    assert_eq!(
        request.body,
        json!({
            "model": "deepseek/deepseek-r1:free",
            "messages": [
                {"role": "assistant", "content": "Hello! How can I help you today?"},
                {"role": "user", "content": "Hello"}
            ],
            "stream": false,
            "temperature": 0.7,
            "max_tokens": 1000
        })
    );
}

#[tokio::test]
async fn content_is_returned_verbatim() {
    let (url, _) = start_endpoint(ScriptedReply::ok(
        r#"{"choices":[{"message":{"role":"assistant","content":"  **bold**\n\n"}}]}"#,
    ))
    .await;

    let reply = provider_for(&url)
        .complete(hello_request())
        .await
        .expect("completion succeeds");
    assert_eq!(reply, "  **bold**\n\n");
}

#[tokio::test]
async fn malformed_body_is_an_invalid_format_error() {
    let (url, _) = start_endpoint(ScriptedReply::ok("<html>not json</html>")).await;

    let error = provider_for(&url)
        .complete(hello_request())
        .await
        .expect_err("malformed body fails");
    assert!(
        matches!(error, ProviderError::InvalidFormat { stage: "decode-response", .. }),
        "unexpected error: {error:?}"
    );
}

#[tokio::test]
async fn missing_choices_is_an_empty_response_api_error() {
    for body in [
        r#"{"id":"gen-2","model":"m","choices":[]}"#,
        r#"{"id":"gen-3","model":"m"}"#,
        r#"{"id":"gen-4","model":"m","choices":null}"#,
    ] {
        let (url, _) = start_endpoint(ScriptedReply::ok(body)).await;

        let error = provider_for(&url)
            .complete(hello_request())
            .await
            .expect_err("no choices fails");
        match error {
            ProviderError::Api { detail, .. } => assert_eq!(detail, "empty response"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}

#[tokio::test]
async fn error_status_is_an_api_error_with_body() {
    let (url, captured) = start_endpoint(ScriptedReply {
        status: StatusCode::UNAUTHORIZED,
        body: r#"{"error":{"message":"No auth credentials found"}}"#,
        delay: Duration::ZERO,
    })
    .await;

    let error = provider_for(&url)
        .complete(hello_request())
        .await
        .expect_err("401 fails");
    match error {
        ProviderError::Api { detail, .. } => {
            assert!(detail.starts_with("status 401"), "detail: {detail}");
            assert!(detail.contains("No auth credentials found"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(captured.lock().unwrap().len(), 1, "no automatic retry");
}

#[tokio::test]
async fn unreachable_endpoint_is_a_network_error() {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind to port 0");
    let addr = listener.local_addr().expect("get local addr");
    drop(listener);

    let error = provider_for(&format!("http://{addr}{COMPLETIONS_PATH}"))
        .complete(hello_request())
        .await
        .expect_err("connection refused");
    assert!(
        matches!(error, ProviderError::Network { .. }),
        "unexpected error: {error:?}"
    );
}

#[tokio::test]
async fn slow_endpoint_times_out_as_a_network_error() {
    let (url, _) = start_endpoint(ScriptedReply {
        status: StatusCode::OK,
        body: r#"{"choices":[{"message":{"content":"late"}}]}"#,
        delay: Duration::from_millis(500),
    })
    .await;

    let config = ProviderConfig::new(&url, "test-key", "m")
        .with_request_timeout(Duration::from_millis(50));
    let provider = ChatCompletionsProvider::new(&config).expect("client builds");

    let error = provider
        .complete(hello_request())
        .await
        .expect_err("request times out");
    assert!(
        matches!(error, ProviderError::Network { .. }),
        "unexpected error: {error:?}"
    );
}
