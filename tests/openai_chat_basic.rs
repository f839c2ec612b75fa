use std::sync::Arc;

use futures_util::StreamExt;
use serde_json::json;

use naisho::{
    CompletionReason, LLMClient, LLMError, ProviderConfig, QueryRequest, StreamOptions,
};

mod common;
use common::{SseTransport, StaticTransport};

fn openai_client(transport: Arc<dyn naisho::http::HttpTransport>) -> LLMClient {
    LLMClient::builder()
        .with_provider(ProviderConfig::openai("test-key"))
        .with_transport(transport)
        .build()
        .expect("client builds")
}

#[tokio::test]
async fn query_returns_normalized_text_and_reason() {
    let transport = Arc::new(StaticTransport::new(
        200,
        br#"{"choices":[{"message":{"content":"Hello world"},"finish_reason":"stop"}],"model":"gpt-4o-mini"}"#,
    ));
    let client = openai_client(transport.clone());

    let response = client
        .query("openai", QueryRequest::prompt("greet me"))
        .await
        .expect("query succeeds");

    assert_eq!(response.text, "Hello world");
    assert_eq!(response.completion_reason, CompletionReason::Stop);
    assert_eq!(response.provider, "openai_chat");
    assert_eq!(response.raw["model"], json!("gpt-4o-mini"));
}

#[tokio::test]
async fn every_request_carries_the_no_store_header() {
    let transport = Arc::new(StaticTransport::new(
        200,
        br#"{"choices":[{"message":{"content":"ok"},"finish_reason":"stop"}]}"#,
    ));
    let client = openai_client(transport.clone());

    client
        .query("o", QueryRequest::prompt("first"))
        .await
        .expect("query succeeds");
    client
        .query("OpenAI", QueryRequest::prompt("second"))
        .await
        .expect("query succeeds");

    assert_eq!(transport.request_count(), 2);
    for index in 0..2 {
        let headers = transport.request_headers(index);
        assert_eq!(
            headers.get("X-OpenAI-No-Store"),
            Some(&"true".to_string()),
            "request {index} must opt out of retention"
        );
    }
}

#[tokio::test]
async fn request_body_reflects_overrides_and_system_instruction() {
    let transport = Arc::new(StaticTransport::new(
        200,
        br#"{"choices":[{"message":{"content":"ok"},"finish_reason":"stop"}]}"#,
    ));
    let client = openai_client(transport.clone());

    let mut request = QueryRequest::prompt("question");
    request.system_instruction = Some("answer briefly".to_string());
    request.overrides.model = Some("gpt-4o".to_string());
    request.overrides.max_output_tokens = Some(128);
    client.query("openai", request).await.expect("query succeeds");

    let body = transport.request_body(0);
    assert_eq!(body["model"], json!("gpt-4o"));
    assert_eq!(body["max_completion_tokens"], json!(128));
    assert_eq!(body["messages"][0]["role"], json!("system"));
    assert_eq!(body["messages"][1]["role"], json!("user"));
}

#[tokio::test]
async fn non_2xx_surfaces_as_transport_with_status_preserved() {
    let transport = Arc::new(StaticTransport::new(
        429,
        br#"{"error":{"message":"Rate limit reached","code":"rate_limit_exceeded"}}"#,
    ));
    let client = openai_client(transport);

    let err = client
        .query("openai", QueryRequest::prompt("hi"))
        .await
        .expect_err("should fail");
    match err {
        LLMError::Transport { status, message } => {
            assert_eq!(status, Some(429));
            assert!(message.contains("Rate limit reached"));
        }
        other => panic!("unexpected error type: {other:?}"),
    }
}

#[tokio::test]
async fn buffered_and_streamed_paths_agree_on_text_and_reason() {
    // Same logical completion delivered both ways.
    let buffered = Arc::new(StaticTransport::new(
        200,
        br#"{"choices":[{"message":{"content":"Hello world"},"finish_reason":"stop"}]}"#,
    ));
    let streamed = Arc::new(SseTransport::new(vec![
        b"data: {\"choices\":[{\"delta\":{\"content\":\"Hello\"}}]}\n\n",
        b"data: {\"choices\":[{\"delta\":{\"content\":\" world\"}}]}\n\n",
        b"data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n",
        b"data: [DONE]\n\n",
    ]));

    let response = openai_client(buffered)
        .query("openai", QueryRequest::prompt("greet me"))
        .await
        .expect("query succeeds");

    let events: Vec<_> = openai_client(streamed)
        .stream_panels(
            "openai",
            QueryRequest::prompt("greet me"),
            StreamOptions::default(),
        )
        .await
        .expect("stream opens")
        .collect()
        .await;

    let terminal = events.last().expect("terminal event");
    match terminal {
        naisho::PanelEvent::Final {
            full_text,
            completion_reason,
            ..
        } => {
            assert_eq!(*full_text, response.text);
            assert_eq!(*completion_reason, response.completion_reason);
        }
        other => panic!("expected final event, got {other:?}"),
    }
}

#[tokio::test]
async fn stream_projection_yields_deltas_in_provider_order() {
    let transport = Arc::new(SseTransport::new(vec![
        b"data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n\n",
        b"data: {\"choices\":[{\"delta\":{\"content\":\"b\"}}]}\n\n",
        b"data: {\"choices\":[{\"delta\":{\"content\":\"c\"},\"finish_reason\":\"stop\"}]}\n\n",
        b"data: [DONE]\n\n",
    ]));
    let client = openai_client(transport);

    let deltas: Vec<String> = client
        .stream("openai", QueryRequest::prompt("hi"), StreamOptions::default())
        .await
        .expect("stream opens")
        .map(|item| item.expect("delta"))
        .collect()
        .await;

    assert_eq!(deltas, vec!["a", "b", "c"]);
}
