use std::env;

use dotenvy::dotenv;
use futures_util::StreamExt;

use naisho::http::reqwest::default_dyn_transport;
use naisho::{CompletionReason, LLMClient, ProviderConfig, QueryRequest, StreamOptions};

fn build_client_from_env() -> Option<(LLMClient, String)> {
    let Some(api_key) = load_env_var("OPENAI_CHAT_KEY") else {
        eprintln!("skip live test: OPENAI_CHAT_KEY missing");
        return None;
    };
    let model = load_env_var("OPENAI_CHAT_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string());

    let transport = default_dyn_transport().expect("transport");
    let mut config = ProviderConfig::openai(api_key).with_model(model.clone());
    if let Some(endpoint) = load_env_var("OPENAI_CHAT_ENDPOINT") {
        config = config.with_base_url(endpoint);
    }
    let client = LLMClient::builder()
        .with_provider(config)
        .with_transport(transport)
        .build()
        .expect("client");
    Some((client, model))
}

fn load_env_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

#[tokio::test]
#[ignore = "requires valid OpenAI-compatible endpoint"]
async fn openai_live_query_and_stream_agree() {
    dotenv().ok();
    let Some((client, _model)) = build_client_from_env() else {
        return;
    };

    let mut request = QueryRequest::prompt("Introduce the Rust language in one sentence.");
    request.system_instruction = Some("You are a helpful assistant.".to_string());

    let response = client
        .query("openai", request.clone())
        .await
        .expect("query should succeed");
    assert!(!response.text.is_empty(), "response should contain text");
    assert_eq!(response.completion_reason, CompletionReason::Stop);

    let deltas: Vec<String> = client
        .stream("openai", request, StreamOptions::default())
        .await
        .expect("stream should open")
        .map(|item| item.expect("delta"))
        .collect()
        .await;
    assert!(!deltas.is_empty(), "stream should yield deltas");
}
