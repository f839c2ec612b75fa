use serde_json::Value;

use crate::error::LLMError;
use crate::types::{CompletionReason, QueryResponse};

use super::types::AnthropicMessageResponse;

pub(crate) fn map_response(raw: Value, provider: &'static str) -> Result<QueryResponse, LLMError> {
    let parsed: AnthropicMessageResponse =
        serde_json::from_value(raw.clone()).map_err(|err| LLMError::Transport {
            status: None,
            message: format!("{provider}: failed to parse response: {err}"),
        })?;

    let mut text = String::new();
    for block in &parsed.content {
        if block.kind == "text" {
            if let Some(fragment) = &block.text {
                text.push_str(fragment);
            }
        }
    }

    let completion_reason = parsed
        .stop_reason
        .as_deref()
        .map(convert_stop_reason)
        .unwrap_or(CompletionReason::Unknown);

    Ok(QueryResponse {
        text,
        raw,
        completion_reason,
        provider,
    })
}

pub(crate) fn convert_stop_reason(reason: &str) -> CompletionReason {
    match reason {
        "end_turn" | "stop_sequence" => CompletionReason::Stop,
        "max_tokens" => CompletionReason::LengthLimited,
        "refusal" => CompletionReason::ContentFiltered,
        _ => CompletionReason::Unknown,
    }
}
