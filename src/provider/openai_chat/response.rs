use serde_json::Value;
use tracing::warn;

use crate::error::LLMError;
use crate::types::{CompletionReason, QueryResponse};

use super::types::OpenAiChatResponse;

pub(crate) fn map_response(raw: Value, provider: &'static str) -> Result<QueryResponse, LLMError> {
    let parsed: OpenAiChatResponse =
        serde_json::from_value(raw.clone()).map_err(|err| LLMError::Transport {
            status: None,
            message: format!("{provider}: failed to parse response: {err}"),
        })?;

    let text = parsed
        .choices
        .iter()
        .find_map(|choice| {
            choice
                .message
                .as_ref()
                .and_then(|message| message.content.clone())
                .filter(|content| !content.is_empty())
        })
        .unwrap_or_default();

    if text.is_empty() {
        warn!(provider, "response contained no text content");
    }

    let completion_reason = parsed
        .choices
        .iter()
        .find_map(|choice| choice.finish_reason.as_deref().map(convert_finish_reason))
        .unwrap_or(CompletionReason::Unknown);

    Ok(QueryResponse {
        text,
        raw,
        completion_reason,
        provider,
    })
}

pub(crate) fn convert_finish_reason(reason: &str) -> CompletionReason {
    match reason {
        "stop" => CompletionReason::Stop,
        "length" => CompletionReason::LengthLimited,
        "content_filter" => CompletionReason::ContentFiltered,
        _ => CompletionReason::Unknown,
    }
}
