use serde_json::Value;
use tracing::warn;

use crate::error::LLMError;
use crate::types::{CompletionReason, QueryResponse};

use super::types::GeminiGenerateContentResponse;

pub(crate) fn map_response(raw: Value, provider: &'static str) -> Result<QueryResponse, LLMError> {
    let parsed: GeminiGenerateContentResponse =
        serde_json::from_value(raw.clone()).map_err(|err| LLMError::Transport {
            status: None,
            message: format!("{provider}: failed to parse response: {err}"),
        })?;

    let mut text = String::new();
    for candidate in &parsed.candidates {
        if let Some(content) = &candidate.content {
            for part in &content.parts {
                if let Some(fragment) = &part.text {
                    text.push_str(fragment);
                }
            }
        }
        if !text.is_empty() {
            break;
        }
    }

    if text.is_empty() {
        warn!(provider, "response contained no text parts");
    }

    let completion_reason = parsed
        .candidates
        .iter()
        .find_map(|candidate| candidate.finish_reason.as_deref().map(convert_finish_reason))
        .unwrap_or(CompletionReason::Unknown);

    Ok(QueryResponse {
        text,
        raw,
        completion_reason,
        provider,
    })
}

/// Gemini reports finish reasons as SCREAMING_SNAKE enum names.
pub(crate) fn convert_finish_reason(reason: &str) -> CompletionReason {
    match reason {
        "STOP" => CompletionReason::Stop,
        "MAX_TOKENS" => CompletionReason::LengthLimited,
        "SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" | "SPII" => {
            CompletionReason::ContentFiltered
        }
        _ => CompletionReason::Unknown,
    }
}
