use serde::Deserialize;

use crate::error::LLMError;

/// Classifies a non-2xx Messages response.
///
/// Anthropic wraps failures in `{"type":"error","error":{type, message}}`.
pub(crate) fn parse_anthropic_error(status: u16, body: &str) -> LLMError {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<InnerError>,
    }

    #[derive(Deserialize)]
    struct InnerError {
        #[serde(rename = "type")]
        kind: Option<String>,
        message: Option<String>,
    }

    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if let Some(error) = parsed.error {
            let mut message = error.message.unwrap_or_else(|| "unknown error".to_string());
            if let Some(kind) = error.kind {
                if !kind.is_empty() {
                    message = format!("{message} ({kind})");
                }
            }
            return LLMError::transport_status(status, message);
        }
    }

    LLMError::transport_status(status, body.trim().to_string())
}
