use serde::Deserialize;

use crate::error::LLMError;

/// Classifies a non-2xx GenerateContent response.
///
/// Google wraps failures in an `{"error": {code, message, status}}` envelope
/// with RPC status names; the name is appended to the message so diagnostics
/// keep both vocabularies.
pub(crate) fn parse_gemini_error(status: u16, body: &str) -> LLMError {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<InnerError>,
    }

    #[derive(Deserialize)]
    struct InnerError {
        message: Option<String>,
        status: Option<String>,
    }

    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if let Some(error) = parsed.error {
            let mut message = error.message.unwrap_or_else(|| "unknown error".to_string());
            if let Some(status_text) = error.status {
                if !status_text.is_empty() {
                    message = format!("{message} ({status_text})");
                }
            }
            return LLMError::transport_status(status, message);
        }
    }

    LLMError::transport_status(status, body.trim().to_string())
}
