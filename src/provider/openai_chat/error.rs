use serde::Deserialize;

use crate::error::LLMError;

/// Classifies a non-2xx Chat Completions response.
///
/// The upstream message is extracted when the body is the documented
/// `{"error": {...}}` envelope; otherwise the raw body is preserved so
/// nothing is lost for diagnostics.
pub(crate) fn parse_openai_error(status: u16, body: &str) -> LLMError {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<InnerError>,
    }

    #[derive(Deserialize)]
    struct InnerError {
        message: Option<String>,
        code: Option<String>,
    }

    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if let Some(error) = parsed.error {
            let mut message = error.message.unwrap_or_else(|| "unknown error".to_string());
            if let Some(code) = error.code {
                if !code.is_empty() {
                    message = format!("{message} ({code})");
                }
            }
            return LLMError::transport_status(status, message);
        }
    }

    LLMError::transport_status(status, body.trim().to_string())
}
