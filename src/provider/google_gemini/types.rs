use serde::{Deserialize, Serialize};

/// GenerateContent response, reduced to the fields the relay consumes.
/// The same shape arrives as whole-response (buffered) and per-frame
/// (streaming with `alt=sse`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct GeminiGenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct GeminiCandidate {
    pub content: Option<GeminiContent>,
    #[serde(rename = "finishReason")]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct GeminiContent {
    #[serde(default)]
    pub parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct GeminiPart {
    pub text: Option<String>,
}
