use serde::{Deserialize, Serialize};

/// Buffered Chat Completions response, reduced to the fields the relay
/// consumes. Unknown fields are ignored on purpose.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct OpenAiChatResponse {
    #[serde(default)]
    pub choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct OpenAiChoice {
    pub message: Option<OpenAiResponseMessage>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct OpenAiResponseMessage {
    pub content: Option<String>,
}

/// One streaming frame: `{"choices":[{"delta":{"content":...}}]}`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct OpenAiStreamChunk {
    #[serde(default)]
    pub choices: Vec<OpenAiStreamChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct OpenAiStreamChoice {
    pub delta: Option<OpenAiStreamDelta>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct OpenAiStreamDelta {
    pub content: Option<String>,
}
