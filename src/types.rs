//! Shared data structures modeling single-shot requests, responses, and
//! streamed panel events.
//!
//! These types normalize provider-specific payloads so the rest of the crate
//! can stay agnostic of individual API differences. One `QueryRequest` maps
//! to one prompt/attachment exchange; there is no conversation memory.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::attachment::FileAttachment;
use crate::error::ErrorKind;

/// Normalized single-shot request consumed by every provider adapter.
///
/// A `QueryRequest` owns everything one exchange needs: the user prompt, an
/// optional system instruction, an optional in-memory attachment, and
/// sampling overrides merged over the provider's configured defaults.
///
/// # Examples
///
/// ```
/// # use naisho::types::{QueryRequest, RequestOverrides};
/// let request = QueryRequest {
///     prompt: "Summarize Rust ownership in one sentence.".into(),
///     system_instruction: Some("You are terse.".into()),
///     attachment: None,
///     overrides: RequestOverrides { temperature: Some(0.3), ..Default::default() },
///     credential: None,
/// };
/// assert!(request.attachment.is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct QueryRequest {
    /// The user prompt text.
    pub prompt: String,
    /// Optional system instruction placed wherever the provider expects it.
    pub system_instruction: Option<String>,
    /// Optional in-memory file attachment, inlined into the request body.
    pub attachment: Option<FileAttachment>,
    /// Per-call overrides merged over the provider's defaults.
    pub overrides: RequestOverrides,
    /// Caller-resolved credential replacing the adapter's configured key for
    /// this call. The crate never reads files or environment variables.
    pub credential: Option<String>,
}

impl QueryRequest {
    /// Builds a request holding only a prompt, with everything else default.
    pub fn prompt<T: Into<String>>(prompt: T) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }
}

/// Tunable per-call knobs supported across providers.
///
/// Every field is optional so callers only set what they care about; unset
/// fields fall back to the [`crate::config::ProviderConfig`] defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestOverrides {
    /// Model identifier override.
    pub model: Option<String>,
    /// Sampling temperature.
    pub temperature: Option<f32>,
    /// Nucleus sampling parameter.
    pub top_p: Option<f32>,
    /// Maximum number of output tokens.
    pub max_output_tokens: Option<u32>,
}

/// Buffered response returned by [`crate::client::LLMClient::query`].
///
/// `raw` keeps the provider's payload verbatim for diagnostics; `text` and
/// `completion_reason` are the normalized projection every caller can rely
/// on regardless of backend.
#[derive(Debug, Clone)]
pub struct QueryResponse {
    /// Concatenated response text.
    pub text: String,
    /// Raw provider payload, untouched.
    pub raw: Value,
    /// Why the response ended.
    pub completion_reason: CompletionReason,
    /// Adapter identifier such as `openai_chat`.
    pub provider: &'static str,
}

/// Why a response or stream stopped generating content.
///
/// Each adapter maps its vendor's finish strings onto these four values;
/// anything unrecognized collapses to [`CompletionReason::Unknown`] rather
/// than leaking vendor vocabulary to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionReason {
    /// Natural stop.
    Stop,
    /// The provider hit its output-token ceiling.
    LengthLimited,
    /// The provider's safety layer cut the response short.
    ContentFiltered,
    /// Early close or an unrecognized vendor reason.
    Unknown,
}

/// One normalized event within a logical stream (a "panel").
///
/// Exactly one `Final` or `Error` terminates a given `stream_id`, and no
/// `Delta` follows termination. The serialized form is the wire shape pushed
/// to SSE consumers: an `event` discriminator plus camelCase fields.
///
/// # Examples
///
/// ```
/// # use naisho::types::PanelEvent;
/// let event = PanelEvent::Delta { stream_id: "p1".into(), delta: "hi".into() };
/// let json = serde_json::to_value(&event).unwrap();
/// assert_eq!(json["event"], "panel_delta");
/// assert_eq!(json["streamId"], "p1");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum PanelEvent {
    /// One increment of generated text.
    #[serde(rename = "panel_delta", rename_all = "camelCase")]
    Delta { stream_id: String, delta: String },
    /// Terminal event carrying the accumulated full text.
    #[serde(rename = "panel_final", rename_all = "camelCase")]
    Final {
        stream_id: String,
        full_text: String,
        completion_reason: CompletionReason,
    },
    /// Terminal fault; no further events follow on this stream id.
    #[serde(rename = "panel_error", rename_all = "camelCase")]
    Error {
        stream_id: String,
        error: String,
        error_kind: ErrorKind,
    },
}

impl PanelEvent {
    /// The stream id this event belongs to.
    pub fn stream_id(&self) -> &str {
        match self {
            Self::Delta { stream_id, .. }
            | Self::Final { stream_id, .. }
            | Self::Error { stream_id, .. } => stream_id,
        }
    }

    /// Whether this event terminates its stream.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Delta { .. })
    }
}
