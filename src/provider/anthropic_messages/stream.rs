use futures_util::StreamExt;
use futures_util::stream;
use serde_json::Value;

use crate::error::LLMError;
use crate::http::HttpBodyStream;
use crate::provider::{StreamItem, TextEventStream};
use crate::sse::{SseDecoder, SseFrame};

use super::response::convert_stop_reason;

const PROVIDER: &str = "anthropic_messages";

/// Turns the Messages SSE body into [`StreamItem`]s.
///
/// Anthropic tags every frame with a `type`: text arrives in
/// `content_block_delta`, the stop reason in `message_delta`, and the
/// remaining bookkeeping events (`message_start`, `ping`, ...) carry nothing
/// the relay needs.
pub(crate) fn create_stream(body: HttpBodyStream) -> TextEventStream {
    let frames = SseDecoder::new(body, PROVIDER);
    let items = frames.flat_map(|frame| {
        let out: Vec<Result<StreamItem, LLMError>> = match frame {
            Ok(SseFrame::Data(data)) => match parse_frame(&data) {
                Ok(items) => items.into_iter().map(Ok).collect(),
                Err(err) => vec![Err(err)],
            },
            Ok(SseFrame::Done) => Vec::new(),
            Err(err) => vec![Err(err)],
        };
        stream::iter(out)
    });
    Box::pin(items)
}

pub(crate) fn parse_frame(data: &str) -> Result<Vec<StreamItem>, LLMError> {
    let event: Value = serde_json::from_str(data).map_err(|err| LLMError::Transport {
        status: None,
        message: format!("{PROVIDER}: failed to parse stream event: {err}"),
    })?;

    let mut items = Vec::new();
    match event.get("type").and_then(Value::as_str).unwrap_or_default() {
        "content_block_delta" => {
            if let Some(text) = event
                .get("delta")
                .and_then(|delta| delta.get("text"))
                .and_then(Value::as_str)
            {
                if !text.is_empty() {
                    items.push(StreamItem::Delta(text.to_string()));
                }
            }
        }
        "message_delta" => {
            if let Some(reason) = event
                .get("delta")
                .and_then(|delta| delta.get("stop_reason"))
                .and_then(Value::as_str)
            {
                items.push(StreamItem::Finish(convert_stop_reason(reason)));
            }
        }
        // message_start / content_block_start / content_block_stop /
        // message_stop / ping carry nothing the relay forwards.
        _ => {}
    }
    Ok(items)
}
