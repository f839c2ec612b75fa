use futures_util::StreamExt;
use futures_util::stream;

use crate::error::LLMError;
use crate::http::HttpBodyStream;
use crate::provider::{StreamItem, TextEventStream};
use crate::sse::{SseDecoder, SseFrame};

use super::response::convert_finish_reason;
use super::types::OpenAiStreamChunk;

const PROVIDER: &str = "openai_chat";

/// Turns the raw SSE body into parsed [`StreamItem`] units.
///
/// One network frame may carry several choices or none at all; the frame
/// decoder guarantees each payload handed to [`parse_frame`] is a complete
/// JSON object, never a fragment.
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

/// Parses one complete `data:` payload into zero or more items.
pub(crate) fn parse_frame(data: &str) -> Result<Vec<StreamItem>, LLMError> {
    let chunk: OpenAiStreamChunk =
        serde_json::from_str(data).map_err(|err| LLMError::Transport {
            status: None,
            message: format!("{PROVIDER}: failed to parse stream chunk: {err}"),
        })?;

    let mut items = Vec::new();
    for choice in &chunk.choices {
        if let Some(text) = choice
            .delta
            .as_ref()
            .and_then(|delta| delta.content.as_deref())
        {
            if !text.is_empty() {
                items.push(StreamItem::Delta(text.to_string()));
            }
        }
        if let Some(reason) = choice.finish_reason.as_deref() {
            items.push(StreamItem::Finish(convert_finish_reason(reason)));
        }
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CompletionReason;

    #[test]
    fn delta_frame_yields_text() {
        let items = parse_frame(r#"{"choices":[{"delta":{"content":"Hel"}}]}"#).expect("parses");
        assert_eq!(items, vec![StreamItem::Delta("Hel".to_string())]);
    }

    #[test]
    fn finish_frame_yields_normalized_reason() {
        let items =
            parse_frame(r#"{"choices":[{"delta":{},"finish_reason":"length"}]}"#).expect("parses");
        assert_eq!(
            items,
            vec![StreamItem::Finish(CompletionReason::LengthLimited)]
        );
    }

    #[test]
    fn role_only_frame_yields_nothing() {
        let items = parse_frame(r#"{"choices":[{"delta":{"role":"assistant"}}]}"#).expect("parses");
        assert!(items.is_empty());
    }

    #[test]
    fn malformed_frame_is_a_transport_fault() {
        let err = parse_frame("{not json").expect_err("should fail");
        assert!(matches!(err, LLMError::Transport { .. }));
    }
}
