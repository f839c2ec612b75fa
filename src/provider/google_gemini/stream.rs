use futures_util::StreamExt;
use futures_util::stream;

use crate::error::LLMError;
use crate::http::HttpBodyStream;
use crate::provider::{StreamItem, TextEventStream};
use crate::sse::{SseDecoder, SseFrame};

use super::response::convert_finish_reason;
use super::types::GeminiGenerateContentResponse;

const PROVIDER: &str = "google_gemini";

/// Turns the `streamGenerateContent?alt=sse` body into [`StreamItem`]s.
///
/// Each SSE frame carries a whole `GenerateContentResponse` chunk whose
/// candidate parts may hold zero or more text fragments.
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
    let chunk: GeminiGenerateContentResponse =
        serde_json::from_str(data).map_err(|err| LLMError::Transport {
            status: None,
            message: format!("{PROVIDER}: failed to parse stream chunk: {err}"),
        })?;

    let mut items = Vec::new();
    for candidate in &chunk.candidates {
        if let Some(content) = &candidate.content {
            for part in &content.parts {
                if let Some(text) = &part.text {
                    if !text.is_empty() {
                        items.push(StreamItem::Delta(text.clone()));
                    }
                }
            }
        }
        if let Some(reason) = candidate.finish_reason.as_deref() {
            items.push(StreamItem::Finish(convert_finish_reason(reason)));
        }
    }
    Ok(items)
}
