//! Server-Sent Events framing.
//!
//! Raw network chunks do not align with logical events: one chunk may carry
//! several `data:` lines, or an event may arrive split across chunks. The
//! decoder buffers bytes until a complete frame boundary (blank line) is
//! seen and only then yields the joined payload, so downstream parsers never
//! see a partial fragment.

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;

use crate::error::LLMError;
use crate::http::HttpBodyStream;

/// Standardized SSE frame yielded by [`SseDecoder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseFrame {
    /// Joined `data:` payload of one event.
    Data(String),
    /// Terminal marker reported via `[DONE]`.
    Done,
}

/// Normalizes a provider SSE feed into [`SseFrame`] values.
pub struct SseDecoder {
    body: HttpBodyStream,
    buffer: Vec<u8>,
    data_lines: Vec<Vec<u8>>,
    pending: VecDeque<Result<SseFrame, LLMError>>,
    provider: &'static str,
    stream_closed: bool,
    done_received: bool,
}

impl SseDecoder {
    /// Wraps a raw HTTP body stream and prepares it for SSE decoding.
    pub fn new(body: HttpBodyStream, provider: &'static str) -> Self {
        Self {
            body,
            buffer: Vec::new(),
            data_lines: Vec::new(),
            pending: VecDeque::new(),
            provider,
            stream_closed: false,
            done_received: false,
        }
    }

    fn handle_line(&mut self, line: Vec<u8>) {
        // Only `data:` fields matter; `event:`/`id:`/comment lines are
        // dropped because every provider we speak puts the payload in data.
        if line.starts_with(b"data:") {
            let mut data = line[5..].to_vec();
            if data.first() == Some(&b' ') {
                data.remove(0);
            }
            self.data_lines.push(data);
        }
    }

    fn flush_frame(&mut self) -> Result<(), LLMError> {
        if self.data_lines.is_empty() {
            return Ok(());
        }

        let mut joined = Vec::new();
        for (idx, mut segment) in self.data_lines.drain(..).enumerate() {
            if idx > 0 {
                joined.push(b'\n');
            }
            joined.append(&mut segment);
        }

        if joined.is_empty() {
            return Ok(());
        }

        let data = String::from_utf8(joined).map_err(|err| LLMError::Transport {
            status: None,
            message: format!("{}: invalid UTF-8 in stream chunk: {err}", self.provider),
        })?;

        if data.trim() == "[DONE]" {
            if !self.done_received {
                self.done_received = true;
                self.pending.push_back(Ok(SseFrame::Done));
            }
        } else {
            self.pending.push_back(Ok(SseFrame::Data(data)));
        }

        Ok(())
    }

    fn drain_line(buffer: &mut Vec<u8>) -> Option<Vec<u8>> {
        buffer.iter().position(|b| *b == b'\n').map(|pos| {
            let mut line: Vec<u8> = buffer.drain(..=pos).collect();
            if line.last() == Some(&b'\n') {
                line.pop();
            }
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            line
        })
    }
}

impl Stream for SseDecoder {
    type Item = Result<SseFrame, LLMError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if let Some(frame) = this.pending.pop_front() {
            return Poll::Ready(Some(frame));
        }

        if this.done_received && this.pending.is_empty() {
            return Poll::Ready(None);
        }

        loop {
            if this.stream_closed {
                // Flush whatever is left: a final line without trailing
                // newline still belongs to the last frame.
                if !this.buffer.is_empty() {
                    let line = this.buffer.drain(..).collect::<Vec<u8>>();
                    this.handle_line(line);
                }
                if let Err(err) = this.flush_frame() {
                    return Poll::Ready(Some(Err(err)));
                }
                return this
                    .pending
                    .pop_front()
                    .map_or(Poll::Ready(None), |frame| Poll::Ready(Some(frame)));
            }

            match this.body.as_mut().poll_next(cx) {
                Poll::Ready(Some(chunk_result)) => match chunk_result {
                    Ok(bytes) => {
                        this.buffer.extend_from_slice(&bytes);
                        while let Some(line) = Self::drain_line(&mut this.buffer) {
                            if line.is_empty() {
                                if let Err(err) = this.flush_frame() {
                                    return Poll::Ready(Some(Err(err)));
                                }
                                if let Some(frame) = this.pending.pop_front() {
                                    return Poll::Ready(Some(frame));
                                }
                            } else {
                                this.handle_line(line);
                            }
                        }
                        if let Some(frame) = this.pending.pop_front() {
                            return Poll::Ready(Some(frame));
                        }
                    }
                    Err(err) => return Poll::Ready(Some(Err(err))),
                },
                Poll::Ready(None) => {
                    this.stream_closed = true;
                    continue;
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// Buffers an entire stream body, used to surface rich error messages when a
/// streaming endpoint answers with a non-2xx status.
pub(crate) async fn collect_body_text(
    mut body: HttpBodyStream,
    provider: &'static str,
) -> Result<String, LLMError> {
    use futures_util::StreamExt;

    let mut bytes = Vec::new();
    while let Some(chunk) = body.next().await {
        bytes.extend_from_slice(&chunk?);
    }
    String::from_utf8(bytes).map_err(|err| LLMError::Transport {
        status: None,
        message: format!("{provider}: failed to decode stream error body: {err}"),
    })
}
