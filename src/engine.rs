//! Streaming engine.
//!
//! Drives a provider's incremental transport through one state machine:
//!
//! ```text
//! Idle -> Opening -> Streaming -> (Completing | Aborting | TimedOut | Failed) -> Closed
//! ```
//!
//! `Idle -> Opening -> Streaming` happens inside [`open_panel_stream`]; the
//! returned [`PanelStream`] owns the remaining transitions. Whatever path a
//! stream takes into `Closed`, the transport handle is dropped before the
//! terminal event is emitted and exactly one terminal event is produced.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures_core::Stream;
use tokio::time::{Instant, Sleep};
use tracing::{debug, warn};

use crate::error::LLMError;
use crate::provider::{Provider, StreamItem, TextEventStream};
use crate::types::{CompletionReason, PanelEvent, QueryRequest};

/// Wall-clock budget applied when the caller does not override it.
pub const DEFAULT_STREAM_TIMEOUT: Duration = Duration::from_secs(300);

/// Per-chunk abort callback: return `false` to stop the stream.
pub type ChunkCallback = Box<dyn FnMut(&str) -> bool + Send>;

/// Caller-tunable streaming knobs.
#[derive(Default)]
pub struct StreamOptions {
    /// Bounds the stream's total duration, opening included. Defaults to
    /// [`DEFAULT_STREAM_TIMEOUT`]. This is not an inter-chunk gap limit.
    pub timeout: Option<Duration>,
    /// Caller-supplied stream id correlating panel events; a fresh UUID is
    /// generated when absent.
    pub panel_id: Option<String>,
    /// Invoked with each text delta before it is forwarded; returning
    /// `false` closes the transport and terminates the stream softly.
    pub on_chunk: Option<ChunkCallback>,
}

impl StreamOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_panel_id<T: Into<String>>(mut self, panel_id: T) -> Self {
        self.panel_id = Some(panel_id.into());
        self
    }

    pub fn with_on_chunk<F>(mut self, on_chunk: F) -> Self
    where
        F: FnMut(&str) -> bool + Send + 'static,
    {
        self.on_chunk = Some(Box::new(on_chunk));
        self
    }
}

/// Opens the provider's transport and hands back the event stream.
///
/// The timeout timer is armed before the transport is opened, so a hung
/// connection attempt counts against the same budget as the stream itself.
///
/// # Errors
///
/// Opening faults (policy rejection, serialization, transport, timeout)
/// surface here as plain errors; once a [`PanelStream`] exists, every
/// subsequent fault arrives as a terminal [`PanelEvent::Error`] instead.
pub(crate) async fn open_panel_stream(
    provider: &dyn Provider,
    request: QueryRequest,
    options: StreamOptions,
) -> Result<PanelStream, LLMError> {
    let budget = options.timeout.unwrap_or(DEFAULT_STREAM_TIMEOUT);
    let deadline = Instant::now() + budget;
    let stream_id = options
        .panel_id
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let inner = tokio::time::timeout_at(deadline, provider.open_stream(request))
        .await
        .map_err(|_| LLMError::Timeout { budget })??;

    debug!(stream_id = %stream_id, provider = provider.name(), "stream opened");
    Ok(PanelStream {
        stream_id,
        state: EngineState::Streaming,
        inner: Some(inner),
        deadline: Box::pin(tokio::time::sleep_until(deadline)),
        budget,
        accumulated: String::new(),
        finish_reason: None,
        on_chunk: options.on_chunk,
        terminal_error: None,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EngineState {
    /// Forwarding deltas as they arrive.
    Streaming,
    /// Callback said stop; transport already closed, `Final` still owed.
    Aborting,
    /// Terminal event emitted; nothing follows.
    Closed,
}

/// Normalized event stream for one panel.
///
/// Yields zero or more [`PanelEvent::Delta`]s followed by exactly one
/// terminal event, then ends. Dropping the stream at any point cancels it
/// and releases the transport.
pub struct PanelStream {
    stream_id: String,
    state: EngineState,
    inner: Option<TextEventStream>,
    deadline: Pin<Box<Sleep>>,
    budget: Duration,
    accumulated: String,
    finish_reason: Option<CompletionReason>,
    on_chunk: Option<ChunkCallback>,
    terminal_error: Option<LLMError>,
}

impl PanelStream {
    /// The id stamped on every event of this stream.
    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    /// The terminal error, available once a [`PanelEvent::Error`] was
    /// emitted. Lets projections re-surface the typed error.
    pub(crate) fn take_error(&mut self) -> Option<LLMError> {
        self.terminal_error.take()
    }

    /// `Streaming -> Completing -> Closed`: natural end of the transport.
    fn complete(&mut self) -> PanelEvent {
        self.inner = None;
        self.state = EngineState::Closed;
        let completion_reason = self.finish_reason.take().unwrap_or(CompletionReason::Unknown);
        if self.accumulated.is_empty() {
            warn!(stream_id = %self.stream_id, "stream ended without any text deltas");
        }
        debug!(stream_id = %self.stream_id, ?completion_reason, "stream completed");
        PanelEvent::Final {
            stream_id: self.stream_id.clone(),
            full_text: std::mem::take(&mut self.accumulated),
            completion_reason,
        }
    }

    /// `Aborting -> Closed`: caller-directed stop, surfaced as `Final`.
    fn finish_abort(&mut self) -> PanelEvent {
        self.state = EngineState::Closed;
        let completion_reason = self.finish_reason.take().unwrap_or(CompletionReason::Unknown);
        debug!(stream_id = %self.stream_id, "stream aborted by caller");
        PanelEvent::Final {
            stream_id: self.stream_id.clone(),
            full_text: std::mem::take(&mut self.accumulated),
            completion_reason,
        }
    }

    /// `Streaming -> TimedOut -> Closed`.
    fn time_out(&mut self) -> PanelEvent {
        self.inner = None;
        self.state = EngineState::Closed;
        warn!(stream_id = %self.stream_id, budget = ?self.budget, "stream timed out");
        let error = LLMError::Timeout {
            budget: self.budget,
        };
        let event = PanelEvent::Error {
            stream_id: self.stream_id.clone(),
            error: error.to_string(),
            error_kind: error.kind(),
        };
        self.terminal_error = Some(error);
        event
    }

    /// `Streaming -> Failed -> Closed`.
    fn fail(&mut self, error: LLMError) -> PanelEvent {
        self.inner = None;
        self.state = EngineState::Closed;
        warn!(stream_id = %self.stream_id, %error, "stream failed");
        let event = PanelEvent::Error {
            stream_id: self.stream_id.clone(),
            error: error.to_string(),
            error_kind: error.kind(),
        };
        self.terminal_error = Some(error);
        event
    }
}

impl Stream for PanelStream {
    type Item = PanelEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        match this.state {
            EngineState::Closed => return Poll::Ready(None),
            EngineState::Aborting => return Poll::Ready(Some(this.finish_abort())),
            EngineState::Streaming => {}
        }

        loop {
            // The timer is polled first so an expired budget wins the race
            // against a chunk that became ready in the same wake-up.
            if this.deadline.as_mut().poll(cx).is_ready() {
                return Poll::Ready(Some(this.time_out()));
            }

            let Some(inner) = this.inner.as_mut() else {
                return Poll::Ready(Some(this.complete()));
            };

            match inner.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(StreamItem::Delta(text)))) => {
                    this.accumulated.push_str(&text);
                    let keep_going = match this.on_chunk.as_mut() {
                        Some(callback) => callback(&text),
                        None => true,
                    };
                    if !keep_going {
                        // Close the transport before this delta is even
                        // forwarded, so nothing further can arrive.
                        this.inner = None;
                        this.state = EngineState::Aborting;
                    }
                    return Poll::Ready(Some(PanelEvent::Delta {
                        stream_id: this.stream_id.clone(),
                        delta: text,
                    }));
                }
                Poll::Ready(Some(Ok(StreamItem::Finish(reason)))) => {
                    this.finish_reason = Some(reason);
                }
                Poll::Ready(Some(Err(error))) => {
                    return Poll::Ready(Some(this.fail(error)));
                }
                Poll::Ready(None) => {
                    return Poll::Ready(Some(this.complete()));
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// Thin projection of [`PanelStream`] down to its text deltas.
///
/// Terminal `Final` events end the sequence silently; terminal `Error`
/// events surface as one `Err` item before the end.
pub struct DeltaStream {
    inner: PanelStream,
    done: bool,
}

impl DeltaStream {
    pub(crate) fn new(inner: PanelStream) -> Self {
        Self { inner, done: false }
    }
}

impl Stream for DeltaStream {
    type Item = Result<String, LLMError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }
        loop {
            match Pin::new(&mut this.inner).poll_next(cx) {
                Poll::Ready(Some(PanelEvent::Delta { delta, .. })) => {
                    return Poll::Ready(Some(Ok(delta)));
                }
                Poll::Ready(Some(PanelEvent::Final { .. })) | Poll::Ready(None) => {
                    this.done = true;
                    return Poll::Ready(None);
                }
                Poll::Ready(Some(PanelEvent::Error { error, .. })) => {
                    this.done = true;
                    let typed = this
                        .inner
                        .take_error()
                        .unwrap_or(LLMError::Transport {
                            status: None,
                            message: error,
                        });
                    return Poll::Ready(Some(Err(typed)));
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
