//! Mock transports shared by the integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream;

use naisho::LLMError;
use naisho::http::{
    HttpBodyStream, HttpRequest, HttpResponse, HttpStreamResponse, HttpTransport,
};

/// Serves a fixed buffered body and records every request it sees.
pub struct StaticTransport {
    pub status: u16,
    pub body: Vec<u8>,
    pub requests: Mutex<Vec<HttpRequest>>,
}

impl StaticTransport {
    pub fn new(status: u16, body: &[u8]) -> Self {
        Self {
            status,
            body: body.to_vec(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// The JSON body of the `index`-th request.
    pub fn request_body(&self, index: usize) -> serde_json::Value {
        let requests = self.requests.lock().unwrap();
        let bytes = requests[index].body.clone().unwrap_or_default();
        serde_json::from_slice(&bytes).expect("request body should be JSON")
    }

    pub fn request_headers(&self, index: usize) -> HashMap<String, String> {
        self.requests.lock().unwrap()[index].headers.clone()
    }
}

#[async_trait]
impl HttpTransport for StaticTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, LLMError> {
        self.requests.lock().unwrap().push(request);
        Ok(HttpResponse {
            status: self.status,
            headers: HashMap::new(),
            body: self.body.clone(),
        })
    }

    async fn send_stream(&self, _request: HttpRequest) -> Result<HttpStreamResponse, LLMError> {
        panic!("StaticTransport does not serve streams");
    }
}

/// Serves scripted SSE bytes for `send_stream` and a scripted buffered body
/// for `send` (the latter feeds Gemini's verification request).
pub struct SseTransport {
    pub stream_status: u16,
    pub frames: Vec<Vec<u8>>,
    pub send_status: u16,
    pub send_body: Vec<u8>,
    pub send_calls: AtomicUsize,
    pub stream_calls: AtomicUsize,
    /// Keeps the stream open forever after the scripted frames.
    pub hang_after_frames: bool,
}

impl SseTransport {
    pub fn new(frames: Vec<&[u8]>) -> Self {
        Self {
            stream_status: 200,
            frames: frames.into_iter().map(<[u8]>::to_vec).collect(),
            send_status: 200,
            send_body: b"{}".to_vec(),
            send_calls: AtomicUsize::new(0),
            stream_calls: AtomicUsize::new(0),
            hang_after_frames: false,
        }
    }

    pub fn hanging() -> Self {
        let mut transport = Self::new(Vec::new());
        transport.hang_after_frames = true;
        transport
    }
}

#[async_trait]
impl HttpTransport for SseTransport {
    async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, LLMError> {
        self.send_calls.fetch_add(1, Ordering::SeqCst);
        Ok(HttpResponse {
            status: self.send_status,
            headers: HashMap::new(),
            body: self.send_body.clone(),
        })
    }

    async fn send_stream(&self, _request: HttpRequest) -> Result<HttpStreamResponse, LLMError> {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);
        let frames = self.frames.clone().into_iter().map(Ok);
        let body: HttpBodyStream = if self.hang_after_frames {
            Box::pin(stream::iter(frames).chain(stream::pending()))
        } else {
            Box::pin(stream::iter(frames))
        };
        Ok(HttpStreamResponse {
            status: self.stream_status,
            headers: HashMap::new(),
            body,
        })
    }
}
