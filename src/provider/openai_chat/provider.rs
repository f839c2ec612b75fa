use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::ProviderConfig;
use crate::error::LLMError;
use crate::http::{
    DynHttpTransport, HttpResponse, post_json_stream_with_headers, post_json_with_headers,
};
use crate::provider::{Provider, RetentionPolicy, TextEventStream};
use crate::sse::collect_body_text;
use crate::types::{QueryRequest, QueryResponse};

use super::error::parse_openai_error;
use super::request::build_openai_body;
use super::response::map_response;
use super::stream::create_stream;

const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Retention opt-out stamped on every request; there is no code path that
/// omits it.
pub const NO_STORE_HEADER: &str = "X-OpenAI-No-Store";

/// OpenAI Chat Completions Provider
///
/// Every request carries the [`NO_STORE_HEADER`] no-retention signal, which
/// instructs the vendor not to keep inputs or outputs for service
/// improvement. The header is part of request construction itself, not an
/// option.
pub struct OpenAiChatProvider {
    pub(crate) transport: DynHttpTransport,
    pub(crate) config: ProviderConfig,
}

impl OpenAiChatProvider {
    /// 创建带默认 base_url 的 Provider
    pub fn new(transport: DynHttpTransport, config: ProviderConfig) -> Self {
        Self { transport, config }
    }

    pub(crate) fn endpoint(&self) -> String {
        let base = self
            .config
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/');
        if base.ends_with("/v1") {
            format!("{base}/chat/completions")
        } else {
            format!("{base}/v1/chat/completions")
        }
    }

    fn build_headers(&self, request: &QueryRequest) -> HashMap<String, String> {
        let credential = request
            .credential
            .as_deref()
            .unwrap_or(&self.config.credential);
        let mut headers = HashMap::new();
        headers.insert("Authorization".to_string(), format!("Bearer {credential}"));
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers.insert("Accept".to_string(), "application/json".to_string());
        headers.insert(NO_STORE_HEADER.to_string(), "true".to_string());
        headers
    }

    fn ensure_success(&self, response: HttpResponse) -> Result<Value, LLMError> {
        let status = response.status;
        let text = response.into_string()?;
        if (200..300).contains(&status) {
            serde_json::from_str(&text).map_err(|err| LLMError::Transport {
                status: None,
                message: format!("{}: malformed response body: {err}", self.name()),
            })
        } else {
            Err(parse_openai_error(status, &text))
        }
    }
}

#[async_trait]
impl Provider for OpenAiChatProvider {
    fn build_body(&self, request: &QueryRequest, stream: bool) -> Result<Value, LLMError> {
        build_openai_body(request, &self.config, stream)
    }

    async fn query(&self, request: QueryRequest) -> Result<QueryResponse, LLMError> {
        let body = self.build_body(&request, false)?;
        let headers = self.build_headers(&request);
        let response =
            post_json_with_headers(self.transport.as_ref(), self.endpoint(), headers, &body)
                .await?;
        let raw = self.ensure_success(response)?;
        map_response(raw, self.name())
    }

    async fn open_stream(&self, request: QueryRequest) -> Result<TextEventStream, LLMError> {
        let body = self.build_body(&request, true)?;
        let headers = self.build_headers(&request);
        let response =
            post_json_stream_with_headers(self.transport.as_ref(), self.endpoint(), headers, &body)
                .await?;
        if !(200..300).contains(&response.status) {
            let text = collect_body_text(response.body, self.name()).await?;
            return Err(parse_openai_error(response.status, &text));
        }
        Ok(create_stream(response.body))
    }

    fn policy(&self) -> RetentionPolicy {
        RetentionPolicy::EnforcedNoStore
    }

    fn name(&self) -> &'static str {
        "openai_chat"
    }
}
