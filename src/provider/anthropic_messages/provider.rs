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

use super::error::parse_anthropic_error;
use super::request::build_anthropic_body;
use super::response::map_response;
use super::stream::create_stream;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_VERSION: &str = "2023-06-01";

/// Anthropic Messages Provider（兼容 Claude 3.x Messages API）
///
/// The router never dispatches here: the vendor retains flagged inputs for
/// an abuse-monitoring window documented only as "a limited period", which
/// the crate's no-retention guarantee cannot absorb. The adapter stays a
/// complete, directly constructible protocol implementation for callers who
/// accept that trade-off themselves.
pub struct AnthropicMessagesProvider {
    pub(crate) transport: DynHttpTransport,
    pub(crate) config: ProviderConfig,
    version: String,
}

impl AnthropicMessagesProvider {
    /// 使用默认 base_url 与 anthropic-version 创建 Provider
    pub fn new(transport: DynHttpTransport, config: ProviderConfig) -> Self {
        Self {
            transport,
            config,
            version: DEFAULT_VERSION.to_string(),
        }
    }

    /// 自定义 Anthropic API 版本（anthropic-version）
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub(crate) fn endpoint(&self) -> String {
        let base = self
            .config
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/');
        if base.ends_with("/v1") {
            format!("{base}/messages")
        } else {
            format!("{base}/v1/messages")
        }
    }

    fn build_headers(&self, request: &QueryRequest) -> HashMap<String, String> {
        let credential = request
            .credential
            .as_deref()
            .unwrap_or(&self.config.credential);
        let mut headers = HashMap::new();
        headers.insert("x-api-key".to_string(), credential.to_string());
        headers.insert("anthropic-version".to_string(), self.version.clone());
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers.insert("Accept".to_string(), "application/json".to_string());
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
            Err(parse_anthropic_error(status, &text))
        }
    }
}

#[async_trait]
impl Provider for AnthropicMessagesProvider {
    fn build_body(&self, request: &QueryRequest, stream: bool) -> Result<Value, LLMError> {
        build_anthropic_body(request, &self.config, stream)
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
            return Err(parse_anthropic_error(response.status, &text));
        }
        Ok(create_stream(response.body))
    }

    fn policy(&self) -> RetentionPolicy {
        RetentionPolicy::Unsupported
    }

    fn name(&self) -> &'static str {
        "anthropic_messages"
    }
}
