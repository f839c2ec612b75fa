use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::OnceCell;
use tracing::debug;

use crate::config::ProviderConfig;
use crate::error::LLMError;
use crate::http::{
    DynHttpTransport, HttpResponse, post_json_stream_with_headers, post_json_with_headers,
};
use crate::provider::{Provider, RetentionPolicy, TextEventStream};
use crate::sse::collect_body_text;
use crate::types::{QueryRequest, QueryResponse};

use super::error::parse_gemini_error;
use super::request::build_gemini_body;
use super::response::map_response;
use super::stream::create_stream;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Google Gemini GenerateContent provider implementation.
///
/// Google's free tier retains prompts and may use them for training, so this
/// adapter refuses to relay anything until the account's paid tier is
/// verified: one minimal generation request per adapter instance, issued
/// before the first real request. The outcome (either way) is cached for the
/// instance's lifetime; a failed instance keeps failing fast without further
/// network cost until it is reconstructed.
pub struct GoogleGeminiProvider {
    pub(crate) transport: DynHttpTransport,
    pub(crate) config: ProviderConfig,
    verified: OnceCell<Result<(), String>>,
}

impl GoogleGeminiProvider {
    pub fn new(transport: DynHttpTransport, config: ProviderConfig) -> Self {
        Self {
            transport,
            config,
            verified: OnceCell::new(),
        }
    }

    /// Builds the non-streaming endpoint URL for GenerateContent.
    pub(crate) fn endpoint(&self, model: &str) -> String {
        let base = self.base_url();
        let model_path = normalize_model(model);
        if base.ends_with("/v1beta") {
            format!("{base}/{model_path}:generateContent")
        } else {
            format!("{base}/v1beta/{model_path}:generateContent")
        }
    }

    /// Builds the streaming endpoint URL (SSE) for GenerateContent.
    pub(crate) fn stream_endpoint(&self, model: &str) -> String {
        let base = self.base_url();
        let model_path = normalize_model(model);
        if base.ends_with("/v1beta") {
            format!("{base}/{model_path}:streamGenerateContent?alt=sse")
        } else {
            format!("{base}/v1beta/{model_path}:streamGenerateContent?alt=sse")
        }
    }

    fn base_url(&self) -> &str {
        self.config
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
    }

    fn build_headers(&self, request: &QueryRequest) -> HashMap<String, String> {
        let credential = request
            .credential
            .as_deref()
            .unwrap_or(&self.config.credential);
        let mut headers = HashMap::new();
        headers.insert("x-goog-api-key".to_string(), credential.to_string());
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers.insert("Accept".to_string(), "application/json".to_string());
        headers
    }

    fn resolve_model<'a>(&'a self, request: &'a QueryRequest) -> &'a str {
        request
            .overrides
            .model
            .as_deref()
            .unwrap_or(&self.config.model)
    }

    /// Settles the per-instance verification cell before the first real
    /// request. Concurrent first calls may both issue the verification
    /// request; the race is benign because the provider's own account state
    /// is authoritative and the cell is written at most once.
    async fn ensure_verified(&self, request: &QueryRequest) -> Result<(), LLMError> {
        if let Some(outcome) = self.verified.get() {
            return outcome
                .clone()
                .map_err(|message| LLMError::Config { message });
        }

        match self.run_verification(request).await {
            Ok(()) => {
                debug!(provider = self.name(), "paid tier verified");
                let _ = self.verified.set(Ok(()));
                Ok(())
            }
            Err(LLMError::Config { message }) => {
                let _ = self.verified.set(Err(message.clone()));
                Err(LLMError::Config { message })
            }
            // Plain transport faults say nothing about the account tier, so
            // they must not settle the cell.
            Err(other) => Err(other),
        }
    }

    /// One minimal generation request classifying the account tier.
    async fn run_verification(&self, request: &QueryRequest) -> Result<(), LLMError> {
        let model = self.resolve_model(request);
        let body = json!({
            "contents": [ { "role": "user", "parts": [ { "text": "ping" } ] } ],
            "generationConfig": { "maxOutputTokens": 1 }
        });
        let response = post_json_with_headers(
            self.transport.as_ref(),
            self.endpoint(model),
            self.build_headers(request),
            &body,
        )
        .await?;

        match response.status {
            status if (200..300).contains(&status) => Ok(()),
            401 | 403 | 429 => {
                let detail = response.into_string().unwrap_or_default();
                Err(LLMError::Config {
                    message: format!(
                        "Gemini requires a paid-tier (billed) API key: free-tier requests \
                         are retained by the vendor and may be used for training. Enable \
                         billing for the project behind this key, or use provider \
                         \"openai\". Upstream said: {}",
                        detail.trim()
                    ),
                })
            }
            status => {
                let detail = response.into_string().unwrap_or_default();
                Err(parse_gemini_error(status, &detail))
            }
        }
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
            Err(parse_gemini_error(status, &text))
        }
    }
}

fn normalize_model(model: &str) -> String {
    if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{model}")
    }
}

#[async_trait]
impl Provider for GoogleGeminiProvider {
    fn build_body(&self, request: &QueryRequest, stream: bool) -> Result<Value, LLMError> {
        build_gemini_body(request, &self.config, stream)
    }

    async fn query(&self, request: QueryRequest) -> Result<QueryResponse, LLMError> {
        self.ensure_verified(&request).await?;
        let model = self.resolve_model(&request).to_string();
        let body = self.build_body(&request, false)?;
        let headers = self.build_headers(&request);
        let response =
            post_json_with_headers(self.transport.as_ref(), self.endpoint(&model), headers, &body)
                .await?;
        let raw = self.ensure_success(response)?;
        map_response(raw, self.name())
    }

    async fn open_stream(&self, request: QueryRequest) -> Result<TextEventStream, LLMError> {
        self.ensure_verified(&request).await?;
        let model = self.resolve_model(&request).to_string();
        let body = self.build_body(&request, true)?;
        let headers = self.build_headers(&request);
        let response = post_json_stream_with_headers(
            self.transport.as_ref(),
            self.stream_endpoint(&model),
            headers,
            &body,
        )
        .await?;
        if !(200..300).contains(&response.status) {
            let text = collect_body_text(response.body, self.name()).await?;
            return Err(parse_gemini_error(response.status, &text));
        }
        Ok(create_stream(response.body))
    }

    fn policy(&self) -> RetentionPolicy {
        RetentionPolicy::PaidTierVerified
    }

    fn name(&self) -> &'static str {
        "google_gemini"
    }
}
