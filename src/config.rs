use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::LLMError;
use crate::http::DynHttpTransport;
use crate::provider::DynProvider;
use crate::provider::anthropic_messages::AnthropicMessagesProvider;
use crate::provider::google_gemini::GoogleGeminiProvider;
use crate::provider::openai_chat::OpenAiChatProvider;

/// 供应商类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    OpenAiChat,
    GoogleGemini,
    AnthropicMessages,
}

impl ProviderKind {
    /// Resolves a caller-facing provider identifier.
    ///
    /// Identifiers are case-insensitive and accept single-letter shorthands:
    /// `openai`/`o`, `gemini`/`g`, `claude`/`anthropic`/`c`. Anything else is
    /// rejected here, before any network activity, with a hint naming the
    /// valid choices.
    pub fn parse(identifier: &str) -> Result<Self, LLMError> {
        match identifier.trim().to_ascii_lowercase().as_str() {
            "openai" | "o" => Ok(Self::OpenAiChat),
            "gemini" | "google" | "g" => Ok(Self::GoogleGemini),
            "claude" | "anthropic" | "c" => Ok(Self::AnthropicMessages),
            other => Err(LLMError::Config {
                message: format!(
                    "unknown provider \"{other}\"; valid identifiers are \
                     \"openai\" (\"o\") and \"gemini\" (\"g\")"
                ),
            }),
        }
    }

    /// Canonical identifier used in messages and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAiChat => "openai",
            Self::GoogleGemini => "gemini",
            Self::AnthropicMessages => "claude",
        }
    }
}

/// 模型配置 描述一个可调用后端
///
/// Constructed once at registry build time and read-only afterwards, so
/// concurrent requests never observe a partial update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    /// Resolved credential string; the crate never reads files or env vars.
    pub credential: String,
    /// Default model when the request carries no override.
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
    pub max_output_tokens: u32,
    /// Override for proxies or compatibility layers.
    pub base_url: Option<String>,
}

impl ProviderConfig {
    /// OpenAI defaults.
    pub fn openai(credential: impl Into<String>) -> Self {
        Self {
            kind: ProviderKind::OpenAiChat,
            credential: credential.into(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            top_p: 0.95,
            max_output_tokens: 4096,
            base_url: None,
        }
    }

    /// Google Gemini defaults.
    pub fn gemini(credential: impl Into<String>) -> Self {
        Self {
            kind: ProviderKind::GoogleGemini,
            credential: credential.into(),
            model: "gemini-2.0-flash".to_string(),
            temperature: 0.7,
            top_p: 0.95,
            max_output_tokens: 8192,
            base_url: None,
        }
    }

    /// Anthropic defaults. The adapter is a complete protocol implementation
    /// but routed access is policy-blocked; see [`crate::client::LLMClient`].
    pub fn anthropic(credential: impl Into<String>) -> Self {
        Self {
            kind: ProviderKind::AnthropicMessages,
            credential: credential.into(),
            model: "claude-3-5-sonnet-latest".to_string(),
            temperature: 0.7,
            top_p: 0.95,
            max_output_tokens: 4096,
            base_url: None,
        }
    }

    /// 自定义默认模型
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// 自定义 base_url
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }
}

/// Builds the adapter registry injected into [`crate::client::LLMClient`].
///
/// The registry is an explicit value constructed at process start; there is
/// no module-level provider state anywhere in the crate.
pub fn build_registry(
    configs: Vec<ProviderConfig>,
    transport: DynHttpTransport,
) -> HashMap<ProviderKind, DynProvider> {
    let mut registry: HashMap<ProviderKind, DynProvider> = HashMap::new();
    for config in configs {
        let kind = config.kind;
        let provider: DynProvider = match kind {
            ProviderKind::OpenAiChat => {
                Arc::new(OpenAiChatProvider::new(transport.clone(), config))
            }
            ProviderKind::GoogleGemini => {
                Arc::new(GoogleGeminiProvider::new(transport.clone(), config))
            }
            ProviderKind::AnthropicMessages => {
                Arc::new(AnthropicMessagesProvider::new(transport.clone(), config))
            }
        };
        registry.insert(kind, provider);
    }
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_resolve_case_insensitively_with_shorthands() {
        assert_eq!(
            ProviderKind::parse("OpenAI").expect("openai"),
            ProviderKind::OpenAiChat
        );
        assert_eq!(
            ProviderKind::parse("o").expect("o"),
            ProviderKind::OpenAiChat
        );
        assert_eq!(
            ProviderKind::parse("GEMINI").expect("gemini"),
            ProviderKind::GoogleGemini
        );
        assert_eq!(
            ProviderKind::parse("g").expect("g"),
            ProviderKind::GoogleGemini
        );
        assert_eq!(
            ProviderKind::parse(" claude ").expect("claude"),
            ProviderKind::AnthropicMessages
        );
    }

    #[test]
    fn unknown_identifier_rejected_with_remediation() {
        let err = ProviderKind::parse("mistral").expect_err("should fail");
        match err {
            LLMError::Config { message } => {
                assert!(message.contains("mistral"));
                assert!(message.contains("openai"));
                assert!(message.contains("gemini"));
            }
            other => panic!("unexpected error type: {other:?}"),
        }
    }
}
