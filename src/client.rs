use std::collections::HashMap;

use crate::config::{ProviderConfig, ProviderKind, build_registry};
use crate::engine::{DeltaStream, PanelStream, StreamOptions, open_panel_stream};
use crate::error::LLMError;
use crate::http::DynHttpTransport;
use crate::provider::DynProvider;
use crate::types::{QueryRequest, QueryResponse};

/// 调用入口 负责路由与策略前置检查
///
/// The client owns an explicit adapter registry built once at startup;
/// nothing in the crate holds module-level provider state. Every entry point
/// resolves the provider identifier, runs the routing-layer policy check,
/// and only then dispatches, so an unsupported backend never causes network
/// activity.
pub struct LLMClient {
    providers: HashMap<ProviderKind, DynProvider>,
}

impl LLMClient {
    /// 创建 Builder 便于后续注册 Provider
    pub fn builder() -> LLMClientBuilder {
        LLMClientBuilder {
            configs: Vec::new(),
            transport: None,
        }
    }

    /// Wraps an already-built registry, for callers that construct adapters
    /// themselves (tests do this with mock transports).
    pub fn new(providers: HashMap<ProviderKind, DynProvider>) -> Self {
        Self { providers }
    }

    /// One buffered prompt/response exchange.
    pub async fn query(
        &self,
        provider: &str,
        request: QueryRequest,
    ) -> Result<QueryResponse, LLMError> {
        let provider = self.resolve(provider)?;
        provider.query(request).await
    }

    /// Streams text deltas; the thin projection of [`crate::types::PanelEvent::Delta`].
    pub async fn stream(
        &self,
        provider: &str,
        request: QueryRequest,
        options: StreamOptions,
    ) -> Result<DeltaStream, LLMError> {
        let panel = self.stream_panels(provider, request, options).await?;
        Ok(DeltaStream::new(panel))
    }

    /// Streams the full normalized event sequence for one panel, the richer
    /// contract consumed by push transports such as SSE.
    pub async fn stream_panels(
        &self,
        provider: &str,
        request: QueryRequest,
        options: StreamOptions,
    ) -> Result<PanelStream, LLMError> {
        let provider = self.resolve(provider)?;
        open_panel_stream(provider.as_ref(), request, options).await
    }

    /// 返回当前已注册的供应商标识
    pub fn configured(&self) -> Vec<&'static str> {
        self.providers.keys().map(ProviderKind::as_str).collect()
    }

    fn resolve(&self, identifier: &str) -> Result<DynProvider, LLMError> {
        let kind = ProviderKind::parse(identifier)?;

        // Routing-layer mirror of RetentionPolicy::Unsupported: the class is
        // rejected whether or not an adapter was registered for it.
        if kind == ProviderKind::AnthropicMessages {
            return Err(LLMError::Config {
                message: "provider \"claude\" is not routed: the vendor retains flagged \
                          inputs for an unspecified abuse-monitoring window, which the \
                          no-retention guarantee cannot absorb; use \"openai\" or \
                          \"gemini\" instead"
                    .to_string(),
            });
        }

        self.providers
            .get(&kind)
            .cloned()
            .ok_or_else(|| LLMError::Config {
                message: format!(
                    "provider \"{}\" has no credential configured; register it when \
                     building the client",
                    kind.as_str()
                ),
            })
    }
}

/// 负责注册 Provider 的 Builder
pub struct LLMClientBuilder {
    configs: Vec<ProviderConfig>,
    transport: Option<DynHttpTransport>,
}

impl LLMClientBuilder {
    /// 注册一个供应商配置
    pub fn with_provider(mut self, config: ProviderConfig) -> Self {
        self.configs.push(config);
        self
    }

    /// Injects a transport; defaults to the reqwest implementation.
    pub fn with_transport(mut self, transport: DynHttpTransport) -> Self {
        self.transport = Some(transport);
        self
    }

    /// 构建最终的 LLMClient
    ///
    /// # Errors
    ///
    /// Returns [`LLMError::Transport`] when the default HTTP client cannot
    /// be initialized.
    pub fn build(self) -> Result<LLMClient, LLMError> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => crate::http::reqwest::default_dyn_transport()?,
        };
        Ok(LLMClient {
            providers: build_registry(self.configs, transport),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::http::{HttpRequest, HttpResponse, HttpStreamResponse, HttpTransport};

    /// Transport that panics if any network entry point is reached, proving
    /// rejected identifiers never cause network activity.
    struct PanicTransport;

    #[async_trait]
    impl HttpTransport for PanicTransport {
        async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, LLMError> {
            panic!("rejected identifiers must not reach the network");
        }

        async fn send_stream(&self, _request: HttpRequest) -> Result<HttpStreamResponse, LLMError> {
            panic!("rejected identifiers must not reach the network");
        }
    }

    fn client_with_all_providers() -> LLMClient {
        LLMClient::builder()
            .with_provider(ProviderConfig::openai("k1"))
            .with_provider(ProviderConfig::gemini("k2"))
            .with_provider(ProviderConfig::anthropic("k3"))
            .with_transport(Arc::new(PanicTransport))
            .build()
            .expect("builds")
    }

    #[tokio::test]
    async fn unknown_identifier_is_rejected_without_network() {
        let client = client_with_all_providers();
        let err = client
            .query("llama", QueryRequest::prompt("hi"))
            .await
            .expect_err("should fail");
        match err {
            LLMError::Config { message } => {
                assert!(message.contains("llama"));
                assert!(message.contains("openai"));
            }
            other => panic!("unexpected error type: {other:?}"),
        }
    }

    #[tokio::test]
    async fn anthropic_class_is_policy_rejected_even_when_configured() {
        let client = client_with_all_providers();
        for identifier in ["claude", "anthropic", "c", "Claude"] {
            let err = client
                .query(identifier, QueryRequest::prompt("hi"))
                .await
                .expect_err("should be rejected");
            match err {
                LLMError::Config { message } => {
                    assert!(message.contains("openai"), "{identifier}: {message}");
                    assert!(message.contains("gemini"), "{identifier}: {message}");
                }
                other => panic!("unexpected error type: {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn unconfigured_provider_is_a_config_error() {
        let client = LLMClient::builder()
            .with_provider(ProviderConfig::openai("k1"))
            .with_transport(Arc::new(PanicTransport))
            .build()
            .expect("builds");
        let err = client
            .query("gemini", QueryRequest::prompt("hi"))
            .await
            .expect_err("should fail");
        assert!(matches!(err, LLMError::Config { .. }));
    }

    #[test]
    fn configured_lists_registered_identifiers() {
        let client = client_with_all_providers();
        let mut configured = client.configured();
        configured.sort_unstable();
        assert_eq!(configured, vec!["claude", "gemini", "openai"]);
    }
}
