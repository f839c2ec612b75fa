use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures_core::Stream;
use serde_json::Value;

use crate::error::LLMError;
use crate::types::{CompletionReason, QueryRequest, QueryResponse};

pub mod anthropic_messages;
pub mod google_gemini;
pub mod openai_chat;

/// 供应商增量单元 一个网络帧可能解析出零个或多个
#[derive(Debug, Clone, PartialEq)]
pub enum StreamItem {
    /// One increment of generated text, in provider emission order.
    Delta(String),
    /// Provider-reported finish reason, already normalized.
    Finish(CompletionReason),
}

/// 流式响应别名
pub type TextEventStream = Pin<Box<dyn Stream<Item = Result<StreamItem, LLMError>> + Send>>;

/// Static privacy classification of an adapter.
///
/// The classification is a property of the vendor contract, not of any
/// request, so it is fixed at compile time per adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionPolicy {
    /// A no-retention signal is stamped on every request; no opt-out exists.
    EnforcedNoStore,
    /// The account's paid tier is verified once per adapter instance before
    /// the first real request; the outcome is cached for the instance's
    /// lifetime.
    PaidTierVerified,
    /// The vendor's retention terms cannot satisfy the crate's guarantee;
    /// the router rejects the provider before any network activity.
    Unsupported,
}

/// 统一的 Provider Trait 所有供应商实现该接口即可接入
#[async_trait]
pub trait Provider: Send + Sync {
    /// Maps the normalized request onto the provider's JSON wire shape.
    ///
    /// Pure over `(resolved model, request)`: no I/O, no clock, and any
    /// model-version quirks are decided here by inspecting the model string.
    fn build_body(&self, request: &QueryRequest, stream: bool) -> Result<Value, LLMError>;

    /// 提交完整请求并等待完整响应
    async fn query(&self, request: QueryRequest) -> Result<QueryResponse, LLMError>;

    /// Opens the incremental transport and returns the provider's stream of
    /// parsed [`StreamItem`] units.
    async fn open_stream(&self, request: QueryRequest) -> Result<TextEventStream, LLMError>;

    /// 供应商的隐私策略分类
    fn policy(&self) -> RetentionPolicy;

    /// 供应商名称
    fn name(&self) -> &'static str;
}

/// 线程安全 Provider
pub type DynProvider = Arc<dyn Provider>;
