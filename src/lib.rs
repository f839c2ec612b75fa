//! 隐私优先的多后端单轮 LLM 调用库
//!
//! One call contract ([`client::LLMClient::query`],
//! [`client::LLMClient::stream`], [`client::LLMClient::stream_panels`])
//! over incompatible vendor wire protocols, with no-retention semantics
//! baked into request construction rather than left optional.

pub mod attachment;
pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod http;
pub mod provider;
pub mod sse;
pub mod types;

pub use client::{LLMClient, LLMClientBuilder};
pub use config::{ProviderConfig, ProviderKind};
pub use engine::{DEFAULT_STREAM_TIMEOUT, DeltaStream, PanelStream, StreamOptions};
pub use error::{ErrorKind, LLMError};
pub use provider::{Provider, RetentionPolicy};
pub use types::*;
