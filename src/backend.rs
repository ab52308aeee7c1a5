//! # Model backend boundary
//! The pipeline treats the LLM provider as an opaque call: an ordered,
//! role-tagged message sequence plus generation parameters go in, plain text
//! comes out. Provider SDKs, authentication, and retry policy all live behind
//! [ModelBackend]; the orchestrator never retries a failed call.
//!
//! Backend failures are classified into [BackendError] kinds at this
//! boundary, so callers branch on the variant instead of matching on error
//! message text.

use async_trait::async_trait;

use crate::config::GenerationConfig;
use crate::render::Message;

/// The external LLM invocation boundary.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Identifier of the underlying model, recorded in call metadata
    /// (e.g. "gemini-2.5-flash").
    fn model_id(&self) -> &str;

    /// Sends the rendered messages to the model and returns its text reply.
    async fn invoke(&self, messages: &[Message], config: &GenerationConfig)
        -> Result<String, BackendError>;
}

/// A backend call failure, classified by kind. None of these are retried by
/// the pipeline; retry policy belongs to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Missing or invalid credentials.
    Auth(String),
    /// The provider rejected the call for rate limiting.
    RateLimit(String),
    /// The account's quota is exhausted.
    Quota(String),
    /// Transport-level failure reaching the provider.
    Network(String),
    /// Anything the provider reported that fits no other kind.
    Other(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::Auth(msg) => write!(f, "backend auth error: {}", msg),
            BackendError::RateLimit(msg) => write!(f, "backend rate limit: {}", msg),
            BackendError::Quota(msg) => write!(f, "backend quota exhausted: {}", msg),
            BackendError::Network(msg) => write!(f, "backend network error: {}", msg),
            BackendError::Other(msg) => write!(f, "backend error: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

/// Provider families a model identifier can resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Gemini,
    OpenAi,
    Anthropic,
    Ollama,
}

/// Immutable mapping from model-identifier prefix to provider family,
/// constructed at startup and passed by reference where needed. Replaces
/// ad hoc substring matching on model names with one explicit table.
#[derive(Debug, Clone)]
pub struct ModelCatalog {
    // longest prefix first, so "ollama/" wins over shorter overlaps
    entries: Vec<(String, Provider)>,
}

impl ModelCatalog {
    /// The catalog of known model families.
    pub fn builtin() -> Self {
        let mut entries: Vec<(String, Provider)> = [
            ("gemini", Provider::Gemini),
            ("gpt", Provider::OpenAi),
            ("claude", Provider::Anthropic),
            ("ollama/", Provider::Ollama),
        ]
        .into_iter()
        .map(|(prefix, provider)| (prefix.to_string(), provider))
        .collect();
        entries.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        Self { entries }
    }

    /// Resolves a model identifier to its provider family, or `None` for an
    /// identifier no entry covers.
    pub fn provider_for(&self, model_id: &str) -> Option<Provider> {
        let lowered = model_id.to_lowercase();
        self.entries
            .iter()
            .find(|(prefix, _)| lowered.starts_with(prefix.as_str()))
            .map(|(_, provider)| *provider)
    }
}
