use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Text-completion collaborator used for classification, moderation, and
/// small-talk generation.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

/// Conversational collaborator backing the multi-turn chat path.
#[async_trait]
pub trait ChatEngine: Send + Sync {
    async fn chat(&self, history: &[ChatTurn], message: &str) -> Result<String>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryResponse {
    pub text: String,
}

/// Knowledge-grounded answering collaborator. The retrieval index itself
/// lives behind this seam.
#[async_trait]
pub trait QueryEngine: Send + Sync {
    async fn query(&self, text: &str) -> Result<QueryResponse>;
}
