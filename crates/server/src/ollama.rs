use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use concierge_core::config::AppConfig;
use concierge_router::engines::{EngineFactory, EngineOptions};
use concierge_router::llm::{ChatEngine, ChatTurn, LlmClient, QueryEngine, QueryResponse};
use serde::{Deserialize, Serialize};

const CHAT_INSTRUCTION: &str = "You are a helpful assistant that can handle both ordinary \
conversation and answering questions using retrieved context. If the user is simply greeting or \
chatting, respond naturally and politely as in normal conversation. If the user asks a factual \
question or about the retrieved context, answer clearly and concisely, keeping it short (1-2 \
sentences) and avoiding unnecessary reasoning loops or speculation.";

#[derive(Clone, Copy, Debug, Serialize)]
struct ModelOptions {
    temperature: f32,
    num_ctx: u32,
}

impl From<&EngineOptions> for ModelOptions {
    fn from(options: &EngineOptions) -> Self {
        Self { temperature: options.temperature, num_ctx: options.num_ctx }
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: ModelOptions,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Text-completion collaborator against Ollama's `/api/generate`.
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    options: ModelOptions,
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: self.options,
        };

        let response = self
            .http
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()
            .await
            .context("generate request failed")?
            .error_for_status()
            .context("generate request was rejected")?
            .json::<GenerateResponse>()
            .await
            .context("generate response was not valid JSON")?;

        Ok(response.response)
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatTurn>,
    stream: bool,
    options: ModelOptions,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    message: ChatMessageBody,
}

#[derive(Debug, Deserialize)]
struct ChatMessageBody {
    content: String,
}

/// Conversational collaborator against Ollama's `/api/chat`, with the
/// standing system instruction prepended to every exchange.
pub struct OllamaChatEngine {
    http: reqwest::Client,
    base_url: String,
    model: String,
    options: ModelOptions,
}

pub(crate) fn build_chat_messages(history: &[ChatTurn], message: &str) -> Vec<ChatTurn> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatTurn { role: "system".to_string(), content: CHAT_INSTRUCTION.to_string() });
    messages.extend(history.iter().cloned());
    messages.push(ChatTurn { role: "user".to_string(), content: message.to_string() });
    messages
}

#[async_trait]
impl ChatEngine for OllamaChatEngine {
    async fn chat(&self, history: &[ChatTurn], message: &str) -> Result<String> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: build_chat_messages(history, message),
            stream: false,
            options: self.options,
        };

        let response = self
            .http
            .post(format!("{}/api/chat", self.base_url))
            .json(&request)
            .send()
            .await
            .context("chat request failed")?
            .error_for_status()
            .context("chat request was rejected")?
            .json::<ChatCompletionResponse>()
            .await
            .context("chat response was not valid JSON")?;

        Ok(response.message.content)
    }
}

#[derive(Debug, Serialize)]
struct RetrievalRequest<'a> {
    query: &'a str,
    model: &'a str,
}

#[derive(Debug, Deserialize)]
struct RetrievalResponse {
    text: String,
}

/// Knowledge-grounded answering collaborator. The index and search live in
/// the retrieval service; this client only speaks its query contract.
pub struct RetrievalClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
}

#[async_trait]
impl QueryEngine for RetrievalClient {
    async fn query(&self, text: &str) -> Result<QueryResponse> {
        let request = RetrievalRequest { query: text, model: &self.model };

        let response = self
            .http
            .post(format!("{}/query", self.endpoint))
            .json(&request)
            .send()
            .await
            .context("retrieval request failed")?
            .error_for_status()
            .context("retrieval request was rejected")?
            .json::<RetrievalResponse>()
            .await
            .context("retrieval response was not valid JSON")?;

        Ok(QueryResponse { text: response.text })
    }
}

/// Builds the concrete collaborator handles the engine cache hands out.
pub struct OllamaEngineFactory {
    llm_http: reqwest::Client,
    retrieval_http: reqwest::Client,
    base_url: String,
    retrieval_endpoint: String,
}

impl OllamaEngineFactory {
    pub fn from_config(config: &AppConfig) -> Result<Self, reqwest::Error> {
        let llm_http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.llm.timeout_secs))
            .build()?;
        let retrieval_http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.retrieval.timeout_secs))
            .build()?;

        Ok(Self {
            llm_http,
            retrieval_http,
            base_url: config.llm.base_url.trim_end_matches('/').to_string(),
            retrieval_endpoint: config.retrieval.endpoint.trim_end_matches('/').to_string(),
        })
    }
}

impl EngineFactory for OllamaEngineFactory {
    fn completion_client(
        &self,
        model: &str,
        options: &EngineOptions,
    ) -> Result<Arc<dyn LlmClient>> {
        Ok(Arc::new(OllamaClient {
            http: self.llm_http.clone(),
            base_url: self.base_url.clone(),
            model: model.to_string(),
            options: options.into(),
        }))
    }

    fn chat_engine(&self, model: &str, options: &EngineOptions) -> Result<Arc<dyn ChatEngine>> {
        Ok(Arc::new(OllamaChatEngine {
            http: self.llm_http.clone(),
            base_url: self.base_url.clone(),
            model: model.to_string(),
            options: options.into(),
        }))
    }

    fn query_engine(&self, model: &str, _options: &EngineOptions) -> Result<Arc<dyn QueryEngine>> {
        Ok(Arc::new(RetrievalClient {
            http: self.retrieval_http.clone(),
            endpoint: self.retrieval_endpoint.clone(),
            model: model.to_string(),
        }))
    }
}
