use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use concierge_core::{ModelId, ResponsePayload};
use concierge_router::engines::{EngineCache, EngineOptions};
use concierge_router::llm::ChatTurn;
use concierge_router::orchestrator::RoutingOrchestrator;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Arc<RoutingOrchestrator>,
    pub engines: Arc<EngineCache>,
    pub chat_options: EngineOptions,
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
    #[serde(default)]
    pub model: ModelId,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatTurn>,
    #[serde(default)]
    pub model: ModelId,
}

#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct ChatResponse {
    pub answer: String,
}

#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct ApiError {
    pub error: String,
}

pub fn router(state: ApiState) -> Router {
    Router::new().route("/ask", post(ask)).route("/chat", post(chat)).with_state(state)
}

/// Classic single-turn path: one question through the full routing
/// pipeline. The pipeline never fails a request, so this handler has no
/// error branch.
pub async fn ask(
    State(state): State<ApiState>,
    Json(request): Json<AskRequest>,
) -> Json<ResponsePayload> {
    Json(state.orchestrator.respond(&request.question, request.model).await)
}

/// Multi-turn conversation against the chat engine. History validation is a
/// boundary concern; a malformed history is rejected here and never reaches
/// the engine.
pub async fn chat(
    State(state): State<ApiState>,
    Json(mut request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, Json<ApiError>)> {
    let Some(last) = request.messages.pop() else {
        return Err(bad_request("chat history must not be empty"));
    };
    if last.role != "user" {
        return Err(bad_request("last message must be from the user"));
    }

    let engine = state
        .engines
        .chat_engine(request.model.as_str(), &state.chat_options)
        .map_err(|error| {
            warn!(error = %error, model = request.model.as_str(), "chat engine unavailable");
            service_unavailable("chat engine is unavailable")
        })?;

    match engine.chat(&request.messages, &last.content).await {
        Ok(answer) => Ok(Json(ChatResponse { answer })),
        Err(error) => {
            warn!(error = %error, "chat backend did not answer");
            Err(service_unavailable("chat backend did not answer"))
        }
    }
}

fn bad_request(message: &str) -> (StatusCode, Json<ApiError>) {
    (StatusCode::BAD_REQUEST, Json(ApiError { error: message.to_string() }))
}

fn service_unavailable(message: &str) -> (StatusCode, Json<ApiError>) {
    (StatusCode::SERVICE_UNAVAILABLE, Json(ApiError { error: message.to_string() }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::Result;
    use async_trait::async_trait;
    use axum::{extract::State, http::StatusCode, Json};
    use concierge_core::config::AppConfig;
    use concierge_core::IntentLabel;
    use concierge_router::engines::{EngineCache, EngineFactory, EngineOptions};
    use concierge_router::llm::{ChatEngine, ChatTurn, LlmClient, QueryEngine, QueryResponse};
    use concierge_router::orchestrator::RoutingOrchestrator;

    use super::{ask, chat, ApiState, AskRequest, ChatRequest};

    struct ScriptedLlm(&'static str);

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct ScriptedChat(&'static str);

    #[async_trait]
    impl ChatEngine for ScriptedChat {
        async fn chat(&self, _history: &[ChatTurn], _message: &str) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct ScriptedQuery(&'static str);

    #[async_trait]
    impl QueryEngine for ScriptedQuery {
        async fn query(&self, _text: &str) -> Result<QueryResponse> {
            Ok(QueryResponse { text: self.0.to_string() })
        }
    }

    struct ScriptedFactory;

    impl EngineFactory for ScriptedFactory {
        fn completion_client(
            &self,
            model: &str,
            _options: &EngineOptions,
        ) -> Result<Arc<dyn LlmClient>> {
            if model == "llama-guard3" {
                return Ok(Arc::new(ScriptedLlm(
                    "verdict: allow\nseverity: low\nrationale: no safety issues",
                )));
            }
            Ok(Arc::new(ScriptedLlm("Hey! Good to see you.")))
        }

        fn chat_engine(&self, _model: &str, _options: &EngineOptions) -> Result<Arc<dyn ChatEngine>> {
            Ok(Arc::new(ScriptedChat("hello from the chat engine")))
        }

        fn query_engine(&self, _model: &str, _options: &EngineOptions) -> Result<Arc<dyn QueryEngine>> {
            Ok(Arc::new(ScriptedQuery("retrieved answer")))
        }
    }

    fn api_state() -> ApiState {
        let config = AppConfig::default();
        let engines = Arc::new(EngineCache::new(config.engines.capacity, Arc::new(ScriptedFactory)));
        ApiState {
            orchestrator: Arc::new(RoutingOrchestrator::new(Arc::clone(&engines), &config)),
            engines,
            chat_options: EngineOptions {
                temperature: config.llm.temperature,
                num_ctx: config.llm.num_ctx,
            },
        }
    }

    #[test]
    fn unknown_model_ids_fail_request_deserialization() {
        let error = serde_json::from_str::<AskRequest>(
            r#"{"question": "hi", "model": "gpt5-ultra"}"#,
        )
        .expect_err("unknown model must be rejected at the boundary");
        assert!(error.to_string().contains("unknown variant"));
    }

    #[test]
    fn missing_model_defaults_to_mistral() {
        let request: AskRequest =
            serde_json::from_str(r#"{"question": "hi"}"#).expect("deserialize");
        assert_eq!(request.model.as_str(), "mistral");
    }

    #[tokio::test]
    async fn ask_returns_the_full_routing_envelope() {
        let Json(payload) = ask(
            State(api_state()),
            Json(AskRequest {
                question: "hello there".to_string(),
                model: concierge_core::ModelId::Mistral,
            }),
        )
        .await;

        assert_eq!(payload.intent, IntentLabel::SmallTalk);
        assert_eq!(payload.answer, "Hey! Good to see you.");
        assert_eq!(payload.moderation.verdict.as_str(), "allow");
    }

    #[tokio::test]
    async fn chat_answers_through_the_cached_chat_engine() {
        let request = ChatRequest {
            messages: vec![ChatTurn { role: "user".to_string(), content: "hi".to_string() }],
            model: concierge_core::ModelId::Mistral,
        };

        let Json(response) =
            chat(State(api_state()), Json(request)).await.expect("chat should answer");
        assert_eq!(response.answer, "hello from the chat engine");
    }

    #[tokio::test]
    async fn chat_rejects_a_history_not_ending_with_the_user() {
        let request = ChatRequest {
            messages: vec![
                ChatTurn { role: "user".to_string(), content: "hi".to_string() },
                ChatTurn { role: "assistant".to_string(), content: "hello!".to_string() },
            ],
            model: concierge_core::ModelId::Mistral,
        };

        let (status, Json(body)) =
            chat(State(api_state()), Json(request)).await.expect_err("should reject");
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "last message must be from the user");
    }

    #[tokio::test]
    async fn chat_rejects_an_empty_history() {
        let request =
            ChatRequest { messages: Vec::new(), model: concierge_core::ModelId::Mistral };

        let (status, Json(body)) =
            chat(State(api_state()), Json(request)).await.expect_err("should reject");
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "chat history must not be empty");
    }
}
