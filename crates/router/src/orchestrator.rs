use std::sync::Arc;
use std::time::Duration;

use concierge_core::config::AppConfig;
use concierge_core::{
    IntentLabel, IntentResult, ModelId, ModerationResult, ResponsePayload, RoutingDecision,
};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::classifier::ModelBackedClassifier;
use crate::engines::{EngineCache, EngineOptions};
use crate::heuristics;
use crate::llm::LlmClient;
use crate::moderator::ModelBackedModerator;
use crate::small_talk;

const MEMORY_ACK_RESPONSE: &str = "I'll remember that for later once memory storage is enabled.";
const RETRIEVAL_UNAVAILABLE_RESPONSE: &str =
    "Sorry, I couldn't reach the knowledge base right now.";
const SMALL_TALK_TEMPERATURE: f32 = 0.6;

/// Central orchestration that combines the safety gate and intent
/// classification into one decision, then dispatches to the matching
/// handling path. The worst case for any request is the `qa` default path;
/// no collaborator failure ever aborts a request.
pub struct RoutingOrchestrator {
    engines: Arc<EngineCache>,
    safety_model: String,
    temperature: f32,
    num_ctx: u32,
    llm_timeout: Duration,
    retrieval_timeout: Duration,
}

impl RoutingOrchestrator {
    pub fn new(engines: Arc<EngineCache>, config: &AppConfig) -> Self {
        Self {
            engines,
            safety_model: config.llm.safety_model.clone(),
            temperature: config.llm.temperature,
            num_ctx: config.llm.num_ctx,
            llm_timeout: Duration::from_secs(config.llm.timeout_secs),
            retrieval_timeout: Duration::from_secs(config.retrieval.timeout_secs),
        }
    }

    /// Combine moderation and classification into one immutable decision.
    /// A blocked verdict forces the `bad` intent and skips classification.
    pub async fn analyze(&self, user_text: &str, model: ModelId) -> RoutingDecision {
        let trimmed = user_text.trim();

        let moderation = self.run_moderation(trimmed, model).await;
        if moderation.is_blocked() {
            let rationale = moderation.rationale.clone();
            return RoutingDecision {
                intent: IntentLabel::Bad,
                moderation,
                should_refuse: true,
                should_escalate: false,
                rationale,
            };
        }

        let intent_result = self.run_classification(trimmed, model).await;
        let should_escalate = intent_result.intent == IntentLabel::Escalate;
        let should_refuse = intent_result.intent == IntentLabel::Bad;

        RoutingDecision {
            intent: intent_result.intent,
            moderation,
            should_refuse,
            should_escalate,
            rationale: intent_result.rationale,
        }
    }

    /// Full pipeline: analyze, dispatch, and wrap the answer in the
    /// response envelope.
    pub async fn respond(&self, user_text: &str, model: ModelId) -> ResponsePayload {
        let decision = self.analyze(user_text, model).await;
        debug!(
            intent = decision.intent.as_str(),
            verdict = decision.moderation.verdict.as_str(),
            "routing decision"
        );

        if decision.should_refuse {
            return decision.render_payload(decision.render_refusal_response());
        }

        if decision.should_escalate {
            return decision.render_payload(decision.render_escalation_response());
        }

        match decision.intent {
            IntentLabel::SmallTalk => {
                let answer = self.generate_small_talk(user_text, model).await;
                decision.render_payload(answer)
            }
            IntentLabel::MemoryWrite => decision.render_payload(MEMORY_ACK_RESPONSE),
            _ => {
                let answer = self.run_retrieval(user_text, model).await;
                decision.render_payload(answer)
            }
        }
    }

    async fn run_moderation(&self, trimmed: &str, model: ModelId) -> ModerationResult {
        if trimmed.is_empty() {
            return ModerationResult::block_high("Empty user input.");
        }

        if let Some(result) = heuristics::heuristic_moderation(trimmed) {
            return result;
        }

        if let Some(result) = self.run_model_moderation(trimmed, model).await {
            return result;
        }

        ModerationResult::allow("No safety issues detected.")
    }

    async fn run_model_moderation(&self, trimmed: &str, model: ModelId) -> Option<ModerationResult> {
        let client = self.moderation_client(model)?;
        ModelBackedModerator::new(client, self.llm_timeout).moderate(trimmed).await
    }

    /// Resolve the safety-tuned handle, falling back exactly once to the
    /// request's general-purpose model when it cannot be built.
    fn moderation_client(&self, model: ModelId) -> Option<Arc<dyn LlmClient>> {
        let options = self.base_options();
        match self.engines.completion_client(&self.safety_model, &options) {
            Ok(client) => Some(client),
            Err(error) => {
                warn!(
                    error = %error,
                    safety_model = %self.safety_model,
                    "safety model unavailable, falling back to the general-purpose model"
                );
                match self.engines.completion_client(model.as_str(), &options) {
                    Ok(client) => Some(client),
                    Err(error) => {
                        warn!(error = %error, model = model.as_str(), "moderation fallback model unavailable");
                        None
                    }
                }
            }
        }
    }

    async fn run_classification(&self, trimmed: &str, model: ModelId) -> IntentResult {
        if trimmed.is_empty() {
            return IntentResult::new(IntentLabel::Bad, "Empty input.");
        }

        if let Some(result) = heuristics::heuristic_intent(trimmed) {
            return result;
        }

        if let Some(result) = self.run_model_classification(trimmed, model).await {
            return result;
        }

        IntentResult::new(IntentLabel::Qa, "Fallback default after classifier failure.")
    }

    async fn run_model_classification(&self, trimmed: &str, model: ModelId) -> Option<IntentResult> {
        match self.engines.completion_client(model.as_str(), &self.base_options()) {
            Ok(client) => {
                ModelBackedClassifier::new(client, self.llm_timeout).classify(trimmed).await
            }
            Err(error) => {
                warn!(error = %error, model = model.as_str(), "classification model unavailable");
                None
            }
        }
    }

    async fn generate_small_talk(&self, user_text: &str, model: ModelId) -> String {
        let options = EngineOptions { temperature: SMALL_TALK_TEMPERATURE, num_ctx: self.num_ctx };
        match self.engines.completion_client(model.as_str(), &options) {
            Ok(client) => {
                small_talk::generate_small_talk_response(client.as_ref(), user_text, self.llm_timeout)
                    .await
            }
            Err(error) => {
                warn!(error = %error, model = model.as_str(), "small talk model unavailable");
                small_talk::fallback_response().to_string()
            }
        }
    }

    async fn run_retrieval(&self, user_text: &str, model: ModelId) -> String {
        let engine = match self.engines.query_engine(model.as_str(), &self.base_options()) {
            Ok(engine) => engine,
            Err(error) => {
                warn!(error = %error, model = model.as_str(), "retrieval engine unavailable");
                return RETRIEVAL_UNAVAILABLE_RESPONSE.to_string();
            }
        };

        match timeout(self.retrieval_timeout, engine.query(user_text)).await {
            Ok(Ok(response)) => response.text,
            Ok(Err(error)) => {
                warn!(error = %error, "retrieval query failed");
                RETRIEVAL_UNAVAILABLE_RESPONSE.to_string()
            }
            Err(_) => {
                warn!(
                    timeout_secs = self.retrieval_timeout.as_secs(),
                    "retrieval query timed out"
                );
                RETRIEVAL_UNAVAILABLE_RESPONSE.to_string()
            }
        }
    }

    fn base_options(&self) -> EngineOptions {
        EngineOptions { temperature: self.temperature, num_ctx: self.num_ctx }
    }
}
