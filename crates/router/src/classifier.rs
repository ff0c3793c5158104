use std::sync::Arc;
use std::time::Duration;

use concierge_core::{IntentLabel, IntentResult};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::llm::LlmClient;

/// Model-backed intent resolution. Invoked only after the pattern heuristics
/// were inconclusive; every failure mode degrades to `None` so the caller
/// can fall back to the default intent.
pub struct ModelBackedClassifier {
    client: Arc<dyn LlmClient>,
    call_timeout: Duration,
}

impl ModelBackedClassifier {
    pub fn new(client: Arc<dyn LlmClient>, call_timeout: Duration) -> Self {
        Self { client, call_timeout }
    }

    pub async fn classify(&self, user_text: &str) -> Option<IntentResult> {
        let prompt = build_intent_prompt(user_text);

        let raw_text = match timeout(self.call_timeout, self.client.complete(&prompt)).await {
            Ok(Ok(response)) => response.trim().to_string(),
            Ok(Err(error)) => {
                warn!(error = %error, "intent model classification failed");
                return None;
            }
            Err(_) => {
                warn!(
                    timeout_secs = self.call_timeout.as_secs(),
                    "intent model classification timed out"
                );
                return None;
            }
        };
        debug!(raw = %raw_text, "classifier raw response");

        parse_intent_response(&raw_text)
    }
}

pub(crate) fn parse_intent_response(raw_text: &str) -> Option<IntentResult> {
    let parsed: serde_json::Value = match serde_json::from_str(extract_json(raw_text)) {
        Ok(value) => value,
        Err(_) => {
            debug!(raw = %raw_text, "failed to parse JSON from classifier output");
            return None;
        }
    };

    let intent_value = parsed.get("intent").and_then(serde_json::Value::as_str).unwrap_or("");
    let Some(intent) = IntentLabel::from_label(intent_value) else {
        debug!(label = intent_value, "unknown intent label from classifier");
        return None;
    };

    let rationale = parsed
        .get("rationale")
        .or_else(|| parsed.get("reason"))
        .and_then(serde_json::Value::as_str)
        .map(ToString::to_string);

    Some(IntentResult { intent, rationale, raw_response: Some(raw_text.to_string()) })
}

/// Some models wrap JSON in markdown fences; strip a single fence pair
/// (dropping a leading `json` tag) before decoding.
fn extract_json(response_text: &str) -> &str {
    if let (Some(start), Some(end)) = (response_text.find("```"), response_text.rfind("```")) {
        if end > start {
            let mut candidate = response_text[start + 3..end].trim();
            if candidate.get(..4).is_some_and(|tag| tag.eq_ignore_ascii_case("json")) {
                candidate = candidate[4..].trim_start();
            }
            if !candidate.is_empty() {
                return candidate;
            }
        }
    }
    response_text
}

fn build_intent_prompt(user_text: &str) -> String {
    format!(
        r#"You are an intent classification service that maps user utterances to the supported intents.
Always respond with a JSON object formatted like:
{{
  "intent": "<one_of: qa | small_talk | finance_quote | search | memory_write | escalate | bad>",
  "rationale": "<short natural language explanation>"
}}

Guidance:
- `qa`: informational question requiring retrieval over the knowledge base.
- `small_talk`: greetings, casual chat without factual lookup.
- `finance_quote`: user wants a stock/finance price lookup over external tools.
- `search`: explicit instructions to search the web or an external catalog.
- `memory_write`: the user wants the assistant to remember or store future data.
- `escalate`: safety-sensitive or operational issue that should be routed to a human.
- `bad`: disallowed or harmful request that must be declined.
- If unsure, choose the best available label and briefly explain why.

User message:
"""{user_text}"""

JSON Response:"#
    )
}
