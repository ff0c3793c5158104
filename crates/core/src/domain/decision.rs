use serde::{Deserialize, Serialize};

use crate::domain::intent::IntentLabel;
use crate::domain::moderation::ModerationResult;

/// Composite outcome of moderation plus classification for one utterance.
/// Fields are computed once by the orchestrator and never mutated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoutingDecision {
    pub intent: IntentLabel,
    pub moderation: ModerationResult,
    pub should_refuse: bool,
    pub should_escalate: bool,
    pub rationale: Option<String>,
}

impl RoutingDecision {
    pub fn render_refusal_response(&self) -> &'static str {
        if self.moderation.is_blocked() {
            "I'm sorry, but I can't assist with that request."
        } else {
            "I'm sorry, but I can't comply with that request."
        }
    }

    pub fn render_escalation_response(&self) -> &'static str {
        "This request may require a human assistant. I've forwarded the details."
    }

    /// Wrap an answer in the response envelope. Callers must never see a
    /// bare answer string without the routing metadata.
    pub fn render_payload(&self, answer: impl Into<String>) -> ResponsePayload {
        ResponsePayload {
            answer: answer.into(),
            intent: self.intent,
            moderation: self.moderation.clone(),
            routing_rationale: self.rationale.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponsePayload {
    pub answer: String,
    pub intent: IntentLabel,
    pub moderation: ModerationResult,
    pub routing_rationale: Option<String>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::domain::intent::IntentLabel;
    use crate::domain::moderation::{ModerationResult, SafetySeverity, SafetyVerdict};

    use super::RoutingDecision;

    fn refusal_decision(moderation: ModerationResult) -> RoutingDecision {
        RoutingDecision {
            intent: IntentLabel::Bad,
            moderation,
            should_refuse: true,
            should_escalate: false,
            rationale: Some("declined".to_string()),
        }
    }

    #[test]
    fn blocked_refusals_use_the_assist_wording() {
        let decision = refusal_decision(ModerationResult::block_high("matched block pattern"));
        assert_eq!(
            decision.render_refusal_response(),
            "I'm sorry, but I can't assist with that request."
        );
    }

    #[test]
    fn unblocked_refusals_use_the_comply_wording() {
        let decision = refusal_decision(ModerationResult::allow("no safety issues"));
        assert_eq!(
            decision.render_refusal_response(),
            "I'm sorry, but I can't comply with that request."
        );
    }

    #[test]
    fn payload_envelope_matches_the_wire_contract() {
        let decision = RoutingDecision {
            intent: IntentLabel::Qa,
            moderation: ModerationResult {
                verdict: SafetyVerdict::Warn,
                severity: SafetySeverity::Medium,
                categories: vec!["questionable".to_string()],
                rationale: Some("matched warn pattern".to_string()),
            },
            should_refuse: false,
            should_escalate: false,
            rationale: Some("informational question".to_string()),
        };

        let value = serde_json::to_value(decision.render_payload("the answer")).expect("serialize");
        assert_eq!(
            value,
            json!({
                "answer": "the answer",
                "intent": "qa",
                "moderation": {
                    "verdict": "warn",
                    "severity": "medium",
                    "categories": ["questionable"],
                    "rationale": "matched warn pattern",
                },
                "routing_rationale": "informational question",
            })
        );
    }

    #[test]
    fn missing_rationales_serialize_as_null() {
        let decision = RoutingDecision {
            intent: IntentLabel::SmallTalk,
            moderation: ModerationResult {
                verdict: SafetyVerdict::Allow,
                severity: SafetySeverity::Low,
                categories: Vec::new(),
                rationale: None,
            },
            should_refuse: false,
            should_escalate: false,
            rationale: None,
        };

        let value = serde_json::to_value(decision.render_payload("hi")).expect("serialize");
        assert_eq!(value["routing_rationale"], serde_json::Value::Null);
        assert_eq!(value["moderation"]["rationale"], serde_json::Value::Null);
    }
}
