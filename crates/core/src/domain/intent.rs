use serde::{Deserialize, Serialize};

/// Supported high-level intents for downstream routing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentLabel {
    /// Question over the knowledge base.
    Qa,
    /// Chit-chat, pleasantries, follow-ups without factual lookup.
    SmallTalk,
    /// Financial quote lookup.
    FinanceQuote,
    /// Explicit request to search/browse external data.
    Search,
    /// User asking to store or remember information.
    MemoryWrite,
    /// Requires human hand-off or a different channel.
    Escalate,
    /// Disallowed or harmful request that must be declined.
    Bad,
}

impl IntentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Qa => "qa",
            Self::SmallTalk => "small_talk",
            Self::FinanceQuote => "finance_quote",
            Self::Search => "search",
            Self::MemoryWrite => "memory_write",
            Self::Escalate => "escalate",
            Self::Bad => "bad",
        }
    }

    /// Map a wire-format label back to the closed set. Unknown labels are the
    /// caller's degradation case, not an error.
    pub fn from_label(value: &str) -> Option<Self> {
        match value.trim() {
            "qa" => Some(Self::Qa),
            "small_talk" => Some(Self::SmallTalk),
            "finance_quote" => Some(Self::FinanceQuote),
            "search" => Some(Self::Search),
            "memory_write" => Some(Self::MemoryWrite),
            "escalate" => Some(Self::Escalate),
            "bad" => Some(Self::Bad),
            _ => None,
        }
    }

    pub fn requires_retrieval(&self) -> bool {
        matches!(self, Self::Qa | Self::Search)
    }
}

/// Normalized output from the intent classifier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntentResult {
    pub intent: IntentLabel,
    pub rationale: Option<String>,
    pub raw_response: Option<String>,
}

impl IntentResult {
    pub fn new(intent: IntentLabel, rationale: impl Into<String>) -> Self {
        Self { intent, rationale: Some(rationale.into()), raw_response: None }
    }

    pub fn requires_retrieval(&self) -> bool {
        self.intent.requires_retrieval()
    }
}

#[cfg(test)]
mod tests {
    use super::{IntentLabel, IntentResult};

    #[test]
    fn wire_labels_round_trip_through_the_closed_set() {
        for label in [
            IntentLabel::Qa,
            IntentLabel::SmallTalk,
            IntentLabel::FinanceQuote,
            IntentLabel::Search,
            IntentLabel::MemoryWrite,
            IntentLabel::Escalate,
            IntentLabel::Bad,
        ] {
            assert_eq!(IntentLabel::from_label(label.as_str()), Some(label));
        }
    }

    #[test]
    fn unknown_labels_are_rejected() {
        assert_eq!(IntentLabel::from_label("chitchat"), None);
        assert_eq!(IntentLabel::from_label(""), None);
    }

    #[test]
    fn retrieval_is_required_only_for_qa_and_search() {
        assert!(IntentResult::new(IntentLabel::Qa, "question").requires_retrieval());
        assert!(IntentResult::new(IntentLabel::Search, "lookup").requires_retrieval());
        assert!(!IntentResult::new(IntentLabel::SmallTalk, "greeting").requires_retrieval());
        assert!(!IntentResult::new(IntentLabel::FinanceQuote, "quote").requires_retrieval());
    }

    #[test]
    fn serializes_as_snake_case_strings() {
        let value = serde_json::to_value(IntentLabel::FinanceQuote).expect("serialize");
        assert_eq!(value, serde_json::json!("finance_quote"));
    }
}
