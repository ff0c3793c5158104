use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetySeverity {
    Low,
    Medium,
    High,
}

impl SafetySeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn from_label(value: &str) -> Option<Self> {
        match value.trim() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyVerdict {
    Allow,
    Warn,
    Block,
}

impl SafetyVerdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Warn => "warn",
            Self::Block => "block",
        }
    }

    pub fn from_label(value: &str) -> Option<Self> {
        match value.trim() {
            "allow" => Some(Self::Allow),
            "warn" => Some(Self::Warn),
            "block" => Some(Self::Block),
            _ => None,
        }
    }
}

/// Outcome of the safety gate for one utterance. Constructed once, never
/// mutated afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModerationResult {
    pub verdict: SafetyVerdict,
    pub severity: SafetySeverity,
    pub categories: Vec<String>,
    pub rationale: Option<String>,
}

impl ModerationResult {
    pub fn allow(rationale: impl Into<String>) -> Self {
        Self {
            verdict: SafetyVerdict::Allow,
            severity: SafetySeverity::Low,
            categories: Vec::new(),
            rationale: Some(rationale.into()),
        }
    }

    pub fn block_high(rationale: impl Into<String>) -> Self {
        Self {
            verdict: SafetyVerdict::Block,
            severity: SafetySeverity::High,
            categories: Vec::new(),
            rationale: Some(rationale.into()),
        }
    }

    pub fn is_blocked(&self) -> bool {
        self.verdict == SafetyVerdict::Block
    }
}

#[cfg(test)]
mod tests {
    use super::{ModerationResult, SafetySeverity, SafetyVerdict};

    #[test]
    fn severity_ordering_is_low_to_high() {
        assert!(SafetySeverity::Low < SafetySeverity::Medium);
        assert!(SafetySeverity::Medium < SafetySeverity::High);
    }

    #[test]
    fn only_block_verdicts_report_blocked() {
        assert!(ModerationResult::block_high("blocked").is_blocked());
        assert!(!ModerationResult::allow("fine").is_blocked());

        let warn = ModerationResult {
            verdict: SafetyVerdict::Warn,
            severity: SafetySeverity::Medium,
            categories: vec!["questionable".to_string()],
            rationale: None,
        };
        assert!(!warn.is_blocked());
    }

    #[test]
    fn labels_round_trip() {
        for verdict in [SafetyVerdict::Allow, SafetyVerdict::Warn, SafetyVerdict::Block] {
            assert_eq!(SafetyVerdict::from_label(verdict.as_str()), Some(verdict));
        }
        for severity in [SafetySeverity::Low, SafetySeverity::Medium, SafetySeverity::High] {
            assert_eq!(SafetySeverity::from_label(severity.as_str()), Some(severity));
        }
        assert_eq!(SafetyVerdict::from_label("deny"), None);
        assert_eq!(SafetySeverity::from_label("critical"), None);
    }
}
