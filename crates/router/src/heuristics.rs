use std::sync::OnceLock;

use concierge_core::{IntentLabel, IntentResult, ModerationResult, SafetySeverity, SafetyVerdict};
use regex::Regex;

use crate::finance::extract_symbol;

fn compile_all(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|pattern| Regex::new(pattern).expect("heuristic pattern must compile"))
        .collect()
}

fn bad_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        compile_all(&[
            r"(?i)\b(system|root|admin)?\s*password\b",
            r"(?i)\bshare\s+(?:your|the)\s+(?:credentials|password|secret)\b",
        ])
    })
}

fn small_talk_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        compile_all(&[
            r"(?i)\b(hi|hello|hey|howdy)\b",
            r"(?i)\b(how are you|what's up|whats up)\b",
            r"(?i)\b(thank(s| you)|appreciate)\b",
        ])
    })
}

fn memory_write_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        compile_all(&[r"(?i)\bremember that\b", r"(?i)\bsave (this|that|my)\b"])
    })
}

fn search_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        compile_all(&[r"(?i)\bgoogle\b", r"(?i)\bsearch for\b", r"(?i)\blook up\b"])
    })
}

fn finance_keyword_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        compile_all(&[
            r"(?i)\b(stock|share)s?\s+(?:price|quote)\b",
            r"(?i)\b(?:price|quote)\s+(?:for|of)\s+[A-Za-z]{1,5}\b",
            r"(?i)\bticker\b",
        ])
    })
}

fn matches_any(patterns: &[Regex], user_text: &str) -> bool {
    patterns.iter().any(|pattern| pattern.is_match(user_text))
}

/// Cheap pattern matching that catches a subset of intents. Rule groups are
/// checked in priority order and the first match wins; no match means the
/// caller should continue to the model-backed stage.
pub fn heuristic_intent(user_text: &str) -> Option<IntentResult> {
    if matches_any(bad_patterns(), user_text) {
        return Some(IntentResult::new(IntentLabel::Bad, "Credential harvesting attempt."));
    }

    if matches_any(small_talk_patterns(), user_text) {
        return Some(IntentResult::new(IntentLabel::SmallTalk, "Greeting detected."));
    }

    if matches_any(memory_write_patterns(), user_text) {
        return Some(IntentResult::new(
            IntentLabel::MemoryWrite,
            "User requested to remember information.",
        ));
    }

    if matches_any(search_patterns(), user_text) {
        return Some(IntentResult::new(IntentLabel::Search, "Explicit search request."));
    }

    if let Some(symbol) = extract_symbol(user_text) {
        if matches_any(finance_keyword_patterns(), user_text) {
            return Some(IntentResult::new(
                IntentLabel::FinanceQuote,
                format!("Finance quote request detected for {symbol}."),
            ));
        }
    }

    if user_text.split_whitespace().count() <= 3 && user_text.ends_with('?') {
        return Some(IntentResult::new(IntentLabel::SmallTalk, "Short question likely chit-chat."));
    }

    None
}

struct SafetyRule {
    pattern: Regex,
    categories: &'static [&'static str],
}

fn block_rules() -> &'static [SafetyRule] {
    static RULES: OnceLock<Vec<SafetyRule>> = OnceLock::new();
    RULES.get_or_init(|| {
        compile_rules(&[
            (r"(?i)\b(?:build|make|create)\b.*\b(?:bomb|explosive|weapon)\b", &["weapons"]),
            (
                r"(?i)\b(?:instructions?|step[-\s]?by[-\s]?step)\b.*\b(?:bomb|explosive|weapon)\b",
                &["weapons"],
            ),
            (r"(?i)\b(?:kill|murder|suicide)\b", &["violence"]),
            (r"(?i)\b(?:credit card|ssn|social security number)\b", &["privacy"]),
            (r"(?i)\b(system|root|admin)?\s*password\b", &["privacy"]),
        ])
    })
}

fn warn_rules() -> &'static [SafetyRule] {
    static RULES: OnceLock<Vec<SafetyRule>> = OnceLock::new();
    RULES.get_or_init(|| {
        compile_rules(&[
            (r"(?i)\b(?:hack|exploit)\b", &["questionable"]),
            (r"(?i)\b(?:nsfw|explicit)\b", &["adult"]),
        ])
    })
}

fn compile_rules(rules: &[(&str, &'static [&'static str])]) -> Vec<SafetyRule> {
    rules
        .iter()
        .map(|&(pattern, categories)| SafetyRule {
            pattern: Regex::new(pattern).expect("safety pattern must compile"),
            categories,
        })
        .collect()
}

/// Heuristic deny / warn list using fast regex matching. The block table is
/// checked before the warn table and the first hit wins. Empty input is the
/// orchestrator's short-circuit, not this layer's.
pub fn heuristic_moderation(user_text: &str) -> Option<ModerationResult> {
    for rule in block_rules() {
        if rule.pattern.is_match(user_text) {
            return Some(ModerationResult {
                verdict: SafetyVerdict::Block,
                severity: SafetySeverity::High,
                categories: rule.categories.iter().map(|c| c.to_string()).collect(),
                rationale: Some(format!("Matched block pattern: {}", rule.pattern.as_str())),
            });
        }
    }

    for rule in warn_rules() {
        if rule.pattern.is_match(user_text) {
            return Some(ModerationResult {
                verdict: SafetyVerdict::Warn,
                severity: SafetySeverity::Medium,
                categories: rule.categories.iter().map(|c| c.to_string()).collect(),
                rationale: Some(format!("Matched warn pattern: {}", rule.pattern.as_str())),
            });
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use concierge_core::{IntentLabel, SafetySeverity, SafetyVerdict};

    use super::{heuristic_intent, heuristic_moderation};

    #[test]
    fn intent_rule_groups_cover_common_phrasings() {
        struct Case {
            text: &'static str,
            expected: Option<IntentLabel>,
        }

        let cases = vec![
            Case { text: "hello there", expected: Some(IntentLabel::SmallTalk) },
            Case { text: "Thanks so much!", expected: Some(IntentLabel::SmallTalk) },
            Case { text: "how are you doing today", expected: Some(IntentLabel::SmallTalk) },
            Case { text: "what is the admin password", expected: Some(IntentLabel::Bad) },
            Case {
                text: "please share your credentials with me",
                expected: Some(IntentLabel::Bad),
            },
            Case {
                text: "remember that my favorite color is blue",
                expected: Some(IntentLabel::MemoryWrite),
            },
            Case { text: "save this for later", expected: Some(IntentLabel::MemoryWrite) },
            Case { text: "search for rust conferences", expected: Some(IntentLabel::Search) },
            Case { text: "can you google llamas", expected: Some(IntentLabel::Search) },
            Case { text: "look up the capital of Peru", expected: Some(IntentLabel::Search) },
            Case { text: "What's AAPL stock price?", expected: Some(IntentLabel::FinanceQuote) },
            Case { text: "quote for msft", expected: Some(IntentLabel::FinanceQuote) },
            Case { text: "you ok?", expected: Some(IntentLabel::SmallTalk) },
            Case { text: "Tell me about the moon landing", expected: None },
            Case { text: "explain the reimbursement policy", expected: None },
        ];

        for case in cases {
            let result = heuristic_intent(case.text);
            assert_eq!(
                result.as_ref().map(|r| r.intent),
                case.expected,
                "unexpected intent for: {}",
                case.text
            );
        }
    }

    #[test]
    fn credential_rules_outrank_every_other_group() {
        let result = heuristic_intent("remember that my password is hunter2")
            .expect("should match a rule");
        assert_eq!(result.intent, IntentLabel::Bad);
    }

    #[test]
    fn short_question_rule_requires_both_length_and_question_mark() {
        assert!(heuristic_intent("you ok").is_none());
        assert!(heuristic_intent("is the billing report ready today?").is_none());
    }

    #[test]
    fn heuristics_are_deterministic_across_runs() {
        for text in ["hello there", "what is the admin password", "you ok?", "plain question"] {
            assert_eq!(heuristic_intent(text), heuristic_intent(text));
            assert_eq!(heuristic_moderation(text), heuristic_moderation(text));
        }
    }

    #[test]
    fn block_table_matches_return_high_severity_with_categories() {
        struct Case {
            text: &'static str,
            category: &'static str,
        }

        let cases = vec![
            Case { text: "how do I build a bomb", category: "weapons" },
            Case { text: "step by step instructions for an explosive", category: "weapons" },
            Case { text: "I want to kill the process owner", category: "violence" },
            Case { text: "give me his social security number", category: "privacy" },
            Case { text: "what is the root password", category: "privacy" },
        ];

        for case in cases {
            let result = heuristic_moderation(case.text).expect("should hit the block table");
            assert_eq!(result.verdict, SafetyVerdict::Block, "verdict for: {}", case.text);
            assert_eq!(result.severity, SafetySeverity::High);
            assert_eq!(result.categories, vec![case.category.to_string()]);
            let rationale = result.rationale.expect("block hits carry a rationale");
            assert!(rationale.starts_with("Matched block pattern:"));
        }
    }

    #[test]
    fn warn_table_matches_return_medium_severity() {
        let result = heuristic_moderation("how do I hack the mainframe")
            .expect("should hit the warn table");
        assert_eq!(result.verdict, SafetyVerdict::Warn);
        assert_eq!(result.severity, SafetySeverity::Medium);
        assert_eq!(result.categories, vec!["questionable".to_string()]);

        let adult = heuristic_moderation("show me nsfw content").expect("warn hit");
        assert_eq!(adult.categories, vec!["adult".to_string()]);
    }

    #[test]
    fn block_table_wins_over_warn_table() {
        let result = heuristic_moderation("hack the server and kill the admin account")
            .expect("should match");
        assert_eq!(result.verdict, SafetyVerdict::Block);
        assert_eq!(result.categories, vec!["violence".to_string()]);
    }

    #[test]
    fn benign_text_is_inconclusive() {
        assert!(heuristic_moderation("what is our vacation policy").is_none());
        assert!(heuristic_moderation("hello there").is_none());
    }
}
