use std::sync::{Arc, OnceLock};
use std::time::Duration;

use concierge_core::{ModerationResult, SafetySeverity, SafetyVerdict};
use regex::Regex;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::llm::LlmClient;

const MODERATION_CATEGORIES: &[&str] =
    &["self-harm", "hate", "violence", "weapons", "sexual", "privacy", "other"];

/// Model-backed moderation resolution against a safety-tuned model. Each
/// field of the plain-text reply is extracted independently so a partially
/// malformed reply still yields a usable, conservative result; only an
/// invocation failure is inconclusive.
pub struct ModelBackedModerator {
    client: Arc<dyn LlmClient>,
    call_timeout: Duration,
}

impl ModelBackedModerator {
    pub fn new(client: Arc<dyn LlmClient>, call_timeout: Duration) -> Self {
        Self { client, call_timeout }
    }

    pub async fn moderate(&self, user_text: &str) -> Option<ModerationResult> {
        let prompt = build_moderation_prompt(user_text);

        let output = match timeout(self.call_timeout, self.client.complete(&prompt)).await {
            Ok(Ok(response)) => response.trim().to_string(),
            Ok(Err(error)) => {
                warn!(error = %error, "moderation model call failed");
                return None;
            }
            Err(_) => {
                warn!(
                    timeout_secs = self.call_timeout.as_secs(),
                    "moderation model call timed out"
                );
                return None;
            }
        };
        debug!(raw = %output, "moderation raw response");

        Some(parse_moderation_response(&output))
    }
}

pub(crate) fn parse_moderation_response(output: &str) -> ModerationResult {
    let verdict = line_value(output, verdict_pattern())
        .and_then(SafetyVerdict::from_label)
        .unwrap_or(SafetyVerdict::Allow);

    let severity = line_value(output, severity_pattern())
        .and_then(SafetySeverity::from_label)
        .unwrap_or(SafetySeverity::Low);

    let categories = line_value(output, categories_pattern())
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|category| !category.is_empty())
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default();

    let rationale = line_value(output, rationale_pattern()).map(ToString::to_string);

    ModerationResult { verdict, severity, categories, rationale }
}

fn line_value<'a>(output: &'a str, pattern: &Regex) -> Option<&'a str> {
    pattern.captures(output).and_then(|captures| captures.get(1)).map(|m| m.as_str().trim())
}

fn verdict_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)verdict\s*:\s*(.+)").expect("pattern must compile"))
}

fn severity_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)severity\s*:\s*(.+)").expect("pattern must compile"))
}

fn categories_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)categories\s*:\s*(.+)").expect("pattern must compile"))
}

fn rationale_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)rationale\s*:\s*(.+)").expect("pattern must compile"))
}

fn build_moderation_prompt(user_text: &str) -> String {
    let categories = MODERATION_CATEGORIES.join(", ");
    format!(
        r#"You are a content moderation classifier. Inspect the user message and determine whether the AI assistant should comply.
Respond with plain text lines formatted exactly as:
verdict: <allow|warn|block>
severity: <low|medium|high>
categories: <comma separated list drawn from {categories}>
rationale: <one sentence justification>

If the content is clearly safe, return "allow" and "low" severity.

User message:
"""{user_text}""""#
    )
}
