use std::time::Duration;

use tokio::time::timeout;
use tracing::warn;

use crate::llm::LlmClient;

const FALLBACK_RESPONSE: &str = "Hi there! How can I help you today?";

pub fn fallback_response() -> &'static str {
    FALLBACK_RESPONSE
}

/// Short chit-chat generation for non-retrieval paths. Any failure falls
/// back to the canned greeting rather than surfacing an error.
pub async fn generate_small_talk_response(
    client: &dyn LlmClient,
    user_text: &str,
    call_timeout: Duration,
) -> String {
    let prompt = format!(
        r#"You are a friendly assistant engaging in casual small talk.
Respond warmly and concisely (max 2 sentences) to the user message:
"""{user_text}""""#
    );

    match timeout(call_timeout, client.complete(&prompt)).await {
        Ok(Ok(response)) => response.trim().to_string(),
        Ok(Err(error)) => {
            warn!(error = %error, "small talk generation failed");
            FALLBACK_RESPONSE.to_string()
        }
        Err(_) => {
            warn!(timeout_secs = call_timeout.as_secs(), "small talk generation timed out");
            FALLBACK_RESPONSE.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use anyhow::bail;
    use async_trait::async_trait;

    use crate::llm::LlmClient;

    use super::{fallback_response, generate_small_talk_response};

    struct ScriptedLlm(&'static str);

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn complete(&self, _prompt: &str) -> anyhow::Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct FailingLlm;

    #[async_trait]
    impl LlmClient for FailingLlm {
        async fn complete(&self, _prompt: &str) -> anyhow::Result<String> {
            bail!("generation backend offline")
        }
    }

    #[tokio::test]
    async fn returns_the_trimmed_generation() {
        let answer =
            generate_small_talk_response(&ScriptedLlm("  Hey! Great to see you.  "), "hi", Duration::from_secs(5))
                .await;
        assert_eq!(answer, "Hey! Great to see you.");
    }

    #[tokio::test]
    async fn generation_failure_falls_back_to_the_canned_greeting() {
        let answer =
            generate_small_talk_response(&FailingLlm, "hi", Duration::from_secs(5)).await;
        assert_eq!(answer, fallback_response());
    }
}
