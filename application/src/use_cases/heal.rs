//! Self-healing of failed code fragments
//!
//! When a fragment fails to execute, the owning provider gets one chance
//! to repair its own code: the error output is fed back at low temperature
//! and the first executable fragment of the reply becomes the candidate
//! fix. Healing is best-effort; any failure along the way simply leaves
//! the original execution result in place.

use crate::ports::completion_gateway::CompletionGateway;
use gateway_domain::{CodeFragment, extract_fragments};
use tracing::{info, warn};

/// Ask `gateway` to repair a failed fragment. Returns the candidate fix,
/// or `None` when the provider errored or returned no executable code.
pub async fn heal_fragment(
    gateway: &dyn CompletionGateway,
    fragment: &CodeFragment,
    stderr: &str,
    temperature: f64,
) -> Option<CodeFragment> {
    let prompt = format!(
        "The following {language} code failed to execute with an error.\n\
         Fix the code to resolve the error. Return ONLY the fixed code.\n\n\
         ERROR:\n{stderr}\n\n\
         BROKEN CODE:\n```{language}\n{code}\n```\n\n\
         FIXED CODE:",
        language = fragment.language,
        code = fragment.code,
    );

    info!(provider = %gateway.provider(), "attempting to heal failed fragment");

    let text = match gateway.complete(&prompt, temperature).await {
        Ok(text) => text,
        Err(e) => {
            warn!(provider = %gateway.provider(), error = %e, "healing call failed");
            return None;
        }
    };

    let fixed = extract_fragments(&text, &fragment.language)
        .into_iter()
        .find(|f| f.is_executable());

    if fixed.is_none() {
        warn!("no executable code in healing response");
    }
    fixed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::completion_gateway::ProviderError;
    use async_trait::async_trait;
    use gateway_domain::ProviderId;

    struct FixedReply(Result<String, ProviderError>);

    #[async_trait]
    impl CompletionGateway for FixedReply {
        fn provider(&self) -> ProviderId {
            ProviderId::Groq
        }

        fn model_name(&self) -> &str {
            "test-model"
        }

        async fn complete(&self, _: &str, _: f64) -> Result<String, ProviderError> {
            self.0.clone()
        }
    }

    fn broken() -> CodeFragment {
        CodeFragment::new("python", "print(undefined_name)", 0)
    }

    #[tokio::test]
    async fn test_heal_extracts_fixed_code() {
        let gateway = FixedReply(Ok(
            "Here is the fix:\n```python\nprint(\"fixed\")\n```".to_string()
        ));

        let fixed = heal_fragment(&gateway, &broken(), "NameError", 0.2)
            .await
            .unwrap();
        assert_eq!(fixed.code, "print(\"fixed\")");
        assert_eq!(fixed.language, "python");
    }

    #[tokio::test]
    async fn test_heal_gives_up_on_provider_error() {
        let gateway = FixedReply(Err(ProviderError::Network("down".into())));
        assert!(
            heal_fragment(&gateway, &broken(), "NameError", 0.2)
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_heal_gives_up_without_executable_code() {
        let gateway = FixedReply(Ok("Sorry, I cannot help with that.".to_string()));
        assert!(
            heal_fragment(&gateway, &broken(), "NameError", 0.2)
                .await
                .is_none()
        );
    }
}
