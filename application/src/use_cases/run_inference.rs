//! Run-inference use case - the request coordinator
//!
//! One request flows through five stages: semantic-cache probe,
//! scatter-gather dispatch to every configured provider, sandboxed
//! execution of extracted code fragments, judging, and cache store.
//! Provider failures are values (a `ModelResponse` carrying an error),
//! not short-circuits: the pipeline degrades per provider and only
//! errors out when every provider failed and the cache missed.

use crate::cache::SemanticCache;
use crate::ports::completion_gateway::{CompletionGateway, ProviderError};
use crate::ports::embedder::PromptEmbedder;
use crate::ports::sandbox::{ExecutionLimits, SandboxExecutor};
use crate::use_cases::heal::heal_fragment;
use gateway_domain::{
    CodeFragment, ExecutionResult, InferenceRequest, InferenceResult, Judge, ModelResponse,
    ProviderFailure, ProviderFailureKind, ProviderId, extract_fragments,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

/// Errors the coordinator itself can return.
///
/// Per-provider failures never surface here; they ride inside the
/// result's `model_responses`.
#[derive(Error, Debug)]
pub enum RunInferenceError {
    #[error("no completion providers configured")]
    NoProviders,

    #[error("all providers failed: {}", describe_failures(.failures))]
    AllProvidersFailed {
        failures: Vec<(ProviderId, ProviderFailure)>,
    },
}

fn describe_failures(failures: &[(ProviderId, ProviderFailure)]) -> String {
    failures
        .iter()
        .map(|(provider, failure)| format!("{provider}: {failure}"))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Tunables for one coordinator instance.
#[derive(Debug, Clone)]
pub struct RunInferenceConfig {
    /// Per-provider deadline; a slow provider becomes a timeout failure
    /// without delaying the others beyond this bound.
    pub provider_timeout: Duration,
    /// Language assumed for untagged code fences.
    pub default_language: String,
    /// Resource limits applied to every fragment execution.
    pub limits: ExecutionLimits,
    /// Whether failed fragments get one self-repair round trip.
    pub self_heal: bool,
    /// Temperature used for repair prompts.
    pub heal_temperature: f64,
}

impl Default for RunInferenceConfig {
    fn default() -> Self {
        Self {
            provider_timeout: Duration::from_secs(30),
            default_language: "python".to_string(),
            limits: ExecutionLimits::default(),
            self_heal: false,
            heal_temperature: 0.2,
        }
    }
}

/// Coordinates one inference request across providers, sandbox, judge,
/// and cache.
pub struct RunInferenceUseCase {
    gateways: Vec<Arc<dyn CompletionGateway>>,
    sandbox: Arc<dyn SandboxExecutor>,
    embedder: Arc<dyn PromptEmbedder>,
    cache: Arc<SemanticCache>,
    judge: Judge,
    config: RunInferenceConfig,
}

impl RunInferenceUseCase {
    pub fn new(
        gateways: Vec<Arc<dyn CompletionGateway>>,
        sandbox: Arc<dyn SandboxExecutor>,
        embedder: Arc<dyn PromptEmbedder>,
        cache: Arc<SemanticCache>,
    ) -> Self {
        Self {
            gateways,
            sandbox,
            embedder,
            cache,
            judge: Judge::new(),
            config: RunInferenceConfig::default(),
        }
    }

    pub fn with_config(mut self, config: RunInferenceConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_judge(mut self, judge: Judge) -> Self {
        self.judge = judge;
        self
    }

    /// Run one request through the full pipeline.
    #[instrument(skip(self, request), fields(request_id = %request.id))]
    pub async fn execute(
        &self,
        request: &InferenceRequest,
    ) -> Result<InferenceResult, RunInferenceError> {
        if self.gateways.is_empty() {
            return Err(RunInferenceError::NoProviders);
        }

        let started = Instant::now();
        let embedding = self.embedder.embed(&request.prompt).await;

        if let Some(mut cached) = self.cache.lookup(&embedding).await {
            info!("serving result from semantic cache");
            cached.request_id = request.id.to_string();
            return Ok(cached
                .as_cached()
                .with_total_latency(started.elapsed().as_secs_f64()));
        }

        let mut responses = self.scatter(request).await;

        if responses.iter().all(|r| !r.is_success()) {
            let failures = responses
                .iter()
                .map(|r| {
                    let failure = r.error.clone().unwrap_or_else(|| {
                        ProviderFailure::new(ProviderFailureKind::Network, "unknown failure")
                    });
                    (r.provider, failure)
                })
                .collect();
            return Err(RunInferenceError::AllProvidersFailed { failures });
        }

        if request.execute_code {
            let fragments = self.execute_fragments(&mut responses).await;
            if self.config.self_heal {
                self.heal_failures(&mut responses, &fragments).await;
            }
        }

        let mut result = InferenceResult::new(request.id.as_str(), responses);

        if request.verify {
            if let Some(verdict) = self.judge.verify(&result.model_responses) {
                debug!(strategy = %verdict.report.synthesis_strategy, "verdict reached");
                result = result.with_selection(verdict.selected, verdict.report);
            }
        }

        let result = result.with_total_latency(started.elapsed().as_secs_f64());
        self.cache.store(embedding, result.clone()).await;
        Ok(result)
    }

    /// Dispatch the prompt to every provider concurrently and gather
    /// responses in dispatch order. Each provider runs under its own
    /// deadline; a deadline miss becomes a timeout failure response.
    async fn scatter(&self, request: &InferenceRequest) -> Vec<ModelResponse> {
        let mut join_set = JoinSet::new();

        for (index, gateway) in self.gateways.iter().enumerate() {
            let gateway = Arc::clone(gateway);
            let prompt = request.prompt.clone();
            let temperature = request.temperature;
            let deadline = self.config.provider_timeout;

            join_set.spawn(async move {
                let started = Instant::now();
                let outcome =
                    tokio::time::timeout(deadline, gateway.complete(&prompt, temperature)).await;
                let latency = started.elapsed().as_secs_f64();

                let response = match outcome {
                    Ok(Ok(text)) => {
                        ModelResponse::success(gateway.provider(), gateway.model_name(), text, latency)
                    }
                    Ok(Err(error)) => {
                        warn!(provider = %gateway.provider(), error = %error, "provider failed");
                        ModelResponse::failure(
                            gateway.provider(),
                            gateway.model_name(),
                            error.failure(),
                            latency,
                        )
                    }
                    Err(_) => {
                        warn!(provider = %gateway.provider(), ?deadline, "provider timed out");
                        ModelResponse::failure(
                            gateway.provider(),
                            gateway.model_name(),
                            ProviderError::Timeout(deadline).failure(),
                            latency,
                        )
                    }
                };
                (index, response)
            });
        }

        // Completion order is arbitrary; slots restore dispatch order.
        let mut slots: Vec<Option<ModelResponse>> =
            (0..self.gateways.len()).map(|_| None).collect();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, response)) => slots[index] = Some(response),
                Err(error) => warn!(%error, "provider task aborted"),
            }
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.unwrap_or_else(|| {
                    let gateway = &self.gateways[index];
                    ModelResponse::failure(
                        gateway.provider(),
                        gateway.model_name(),
                        ProviderFailure::new(ProviderFailureKind::Network, "provider task aborted"),
                        0.0,
                    )
                })
            })
            .collect()
    }

    /// Extract executable fragments from every successful response and run
    /// them all concurrently, attaching results in fragment order. Returns
    /// the extracted fragments per response for the healing pass.
    async fn execute_fragments(&self, responses: &mut [ModelResponse]) -> Vec<Vec<CodeFragment>> {
        let per_response: Vec<Vec<CodeFragment>> = responses
            .iter()
            .map(|response| {
                if response.is_success() {
                    extract_fragments(&response.text, &self.config.default_language)
                        .into_iter()
                        .filter(|f| f.is_executable())
                        .collect()
                } else {
                    Vec::new()
                }
            })
            .collect();

        let mut join_set = JoinSet::new();
        for (response_index, fragments) in per_response.iter().enumerate() {
            for (fragment_index, fragment) in fragments.iter().enumerate() {
                let sandbox = Arc::clone(&self.sandbox);
                let fragment = fragment.clone();
                let limits = self.config.limits.clone();
                join_set.spawn(async move {
                    let result = sandbox.execute(&fragment, &limits).await;
                    (response_index, fragment_index, result)
                });
            }
        }

        let mut slots: Vec<Vec<Option<ExecutionResult>>> = per_response
            .iter()
            .map(|fragments| vec![None; fragments.len()])
            .collect();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((response_index, fragment_index, result)) => {
                    slots[response_index][fragment_index] = Some(result);
                }
                Err(error) => warn!(%error, "sandbox task aborted"),
            }
        }

        for (response, results) in responses.iter_mut().zip(slots) {
            response.execution_results = results.into_iter().flatten().collect();
        }
        per_response
    }

    /// Give each response without a verified execution one repair round
    /// trip through its own provider. A verified re-execution replaces the
    /// failed result; anything else leaves the response untouched.
    async fn heal_failures(
        &self,
        responses: &mut [ModelResponse],
        fragments: &[Vec<CodeFragment>],
    ) {
        for (response, fragments) in responses.iter_mut().zip(fragments) {
            if !response.is_success() || fragments.is_empty() {
                continue;
            }
            if response.verified_executions().next().is_some() {
                continue;
            }

            let Some(index) = response
                .execution_results
                .iter()
                .position(|r| !r.is_verified())
            else {
                continue;
            };
            let Some(fragment) = fragments.get(index) else {
                continue;
            };
            let Some(gateway) = self
                .gateways
                .iter()
                .find(|g| g.provider() == response.provider)
            else {
                continue;
            };

            let stderr = response.execution_results[index].stderr.clone();
            let Some(fixed) =
                heal_fragment(gateway.as_ref(), fragment, &stderr, self.config.heal_temperature)
                    .await
            else {
                continue;
            };

            let result = self.sandbox.execute(&fixed, &self.config.limits).await;
            if result.is_verified() {
                info!(provider = %response.provider, "fragment healed and verified");
                response.execution_results[index] = result;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::sandbox::SandboxStrategy;
    use async_trait::async_trait;
    use gateway_domain::{Embedding, SynthesisStrategy};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockGateway {
        provider: ProviderId,
        delay: Duration,
        calls: AtomicUsize,
        replies: Vec<Result<String, ProviderError>>,
    }

    impl MockGateway {
        fn with_replies(
            provider: ProviderId,
            replies: Vec<Result<String, ProviderError>>,
        ) -> Arc<Self> {
            Arc::new(Self {
                provider,
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
                replies,
            })
        }

        fn ok(provider: ProviderId, text: &str) -> Arc<Self> {
            Self::with_replies(provider, vec![Ok(text.to_string())])
        }

        fn failing(provider: ProviderId, error: ProviderError) -> Arc<Self> {
            Self::with_replies(provider, vec![Err(error)])
        }

        fn slow(provider: ProviderId, text: &str, delay: Duration) -> Arc<Self> {
            let mut gateway = Self::with_replies(provider, vec![Ok(text.to_string())]);
            Arc::get_mut(&mut gateway).unwrap().delay = delay;
            gateway
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CompletionGateway for MockGateway {
        fn provider(&self) -> ProviderId {
            self.provider
        }

        fn model_name(&self) -> &str {
            "mock-model"
        }

        async fn complete(&self, _: &str, _: f64) -> Result<String, ProviderError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.replies[call.min(self.replies.len() - 1)].clone()
        }
    }

    /// Sandbox scripted by exact fragment code; unknown code fails.
    struct ScriptedSandbox {
        outputs: HashMap<String, ExecutionResult>,
        calls: AtomicUsize,
    }

    impl ScriptedSandbox {
        fn new(outputs: Vec<(&str, ExecutionResult)>) -> Arc<Self> {
            Arc::new(Self {
                outputs: outputs
                    .into_iter()
                    .map(|(code, result)| (code.to_string(), result))
                    .collect(),
                calls: AtomicUsize::new(0),
            })
        }

        fn empty() -> Arc<Self> {
            Self::new(vec![])
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SandboxExecutor for ScriptedSandbox {
        fn strategy(&self) -> SandboxStrategy {
            SandboxStrategy::Subprocess
        }

        async fn execute(&self, fragment: &CodeFragment, _: &ExecutionLimits) -> ExecutionResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outputs
                .get(&fragment.code)
                .cloned()
                .unwrap_or_else(|| ExecutionResult::failed("unscripted fragment", 0.0))
        }
    }

    /// Deterministic embedder: equal prompts map to equal vectors.
    struct TestEmbedder;

    #[async_trait]
    impl PromptEmbedder for TestEmbedder {
        async fn embed(&self, text: &str) -> Embedding {
            let mut hash = 0usize;
            for byte in text.bytes() {
                hash = hash.wrapping_mul(31).wrapping_add(byte as usize);
            }
            let mut vector = vec![0.0f32; 8];
            vector[hash % 8] = 1.0;
            Embedding::new(vector)
        }
    }

    fn use_case(
        gateways: Vec<Arc<dyn CompletionGateway>>,
        sandbox: Arc<dyn SandboxExecutor>,
    ) -> RunInferenceUseCase {
        RunInferenceUseCase::new(
            gateways,
            sandbox,
            Arc::new(TestEmbedder),
            Arc::new(SemanticCache::default()),
        )
    }

    fn fenced(code: &str) -> String {
        format!("```python\n{code}\n```")
    }

    fn verified(stdout: &str) -> ExecutionResult {
        ExecutionResult::completed(0, stdout.to_string(), String::new(), 0.1)
    }

    #[tokio::test]
    async fn test_consensus_across_agreeing_providers() {
        let groq = MockGateway::ok(ProviderId::Groq, &fenced("print(2 + 2)"));
        let gemini = MockGateway::ok(ProviderId::Gemini, &fenced("print(4)"));
        let sandbox = ScriptedSandbox::new(vec![
            ("print(2 + 2)", verified("4\n")),
            ("print(4)", verified("4\n")),
        ]);

        let use_case = use_case(vec![groq.clone(), gemini.clone()], sandbox);
        let request = InferenceRequest::new("what is 2+2").unwrap();
        let result = use_case.execute(&request).await.unwrap();

        let report = result.verification.unwrap();
        assert!(report.consensus);
        assert_eq!(report.synthesis_strategy, SynthesisStrategy::Consensus);
        assert!(result.selected_response.is_some());
        assert_eq!(groq.call_count(), 1);
        assert_eq!(gemini.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_provider_becomes_timeout_failure() {
        let slow = MockGateway::slow(
            ProviderId::Openai,
            &fenced("print(1)"),
            Duration::from_secs(120),
        );
        let fast = MockGateway::ok(ProviderId::Groq, &fenced("print(1)"));
        let sandbox = ScriptedSandbox::new(vec![("print(1)", verified("1\n"))]);

        let use_case = use_case(vec![slow, fast], sandbox).with_config(RunInferenceConfig {
            provider_timeout: Duration::from_secs(1),
            ..RunInferenceConfig::default()
        });

        let request = InferenceRequest::new("print one").unwrap();
        let result = use_case.execute(&request).await.unwrap();

        // Dispatch order is preserved even though the first provider lost
        assert_eq!(result.model_responses[0].provider, ProviderId::Openai);
        assert_eq!(
            result.model_responses[0].error.as_ref().unwrap().kind,
            ProviderFailureKind::Timeout
        );
        assert_eq!(result.model_responses[1].provider, ProviderId::Groq);

        let report = result.verification.unwrap();
        assert_eq!(report.synthesis_strategy, SynthesisStrategy::HighConfidence);
        assert!(report.verified);
    }

    #[tokio::test]
    async fn test_all_providers_failing_is_an_aggregate_error() {
        let groq = MockGateway::failing(
            ProviderId::Groq,
            ProviderError::RateLimited("quota".into()),
        );
        let ollama = MockGateway::failing(
            ProviderId::Ollama,
            ProviderError::Network("refused".into()),
        );

        let use_case = use_case(vec![groq, ollama], ScriptedSandbox::empty());
        let request = InferenceRequest::new("anything").unwrap();

        match use_case.execute(&request).await {
            Err(RunInferenceError::AllProvidersFailed { failures }) => {
                assert_eq!(failures.len(), 2);
                assert_eq!(failures[0].0, ProviderId::Groq);
                assert_eq!(failures[0].1.kind, ProviderFailureKind::RateLimited);
                assert_eq!(failures[1].1.kind, ProviderFailureKind::Network);
            }
            other => panic!("expected aggregate failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cache_hit_skips_dispatch() {
        let groq = MockGateway::ok(ProviderId::Groq, &fenced("print(1)"));
        let sandbox = ScriptedSandbox::new(vec![("print(1)", verified("1\n"))]);
        let use_case = use_case(vec![groq.clone()], sandbox);

        let first = InferenceRequest::new("print one").unwrap();
        let initial = use_case.execute(&first).await.unwrap();
        assert!(!initial.cached);

        let second = InferenceRequest::new("print one").unwrap();
        let replay = use_case.execute(&second).await.unwrap();

        assert!(replay.cached);
        assert_eq!(replay.request_id, second.id.to_string());
        assert_eq!(groq.call_count(), 1);
    }

    #[tokio::test]
    async fn test_no_providers_is_an_error() {
        let use_case = use_case(vec![], ScriptedSandbox::empty());
        let request = InferenceRequest::new("x").unwrap();
        assert!(matches!(
            use_case.execute(&request).await,
            Err(RunInferenceError::NoProviders)
        ));
    }

    #[tokio::test]
    async fn test_execution_disabled_skips_sandbox() {
        let groq = MockGateway::ok(ProviderId::Groq, &fenced("print(1)"));
        let sandbox = ScriptedSandbox::empty();
        let use_case = use_case(vec![groq], sandbox.clone());

        let request = InferenceRequest::new("print one")
            .unwrap()
            .without_execution();
        let result = use_case.execute(&request).await.unwrap();

        assert_eq!(sandbox.call_count(), 0);
        assert!(result.model_responses[0].execution_results.is_empty());
        // Judging still runs over unexecuted responses
        assert!(result.verification.is_some());
    }

    #[tokio::test]
    async fn test_verification_disabled_skips_judge() {
        let groq = MockGateway::ok(ProviderId::Groq, "plain text answer");
        let use_case = use_case(vec![groq], ScriptedSandbox::empty());

        let request = InferenceRequest::new("explain").unwrap().without_verification();
        let result = use_case.execute(&request).await.unwrap();

        assert!(result.verification.is_none());
        assert!(result.selected_response.is_none());
    }

    #[tokio::test]
    async fn test_failed_fragment_heals_through_owner_provider() {
        let groq = MockGateway::with_replies(
            ProviderId::Groq,
            vec![
                Ok(fenced("print(undefined_name)")),
                Ok(fenced("print(\"fixed\")")),
            ],
        );
        let sandbox = ScriptedSandbox::new(vec![
            (
                "print(undefined_name)",
                ExecutionResult::completed(1, String::new(), "NameError".into(), 0.1),
            ),
            ("print(\"fixed\")", verified("fixed\n")),
        ]);

        let use_case =
            use_case(vec![groq.clone()], sandbox).with_config(RunInferenceConfig {
                self_heal: true,
                ..RunInferenceConfig::default()
            });

        let request = InferenceRequest::new("print something").unwrap();
        let result = use_case.execute(&request).await.unwrap();

        assert_eq!(groq.call_count(), 2);
        let response = &result.model_responses[0];
        assert!(response.execution_results[0].is_verified());
        assert_eq!(response.execution_results[0].stdout, "fixed\n");

        let report = result.verification.unwrap();
        assert_eq!(report.synthesis_strategy, SynthesisStrategy::HighConfidence);
    }
}
