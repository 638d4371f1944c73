//! Synthesis ladder - final answer selection
//!
//! The [`Judge`] walks a strict precedence order and the first applicable
//! strategy wins:
//!
//! 1. **consensus**: two or more responses agree on executed output;
//!    highest-scored member of the agreeing set is selected.
//! 2. **high_confidence**: no consensus, but at least one response
//!    executed with exit code 0; highest-scored such response.
//! 3. **best_available**: no successful execution; highest-scored
//!    response regardless of execution outcome.
//! 4. **fallback**: every response errored; first response, unverified.
//!
//! `verified` is true only under the first two rungs.

use super::comparator::{NormalizedOutput, OutputComparator};
use super::report::{SynthesisStrategy, VerificationReport};
use super::score::ProviderScore;
use super::verifier::{agreement_groups, execution_counts, score_responses};
use crate::inference::ModelResponse;
use std::collections::BTreeMap;

/// The judge's verdict: one selected response plus the report explaining it.
#[derive(Debug, Clone)]
pub struct Verdict {
    pub selected: ModelResponse,
    pub report: VerificationReport,
}

/// Scores responses, detects consensus, and synthesizes the final answer.
pub struct Judge {
    comparator: Box<dyn OutputComparator>,
}

impl Default for Judge {
    fn default() -> Self {
        Self::new()
    }
}

impl Judge {
    /// Judge with the default normalized-stdout comparator.
    pub fn new() -> Self {
        Self {
            comparator: Box::new(NormalizedOutput),
        }
    }

    /// Judge with a custom agreement predicate.
    pub fn with_comparator(comparator: Box<dyn OutputComparator>) -> Self {
        Self { comparator }
    }

    /// Build the verdict for one request's responses.
    ///
    /// Returns `None` only when `responses` is empty; the coordinator
    /// surfaces that as an aggregate error.
    pub fn verify(&self, responses: &[ModelResponse]) -> Option<Verdict> {
        if responses.is_empty() {
            return None;
        }

        let scores = score_responses(responses);
        let (successful, total) = execution_counts(responses);

        let groups = agreement_groups(responses, self.comparator.as_ref());
        let consensus_set = groups
            .iter()
            .filter(|g| g.len() >= 2)
            .max_by_key(|g| g.len());

        let (selected_index, strategy) = if let Some(set) = consensus_set {
            (best_of(&scores, set.iter().copied()), SynthesisStrategy::Consensus)
        } else if let Some(index) = self.high_confidence_pick(responses, &scores) {
            (index, SynthesisStrategy::HighConfidence)
        } else if responses.iter().any(|r| r.is_success()) {
            (
                best_of(&scores, 0..responses.len()),
                SynthesisStrategy::BestAvailable,
            )
        } else {
            (0, SynthesisStrategy::Fallback)
        };

        let consensus = matches!(strategy, SynthesisStrategy::Consensus);
        let verified = matches!(
            strategy,
            SynthesisStrategy::Consensus | SynthesisStrategy::HighConfidence
        );

        let score_map: BTreeMap<_, _> = scores
            .iter()
            .map(|s| (s.provider, s.clone()))
            .collect();

        Some(Verdict {
            selected: responses[selected_index].clone(),
            report: VerificationReport {
                verified,
                consensus,
                synthesis_strategy: strategy,
                successful_executions: successful,
                total_executions: total,
                scores: score_map,
            },
        })
    }

    /// Highest-scored response with at least one verified execution.
    fn high_confidence_pick(
        &self,
        responses: &[ModelResponse],
        scores: &[ProviderScore],
    ) -> Option<usize> {
        let candidates: Vec<usize> = responses
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_success() && r.verified_executions().next().is_some())
            .map(|(i, _)| i)
            .collect();

        if candidates.is_empty() {
            None
        } else {
            Some(best_of(scores, candidates.into_iter()))
        }
    }
}

/// Index of the highest-scored candidate; ties go to dispatch order.
fn best_of(scores: &[ProviderScore], candidates: impl Iterator<Item = usize>) -> usize {
    let mut best = None;
    for index in candidates {
        let score = scores[index].score;
        match best {
            None => best = Some((index, score)),
            Some((_, best_score)) if score > best_score => best = Some((index, score)),
            _ => {}
        }
    }
    best.map(|(i, _)| i).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::provider::ProviderId;
    use crate::inference::{ExecutionResult, ProviderFailure, ProviderFailureKind};

    fn executed(provider: ProviderId, latency: f64, stdout: &str, exit_code: i32) -> ModelResponse {
        let mut response =
            ModelResponse::success(provider, "model", "```python\nx\n```", latency);
        response.execution_results = vec![ExecutionResult::completed(
            exit_code,
            stdout.to_string(),
            String::new(),
            0.1,
        )];
        response
    }

    fn errored(provider: ProviderId, kind: ProviderFailureKind) -> ModelResponse {
        ModelResponse::failure(provider, "model", ProviderFailure::new(kind, "boom"), 1.0)
    }

    #[test]
    fn test_consensus_when_two_outputs_agree() {
        let responses = vec![
            executed(ProviderId::Groq, 0.4, "Hello, World!\n", 0),
            executed(ProviderId::Gemini, 0.9, "Hello, World!\n", 0),
            executed(ProviderId::Ollama, 1.2, "42\n", 0),
        ];

        let verdict = Judge::new().verify(&responses).unwrap();

        assert!(verdict.report.consensus);
        assert!(verdict.report.verified);
        assert_eq!(
            verdict.report.synthesis_strategy,
            SynthesisStrategy::Consensus
        );
        // Groq is faster, so it wins within the agreeing set
        assert_eq!(verdict.selected.provider, ProviderId::Groq);
    }

    #[test]
    fn test_high_confidence_single_success() {
        let responses = vec![
            errored(ProviderId::Groq, ProviderFailureKind::Timeout),
            executed(ProviderId::Gemini, 0.9, "42\n", 0),
        ];

        let verdict = Judge::new().verify(&responses).unwrap();

        assert!(!verdict.report.consensus);
        assert!(verdict.report.verified);
        assert_eq!(
            verdict.report.synthesis_strategy,
            SynthesisStrategy::HighConfidence
        );
        assert_eq!(verdict.selected.provider, ProviderId::Gemini);
        assert_eq!(verdict.report.successful_executions, 1);
        assert_eq!(verdict.report.total_executions, 1);
    }

    #[test]
    fn test_best_available_when_no_execution_succeeds() {
        let responses = vec![
            executed(ProviderId::Groq, 0.4, "", 1),
            executed(ProviderId::Gemini, 0.9, "", 2),
        ];

        let verdict = Judge::new().verify(&responses).unwrap();

        assert!(!verdict.report.verified);
        assert_eq!(
            verdict.report.synthesis_strategy,
            SynthesisStrategy::BestAvailable
        );
        assert_eq!(verdict.report.successful_executions, 0);
    }

    #[test]
    fn test_fallback_when_every_provider_errors() {
        let responses = vec![
            errored(ProviderId::Groq, ProviderFailureKind::Network),
            errored(ProviderId::Gemini, ProviderFailureKind::RateLimited),
        ];

        let verdict = Judge::new().verify(&responses).unwrap();

        assert!(!verdict.report.verified);
        assert!(!verdict.report.consensus);
        assert_eq!(
            verdict.report.synthesis_strategy,
            SynthesisStrategy::Fallback
        );
        // First response in dispatch order
        assert_eq!(verdict.selected.provider, ProviderId::Groq);
    }

    #[test]
    fn test_empty_responses_yield_no_verdict() {
        assert!(Judge::new().verify(&[]).is_none());
    }

    #[test]
    fn test_consensus_requires_two_agreeing() {
        let responses = vec![
            executed(ProviderId::Groq, 0.4, "a\n", 0),
            executed(ProviderId::Gemini, 0.9, "b\n", 0),
        ];

        let verdict = Judge::new().verify(&responses).unwrap();
        assert!(!verdict.report.consensus);
        assert_eq!(
            verdict.report.synthesis_strategy,
            SynthesisStrategy::HighConfidence
        );
    }

    #[test]
    fn test_report_invariant_successful_at_most_total() {
        let responses = vec![
            executed(ProviderId::Groq, 0.4, "x\n", 0),
            executed(ProviderId::Gemini, 0.9, "y\n", 3),
        ];
        let verdict = Judge::new().verify(&responses).unwrap();
        assert!(verdict.report.successful_executions <= verdict.report.total_executions);
    }

    #[test]
    fn test_pluggable_comparator() {
        struct AlwaysAgree;
        impl OutputComparator for AlwaysAgree {
            fn agree(&self, _: &str, _: &str) -> bool {
                true
            }
        }

        let responses = vec![
            executed(ProviderId::Groq, 0.4, "a\n", 0),
            executed(ProviderId::Gemini, 0.9, "b\n", 0),
        ];

        let verdict = Judge::with_comparator(Box::new(AlwaysAgree))
            .verify(&responses)
            .unwrap();
        assert!(verdict.report.consensus);
    }
}
