//! Response scoring and agreement detection
//!
//! Pure functions over a slice of [`ModelResponse`]s. Scoring combines an
//! execution-success factor with a relative latency rank; agreement groups
//! responses whose executed stdout compares equal under the active
//! comparator.

use super::comparator::OutputComparator;
use super::score::ProviderScore;
use crate::inference::ModelResponse;

/// Weight of the execution-success factor in the combined score.
const EXECUTION_WEIGHT: f64 = 0.6;
/// Weight of the relative latency factor in the combined score.
const LATENCY_WEIGHT: f64 = 0.4;

/// Count (successful, total) sandbox executions across all responses.
pub fn execution_counts(responses: &[ModelResponse]) -> (usize, usize) {
    let mut successful = 0;
    let mut total = 0;

    for response in responses {
        for result in &response.execution_results {
            total += 1;
            if result.is_verified() {
                successful += 1;
            }
        }
    }

    (successful, total)
}

/// Score every response, preserving input order.
///
/// Errored responses score 0. For the rest, the execution factor is the
/// verified-execution ratio (0.5 partial credit for a text answer with no
/// fragments), and the latency factor ranks responding providers fastest
/// to slowest.
pub fn score_responses(responses: &[ModelResponse]) -> Vec<ProviderScore> {
    // Latency ranks among non-error responses only
    let mut responding: Vec<(usize, f64)> = responses
        .iter()
        .enumerate()
        .filter(|(_, r)| r.is_success())
        .map(|(i, r)| (i, r.latency))
        .collect();
    responding.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

    let n = responding.len();
    let mut latency_factors = vec![0.0; responses.len()];
    for (rank, (index, _)) in responding.iter().enumerate() {
        latency_factors[*index] = if n <= 1 {
            1.0
        } else {
            1.0 - rank as f64 / (n - 1) as f64
        };
    }

    responses
        .iter()
        .enumerate()
        .map(|(i, response)| {
            if !response.is_success() {
                return ProviderScore::zero(response.provider);
            }

            let execution_factor = if response.execution_results.is_empty() {
                if response.text.trim().is_empty() { 0.0 } else { 0.5 }
            } else {
                let verified = response.verified_executions().count();
                verified as f64 / response.execution_results.len() as f64
            };

            let latency_factor = latency_factors[i];
            let score =
                (EXECUTION_WEIGHT * execution_factor + LATENCY_WEIGHT * latency_factor).clamp(0.0, 1.0);

            ProviderScore {
                provider: response.provider,
                score,
                execution_factor,
                latency_factor,
            }
        })
        .collect()
}

/// The stdout a response contributes to agreement checks: its first
/// verified execution's output. Responses with no verified execution do
/// not participate.
fn agreement_output(response: &ModelResponse) -> Option<&str> {
    response
        .verified_executions()
        .next()
        .map(|r| r.stdout.as_str())
}

/// Group response indices by agreement of their executed outputs.
///
/// Only non-error responses with at least one verified execution
/// participate. Each group's first member is its representative; groups
/// preserve dispatch order.
pub fn agreement_groups(
    responses: &[ModelResponse],
    comparator: &dyn OutputComparator,
) -> Vec<Vec<usize>> {
    let mut groups: Vec<Vec<usize>> = Vec::new();

    for (i, response) in responses.iter().enumerate() {
        let Some(output) = (response.is_success()).then(|| agreement_output(response)).flatten()
        else {
            continue;
        };

        let mut placed = false;
        for group in &mut groups {
            let leader = &responses[group[0]];
            let leader_output = agreement_output(leader).unwrap_or_default();
            if comparator.agree(output, leader_output) {
                group.push(i);
                placed = true;
                break;
            }
        }

        if !placed {
            groups.push(vec![i]);
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::{ExecutionResult, ProviderFailure, ProviderFailureKind};
    use crate::judge::comparator::NormalizedOutput;
    use crate::core::provider::ProviderId;

    fn executed(provider: ProviderId, latency: f64, stdout: &str, exit_code: i32) -> ModelResponse {
        let mut response = ModelResponse::success(provider, "model", "```python\nx\n```", latency);
        response.execution_results = vec![ExecutionResult::completed(
            exit_code,
            stdout.to_string(),
            String::new(),
            0.1,
        )];
        response
    }

    fn errored(provider: ProviderId) -> ModelResponse {
        ModelResponse::failure(
            provider,
            "model",
            ProviderFailure::new(ProviderFailureKind::Timeout, "deadline"),
            30.0,
        )
    }

    #[test]
    fn test_execution_counts() {
        let responses = vec![
            executed(ProviderId::Groq, 0.5, "ok\n", 0),
            executed(ProviderId::Gemini, 0.9, "boom", 1),
        ];
        assert_eq!(execution_counts(&responses), (1, 2));
    }

    #[test]
    fn test_errored_response_scores_zero() {
        let responses = vec![errored(ProviderId::Groq)];
        let scores = score_responses(&responses);
        assert_eq!(scores[0].score, 0.0);
    }

    #[test]
    fn test_faster_provider_outranks_slower() {
        let responses = vec![
            executed(ProviderId::Groq, 0.4, "ok\n", 0),
            executed(ProviderId::Gemini, 1.8, "ok\n", 0),
        ];
        let scores = score_responses(&responses);

        assert!(scores[0].score > scores[1].score);
        assert_eq!(scores[0].latency_factor, 1.0);
        assert_eq!(scores[1].latency_factor, 0.0);
        // Both executed successfully
        assert_eq!(scores[0].execution_factor, 1.0);
        assert_eq!(scores[1].execution_factor, 1.0);
    }

    #[test]
    fn test_scores_stay_in_unit_range() {
        let responses = vec![
            executed(ProviderId::Groq, 0.1, "a", 0),
            executed(ProviderId::Gemini, 0.2, "b", 1),
            errored(ProviderId::Ollama),
        ];
        for score in score_responses(&responses) {
            assert!((0.0..=1.0).contains(&score.score));
        }
    }

    #[test]
    fn test_text_only_response_gets_partial_credit() {
        let responses = vec![ModelResponse::success(ProviderId::Groq, "m", "prose answer", 0.3)];
        let scores = score_responses(&responses);
        assert_eq!(scores[0].execution_factor, 0.5);
        assert_eq!(scores[0].latency_factor, 1.0);
    }

    #[test]
    fn test_agreement_groups_matching_outputs() {
        let responses = vec![
            executed(ProviderId::Groq, 0.4, "Hello, World!\n", 0),
            executed(ProviderId::Gemini, 0.9, "Hello,  World!", 0),
            executed(ProviderId::Ollama, 1.1, "other", 0),
        ];
        let groups = agreement_groups(&responses, &NormalizedOutput);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0], vec![0, 1]);
        assert_eq!(groups[1], vec![2]);
    }

    #[test]
    fn test_agreement_skips_errored_and_unexecuted() {
        let responses = vec![
            errored(ProviderId::Groq),
            executed(ProviderId::Gemini, 0.9, "x", 1), // non-zero exit
            executed(ProviderId::Ollama, 1.1, "x", 0),
        ];
        let groups = agreement_groups(&responses, &NormalizedOutput);
        assert_eq!(groups, vec![vec![2]]);
    }
}
