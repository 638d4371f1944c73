//! Verification report types

use super::score::ProviderScore;
use crate::core::provider::ProviderId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Strategy the judge used to pick the selected response.
///
/// Evaluated in strict precedence order; the first applicable rung wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SynthesisStrategy {
    /// Two or more responses agreed on executed output.
    Consensus,
    /// No consensus, but at least one response executed with exit code 0.
    HighConfidence,
    /// No successful execution; best-scored response chosen anyway.
    BestAvailable,
    /// Every response errored; first response returned unverified.
    Fallback,
}

impl std::fmt::Display for SynthesisStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SynthesisStrategy::Consensus => "consensus",
            SynthesisStrategy::HighConfidence => "high_confidence",
            SynthesisStrategy::BestAvailable => "best_available",
            SynthesisStrategy::Fallback => "fallback",
        };
        write!(f, "{s}")
    }
}

/// Immutable report produced by the judge for one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    /// True only under the `consensus` and `high_confidence` strategies.
    pub verified: bool,
    /// Whether at least two non-error responses agreed on executed output.
    pub consensus: bool,
    /// Which ladder rung selected the response.
    pub synthesis_strategy: SynthesisStrategy,
    /// Executions that completed with exit code 0.
    pub successful_executions: usize,
    /// All sandbox executions for this request.
    pub total_executions: usize,
    /// Per-provider scores.
    pub scores: BTreeMap<ProviderId, ProviderScore>,
}

impl VerificationReport {
    /// Human-readable one-line summary of the verdict.
    pub fn summary(&self, response_count: usize) -> String {
        let mut parts = vec![format!("Received {} provider response(s)", response_count)];

        if self.total_executions > 0 {
            parts.push(format!(
                "Executed {} code fragment(s): {} successful",
                self.total_executions, self.successful_executions
            ));
        }

        if self.consensus {
            parts.push("Providers reached consensus on output".to_string());
        }

        parts.push(format!(
            "Selected response using '{}' strategy",
            self.synthesis_strategy
        ));

        format!("{}.", parts.join(". "))
    }
}
