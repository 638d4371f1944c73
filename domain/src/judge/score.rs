//! Per-provider response scores

use crate::core::provider::ProviderId;
use serde::{Deserialize, Serialize};

/// Score for one provider's response, in `[0.0, 1.0]`.
///
/// The score combines two factors: whether the response's code executed
/// successfully, and how fast the provider answered relative to the other
/// responding providers. The contributing factors are kept so callers can
/// explain the verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderScore {
    pub provider: ProviderId,
    /// Combined score in `[0.0, 1.0]`. Errored providers score 0.
    pub score: f64,
    /// Execution-success factor in `[0.0, 1.0]`.
    pub execution_factor: f64,
    /// Relative latency factor in `[0.0, 1.0]` (faster scores higher).
    pub latency_factor: f64,
}

impl ProviderScore {
    /// Zero score for a provider that errored or timed out.
    pub fn zero(provider: ProviderId) -> Self {
        Self {
            provider,
            score: 0.0,
            execution_factor: 0.0,
            latency_factor: 0.0,
        }
    }
}
