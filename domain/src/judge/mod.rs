//! Judge / verification engine
//!
//! Scores each provider's response, detects consensus among executed
//! outputs, and selects the final answer via an ordered synthesis ladder.

pub mod comparator;
pub mod report;
pub mod score;
pub mod synthesizer;
pub mod verifier;

pub use comparator::{NormalizedOutput, OutputComparator};
pub use report::{SynthesisStrategy, VerificationReport};
pub use score::ProviderScore;
pub use synthesizer::{Judge, Verdict};
