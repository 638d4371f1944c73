//! Use cases orchestrating the ports.

pub mod heal;
pub mod run_inference;

pub use run_inference::{RunInferenceConfig, RunInferenceError, RunInferenceUseCase};
