//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("Temperature {0} is out of range (expected 0.0-2.0)")]
    InvalidTemperature(f64),

    #[error("Prompt must not be empty")]
    EmptyPrompt,

    #[error("No providers configured")]
    NoProviders,
}
