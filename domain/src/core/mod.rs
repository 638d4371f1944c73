//! Core domain types: errors, provider identities, inference requests.

pub mod error;
pub mod provider;
pub mod request;

pub use error::DomainError;
pub use provider::ProviderId;
pub use request::{InferenceRequest, RequestId};
