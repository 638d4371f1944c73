//! Shared HTTP plumbing for provider adapters
//!
//! Every remote provider speaks JSON over HTTPS and reports errors the
//! same four ways: transport failure, auth rejection, rate limiting, or
//! a server-side fault. The mapping to [`ProviderError`] lives here so
//! the adapters only differ in request/response shaping.

use gateway_application::ProviderError;
use std::time::Duration;

/// Build the HTTP client shared by all adapters.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("inference-gateway/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Map a transport-level failure to a provider error.
pub fn map_transport(timeout: Duration, error: reqwest::Error) -> ProviderError {
    if error.is_timeout() {
        ProviderError::Timeout(timeout)
    } else {
        ProviderError::Network(error.to_string())
    }
}

/// Turn a non-success HTTP status into a typed error, consuming the body
/// for the message.
pub async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = format!("status {status}: {body}");
    Err(match status.as_u16() {
        401 | 403 => ProviderError::AuthFailed(message),
        429 => ProviderError::RateLimited(message),
        500..=599 => ProviderError::Network(message),
        _ => ProviderError::Malformed(message),
    })
}
