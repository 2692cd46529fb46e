//! HTTP client creation

use reqwest::Client;
use std::time::Duration;

/// Creates the pooled HTTP client used for every upstream request.
///
/// Retries are not configured here; they live in the fetch loop so that
/// `Retry-After` can be honoured per response.
pub fn create_http_client_with_timeout(timeout_seconds: u64) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .pool_max_idle_per_host(crate::constants::HTTP_POOL_MAX_IDLE_PER_HOST)
        .build()
}

/// Creates an HTTP client for testing with a short timeout
#[cfg(test)]
pub fn create_test_http_client() -> Client {
    create_http_client_with_timeout(5).expect("Failed to create test HTTP client")
}
