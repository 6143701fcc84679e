//! Shared HTTP client factory.
//!
//! Every outbound call carries an explicit timeout; a timeout surfaces as an
//! ordinary transport error.

use reqwest::Client;
use std::time::Duration;

/// Timeout for upstream chat calls (30 seconds).
pub const CHAT_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for exchange rate lookups (5 seconds).
pub const RATE_TIMEOUT: Duration = Duration::from_secs(5);

/// Create a new HTTP client with the chat timeout.
pub fn create_client() -> Client {
    create_client_with_timeout(CHAT_TIMEOUT)
}

/// Create a new HTTP client with a custom timeout.
pub fn create_client_with_timeout(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .build()
        .expect("Failed to create HTTP client")
}
