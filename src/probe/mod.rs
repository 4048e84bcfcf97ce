//! Reachability checks for monitored servers.
//!
//! Supports HTTP and plain TCP checks.

mod http;
mod tcp;

pub use http::*;
pub use tcp::*;

use std::time::Duration;
use thiserror::Error;

/// Probe error types.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid address: {0}")]
    Config(String),
}

/// Check whether a server address is reachable.
///
/// Addresses carrying an http(s) scheme get an HTTP GET; anything else is a
/// TCP connect.
pub async fn check_address(address: &str, timeout: Duration) -> Result<(), ProbeError> {
    if address.is_empty() {
        return Err(ProbeError::Config("empty address".to_string()));
    }

    // Add jitter so a sweep does not fire every probe at once
    let jitter = rand::random::<u64>() % 100;
    tokio::time::sleep(Duration::from_millis(jitter)).await;

    if address.starts_with("http://") || address.starts_with("https://") {
        run_http_check(address, timeout).await
    } else {
        run_tcp_check(address, timeout).await
    }
}
