//! HTTP reachability check.

use std::time::Duration;

use super::ProbeError;

/// Run an HTTP GET against the given URL. Any response counts as
/// reachable; only transport failures and timeouts do not.
pub async fn run_http_check(url: &str, timeout: Duration) -> Result<(), ProbeError> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ProbeError::Network(e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            ProbeError::Timeout(timeout)
        } else {
            ProbeError::Network(e.to_string())
        }
    })?;

    // Drain the body so slow servers cannot pass with headers alone
    response
        .bytes()
        .await
        .map_err(|e| ProbeError::Network(e.to_string()))?;

    Ok(())
}
