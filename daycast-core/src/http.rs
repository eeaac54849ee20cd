use std::time::Duration;

use reqwest::{Client, Response};

use crate::error::WeatherError;

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
const USER_AGENT: &str = concat!("daycast/", env!("CARGO_PKG_VERSION"));

/// HTTP client with an explicit request timeout.
pub fn build_client(timeout: Duration) -> Result<Client, WeatherError> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| WeatherError::Fetch(format!("Failed to build HTTP client: {e}")))
}

/// Read the body and turn any non-success status into a [`WeatherError::Fetch`].
pub async fn success_body(res: Response, what: &str) -> Result<String, WeatherError> {
    let status = res.status();
    let body = res
        .text()
        .await
        .map_err(|e| WeatherError::Fetch(format!("Failed to read {what} response body: {e}")))?;

    if !status.is_success() {
        return Err(WeatherError::Fetch(format!(
            "{what} request failed with status {}: {}",
            status,
            truncate_body(&body),
        )));
    }

    Ok(body)
}

pub fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let cut = (0..=MAX).rev().find(|i| body.is_char_boundary(*i)).unwrap_or(0);
        format!("{}...", &body[..cut])
    } else {
        body.to_string()
    }
}
