//! HTTP plumbing shared by the venue providers.

use std::time::Duration;

use padeltime_availability::AvailabilityError;
use reqwest::{Client, Response};

/// Upper bound for any single request to a booking site.
pub const CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

/// Some booking engines serve an empty page to unknown clients.
pub const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Build a client for one provider.
///
/// With `cookies` set the client keeps a session across requests, which the
/// login-based engines need.
pub fn client(provider: &str, cookies: bool) -> Result<Client, AvailabilityError> {
    Client::builder()
        .timeout(CLIENT_TIMEOUT)
        .user_agent(USER_AGENT)
        .cookie_store(cookies)
        .build()
        .map_err(|e| AvailabilityError::provider(provider, format!("Failed to build client: {}", e)))
}

/// Map a transport error onto the provider error model.
pub fn request_error(provider: &str, e: reqwest::Error) -> AvailabilityError {
    if e.is_timeout() {
        AvailabilityError::Timeout {
            provider: provider.to_string(),
            after: CLIENT_TIMEOUT,
        }
    } else {
        AvailabilityError::provider(provider, format!("Request failed: {}", e))
    }
}

/// Reject non-2xx responses. `what` names the step for the error message.
pub fn ensure_success(
    provider: &str,
    what: &str,
    response: Response,
) -> Result<Response, AvailabilityError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(AvailabilityError::provider(
            provider,
            format!("{} failed: {}", what, status.as_u16()),
        ))
    }
}

/// Read the body as text.
pub async fn body_text(provider: &str, response: Response) -> Result<String, AvailabilityError> {
    response
        .text()
        .await
        .map_err(|e| AvailabilityError::provider(provider, format!("Failed to read response: {}", e)))
}
