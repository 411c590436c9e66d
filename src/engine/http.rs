// ── Engine: HTTP plumbing ──────────────────────────────────────────────────
// Shared reqwest::Client factory and status handling used by every
// operation of the domain client.
//
// The client sets a connect timeout but deliberately no overall request
// timeout: streaming response bodies are unbounded, and reqwest's total
// timeout would cut a healthy long-lived stream. The agent-run timeout
// budget travels to the server as a request parameter instead.

use std::sync::LazyLock;
use std::time::Duration;

use reqwest::{Client, Response};

use crate::atoms::error::{ClientError, ClientResult};

/// A singleton `reqwest::Client` shared by all `CognitiveClient` instances —
/// one connection pool, one TLS config.
static SHARED_CLIENT: LazyLock<Client> = LazyLock::new(|| {
    Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .build()
        .expect("Failed to build shared reqwest::Client")
});

/// Get the shared HTTP client. Operations should call this instead of
/// `Client::builder().build()`.
pub(crate) fn shared_client() -> Client {
    SHARED_CLIENT.clone()
}

/// Turn a non-success response into `ClientError::Api` carrying the status
/// code and raw body text. The backend promises no structured error schema,
/// so the body is surfaced verbatim.
pub(crate) async fn require_success(response: Response) -> ClientResult<Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(ClientError::api(status, body))
}
