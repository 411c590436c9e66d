// ── Atoms: Error Types ─────────────────────────────────────────────────────
// Single canonical error enum for the client, built with `thiserror`.
//
// Design rules:
//   • Variants are coarse-grained by domain (I/O, DB, Network, API…).
//   • The `#[from]` attribute wires std/external error conversions automatically.
//   • `ClientError` → `String` conversion is provided via `Display` so that
//     presentation boundaries can call `.map_err(|e| e.to_string())` without
//     boilerplate.

use thiserror::Error;

// ── Primary error enum ─────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ClientError {
    /// Filesystem or OS-level I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization / deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP / network failure (reqwest layer), including interrupted streams.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// SQLite / rusqlite failure in the local identity store.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The backend answered with a non-success status. Carries the raw body
    /// text — the server promises no structured error schema.
    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    /// A streaming response violated the framing or payload contract
    /// (invalid UTF-8 in a complete line, or a server-reported error frame).
    #[error("Stream error: {0}")]
    Stream(String),

    /// Client configuration is invalid or missing.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Build an API error from a status code and raw body text.
    pub fn api(status: u16, body: impl Into<String>) -> Self {
        Self::Api { status, body: body.into() }
    }
}

// ── Convenience alias ──────────────────────────────────────────────────────

/// All client operations return this type.
pub type ClientResult<T> = Result<T, ClientError>;

// ── Conversion: ClientError → String ───────────────────────────────────────
// Lets presentation-boundary functions call `.map_err(ClientError::into)`.

impl From<ClientError> for String {
    fn from(e: ClientError) -> Self {
        e.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_carries_status_in_message() {
        let e = ClientError::api(500, "internal server error");
        let msg = e.to_string();
        assert!(msg.contains("500"));
        assert!(msg.contains("internal server error"));
    }

    #[test]
    fn serde_error_converts() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let e: ClientError = parse_err.into();
        assert!(matches!(e, ClientError::Serialization(_)));
    }
}
