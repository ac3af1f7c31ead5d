// ── Core error types ──
//
// User-facing errors from vigil-core. These are NOT API-specific --
// consumers never see HTTP status codes or JSON parse failures directly.
// The `From<vigil_api::Error>` impl translates transport-layer errors
// into domain-appropriate variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to backend at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Backend connection timed out")]
    Timeout,

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Operation rejected by backend: {message}")]
    Rejected { message: String },

    #[error("Operation failed: {message}")]
    OperationFailed { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<vigil_api::Error> for CoreError {
    fn from(err: vigil_api::Error) -> Self {
        match err {
            vigil_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map(|u| u.to_string())
                            .unwrap_or_else(|| "<unknown>".into()),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::OperationFailed {
                        message: e.to_string(),
                    }
                }
            }
            vigil_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            vigil_api::Error::Backend { message } => CoreError::Rejected { message },
            vigil_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
            vigil_api::Error::WebSocketConnect(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("WebSocket connection failed: {reason}"),
            },
        }
    }
}
