use thiserror::Error;

/// Top-level error type for the `vigil-api` crate.
///
/// Covers every failure mode across both API surfaces: HTTP transport,
/// the backend's action envelope, payload decoding, and the WebSocket
/// stream. `vigil-core` maps these into user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── Backend envelope ────────────────────────────────────────────
    /// The backend reported a failure via the `{error: ...}` envelope,
    /// or returned a response that matched neither success nor error.
    #[error("Backend error: {message}")]
    Backend { message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    // ── WebSocket ───────────────────────────────────────────────────
    /// WebSocket connection failed.
    #[error("WebSocket connection failed: {0}")]
    WebSocketConnect(String),
}
