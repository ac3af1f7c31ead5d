// ── Runtime monitor configuration ──
//
// These types describe *how* to reach the admin backend. They carry
// connection tuning only and never touch disk. The TUI constructs a
// `MonitorConfig` from its config layer and hands it in.

use url::Url;

/// Configuration for connecting to a single admin backend.
///
/// Built by the TUI, passed to `Monitor` -- core never reads config files.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Backend base URL (e.g., `http://127.0.0.1:8080`).
    pub url: Url,
    /// Request timeout.
    pub timeout: std::time::Duration,
    /// Enable the WebSocket event stream.
    pub websocket_enabled: bool,
    /// Periodic full-refresh interval (seconds). 0 = never poll.
    ///
    /// Runs alongside the event stream as a safety net, and carries the
    /// whole load when the stream is disabled or down.
    pub poll_interval_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            url: Url::parse("http://127.0.0.1:8080").unwrap_or_else(|_| unreachable!()),
            timeout: std::time::Duration::from_secs(30),
            websocket_enabled: true,
            poll_interval_secs: 30,
        }
    }
}
