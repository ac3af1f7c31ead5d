//! WebSocket event stream with auto-reconnect.
//!
//! Connects to the backend's admin event endpoint and streams parsed
//! [`SocketEvent`]s through a [`tokio::sync::broadcast`] channel. Handles
//! reconnection with exponential backoff + jitter automatically; channel
//! lifecycle transitions surface as `Connected`/`Disconnected` events so the
//! consumer can drive its own connection-state display.
//!
//! # Example
//!
//! ```rust,ignore
//! use vigil_api::{EventSocket, ReconnectConfig};
//! use tokio_util::sync::CancellationToken;
//! use url::Url;
//!
//! let cancel = CancellationToken::new();
//! let ws_url = Url::parse("ws://127.0.0.1:5000/admin/events")?;
//!
//! let socket = EventSocket::connect(ws_url, ReconnectConfig::default(), cancel.clone());
//! let mut rx = socket.subscribe();
//!
//! while let Ok(event) = rx.recv().await {
//!     println!("{event:?}");
//! }
//!
//! socket.shutdown();
//! ```

use std::time::Duration;

use futures_util::StreamExt;
use serde::Deserialize;
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::Error;
use crate::types::{AdminUpdate, SystemAlert};

// ── Broadcast channel capacity ───────────────────────────────────────

const EVENT_CHANNEL_CAPACITY: usize = 1024;

// ── SocketEvent ──────────────────────────────────────────────────────

/// A parsed event from the admin stream, including channel lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketEvent {
    /// The channel came up (initially or after a reconnect).
    Connected,
    /// The channel dropped; the background loop keeps reconnecting.
    Disconnected,
    /// An `admin_update` push.
    Update(AdminUpdate),
    /// A `system_alert` push.
    Alert(SystemAlert),
}

// ── ReconnectConfig ──────────────────────────────────────────────────

/// Exponential backoff configuration for WebSocket reconnection.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt. Default: 1s.
    pub initial_delay: Duration,

    /// Upper bound on backoff delay. Default: 30s.
    pub max_delay: Duration,

    /// Maximum reconnection attempts before giving up.
    /// `None` means retry forever.
    pub max_retries: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_retries: None,
        }
    }
}

// ── EventSocket ──────────────────────────────────────────────────────

/// Handle to a running admin event stream.
///
/// Subscribe as many consumers as needed; call [`shutdown`](Self::shutdown)
/// to tear down the background task.
pub struct EventSocket {
    event_rx: broadcast::Receiver<SocketEvent>,
    cancel: CancellationToken,
}

impl EventSocket {
    /// Spawn the reconnection loop against the given WebSocket URL.
    ///
    /// Returns immediately; the first connection attempt happens
    /// asynchronously. Subscribe to the event receiver to observe it.
    pub fn connect(ws_url: Url, reconnect: ReconnectConfig, cancel: CancellationToken) -> Self {
        let (event_tx, event_rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            ws_loop(ws_url, event_tx, reconnect, task_cancel).await;
        });

        Self { event_rx, cancel }
    }

    /// Get a new broadcast receiver for the event stream.
    ///
    /// If a consumer falls behind it receives
    /// [`broadcast::error::RecvError::Lagged`].
    pub fn subscribe(&self) -> broadcast::Receiver<SocketEvent> {
        self.event_rx.resubscribe()
    }

    /// Signal the background task to shut down gracefully.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

// ── Background reconnection loop ─────────────────────────────────────

/// Main loop: connect → read → on error, backoff → reconnect.
async fn ws_loop(
    ws_url: Url,
    event_tx: broadcast::Sender<SocketEvent>,
    reconnect: ReconnectConfig,
    cancel: CancellationToken,
) {
    let mut attempt: u32 = 0;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = connect_and_read(&ws_url, &event_tx, &cancel) => {
                match result {
                    // Clean disconnect (server close frame or stream ended).
                    // Reset attempt counter and reconnect immediately.
                    Ok(()) => {
                        tracing::info!("event socket disconnected cleanly, reconnecting");
                        attempt = 0;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, attempt, "event socket error");

                        if let Some(max) = reconnect.max_retries {
                            if attempt >= max {
                                tracing::error!(
                                    max_retries = max,
                                    "event socket reconnection limit reached, giving up"
                                );
                                break;
                            }
                        }

                        let delay = calculate_backoff(attempt, &reconnect);
                        tracing::info!(
                            delay_ms = delay.as_millis() as u64,
                            attempt,
                            "waiting before reconnect"
                        );

                        tokio::select! {
                            biased;
                            _ = cancel.cancelled() => break,
                            _ = tokio::time::sleep(delay) => {}
                        }

                        attempt += 1;
                    }
                }
            }
        }
    }

    tracing::debug!("event socket loop exiting");
}

// ── Single connection lifecycle ──────────────────────────────────────

/// Establish a single WebSocket connection, read frames until it drops.
///
/// Sends `Connected` once the upgrade succeeds and `Disconnected` on every
/// exit path, so state transitions always bracket a session.
async fn connect_and_read(
    url: &Url,
    event_tx: &broadcast::Sender<SocketEvent>,
    cancel: &CancellationToken,
) -> Result<(), Error> {
    tracing::info!(url = %url, "connecting to event socket");

    let (ws_stream, _response) = tokio_tungstenite::connect_async(url.as_str())
        .await
        .map_err(|e| Error::WebSocketConnect(e.to_string()))?;

    tracing::info!("event socket connected");
    let _ = event_tx.send(SocketEvent::Connected);

    let (_write, mut read) = ws_stream.split();

    let result = loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break Ok(()),
            frame = read.next() => {
                match frame {
                    Some(Ok(tungstenite::Message::Text(text))) => {
                        parse_and_broadcast(&text, event_tx);
                    }
                    Some(Ok(tungstenite::Message::Ping(_))) => {
                        // tungstenite handles pong replies automatically
                        tracing::trace!("event socket ping");
                    }
                    Some(Ok(tungstenite::Message::Close(frame))) => {
                        if let Some(ref cf) = frame {
                            tracing::info!(
                                code = %cf.code,
                                reason = %cf.reason,
                                "event socket close frame received"
                            );
                        } else {
                            tracing::info!("event socket close frame received (no payload)");
                        }
                        break Ok(());
                    }
                    Some(Err(e)) => {
                        break Err(Error::WebSocketConnect(e.to_string()));
                    }
                    None => {
                        // Stream ended without a close frame
                        tracing::info!("event socket stream ended");
                        break Ok(());
                    }
                    _ => {
                        // Binary, Pong, Frame -- ignore
                    }
                }
            }
        }
    };

    let _ = event_tx.send(SocketEvent::Disconnected);
    result
}

// ── Frame parsing ────────────────────────────────────────────────────

/// Raw envelope the backend sends over the WebSocket.
///
/// All frames have the shape `{ "event": "<name>", "data": {...} }`.
#[derive(Debug, Deserialize)]
struct WsFrame {
    event: String,
    #[serde(default)]
    data: serde_json::Value,
}

/// Parse a WebSocket text frame and broadcast the event found inside.
///
/// Unknown event names and bodies that fail to decode are logged and
/// dropped — forward compatible, never fatal.
fn parse_and_broadcast(text: &str, event_tx: &broadcast::Sender<SocketEvent>) {
    let frame: WsFrame = match serde_json::from_str(text) {
        Ok(f) => f,
        Err(e) => {
            tracing::debug!(error = %e, "failed to parse event socket frame");
            return;
        }
    };

    let event = match frame.event.as_str() {
        "admin_update" => match serde_json::from_value::<AdminUpdate>(frame.data) {
            Ok(update) => SocketEvent::Update(update),
            Err(e) => {
                tracing::debug!(error = %e, "dropping admin_update with unknown body");
                return;
            }
        },
        "system_alert" => match serde_json::from_value::<SystemAlert>(frame.data) {
            Ok(alert) => SocketEvent::Alert(alert),
            Err(e) => {
                tracing::debug!(error = %e, "dropping malformed system_alert");
                return;
            }
        },
        other => {
            tracing::debug!(event = other, "dropping unknown event frame");
            return;
        }
    };

    // Ignore send errors -- just means no active subscribers right now
    let _ = event_tx.send(event);
}

// ── Backoff calculation ──────────────────────────────────────────────

/// Exponential backoff with jitter.
///
/// `delay = min(initial * 2^attempt, max) + jitter`
///
/// Jitter is +-25% to spread out reconnection storms from multiple clients.
fn calculate_backoff(attempt: u32, config: &ReconnectConfig) -> Duration {
    let base = config.initial_delay.as_secs_f64() * 2.0_f64.powi(attempt as i32);
    let capped = base.min(config.max_delay.as_secs_f64());

    // Deterministic "jitter" seeded from the attempt number.
    // Not cryptographically random, but good enough for backoff spread.
    let jitter_factor = 1.0 + 0.25 * ((attempt as f64 * 7.3).sin());
    let with_jitter = (capped * jitter_factor).max(0.0);

    Duration::from_secs_f64(with_jitter)
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_reconnect_config() {
        let config = ReconnectConfig::default();
        assert_eq!(config.initial_delay, Duration::from_secs(1));
        assert_eq!(config.max_delay, Duration::from_secs(30));
        assert!(config.max_retries.is_none());
    }

    #[test]
    fn backoff_increases_exponentially() {
        let config = ReconnectConfig::default();

        let d0 = calculate_backoff(0, &config);
        let d1 = calculate_backoff(1, &config);
        let d2 = calculate_backoff(2, &config);

        // Each step should roughly double (within jitter bounds)
        assert!(d1 > d0, "d1 ({d1:?}) should be greater than d0 ({d0:?})");
        assert!(d2 > d1, "d2 ({d2:?}) should be greater than d1 ({d1:?})");
    }

    #[test]
    fn backoff_caps_at_max_delay() {
        let config = ReconnectConfig {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            max_retries: None,
        };

        let d10 = calculate_backoff(10, &config);
        // With jitter factor up to 1.25, max effective is 12.5s
        assert!(
            d10 <= Duration::from_secs(13),
            "delay at attempt 10 ({d10:?}) should be capped near max_delay"
        );
    }

    #[test]
    fn parse_and_broadcast_admin_update() {
        let (tx, mut rx) = broadcast::channel(16);

        let raw = serde_json::json!({
            "event": "admin_update",
            "data": { "type": "memory_sync", "memories": 42 }
        });

        parse_and_broadcast(&raw.to_string(), &tx);

        let event = rx.try_recv().expect("one event");
        assert_eq!(
            event,
            SocketEvent::Update(AdminUpdate::MemorySync { memories: Some(42) })
        );
    }

    #[test]
    fn parse_and_broadcast_system_alert_defaults_level() {
        let (tx, mut rx) = broadcast::channel(16);

        let raw = serde_json::json!({
            "event": "system_alert",
            "data": { "message": "vault sync lagging" }
        });

        parse_and_broadcast(&raw.to_string(), &tx);

        let SocketEvent::Alert(alert) = rx.try_recv().expect("one event") else {
            panic!("expected an alert");
        };
        assert_eq!(alert.message, "vault sync lagging");
        assert!(alert.level.is_none());
    }

    #[test]
    fn parse_and_broadcast_drops_unknown_event() {
        let (tx, mut rx) = broadcast::channel::<SocketEvent>(16);

        let raw = serde_json::json!({
            "event": "metrics_v2",
            "data": { "anything": 1 }
        });

        parse_and_broadcast(&raw.to_string(), &tx);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn parse_and_broadcast_drops_malformed_json() {
        let (tx, mut rx) = broadcast::channel::<SocketEvent>(16);

        parse_and_broadcast("not json at all", &tx);

        // Should not panic, should just log and skip
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn parse_and_broadcast_drops_unknown_update_type() {
        let (tx, mut rx) = broadcast::channel::<SocketEvent>(16);

        let raw = serde_json::json!({
            "event": "admin_update",
            "data": { "type": "future_thing", "value": 1 }
        });

        parse_and_broadcast(&raw.to_string(), &tx);
        assert!(rx.try_recv().is_err());
    }
}
