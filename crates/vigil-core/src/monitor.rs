// ── Connection monitor ──
//
// Full lifecycle management for one admin backend connection. Owns the
// duplex event channel, the polling fallback, the refresh sequence
// counter, and every command the UI can issue. All state flows out
// through the mirror and the typed event broadcast; the monitor itself
// is a cheaply cloneable handle.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::MonitorConfig;
use crate::dispatch::Dispatcher;
use crate::error::CoreError;
use crate::event::{Alert, AlertLevel, TypedEvent};
use crate::mirror::{DashboardMirror, DashboardSnapshot};

use vigil_api::transport::TransportConfig;
use vigil_api::{
    AdminClient, EventSocket, InteractionPage, MemoryPage, NewMemory, ReconnectConfig,
    SocketEvent, UserPage,
};

const EVENT_CHANNEL_SIZE: usize = 256;

// ── ConnectionState ──────────────────────────────────────────────

/// Event-channel state observable by consumers.
///
/// Tracks the duplex channel only. Polling keeps the mirror fresh in
/// every state, so `Disconnected` means "no live pushes", not "no data".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

// ── Monitor ──────────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<MonitorInner>`. Manages the full
/// connection lifecycle: the WebSocket event channel, the periodic
/// polling fallback, sequence-guarded refreshes, and backend commands.
#[derive(Clone)]
pub struct Monitor {
    inner: Arc<MonitorInner>,
}

struct MonitorInner {
    config: MonitorConfig,
    client: AdminClient,
    mirror: Arc<DashboardMirror>,
    dispatcher: Dispatcher,
    connection_state: watch::Sender<ConnectionState>,
    event_tx: broadcast::Sender<TypedEvent>,
    cancel: CancellationToken,
    /// Stamp for full refreshes, taken before the request leaves.
    refresh_seq: AtomicU64,
    /// Single-flight latch: while a refresh is in the air, further
    /// refresh calls coalesce into it instead of stacking requests.
    refresh_in_flight: AtomicBool,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Monitor {
    /// Create a new Monitor from configuration. Does NOT connect --
    /// call [`connect()`](Self::connect) to start the event channel and
    /// background polling.
    pub fn new(config: MonitorConfig) -> Result<Self, CoreError> {
        let transport = TransportConfig {
            timeout: config.timeout,
        };
        let client = AdminClient::new(config.url.clone(), &transport)?;

        let mirror = Arc::new(DashboardMirror::new());
        let dispatcher = Dispatcher::new(Arc::clone(&mirror));
        let (connection_state, _) = watch::channel(ConnectionState::Disconnected);
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_SIZE);

        Ok(Self {
            inner: Arc::new(MonitorInner {
                config,
                client,
                mirror,
                dispatcher,
                connection_state,
                event_tx,
                cancel: CancellationToken::new(),
                refresh_seq: AtomicU64::new(0),
                refresh_in_flight: AtomicBool::new(false),
                task_handles: Mutex::new(Vec::new()),
            }),
        })
    }

    /// Access the monitor configuration.
    pub fn config(&self) -> &MonitorConfig {
        &self.inner.config
    }

    /// Access the underlying mirror.
    pub fn mirror(&self) -> &Arc<DashboardMirror> {
        &self.inner.mirror
    }

    /// Current mirrored state, cheap to clone.
    pub fn snapshot(&self) -> Arc<DashboardSnapshot> {
        self.inner.mirror.current()
    }

    // ── Connection lifecycle ─────────────────────────────────────

    /// Start the monitor.
    ///
    /// Performs an initial full refresh, opens the WebSocket event
    /// channel (when enabled), and spawns the polling fallback. Backend
    /// unreachability is NOT fatal here: the failure surfaces as a
    /// warning alert and the background loops keep retrying.
    pub async fn connect(&self) -> Result<(), CoreError> {
        self.inner
            .connection_state
            .send_replace(ConnectionState::Connecting);

        // Seed the mirror before any task starts. A dead backend only
        // costs us a warning; polling will pick it up later.
        if let Err(e) = self.refresh().await {
            warn!(error = %e, "initial status fetch failed");
            self.emit_warning(format!("Initial status fetch failed: {e}"));
        }

        let mut handles = self.inner.task_handles.lock().await;

        if self.inner.config.websocket_enabled {
            let ws_url = self.inner.client.event_socket_url()?;
            let socket = EventSocket::connect(
                ws_url,
                ReconnectConfig::default(),
                self.inner.cancel.child_token(),
            );
            let monitor = self.clone();
            handles.push(tokio::spawn(socket_bridge_task(monitor, socket)));
        } else {
            // Polling-only mode: there is no channel to wait for.
            self.inner
                .connection_state
                .send_replace(ConnectionState::Connected);
        }

        let interval_secs = self.inner.config.poll_interval_secs;
        if interval_secs > 0 {
            let monitor = self.clone();
            let cancel = self.inner.cancel.clone();
            handles.push(tokio::spawn(poll_task(monitor, interval_secs, cancel)));
        }

        info!(url = %self.inner.config.url, "monitor started");
        Ok(())
    }

    /// Stop the monitor: cancels background tasks, joins them, and
    /// resets the state to [`Disconnected`](ConnectionState::Disconnected).
    pub async fn disconnect(&self) {
        self.inner.cancel.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }

        self.inner
            .connection_state
            .send_replace(ConnectionState::Disconnected);
        debug!("monitor stopped");
    }

    // ── Refresh ──────────────────────────────────────────────────

    /// Fetch the full status document and apply it to the mirror.
    ///
    /// Single-flight: a call that overlaps an in-flight refresh returns
    /// `Ok(false)` immediately. The sequence number is taken before the
    /// request is sent, so a response overtaken by a newer one is
    /// discarded by the mirror rather than applied late.
    pub async fn refresh(&self) -> Result<bool, CoreError> {
        if self
            .inner
            .refresh_in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("refresh already in flight; coalescing");
            return Ok(false);
        }

        let seq = self.inner.refresh_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let result = self.inner.client.system_status().await;
        self.inner.refresh_in_flight.store(false, Ordering::SeqCst);

        let data = result?;
        let event = TypedEvent::Snapshot {
            seq,
            data: Box::new(data),
        };
        self.inner.dispatcher.dispatch(&event);
        let _ = self.inner.event_tx.send(event);
        debug!(seq, "full refresh applied");
        Ok(true)
    }

    // ── Commands ─────────────────────────────────────────────────

    /// Toggle a platform adapter, optimistically.
    ///
    /// Two-phase: the mirror flips immediately so the UI tracks intent,
    /// then the backend confirms. A rejected or failed request unwinds
    /// the mirror to its prior state before the error is returned.
    pub async fn toggle_platform(&self, name: &str, active: bool) -> Result<(), CoreError> {
        let prior = self.inner.dispatcher.stage_platform(name, active);

        match self.inner.client.toggle_platform(name, active).await {
            Ok(()) => {
                debug!(platform = name, active, "platform toggle confirmed");
                Ok(())
            }
            Err(e) => {
                warn!(platform = name, error = %e, "platform toggle rejected; rolling back");
                self.inner.dispatcher.unstage_platform(name, prior);
                Err(e.into())
            }
        }
    }

    /// Store a new memory, then refresh so the counters catch up.
    pub async fn create_memory(&self, memory: &NewMemory) -> Result<(), CoreError> {
        self.inner.client.create_memory(memory).await?;
        let _ = self.refresh().await;
        Ok(())
    }

    /// Trigger a vault sync pass. On success the memory counter is
    /// bumped locally; the next full refresh reconciles the real total.
    pub async fn sync_vault(&self) -> Result<(), CoreError> {
        self.inner.client.sync_vault().await?;
        let event = TypedEvent::MemorySync { memories: None };
        self.inner.dispatcher.dispatch(&event);
        let _ = self.inner.event_tx.send(event);
        Ok(())
    }

    /// Export analytics for the trailing `days` window.
    pub async fn export_analytics(&self, days: u32) -> Result<serde_json::Value, CoreError> {
        Ok(self.inner.client.export_analytics(days).await?)
    }

    // ── Record views ─────────────────────────────────────────────
    //
    // Paged tables fetched on demand; nothing here touches the mirror,
    // so a failed fetch only costs the caller its page.

    /// One page of recent interactions.
    pub async fn interactions(&self, page: u32) -> Result<InteractionPage, CoreError> {
        Ok(self.inner.client.interactions(page).await?)
    }

    /// One page of users ordered by recency.
    pub async fn users(&self, page: u32) -> Result<UserPage, CoreError> {
        Ok(self.inner.client.users(page).await?)
    }

    /// One page of stored memories.
    pub async fn memories(&self, page: u32) -> Result<MemoryPage, CoreError> {
        Ok(self.inner.client.memories(page).await?)
    }

    // ── State observation ────────────────────────────────────────

    /// Subscribe to event-channel state changes.
    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.connection_state.subscribe()
    }

    /// Subscribe to mirrored state changes.
    pub fn subscribe(&self) -> watch::Receiver<Arc<DashboardSnapshot>> {
        self.inner.mirror.subscribe()
    }

    /// Subscribe to the typed event broadcast.
    pub fn events(&self) -> broadcast::Receiver<TypedEvent> {
        self.inner.event_tx.subscribe()
    }

    // ── Internals ────────────────────────────────────────────────

    fn emit_warning(&self, message: String) {
        let _ = self
            .inner
            .event_tx
            .send(TypedEvent::SystemAlert(Alert {
                message,
                level: AlertLevel::Warning,
                received_at: chrono::Utc::now(),
            }));
    }

    fn handle_socket_event(&self, event: SocketEvent) {
        match event {
            SocketEvent::Connected => {
                info!("event channel up");
                self.inner
                    .connection_state
                    .send_replace(ConnectionState::Connected);
                // Pushes missed while the channel was down are gone;
                // resync with a full snapshot.
                let monitor = self.clone();
                tokio::spawn(async move {
                    if let Err(e) = monitor.refresh().await {
                        warn!(error = %e, "post-reconnect refresh failed");
                    }
                });
            }
            SocketEvent::Disconnected => {
                warn!("event channel down; polling carries the load");
                self.inner
                    .connection_state
                    .send_replace(ConnectionState::Disconnected);
                self.emit_warning("Live updates unavailable; falling back to polling".into());
            }
            SocketEvent::Update(update) => {
                let event = TypedEvent::from(update);
                self.inner.dispatcher.dispatch(&event);
                let _ = self.inner.event_tx.send(event);
            }
            SocketEvent::Alert(alert) => {
                let event = TypedEvent::from(alert);
                self.inner.dispatcher.dispatch(&event);
                let _ = self.inner.event_tx.send(event);
            }
        }
    }
}

// ── Background tasks ─────────────────────────────────────────────

/// Periodic polling fallback. Runs whether or not the event channel is
/// up: pushes are deltas, and only full snapshots heal missed ones.
async fn poll_task(monitor: Monitor, interval_secs: u64, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    interval.tick().await; // consume the immediate first tick

    let mut last_failed = false;
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                match monitor.refresh().await {
                    Ok(_) => last_failed = false,
                    Err(e) => {
                        warn!(error = %e, "periodic refresh failed");
                        // Alert once per outage, not once per tick.
                        if !last_failed {
                            monitor.emit_warning(format!("Periodic refresh failed: {e}"));
                        }
                        last_failed = true;
                    }
                }
            }
        }
    }
}

/// Drains the WebSocket into the dispatcher until cancellation.
async fn socket_bridge_task(monitor: Monitor, socket: EventSocket) {
    let cancel = monitor.inner.cancel.clone();
    let mut rx = socket.subscribe();

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            event = rx.recv() => {
                match event {
                    Ok(event) => monitor.handle_socket_event(event),
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "socket bridge lagged; resyncing");
                        if let Err(e) = monitor.refresh().await {
                            warn!(error = %e, "lag resync failed");
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }
    socket.shutdown();
}
