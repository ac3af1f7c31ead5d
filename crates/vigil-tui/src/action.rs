//! All possible UI actions. Actions are the sole mechanism for state mutation.

use std::sync::Arc;

use vigil_core::{Alert, DashboardSnapshot};

use crate::notify::Notification;
use crate::screen::ScreenId;
use crate::screens::{RecordRows, RecordView};

/// Every state transition in the TUI is expressed as an Action.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub enum Action {
    // ── Lifecycle ──────────────────────────────────────────────────
    Quit,
    Tick,
    Render,
    Resize(u16, u16),

    // ── Navigation ────────────────────────────────────────────────
    SwitchScreen(ScreenId),
    GoBack,
    ToggleHelp,

    // ── Data events (from the monitor) ────────────────────────────
    StateUpdated(Arc<DashboardSnapshot>),
    AlertReceived(Alert),

    // ── Connection status ─────────────────────────────────────────
    Connected,
    Connecting,
    Disconnected(String),

    // ── Commands ──────────────────────────────────────────────────
    /// Manual full refresh ('r').
    Refresh,
    TogglePlatform { name: String, active: bool },
    /// Always emitted when a toggle request settles, success or not.
    /// Clears the platform's in-flight marker.
    ToggleFinished { name: String, error: Option<String> },
    SyncVault,
    VaultSyncFinished { error: Option<String> },
    SubmitMemory { content: String, memory_type: String },
    MemoryCreateFinished { error: Option<String> },
    ExportAnalytics { days: u32 },
    ExportFinished { path: Option<String>, error: Option<String> },
    /// Fetch one record view from the backend.
    LoadRecords(RecordView),
    /// Always emitted when a record fetch settles, success or not.
    RecordsLoaded {
        view: RecordView,
        rows: Option<RecordRows>,
        error: Option<String>,
    },

    // ── Memory input overlay ──────────────────────────────────────
    OpenMemoryInput,
    CloseMemoryInput,

    // ── Notifications ─────────────────────────────────────────────
    Notify(Notification),
    DismissNotification,

    // ── Alerts screen ─────────────────────────────────────────────
    ClearAlerts,

    // ── List operations ───────────────────────────────────────────
    ScrollUp,
    ScrollDown,
}
