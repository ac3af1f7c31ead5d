//! Async client for the vigil backend admin API.
//!
//! Two surfaces:
//!
//! - [`AdminClient`] — plain request/response calls against the admin HTTP
//!   endpoints (status snapshot, record data views, platform toggle, memory
//!   creation, vault sync, analytics export), with the backend's `{status}`/`{error}`
//!   envelope unwrapped before callers see it.
//! - [`EventSocket`] — the persistent WebSocket event stream, with automatic
//!   reconnection and a broadcast channel of parsed [`SocketEvent`]s.
//!
//! `vigil-core` consumes both and translates [`Error`] into its own
//! domain-level diagnostics; nothing here is user-facing.

pub mod client;
pub mod error;
pub mod transport;
pub mod types;
pub mod websocket;

pub use client::AdminClient;
pub use error::Error;
pub use transport::TransportConfig;
pub use types::{
    AdminUpdate, ComponentStatus, DatabaseStats, InteractionPage, InteractionRecord, MemoryPage,
    MemoryRecord, NewMemory, PlatformCount, PlatformStatus, RecentActivity, SentimentStats,
    StatusSnapshot, SystemAlert, Timeline, UserPage, UserRecord,
};
pub use websocket::{EventSocket, ReconnectConfig, SocketEvent};
