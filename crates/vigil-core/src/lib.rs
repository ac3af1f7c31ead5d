//! # vigil-core
//!
//! Connection monitoring and state mirroring for the vigil admin
//! dashboard. This crate owns all logic between the wire (vigil-api)
//! and the UI: the [`Monitor`] runs the event channel and the polling
//! fallback, the [`Dispatcher`] routes typed updates, and the
//! [`DashboardMirror`] publishes a sequence-guarded replica of the
//! backend's status document through a `watch` channel.
//!
//! The UI never touches the wire types' optional-soup directly; it
//! reads [`DashboardSnapshot`] values and reacts to [`TypedEvent`]s.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod mirror;
pub mod monitor;

pub use config::MonitorConfig;
pub use dispatch::Dispatcher;
pub use error::CoreError;
pub use event::{Alert, AlertLevel, TypedEvent};
pub use mirror::{DashboardMirror, DashboardSnapshot};
pub use monitor::{ConnectionState, Monitor};

// Re-export the wire types consumers need to issue commands and read
// mirrored sections without depending on vigil-api directly.
pub use vigil_api::{
    ComponentStatus, DatabaseStats, InteractionRecord, MemoryRecord, NewMemory, PlatformCount,
    PlatformStatus, RecentActivity, SentimentStats, Timeline, UserRecord,
};
