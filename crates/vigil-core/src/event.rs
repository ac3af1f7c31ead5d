// ── Typed update events ──
//
// Everything the monitor learns about the backend -- pushed frames and
// polled snapshots alike -- is normalized into `TypedEvent` before it
// reaches the dispatcher. Unknown wire payloads never get this far: the
// API crate drops them at the parse boundary, so this enum is exhaustive
// and every consumer match is total.

use chrono::{DateTime, Utc};
use vigil_api::{AdminUpdate, StatusSnapshot, SystemAlert};

/// Severity of a backend alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertLevel {
    Info,
    Warning,
    Danger,
}

impl AlertLevel {
    /// Maps the wire-level string. Unrecognized levels degrade to `Warning`.
    fn parse(level: Option<&str>) -> Self {
        match level {
            Some("info") => Self::Info,
            Some("danger") | Some("error") | Some("critical") => Self::Danger,
            _ => Self::Warning,
        }
    }
}

/// A backend alert, timestamped on receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub message: String,
    pub level: AlertLevel,
    pub received_at: DateTime<Utc>,
}

/// A single typed update flowing through the dispatcher.
#[derive(Debug, Clone)]
pub enum TypedEvent {
    /// An interaction was recorded on a platform.
    ///
    /// `total` carries the new absolute count when the backend includes
    /// one; otherwise the mirror increments its own counter.
    Interaction {
        platform: Option<String>,
        total: Option<u64>,
    },
    /// The memory store changed size.
    MemorySync { memories: Option<u64> },
    /// A single platform flipped state.
    PlatformStatus {
        platform: String,
        active: bool,
        connected: Option<bool>,
    },
    /// An operator-facing alert. Does not touch the mirror.
    SystemAlert(Alert),
    /// A full status document, sequence-stamped by the monitor.
    Snapshot {
        seq: u64,
        data: Box<StatusSnapshot>,
    },
}

impl From<AdminUpdate> for TypedEvent {
    fn from(update: AdminUpdate) -> Self {
        match update {
            AdminUpdate::Interaction { platform, total } => {
                TypedEvent::Interaction { platform, total }
            }
            AdminUpdate::MemorySync { memories } => TypedEvent::MemorySync { memories },
            AdminUpdate::PlatformStatus {
                platform,
                active,
                connected,
            } => TypedEvent::PlatformStatus {
                platform,
                active,
                connected,
            },
        }
    }
}

impl From<SystemAlert> for TypedEvent {
    fn from(alert: SystemAlert) -> Self {
        TypedEvent::SystemAlert(Alert {
            level: AlertLevel::parse(alert.level.as_deref()),
            message: alert.message,
            received_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alert_level_parsing_degrades_to_warning() {
        assert_eq!(AlertLevel::parse(Some("info")), AlertLevel::Info);
        assert_eq!(AlertLevel::parse(Some("danger")), AlertLevel::Danger);
        assert_eq!(AlertLevel::parse(Some("critical")), AlertLevel::Danger);
        assert_eq!(AlertLevel::parse(Some("verbose")), AlertLevel::Warning);
        assert_eq!(AlertLevel::parse(None), AlertLevel::Warning);
    }

    #[test]
    fn admin_update_maps_one_to_one() {
        let event: TypedEvent = AdminUpdate::PlatformStatus {
            platform: "telegram".into(),
            active: true,
            connected: Some(false),
        }
        .into();
        match event {
            TypedEvent::PlatformStatus {
                platform,
                active,
                connected,
            } => {
                assert_eq!(platform, "telegram");
                assert!(active);
                assert_eq!(connected, Some(false));
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }
}
