// ── Update dispatcher ──
//
// Every mirror write goes through here, so there is exactly one place
// that decides what an event means for the mirrored state. The match is
// exhaustive: adding a `TypedEvent` variant breaks compilation until it
// gets a route.

use std::sync::Arc;

use crate::event::TypedEvent;
use crate::mirror::DashboardMirror;
use vigil_api::PlatformStatus;

/// Routes typed events into mirror mutations.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    mirror: Arc<DashboardMirror>,
}

impl Dispatcher {
    pub fn new(mirror: Arc<DashboardMirror>) -> Self {
        Self { mirror }
    }

    pub fn dispatch(&self, event: &TypedEvent) {
        match event {
            TypedEvent::Interaction { platform, total } => {
                tracing::debug!(platform = platform.as_deref(), ?total, "interaction");
                self.mirror.record_interaction(*total);
            }
            TypedEvent::MemorySync { memories } => {
                tracing::debug!(?memories, "memory sync");
                self.mirror.record_memory_sync(*memories);
            }
            TypedEvent::PlatformStatus {
                platform,
                active,
                connected,
            } => {
                tracing::debug!(platform = %platform, active, "platform status change");
                self.mirror.set_platform(
                    platform,
                    PlatformStatus {
                        active: *active,
                        connected: *connected,
                    },
                );
            }
            // Alerts are operator-facing only; subscribers render them,
            // the mirror never stores them.
            TypedEvent::SystemAlert(alert) => {
                tracing::info!(level = ?alert.level, message = %alert.message, "system alert");
            }
            TypedEvent::Snapshot { seq, data } => {
                self.mirror.apply_full(*seq, (**data).clone());
            }
        }
    }

    // ── Optimistic toggle support ────────────────────────────────────

    /// Applies a tentative platform state ahead of backend confirmation.
    /// Returns the prior entry so a failed commit can unwind.
    pub(crate) fn stage_platform(&self, name: &str, active: bool) -> Option<PlatformStatus> {
        let prior = self.mirror.platform(name);
        self.mirror.set_platform(
            name,
            PlatformStatus {
                active,
                connected: prior.and_then(|p| p.connected),
            },
        );
        prior
    }

    /// Unwinds a tentative platform state after a rejected commit.
    pub(crate) fn unstage_platform(&self, name: &str, prior: Option<PlatformStatus>) {
        match prior {
            Some(status) => self.mirror.set_platform(name, status),
            None => self.mirror.remove_platform(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_event_routes_to_full_apply() {
        let mirror = Arc::new(DashboardMirror::new());
        let dispatcher = Dispatcher::new(Arc::clone(&mirror));

        let data: vigil_api::StatusSnapshot = serde_json::from_value(serde_json::json!({
            "database": { "users": 1, "interactions": 10, "memories": 2 }
        }))
        .expect("valid snapshot");
        dispatcher.dispatch(&TypedEvent::Snapshot {
            seq: 1,
            data: Box::new(data),
        });

        assert_eq!(mirror.current().database.map(|d| d.users), Some(1));
        assert_eq!(mirror.last_applied_seq(), 1);
    }

    #[test]
    fn stage_and_unstage_restore_the_prior_entry() {
        let mirror = Arc::new(DashboardMirror::new());
        let dispatcher = Dispatcher::new(Arc::clone(&mirror));
        mirror.set_platform(
            "slack",
            PlatformStatus {
                active: false,
                connected: Some(true),
            },
        );

        let prior = dispatcher.stage_platform("slack", true);
        assert_eq!(mirror.platform("slack").map(|p| p.active), Some(true));
        // Connectivity survives the optimistic flip.
        assert_eq!(
            mirror.platform("slack").and_then(|p| p.connected),
            Some(true)
        );

        dispatcher.unstage_platform("slack", prior);
        assert_eq!(mirror.platform("slack").map(|p| p.active), Some(false));
    }

    #[test]
    fn unstage_removes_a_platform_the_mirror_never_had() {
        let mirror = Arc::new(DashboardMirror::new());
        let dispatcher = Dispatcher::new(Arc::clone(&mirror));

        let prior = dispatcher.stage_platform("matrix", true);
        assert!(prior.is_none());
        assert!(mirror.platform("matrix").is_some());

        dispatcher.unstage_platform("matrix", prior);
        assert!(mirror.platform("matrix").is_none());
    }
}
