// ── Dashboard state mirror ──
//
// A single in-memory replica of the backend's status document, published
// through a `watch` channel so the TUI re-renders only when something
// actually changed. Full snapshots are sequence-stamped by the monitor;
// a snapshot older than the last applied one is discarded wholesale, so
// a slow poll response can never clobber fresher data.
//
// Merge rule for full snapshots: replace-by-section union. A section the
// incoming document carries replaces the mirrored one; a section it omits
// keeps its previous value. Incremental events touch exactly the fields
// they name.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use tokio::sync::watch;
use vigil_api::{
    ComponentStatus, DatabaseStats, PlatformCount, PlatformStatus, RecentActivity, SentimentStats,
    StatusSnapshot, Timeline,
};

/// The mirrored dashboard state.
///
/// Sections are `Option` because the backend may never have reported them;
/// `None` renders as "unknown", never as zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardSnapshot {
    /// When the last full snapshot was applied (local clock).
    pub refreshed_at: Option<DateTime<Utc>>,
    pub database: Option<DatabaseStats>,
    pub recent_activity: Option<RecentActivity>,
    /// Note-store health. `None` = the backend never reported one.
    pub vault: Option<ComponentStatus>,
    /// Language-model service health.
    pub brain: Option<ComponentStatus>,
    /// Platform adapters in backend-reported order.
    pub platforms: IndexMap<String, PlatformStatus>,
    pub platform_stats: Option<Vec<PlatformCount>>,
    pub timeline: Option<Timeline>,
    pub sentiment: Option<SentimentStats>,
}

/// Sequence-guarded, watch-published mirror of the dashboard state.
#[derive(Debug)]
pub struct DashboardMirror {
    snapshot: watch::Sender<Arc<DashboardSnapshot>>,
    /// Highest sequence number applied so far. 0 = nothing applied yet.
    last_seq: AtomicU64,
}

impl Default for DashboardMirror {
    fn default() -> Self {
        Self::new()
    }
}

impl DashboardMirror {
    pub fn new() -> Self {
        let (snapshot, _) = watch::channel(Arc::new(DashboardSnapshot::default()));
        Self {
            snapshot,
            last_seq: AtomicU64::new(0),
        }
    }

    /// Subscribe to state changes. The receiver always holds the latest value.
    pub fn subscribe(&self) -> watch::Receiver<Arc<DashboardSnapshot>> {
        self.snapshot.subscribe()
    }

    /// Current state, cheap to clone.
    pub fn current(&self) -> Arc<DashboardSnapshot> {
        self.snapshot.borrow().clone()
    }

    /// Sequence number of the newest applied full snapshot.
    pub fn last_applied_seq(&self) -> u64 {
        self.last_seq.load(Ordering::SeqCst)
    }

    pub fn platform(&self, name: &str) -> Option<PlatformStatus> {
        self.snapshot.borrow().platforms.get(name).copied()
    }

    /// Applies a full status document under the sequence guard.
    ///
    /// Returns `false` when `seq` is not newer than the last applied
    /// sequence; the document is dropped untouched in that case.
    pub fn apply_full(&self, seq: u64, incoming: StatusSnapshot) -> bool {
        // fetch_max leaves the counter alone for stale sequences, so two
        // racing applies resolve without a lock.
        let prev = self.last_seq.fetch_max(seq, Ordering::SeqCst);
        if prev >= seq {
            tracing::debug!(seq, last = prev, "discarding stale status snapshot");
            return false;
        }

        self.snapshot.send_modify(|current| {
            let state = Arc::make_mut(current);
            state.refreshed_at = Some(Utc::now());
            if let Some(database) = incoming.database {
                state.database = Some(database);
            }
            if let Some(activity) = incoming.recent_activity {
                state.recent_activity = Some(activity);
            }
            if let Some(vault) = incoming.notion_vault {
                state.vault = Some(vault);
            }
            if let Some(brain) = incoming.openai_brain {
                state.brain = Some(brain);
            }
            if let Some(platforms) = incoming.platforms {
                state.platforms = platforms;
            }
            if let Some(stats) = incoming.platform_stats {
                state.platform_stats = Some(stats);
            }
            if let Some(timeline) = incoming.interaction_timeline {
                state.timeline = Some(timeline);
            }
            if let Some(sentiment) = incoming.sentiment_stats {
                state.sentiment = Some(sentiment);
            }
        });
        true
    }

    // ── Incremental writes (dispatcher only) ─────────────────────────

    /// Records one interaction. With an absolute `total` the counter is
    /// set; without one it increments, seeding zeroed stats if needed.
    pub(crate) fn record_interaction(&self, total: Option<u64>) {
        self.snapshot.send_modify(|current| {
            let state = Arc::make_mut(current);
            let database = state.database.get_or_insert_with(DatabaseStats::default);
            database.interactions = match total {
                Some(total) => total,
                None => database.interactions.saturating_add(1),
            };
        });
    }

    /// Records a memory-store size change, same set-or-increment rule.
    pub(crate) fn record_memory_sync(&self, memories: Option<u64>) {
        self.snapshot.send_modify(|current| {
            let state = Arc::make_mut(current);
            let database = state.database.get_or_insert_with(DatabaseStats::default);
            database.memories = match memories {
                Some(memories) => memories,
                None => database.memories.saturating_add(1),
            };
        });
    }

    /// Upserts one platform. No other section is touched.
    pub(crate) fn set_platform(&self, name: &str, status: PlatformStatus) {
        self.snapshot.send_modify(|current| {
            let state = Arc::make_mut(current);
            state.platforms.insert(name.to_owned(), status);
        });
    }

    /// Removes a platform entry. Used to unwind a tentative toggle for a
    /// platform the mirror had never seen.
    pub(crate) fn remove_platform(&self, name: &str) {
        self.snapshot.send_modify(|current| {
            let state = Arc::make_mut(current);
            state.platforms.shift_remove(name);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_snapshot() -> StatusSnapshot {
        serde_json::from_value(serde_json::json!({
            "database": { "users": 3, "interactions": 120, "memories": 14 },
            "recent_activity": { "interactions_24h": 9, "active_users_24h": 2 },
            "notion_vault": { "connected": true },
            "openai_brain": { "connected": false, "error": "quota exceeded" },
            "platforms": {
                "telegram": { "active": true, "connected": true },
                "discord": { "active": false }
            },
            "sentiment_stats": { "positive": 5, "neutral": 3, "negative": 1 }
        }))
        .expect("valid snapshot")
    }

    #[test]
    fn full_apply_replaces_present_sections() {
        let mirror = DashboardMirror::new();
        assert!(mirror.apply_full(1, full_snapshot()));

        let state = mirror.current();
        assert_eq!(state.database.map(|d| d.interactions), Some(120));
        assert_eq!(state.platforms.len(), 2);
        assert_eq!(state.vault.as_ref().and_then(|v| v.connected), Some(true));
        assert!(state.refreshed_at.is_some());
    }

    #[test]
    fn full_apply_preserves_absent_sections() {
        let mirror = DashboardMirror::new();
        mirror.apply_full(1, full_snapshot());

        // Second document only carries database counters.
        let partial: StatusSnapshot = serde_json::from_value(serde_json::json!({
            "database": { "users": 3, "interactions": 121, "memories": 14 }
        }))
        .expect("valid snapshot");
        assert!(mirror.apply_full(2, partial));

        let state = mirror.current();
        assert_eq!(state.database.map(|d| d.interactions), Some(121));
        // Sections the second document omitted survive.
        assert_eq!(state.platforms.len(), 2);
        assert_eq!(state.sentiment.map(|s| s.positive), Some(5));
    }

    #[test]
    fn stale_sequence_is_discarded_wholesale() {
        let mirror = DashboardMirror::new();
        mirror.apply_full(5, full_snapshot());

        let stale: StatusSnapshot = serde_json::from_value(serde_json::json!({
            "database": { "users": 0, "interactions": 0, "memories": 0 },
            "platforms": {}
        }))
        .expect("valid snapshot");
        assert!(!mirror.apply_full(4, stale.clone()));
        assert!(!mirror.apply_full(5, stale));

        let state = mirror.current();
        assert_eq!(state.database.map(|d| d.interactions), Some(120));
        assert_eq!(state.platforms.len(), 2);
        assert_eq!(mirror.last_applied_seq(), 5);
    }

    #[test]
    fn out_of_order_applies_settle_on_the_newest() {
        let mirror = DashboardMirror::new();
        let newest: StatusSnapshot = serde_json::from_value(serde_json::json!({
            "database": { "users": 3, "interactions": 200, "memories": 20 }
        }))
        .expect("valid snapshot");

        mirror.apply_full(3, newest);
        mirror.apply_full(1, full_snapshot());
        mirror.apply_full(2, full_snapshot());

        assert_eq!(mirror.current().database.map(|d| d.interactions), Some(200));
    }

    #[test]
    fn platform_push_touches_only_that_platform() {
        let mirror = DashboardMirror::new();
        mirror.apply_full(1, full_snapshot());

        mirror.set_platform(
            "discord",
            PlatformStatus {
                active: true,
                connected: Some(true),
            },
        );

        let state = mirror.current();
        assert_eq!(
            state.platforms.get("discord").map(|p| p.active),
            Some(true)
        );
        // The sibling platform and every other section are untouched.
        assert_eq!(
            state.platforms.get("telegram").map(|p| p.active),
            Some(true)
        );
        assert_eq!(state.database.map(|d| d.interactions), Some(120));
    }

    #[test]
    fn interaction_sets_or_increments() {
        let mirror = DashboardMirror::new();
        // No database section yet: the increment seeds zeroed stats.
        mirror.record_interaction(None);
        assert_eq!(mirror.current().database.map(|d| d.interactions), Some(1));

        mirror.record_interaction(Some(500));
        assert_eq!(mirror.current().database.map(|d| d.interactions), Some(500));

        mirror.record_interaction(None);
        assert_eq!(mirror.current().database.map(|d| d.interactions), Some(501));
    }

    #[test]
    fn memory_sync_sets_or_increments() {
        let mirror = DashboardMirror::new();
        mirror.apply_full(1, full_snapshot());

        mirror.record_memory_sync(None);
        assert_eq!(mirror.current().database.map(|d| d.memories), Some(15));

        mirror.record_memory_sync(Some(40));
        assert_eq!(mirror.current().database.map(|d| d.memories), Some(40));
    }

    #[test]
    fn watch_subscribers_observe_changes() {
        let mirror = DashboardMirror::new();
        let mut rx = mirror.subscribe();
        assert!(!rx.has_changed().expect("sender alive"));

        mirror.apply_full(1, full_snapshot());
        assert!(rx.has_changed().expect("sender alive"));
        assert_eq!(
            rx.borrow_and_update().database.map(|d| d.users),
            Some(3)
        );
    }
}
