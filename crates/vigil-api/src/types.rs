//! Wire types for the admin API.
//!
//! Field names map to the exact JSON keys the backend emits. Every section
//! of [`StatusSnapshot`] is optional: an absent group means "no update for
//! that section", and consumers must preserve, not clear, their previous
//! value for it.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Full point-in-time status document from `GET /admin/api/system/status`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusSnapshot {
    /// Backend-side timestamp, if reported.
    #[serde(default)]
    pub timestamp: Option<chrono::DateTime<chrono::Utc>>,

    /// Counter totals from the backend database.
    #[serde(default)]
    pub database: Option<DatabaseStats>,

    /// Activity over the trailing 24 hours.
    #[serde(default)]
    pub recent_activity: Option<RecentActivity>,

    /// Note-store connectivity.
    #[serde(default)]
    pub notion_vault: Option<ComponentStatus>,

    /// Language-model service connectivity.
    #[serde(default)]
    pub openai_brain: Option<ComponentStatus>,

    /// Per-platform adapter state, keyed by platform name.
    #[serde(default)]
    pub platforms: Option<IndexMap<String, PlatformStatus>>,

    /// Interaction counts per platform (for the distribution chart).
    #[serde(default)]
    pub platform_stats: Option<Vec<PlatformCount>>,

    /// Interactions over time (for the timeline chart).
    #[serde(default)]
    pub interaction_timeline: Option<Timeline>,

    /// Sentiment score distribution (for the ternary chart).
    #[serde(default)]
    pub sentiment_stats: Option<SentimentStats>,
}

/// Database counter totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct DatabaseStats {
    #[serde(default)]
    pub users: u64,
    #[serde(default)]
    pub interactions: u64,
    #[serde(default)]
    pub memories: u64,
}

/// Trailing-24h activity counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct RecentActivity {
    #[serde(default)]
    pub interactions_24h: u64,
    #[serde(default)]
    pub active_users_24h: u64,
}

/// Connectivity report for an external collaborator (vault, brain).
///
/// The distinction between "status object present but empty" and "no status
/// object at all" matters for badge classification, so this type is always
/// wrapped in `Option` at the usage site.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ComponentStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connected: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// State of one platform adapter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct PlatformStatus {
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub connected: Option<bool>,
}

/// One slice of the platform distribution chart.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlatformCount {
    pub platform: String,
    pub count: u64,
}

/// Interaction counts over time. `labels` and `interactions` are parallel
/// arrays; consumers zip them and ignore any length mismatch tail.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Timeline {
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub interactions: Vec<u64>,
}

/// Sentiment distribution for the fixed three-category chart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct SentimentStats {
    #[serde(default)]
    pub positive: u64,
    #[serde(default)]
    pub neutral: u64,
    #[serde(default)]
    pub negative: u64,
}

// ── Data views ───────────────────────────────────────────────────────

/// One page of `GET /admin/interactions?format=json`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InteractionPage {
    #[serde(default)]
    pub interactions: Vec<InteractionRecord>,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub pages: u32,
}

/// One interaction row, newest first.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InteractionRecord {
    #[serde(default)]
    pub timestamp: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub sentiment_score: Option<f64>,
}

/// One page of `GET /admin/users?format=json`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPage {
    #[serde(default)]
    pub users: Vec<UserRecord>,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub pages: u32,
}

/// One user row, ordered by most recent interaction.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserRecord {
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub platform_id: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub interaction_count: Option<u64>,
    #[serde(default)]
    pub last_interaction: Option<chrono::DateTime<chrono::Utc>>,
}

/// One page of `GET /admin/memories?format=json`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemoryPage {
    #[serde(default)]
    pub memories: Vec<MemoryRecord>,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub pages: u32,
}

/// One stored memory, newest first.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemoryRecord {
    #[serde(default)]
    pub memory_type: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Request body for `POST /admin/api/memory/create`.
#[derive(Debug, Clone, Serialize)]
pub struct NewMemory {
    pub content: String,
    pub memory_type: String,
    pub confidence: f64,
}

// ── Push payloads ────────────────────────────────────────────────────

/// Body of an `admin_update` frame, discriminated by its `type` tag.
///
/// Deserialization fails for unknown tags; the socket layer logs and drops
/// those frames, so new server-side update types are never fatal here.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AdminUpdate {
    /// A new interaction was recorded. `total` (when present) is the
    /// absolute interaction count; without it consumers increment.
    Interaction {
        #[serde(default)]
        platform: Option<String>,
        #[serde(default)]
        total: Option<u64>,
    },
    /// The vault finished a sync pass.
    MemorySync {
        #[serde(default)]
        memories: Option<u64>,
    },
    /// One platform changed state.
    PlatformStatus {
        #[serde(alias = "name")]
        platform: String,
        active: bool,
        #[serde(default)]
        connected: Option<bool>,
    },
}

/// Body of a `system_alert` frame.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SystemAlert {
    pub message: String,
    /// Severity hint ("info", "warning", "danger"); missing means warning.
    #[serde(default)]
    pub level: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_snapshot_tolerates_missing_sections() {
        let snap: StatusSnapshot = serde_json::from_str("{}").expect("empty object parses");
        assert!(snap.database.is_none());
        assert!(snap.platforms.is_none());
        assert!(snap.sentiment_stats.is_none());
    }

    #[test]
    fn status_snapshot_parses_nested_groups() {
        let body = serde_json::json!({
            "database": { "users": 12, "interactions": 340, "memories": 55 },
            "notion_vault": { "connected": true },
            "openai_brain": { "error": "quota exceeded" },
            "platforms": {
                "telegram": { "active": true, "connected": true },
                "web": { "active": false }
            },
            "platform_stats": [ { "platform": "telegram", "count": 200 } ],
            "interaction_timeline": { "labels": ["Mon", "Tue"], "interactions": [5, 9] },
            "sentiment_stats": { "positive": 10, "neutral": 4, "negative": 1 }
        });

        let snap: StatusSnapshot = serde_json::from_value(body).expect("parses");
        let db = snap.database.expect("database group");
        assert_eq!(db.interactions, 340);
        assert_eq!(snap.notion_vault.expect("vault").connected, Some(true));
        assert_eq!(
            snap.openai_brain.expect("brain").error.as_deref(),
            Some("quota exceeded")
        );

        let platforms = snap.platforms.expect("platforms");
        assert!(platforms["telegram"].connected.expect("connected"));
        assert!(!platforms["web"].active);
        assert_eq!(snap.interaction_timeline.expect("timeline").labels.len(), 2);
    }

    #[test]
    fn interaction_page_tolerates_sparse_rows() {
        let body = serde_json::json!({
            "interactions": [
                {
                    "timestamp": "2026-08-29T10:00:00Z",
                    "platform": "telegram",
                    "username": "linh",
                    "message": "hello",
                    "sentiment_score": 0.4
                },
                { "platform": "web" }
            ],
            "page": 1,
            "pages": 3
        });

        let page: InteractionPage = serde_json::from_value(body).expect("parses");
        assert_eq!(page.pages, 3);
        assert_eq!(page.interactions.len(), 2);
        assert_eq!(page.interactions[0].username.as_deref(), Some("linh"));
        assert!(page.interactions[1].timestamp.is_none());
    }

    #[test]
    fn memory_page_parses_typed_rows() {
        let body = serde_json::json!({
            "memories": [
                { "memory_type": "insight", "content": "likes jazz", "confidence": 0.8 }
            ]
        });

        let page: MemoryPage = serde_json::from_value(body).expect("parses");
        assert_eq!(page.memories[0].memory_type.as_deref(), Some("insight"));
        assert_eq!(page.memories[0].confidence, Some(0.8));
        assert_eq!(page.page, 0);
    }

    #[test]
    fn admin_update_routes_by_type_tag() {
        let update: AdminUpdate = serde_json::from_str(
            r#"{ "type": "platform_status", "name": "telegram", "active": false }"#,
        )
        .expect("parses via name alias");
        assert_eq!(
            update,
            AdminUpdate::PlatformStatus {
                platform: "telegram".into(),
                active: false,
                connected: None,
            }
        );
    }

    #[test]
    fn admin_update_rejects_unknown_type() {
        let result: Result<AdminUpdate, _> =
            serde_json::from_str(r#"{ "type": "telemetry_v2", "value": 1 }"#);
        assert!(result.is_err());
    }
}
