// Integration tests for `AdminClient` using wiremock.

use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vigil_api::{AdminClient, Error, NewMemory};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, AdminClient) {
    let server = MockServer::start().await;
    let base = server.uri().parse().expect("mock server uri");
    let client = AdminClient::with_client(reqwest::Client::new(), base);
    (server, client)
}

// ── Happy-path tests ────────────────────────────────────────────────

#[tokio::test]
async fn test_system_status_full_document() {
    let (server, client) = setup().await;

    let body = json!({
        "timestamp": "2026-08-30T10:00:00Z",
        "database": { "users": 7, "interactions": 1203, "memories": 88 },
        "recent_activity": { "interactions_24h": 41, "active_users_24h": 3 },
        "notion_vault": { "connected": true },
        "openai_brain": { "connected": false, "error": "rate limited" },
        "platforms": {
            "telegram": { "active": true, "connected": true },
            "web": { "active": true, "connected": false }
        },
        "platform_stats": [
            { "platform": "telegram", "count": 900 },
            { "platform": "web", "count": 303 }
        ],
        "interaction_timeline": {
            "labels": ["08-27", "08-28", "08-29"],
            "interactions": [10, 22, 9]
        },
        "sentiment_stats": { "positive": 30, "neutral": 12, "negative": 5 }
    });

    Mock::given(method("GET"))
        .and(path("/admin/api/system/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let snap = client.system_status().await.expect("status fetch");

    assert_eq!(snap.database.expect("database").interactions, 1203);
    assert_eq!(snap.recent_activity.expect("recent").interactions_24h, 41);
    assert_eq!(
        snap.openai_brain.expect("brain").error.as_deref(),
        Some("rate limited")
    );
    let platforms = snap.platforms.expect("platforms");
    assert_eq!(platforms.len(), 2);
    assert!(platforms["telegram"].active);
    assert_eq!(snap.platform_stats.expect("stats")[0].count, 900);
    assert_eq!(snap.interaction_timeline.expect("timeline").interactions, vec![10, 22, 9]);
}

#[tokio::test]
async fn test_system_status_partial_document() {
    let (server, client) = setup().await;

    // Absent groups mean "no update for that section" — the client must
    // surface them as None rather than defaulting to zeros.
    let body = json!({ "database": { "users": 1, "interactions": 2, "memories": 3 } });

    Mock::given(method("GET"))
        .and(path("/admin/api/system/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let snap = client.system_status().await.expect("status fetch");
    assert!(snap.database.is_some());
    assert!(snap.platforms.is_none());
    assert!(snap.notion_vault.is_none());
    assert!(snap.sentiment_stats.is_none());
}

#[tokio::test]
async fn test_interactions_data_view() {
    let (server, client) = setup().await;

    let body = json!({
        "interactions": [
            {
                "timestamp": "2026-08-29T10:00:00Z",
                "platform": "telegram",
                "username": "linh",
                "message": "how do I reset?",
                "response": "press and hold",
                "sentiment_score": 0.2
            }
        ],
        "page": 2,
        "pages": 5
    });

    Mock::given(method("GET"))
        .and(path("/admin/interactions"))
        .and(query_param("format", "json"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .expect(1)
        .mount(&server)
        .await;

    let page = client.interactions(2).await.expect("interactions fetch");
    assert_eq!(page.page, 2);
    assert_eq!(page.pages, 5);
    assert_eq!(page.interactions[0].platform.as_deref(), Some("telegram"));
    assert_eq!(page.interactions[0].sentiment_score, Some(0.2));
}

#[tokio::test]
async fn test_users_and_memories_data_views() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/admin/users"))
        .and(query_param("format", "json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "users": [
                {
                    "platform": "web",
                    "platform_id": "u-99",
                    "username": "minh",
                    "interaction_count": 14,
                    "last_interaction": "2026-08-30T08:00:00Z"
                }
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/admin/memories"))
        .and(query_param("format", "json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "memories": [
                { "memory_type": "insight", "content": "night owl", "confidence": 0.7 }
            ]
        })))
        .mount(&server)
        .await;

    let users = client.users(1).await.expect("users fetch");
    assert_eq!(users.users[0].interaction_count, Some(14));

    let memories = client.memories(1).await.expect("memories fetch");
    assert_eq!(memories.memories[0].memory_type.as_deref(), Some("insight"));
}

#[tokio::test]
async fn test_toggle_platform_success() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/admin/api/platform/telegram/toggle"))
        .and(body_json(json!({ "active": false })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "platform": "telegram",
            "active": false
        })))
        .expect(1)
        .mount(&server)
        .await;

    client
        .toggle_platform("telegram", false)
        .await
        .expect("toggle ok");
}

#[tokio::test]
async fn test_toggle_platform_backend_error() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/admin/api/platform/zalo/toggle"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({ "error": "adapter offline" })),
        )
        .mount(&server)
        .await;

    let err = client
        .toggle_platform("zalo", true)
        .await
        .expect_err("must fail");
    assert!(matches!(err, Error::Backend { ref message } if message == "adapter offline"));
}

#[tokio::test]
async fn test_create_memory() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/admin/api/memory/create"))
        .and(body_json(json!({
            "content": "prefers short answers",
            "memory_type": "manual",
            "confidence": 0.9
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "memory_id": 17
        })))
        .expect(1)
        .mount(&server)
        .await;

    let memory = NewMemory {
        content: "prefers short answers".into(),
        memory_type: "manual".into(),
        confidence: 0.9,
    };
    client.create_memory(&memory).await.expect("create ok");
}

#[tokio::test]
async fn test_sync_vault() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/admin/api/vault/sync"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "message": "Vault synchronization completed"
        })))
        .expect(1)
        .mount(&server)
        .await;

    client.sync_vault().await.expect("sync ok");
}

#[tokio::test]
async fn test_export_analytics() {
    let (server, client) = setup().await;

    let body = json!({
        "period_days": 7,
        "total_records": 2,
        "data": [
            { "timestamp": "2026-08-29T00:00:00Z", "platform": "web" },
            { "timestamp": "2026-08-28T00:00:00Z", "platform": "telegram" }
        ]
    });

    Mock::given(method("GET"))
        .and(path("/admin/api/analytics/export"))
        .and(query_param("days", "7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let blob = client.export_analytics(7).await.expect("export ok");
    assert_eq!(blob["total_records"], 2);
    assert_eq!(blob["data"].as_array().expect("rows").len(), 2);
}

// ── Failure-shape tests ─────────────────────────────────────────────

#[tokio::test]
async fn test_action_rejects_alien_envelope() {
    let (server, client) = setup().await;

    // Neither `status: success` nor `error` — must be treated as failure.
    Mock::given(method("POST"))
        .and(path("/admin/api/vault/sync"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "done": true })))
        .mount(&server)
        .await;

    assert!(client.sync_vault().await.is_err());
}

#[tokio::test]
async fn test_status_malformed_body_is_deserialization_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/admin/api/system/status"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>boom</html>"))
        .mount(&server)
        .await;

    let err = client.system_status().await.expect_err("must fail");
    assert!(matches!(err, Error::Deserialization { .. }));
}
