// ── Monitor integration tests ──
//
// Exercise the full monitor lifecycle against a wiremock backend:
// refresh sequencing, optimistic toggles with rollback, and command
// side effects on the mirror. WebSocket is disabled throughout; the
// channel has its own tests in vigil-api.

use std::time::Duration;

use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vigil_core::{AlertLevel, ConnectionState, CoreError, Monitor, MonitorConfig, TypedEvent};

fn config_for(server: &MockServer) -> MonitorConfig {
    MonitorConfig {
        url: Url::parse(&server.uri()).expect("mock server uri"),
        timeout: Duration::from_secs(5),
        websocket_enabled: false,
        poll_interval_secs: 0,
    }
}

fn status_body() -> serde_json::Value {
    serde_json::json!({
        "database": { "users": 4, "interactions": 250, "memories": 31 },
        "recent_activity": { "interactions_24h": 12, "active_users_24h": 3 },
        "notion_vault": { "connected": true },
        "openai_brain": { "connected": true },
        "platforms": {
            "telegram": { "active": true, "connected": true },
            "discord": { "active": false, "connected": false }
        },
        "sentiment_stats": { "positive": 7, "neutral": 2, "negative": 1 }
    })
}

async fn mount_status(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/admin/api/system/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_body()))
        .mount(server)
        .await;
}

#[tokio::test]
async fn connect_seeds_the_mirror_and_reports_connected() {
    let server = MockServer::start().await;
    mount_status(&server).await;

    let monitor = Monitor::new(config_for(&server)).expect("monitor");
    assert_eq!(
        *monitor.connection_state().borrow(),
        ConnectionState::Disconnected
    );

    monitor.connect().await.expect("connect");

    // Polling-only mode counts as connected once started.
    assert_eq!(
        *monitor.connection_state().borrow(),
        ConnectionState::Connected
    );
    let snapshot = monitor.snapshot();
    assert_eq!(snapshot.database.map(|d| d.interactions), Some(250));
    assert_eq!(snapshot.platforms.len(), 2);

    monitor.disconnect().await;
    assert_eq!(
        *monitor.connection_state().borrow(),
        ConnectionState::Disconnected
    );
}

#[tokio::test]
async fn connect_survives_an_unreachable_backend() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/admin/api/system/status"))
        .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
            "error": "database unavailable"
        })))
        .mount(&server)
        .await;

    let monitor = Monitor::new(config_for(&server)).expect("monitor");
    let mut events = monitor.events();

    // The failed initial fetch surfaces as a warning alert, not an Err.
    monitor.connect().await.expect("connect tolerates fetch failure");
    assert!(monitor.snapshot().database.is_none());

    let alert = tokio::time::timeout(Duration::from_secs(3), async {
        loop {
            if let TypedEvent::SystemAlert(alert) = events.recv().await.expect("event stream") {
                break alert;
            }
        }
    })
    .await
    .expect("warning alert before timeout");
    assert_eq!(alert.level, AlertLevel::Warning);
    assert!(alert.message.contains("Initial status fetch failed"));

    monitor.disconnect().await;
}

#[tokio::test]
async fn poll_tick_refreshes_the_mirror() {
    let server = MockServer::start().await;
    // First fetch serves the baseline body once; every fetch after that
    // sees the grown counter.
    Mock::given(method("GET"))
        .and(path("/admin/api/system/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_body()))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    let mut grown = status_body();
    grown["database"]["interactions"] = serde_json::json!(300);
    Mock::given(method("GET"))
        .and(path("/admin/api/system/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(grown))
        .mount(&server)
        .await;

    let mut config = config_for(&server);
    config.poll_interval_secs = 1;
    let monitor = Monitor::new(config).expect("monitor");
    let mut snapshots = monitor.subscribe();

    monitor.connect().await.expect("connect");
    assert_eq!(
        monitor.snapshot().database.map(|d| d.interactions),
        Some(250)
    );

    // The next poll tick must land the new counter without any manual
    // refresh call.
    tokio::time::timeout(Duration::from_secs(3), async {
        loop {
            snapshots.changed().await.expect("mirror watch");
            let interactions = snapshots.borrow_and_update().database.map(|d| d.interactions);
            if interactions == Some(300) {
                break;
            }
        }
    })
    .await
    .expect("poll tick applies the refreshed counters");

    monitor.disconnect().await;
}

#[tokio::test]
async fn poll_failure_surfaces_a_warning_alert() {
    let server = MockServer::start().await;
    // Initial fetch succeeds; the backend dies before the first poll tick.
    Mock::given(method("GET"))
        .and(path("/admin/api/system/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_body()))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/admin/api/system/status"))
        .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
            "error": "database unavailable"
        })))
        .mount(&server)
        .await;

    let mut config = config_for(&server);
    config.poll_interval_secs = 1;
    let monitor = Monitor::new(config).expect("monitor");
    let mut events = monitor.events();

    monitor.connect().await.expect("connect");

    let alert = tokio::time::timeout(Duration::from_secs(3), async {
        loop {
            if let TypedEvent::SystemAlert(alert) = events.recv().await.expect("event stream") {
                break alert;
            }
        }
    })
    .await
    .expect("poll failure alert before timeout");
    assert_eq!(alert.level, AlertLevel::Warning);
    assert!(alert.message.contains("Periodic refresh failed"));

    monitor.disconnect().await;
}

#[tokio::test]
async fn overlapping_refreshes_coalesce() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/admin/api/system/status"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(status_body())
                .set_delay(Duration::from_millis(200)),
        )
        .mount(&server)
        .await;

    let monitor = Monitor::new(config_for(&server)).expect("monitor");

    // Both futures poll on this task: the first claims the in-flight
    // latch, the second must observe it and coalesce.
    let (first, second) = tokio::join!(monitor.refresh(), monitor.refresh());
    assert!(first.expect("first refresh"));
    assert!(!second.expect("second refresh"));

    // Only one request actually left.
    assert_eq!(server.received_requests().await.map(|r| r.len()), Some(1));
}

#[tokio::test]
async fn toggle_confirms_and_keeps_the_optimistic_state() {
    let server = MockServer::start().await;
    mount_status(&server).await;
    Mock::given(method("POST"))
        .and(path("/admin/api/platform/discord/toggle"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "success"
        })))
        .mount(&server)
        .await;

    let monitor = Monitor::new(config_for(&server)).expect("monitor");
    monitor.connect().await.expect("connect");

    monitor
        .toggle_platform("discord", true)
        .await
        .expect("toggle");

    let snapshot = monitor.snapshot();
    assert_eq!(
        snapshot.platforms.get("discord").map(|p| p.active),
        Some(true)
    );
    // Connectivity from the last snapshot survives the flip.
    assert_eq!(
        snapshot.platforms.get("discord").and_then(|p| p.connected),
        Some(false)
    );
    monitor.disconnect().await;
}

#[tokio::test]
async fn rejected_toggle_rolls_the_mirror_back() {
    let server = MockServer::start().await;
    mount_status(&server).await;
    Mock::given(method("POST"))
        .and(path("/admin/api/platform/discord/toggle"))
        .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
            "error": "adapter crashed"
        })))
        .mount(&server)
        .await;

    let monitor = Monitor::new(config_for(&server)).expect("monitor");
    monitor.connect().await.expect("connect");

    let err = monitor
        .toggle_platform("discord", true)
        .await
        .expect_err("toggle must fail");
    assert!(matches!(err, CoreError::Rejected { .. }), "got {err:?}");

    // The optimistic flip was unwound.
    assert_eq!(
        monitor.snapshot().platforms.get("discord").map(|p| p.active),
        Some(false)
    );
    monitor.disconnect().await;
}

#[tokio::test]
async fn sync_vault_bumps_the_memory_counter() {
    let server = MockServer::start().await;
    mount_status(&server).await;
    Mock::given(method("POST"))
        .and(path("/admin/api/vault/sync"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "success"
        })))
        .mount(&server)
        .await;

    let monitor = Monitor::new(config_for(&server)).expect("monitor");
    monitor.connect().await.expect("connect");
    assert_eq!(monitor.snapshot().database.map(|d| d.memories), Some(31));

    monitor.sync_vault().await.expect("sync");
    assert_eq!(monitor.snapshot().database.map(|d| d.memories), Some(32));
    monitor.disconnect().await;
}

#[tokio::test]
async fn export_analytics_passes_the_window_through() {
    let server = MockServer::start().await;
    mount_status(&server).await;
    Mock::given(method("GET"))
        .and(path("/admin/api/analytics/export"))
        .and(wiremock::matchers::query_param("days", "30"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "days": 30,
            "interactions": []
        })))
        .mount(&server)
        .await;

    let monitor = Monitor::new(config_for(&server)).expect("monitor");
    monitor.connect().await.expect("connect");

    let report = monitor.export_analytics(30).await.expect("export");
    assert_eq!(report.get("days").and_then(serde_json::Value::as_u64), Some(30));
    monitor.disconnect().await;
}
