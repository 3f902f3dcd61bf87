//! Background ticker behavior

use crate::common::{manager_for, TestContext};
use eventsync::client::sync::{SyncService, SyncWorker};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

async fn mount_health_and_snapshot(ctx: &TestContext) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&ctx.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/eventos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&ctx.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/usuarios"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&ctx.server)
        .await;
}

#[tokio::test]
async fn test_reconnect_drains_then_refreshes() {
    let ctx = TestContext::new().await;
    mount_health_and_snapshot(&ctx).await;
    Mock::given(method("DELETE"))
        .and(path("/usuarios/3"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&ctx.server)
        .await;

    ctx.manager
        .register_pending("DELETE", "/usuarios/3", None)
        .await
        .unwrap();

    let mut worker = SyncWorker::new(Arc::clone(&ctx.manager));
    let report = worker.tick().await;
    assert!(report.online);
    assert!(report.drained);
    assert!(report.refreshed);
    assert_eq!(report.pending, 0);

    let second = worker.tick().await;
    assert!(!second.drained);
    assert!(!second.refreshed);
}

#[tokio::test]
async fn test_no_refresh_while_actions_pending() {
    let ctx = TestContext::new().await;
    mount_health_and_snapshot(&ctx).await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&ctx.server)
        .await;

    ctx.manager
        .register_pending("DELETE", "/usuarios/3", None)
        .await
        .unwrap();

    let report = SyncWorker::new(Arc::clone(&ctx.manager)).tick().await;
    assert!(report.drained);
    assert!(!report.refreshed);
    assert_eq!(report.pending, 1);
    assert!(ctx.manager.status().await.last_error.is_some());
}

#[tokio::test]
async fn test_service_marks_unreachable_backend_offline() {
    let manager = manager_for("http://127.0.0.1:9").await;
    manager.set_online(true).await;

    let mut service = SyncService::start(Arc::clone(&manager));
    tokio::time::sleep(Duration::from_millis(400)).await;

    assert!(!manager.is_online().await);
    service.stop();
}

#[tokio::test]
async fn test_failed_drain_retried_on_next_tick_while_online() {
    let ctx = TestContext::new().await;
    mount_health_and_snapshot(&ctx).await;
    Mock::given(method("DELETE"))
        .and(path("/usuarios/3"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&ctx.server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/usuarios/3"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&ctx.server)
        .await;

    ctx.manager
        .register_pending("DELETE", "/usuarios/3", None)
        .await
        .unwrap();

    let mut worker = SyncWorker::new(Arc::clone(&ctx.manager));
    let first = worker.tick().await;
    assert!(first.online);
    assert!(first.drained);
    assert_eq!(first.pending, 1);

    let second = worker.tick().await;
    assert!(second.online);
    assert!(second.drained);
    assert_eq!(second.pending, 0);
    assert!(second.refreshed);
    assert_eq!(ctx.manager.queue().len().await.unwrap(), 0);
}

#[tokio::test]
async fn test_work_queued_while_online_drained_by_tick() {
    let ctx = TestContext::new().await;
    mount_health_and_snapshot(&ctx).await;
    Mock::given(method("DELETE"))
        .and(path("/usuarios/8"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&ctx.server)
        .await;

    ctx.manager.set_online(true).await;
    ctx.manager
        .register_pending("DELETE", "/usuarios/8", None)
        .await
        .unwrap();

    let report = SyncWorker::new(Arc::clone(&ctx.manager)).tick().await;
    assert!(report.drained);
    assert_eq!(report.pending, 0);
}
