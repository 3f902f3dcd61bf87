//! Queue replay against a mock backend

use crate::common::{object, TestContext};
use crate::{assert_err, assert_ok};
use eventsync::client::offline::{ActionMethod, IdRef, PendingRequest, SyncOutcome};
use eventsync::shared::error::SyncError;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

async fn queue_user_registration_checkin(ctx: &TestContext) {
    let queue = ctx.manager.queue();
    queue
        .enqueue(
            ActionMethod::Post,
            "/usuarios",
            Some(object(json!({"nome": "Ana", "email": "ana@example.org", "localId": 555}))),
        )
        .await
        .unwrap();
    queue
        .enqueue(
            ActionMethod::Post,
            "/inscricoes",
            Some(object(json!({"idUsuarioLocal": 555, "id_evento": 3, "localId": 700}))),
        )
        .await
        .unwrap();
    queue
        .enqueue(ActionMethod::Post, "/inscricoes/700/checkin", None)
        .await
        .unwrap();
    ctx.manager.refresh_pending_count().await.unwrap();
}

#[tokio::test]
async fn test_chain_resolves_and_clears_queue() {
    let ctx = TestContext::new().await;
    Mock::given(method("POST"))
        .and(path("/usuarios"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 42})))
        .expect(1)
        .mount(&ctx.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/inscricoes"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id_inscricao": 99})))
        .expect(1)
        .mount(&ctx.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/inscricoes/99/checkin"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&ctx.server)
        .await;

    queue_user_registration_checkin(&ctx).await;
    assert_eq!(ctx.manager.pending_sync().await, 3);

    let outcome = assert_ok!(ctx.manager.sync_now().await);
    assert!(matches!(outcome, SyncOutcome::Completed(report) if report.replayed == 3));

    let received = ctx.received().await;
    assert_eq!(received.len(), 3);
    assert_eq!(
        received[0].body,
        Some(json!({"nome": "Ana", "email": "ana@example.org"}))
    );
    assert_eq!(received[1].path, "/inscricoes");
    assert_eq!(received[1].body, Some(json!({"id_usuario": 42, "id_evento": 3})));
    assert_eq!(received[2].path, "/inscricoes/99/checkin");

    assert!(ctx.manager.queue().is_empty().await.unwrap());
    let status = ctx.manager.status().await;
    assert_eq!(status.pending_count, 0);
    assert!(status.last_sync.is_some());
}

#[tokio::test]
async fn test_failure_keeps_rewritten_tail() {
    let ctx = TestContext::new().await;
    Mock::given(method("POST"))
        .and(path("/usuarios"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 42})))
        .mount(&ctx.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/inscricoes"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&ctx.server)
        .await;

    let queue = ctx.manager.queue();
    queue
        .enqueue(
            ActionMethod::Post,
            "/usuarios",
            Some(object(json!({"nome": "Ana", "localId": 555}))),
        )
        .await
        .unwrap();
    let registration = queue
        .enqueue(
            ActionMethod::Post,
            "/inscricoes",
            Some(object(json!({"idUsuarioLocal": 555, "id_evento": 3}))),
        )
        .await
        .unwrap();

    assert_err!(
        ctx.manager.sync_now().await,
        SyncError::Status { status: 500, .. }
    );

    let remaining = queue.list_ordered().await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, registration);
    assert_eq!(
        remaining[0].payload.body,
        Some(object(json!({"id_usuario": 42, "id_evento": 3})))
    );

    let status = ctx.manager.status().await;
    assert_eq!(status.pending_count, 1);
    assert!(status.last_error.unwrap().contains("500"));
}

#[tokio::test]
async fn test_unresolved_local_user_is_never_sent() {
    let ctx = TestContext::new().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&ctx.server)
        .await;

    ctx.manager
        .queue()
        .submit(&PendingRequest::create_registration(700, IdRef::Placeholder(555), 3))
        .await
        .unwrap();

    assert_err!(
        ctx.manager.sync_now().await,
        SyncError::UnresolvedPlaceholder { placeholder: 555, .. }
    );
    assert_eq!(ctx.manager.queue().len().await.unwrap(), 1);
}

#[tokio::test]
async fn test_bearer_token_attached() {
    let ctx = TestContext::new().await;
    ctx.db.set_auth_token("s3cret").await.unwrap();
    Mock::given(method("DELETE"))
        .and(path("/usuarios/8"))
        .and(header("Authorization", "Bearer s3cret"))
        .and(header("Content-Type", "application/json"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&ctx.server)
        .await;

    ctx.manager
        .register_pending("DELETE", "/usuarios/8", None)
        .await
        .unwrap();
    assert_ok!(ctx.manager.sync_now().await);
}

#[tokio::test]
async fn test_optimistic_entities_rekeyed() {
    let ctx = TestContext::new().await;
    Mock::given(method("POST"))
        .and(path("/usuarios"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id_usuario": "42"})))
        .mount(&ctx.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/inscricoes"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({"data": {"id_inscricao": 99}})),
        )
        .mount(&ctx.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/inscricoes/99/checkin"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&ctx.server)
        .await;

    let quick = ctx
        .manager
        .quick_register("Ana", "ana@example.org", 3)
        .await
        .unwrap();
    assert!(quick.user.sync_pending);

    assert_ok!(ctx.manager.sync_now().await);

    assert_eq!(ctx.db.get_user(quick.user.id).await.unwrap(), None);
    let user = ctx.db.get_user(42).await.unwrap().unwrap();
    assert!(!user.sync_pending);

    let registration = ctx.db.get_registration(99).await.unwrap().unwrap();
    assert_eq!(registration.id_usuario, 42);
    assert!(!registration.sync_pending);

    let checkins = ctx.db.get_registration_checkins(99).await.unwrap();
    assert_eq!(checkins.len(), 1);
    assert!(!checkins[0].sync_pending);
}

#[tokio::test]
async fn test_concurrent_sync_is_single_flight() {
    let ctx = TestContext::new().await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(204).set_delay(Duration::from_millis(400)))
        .expect(1)
        .mount(&ctx.server)
        .await;

    ctx.manager
        .register_pending("DELETE", "/usuarios/1", None)
        .await
        .unwrap();

    let first = Arc::clone(&ctx.manager);
    let second = Arc::clone(&ctx.manager);
    let (a, b) = tokio::join!(first.sync_now(), async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        second.sync_now().await
    });

    assert!(matches!(assert_ok!(a), SyncOutcome::Completed(_)));
    assert_eq!(assert_ok!(b), SyncOutcome::AlreadyRunning);
}

#[tokio::test]
async fn test_enqueue_during_drain_survives_clear() {
    let ctx = TestContext::new().await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(204).set_delay(Duration::from_millis(300)))
        .mount(&ctx.server)
        .await;

    ctx.manager
        .register_pending("DELETE", "/usuarios/1", None)
        .await
        .unwrap();

    let syncing = Arc::clone(&ctx.manager);
    let enqueuing = Arc::clone(&ctx.manager);
    let (synced, queued) = tokio::join!(syncing.sync_now(), async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        enqueuing
            .register_pending("DELETE", "/usuarios/2", None)
            .await
    });
    assert_ok!(synced);
    assert_ok!(queued);

    let remaining = ctx.manager.queue().list_ordered().await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].payload.url, "/usuarios/2");
    assert_eq!(ctx.manager.pending_sync().await, 1);
}
