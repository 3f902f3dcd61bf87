//! Domain operations while the backend is reachable

use crate::common::TestContext;
use crate::{assert_err, assert_ok};
use eventsync::client::offline::IdRef;
use eventsync::shared::error::SyncError;
use eventsync::shared::models::{NewUser, UserUpdate};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, ResponseTemplate};

fn new_user() -> NewUser {
    NewUser {
        nome: "Ana".into(),
        email: "ana@example.org".into(),
        senha: "segredo".into(),
        is_admin: false,
        cpf: None,
        telefone: None,
    }
}

#[tokio::test]
async fn test_online_create_user_is_cached_confirmed() {
    let ctx = TestContext::new().await;
    ctx.manager.set_online(true).await;
    Mock::given(method("POST"))
        .and(path("/usuarios"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 42})))
        .expect(1)
        .mount(&ctx.server)
        .await;

    let user = assert_ok!(ctx.manager.create_user(&new_user()).await);
    assert_eq!(user.id, 42);
    assert!(!user.sync_pending);
    assert_eq!(ctx.db.get_user(42).await.unwrap(), Some(user));
    assert!(ctx.manager.queue().is_empty().await.unwrap());
}

#[tokio::test]
async fn test_online_failure_is_not_queued() {
    let ctx = TestContext::new().await;
    ctx.manager.set_online(true).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(422).set_body_string("email taken"))
        .mount(&ctx.server)
        .await;

    assert_err!(
        ctx.manager.create_user(&new_user()).await,
        SyncError::Status { status: 422, .. }
    );
    assert!(ctx.manager.queue().is_empty().await.unwrap());
}

#[tokio::test]
async fn test_online_registration_for_local_user_goes_through_queue() {
    let ctx = TestContext::new().await;
    let user = ctx.manager.create_user(&new_user()).await.unwrap();
    ctx.manager.set_online(true).await;

    let registration = ctx
        .manager
        .create_registration(IdRef::Placeholder(user.id), 3)
        .await
        .unwrap();
    assert!(registration.sync_pending);

    let checkin = ctx
        .manager
        .check_in(registration.id_inscricao)
        .await
        .unwrap();
    assert!(checkin.sync_pending);

    assert_eq!(ctx.manager.pending_sync().await, 3);
    assert!(ctx.received().await.is_empty());
}

#[tokio::test]
async fn test_online_quick_register() {
    let ctx = TestContext::new().await;
    ctx.manager.set_online(true).await;
    Mock::given(method("POST"))
        .and(path("/usuarios"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id_usuario": 42})))
        .mount(&ctx.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/inscricoes"))
        .and(body_json(json!({"id_usuario": 42, "id_evento": 3})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id_inscricao": 99})))
        .mount(&ctx.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/inscricoes/99/checkin"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id_checkin": 5})))
        .mount(&ctx.server)
        .await;

    let quick = assert_ok!(ctx.manager.quick_register("Ana", "ana@example.org", 3).await);
    assert_eq!(quick.user.id, 42);
    assert_eq!(quick.registration.id_inscricao, 99);
    assert_eq!(quick.checkin.id_checkin, 5);

    let received = ctx.received().await;
    assert_eq!(received[0].body.as_ref().unwrap()["senha"], json!("123"));
    assert_eq!(ctx.manager.pending_sync().await, 0);
}

#[tokio::test]
async fn test_online_update_and_delete_user() {
    let ctx = TestContext::new().await;
    ctx.manager.set_online(true).await;
    ctx.db
        .put_user(&eventsync::shared::models::User::from_new(7, &new_user(), false))
        .await
        .unwrap();
    Mock::given(method("PUT"))
        .and(path("/usuarios/7"))
        .and(body_json(json!({"nome": "Ana Maria"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&ctx.server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/usuarios/7"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&ctx.server)
        .await;

    let update = UserUpdate {
        nome: Some("Ana Maria".into()),
        ..Default::default()
    };
    let updated = assert_ok!(ctx.manager.update_user(7, &update).await).unwrap();
    assert_eq!(updated.nome, "Ana Maria");
    assert!(!updated.sync_pending);

    assert_ok!(ctx.manager.delete_user(7).await);
    assert_eq!(ctx.db.get_user(7).await.unwrap(), None);
}

#[tokio::test]
async fn test_refresh_cache_when_queue_empty() {
    let ctx = TestContext::new().await;
    Mock::given(method("GET"))
        .and(path("/eventos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&ctx.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/usuarios"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"usuarios": [
            {"id": 1, "nome": "Ana", "email": "ana@example.org"}
        ]})))
        .mount(&ctx.server)
        .await;

    let report = assert_ok!(ctx.manager.refresh_cache().await).unwrap();
    assert_eq!(report.users, 1);
    assert_eq!(ctx.db.get_users().await.unwrap().len(), 1);
}
