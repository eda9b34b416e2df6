use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use paydesk_core::uow::UnitOfWork;
use serde_json::{Value, json};
use uuid::Uuid;

use paydesk_billing::bootstrap::{build_broker, build_relay};
use paydesk_billing::infra::db::DbOutboxRepository;
use paydesk_billing::relay::RelaySettings;
use paydesk_billing::router::build_router;
use paydesk_billing::state::AppState;
use paydesk_testing::db::TestDb;

async fn server() -> (TestServer, AppState) {
    let db = TestDb::migrated().await;
    let broker = Arc::new(build_broker(UnitOfWork::new(db.clone()), 0));
    let state = AppState {
        db,
        broker,
        max_retries: 5,
    };
    let server = TestServer::new(build_router(state.clone())).unwrap();
    (server, state)
}

async fn create_order(server: &TestServer, amount: i64) -> Value {
    let response = server.post("/orders").json(&json!({ "amount": amount })).await;
    response.assert_status(StatusCode::CREATED);
    response.json::<Value>()
}

#[tokio::test]
async fn should_answer_health_checks() {
    let (server, _) = server().await;
    server.get("/healthz").await.assert_status_ok();
    server.get("/readyz").await.assert_status_ok();
}

#[tokio::test]
async fn should_attach_request_id_to_responses() {
    let (server, _) = server().await;
    let response = server.get("/healthz").await;
    let id = response.header("x-request-id");
    assert!(Uuid::parse_str(id.to_str().unwrap()).is_ok());
}

#[tokio::test]
async fn should_create_and_fetch_order_in_camel_case() {
    let (server, _) = server().await;
    let created = create_order(&server, 15_000).await;

    assert_eq!(created["amount"], 15_000);
    assert_eq!(created["status"], "PENDING");
    let created_at = created["createdAt"].as_str().unwrap();
    assert!(created_at.ends_with('Z') && created_at.len() == 24, "{created_at}");

    let id = created["id"].as_str().unwrap();
    let fetched = server.get(&format!("/orders/{id}")).await;
    fetched.assert_status_ok();
    assert_eq!(fetched.json::<Value>()["id"], id);

    let listed = server.get("/orders").await.json::<Value>();
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn should_reject_non_positive_amount() {
    let (server, _) = server().await;
    let response = server.post("/orders").json(&json!({ "amount": 0 })).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["kind"], "INVALID_AMOUNT");
}

#[tokio::test]
async fn should_pay_once_and_reject_second_payment() {
    let (server, _) = server().await;
    let created = create_order(&server, 15_000).await;
    let id = created["id"].as_str().unwrap();

    let paid = server.post(&format!("/orders/{id}/pay")).await;
    paid.assert_status_ok();
    let body = paid.json::<Value>();
    assert_eq!(body["order"]["status"], "PAID");
    assert_eq!(body["event"]["kind"], "ORDER_PAID");
    assert_eq!(body["event"]["orderId"], id);
    assert_eq!(body["event"]["failureCount"], 0);
    assert!(body["event"]["publishedAt"].is_null());

    let again = server.post(&format!("/orders/{id}/pay")).await;
    again.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(again.json::<Value>()["kind"], "INVALID_STATE_TRANSITION");

    let event_id = body["event"]["id"].as_str().unwrap();
    let event = server.get(&format!("/outbox/events/{event_id}")).await;
    event.assert_status_ok();
    assert_eq!(event.json::<Value>()["amount"], 15_000);
}

#[tokio::test]
async fn should_return_404_for_unknown_resources() {
    let (server, _) = server().await;
    let unknown = Uuid::now_v7();
    for path in [
        format!("/orders/{unknown}"),
        format!("/invoices/{unknown}"),
        format!("/invoices/order/{unknown}"),
        format!("/outbox/events/{unknown}"),
    ] {
        server.get(&path).await.assert_status(StatusCode::NOT_FOUND);
    }
    server
        .post(&format!("/orders/{unknown}/pay"))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn should_expose_invoice_and_outbox_stats_after_relay() {
    let (server, state) = server().await;
    let created = create_order(&server, 15_000).await;
    let id = created["id"].as_str().unwrap();
    server.post(&format!("/orders/{id}/pay")).await.assert_status_ok();

    let before = server.get("/outbox/stats").await.json::<Value>();
    assert_eq!(before["unpublishedCount"], 2);
    assert_eq!(before["orderCreatedCount"], 1);
    assert_eq!(before["orderPaidCount"], 1);

    let relay = build_relay(
        DbOutboxRepository::new(state.db.clone()),
        Arc::clone(&state.broker),
        RelaySettings::default(),
    );
    relay.try_tick().await;

    let after = server.get("/outbox/stats").await.json::<Value>();
    assert_eq!(after["unpublishedCount"], 0);
    assert_eq!(after["abandonedCount"], 0);

    let stats = server.get("/invoices/stats").await.json::<Value>();
    assert_eq!(stats["totalInvoices"], 1);
    assert_eq!(stats["totalProcessedEvents"], 1);

    let invoice = server.get(&format!("/invoices/order/{id}")).await;
    invoice.assert_status_ok();
    let invoice = invoice.json::<Value>();
    assert_eq!(invoice["amount"], 15_000);

    let invoice_id = invoice["id"].as_str().unwrap();
    server
        .get(&format!("/invoices/{invoice_id}"))
        .await
        .assert_status_ok();
    let list = server.get("/invoices").await.json::<Value>();
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn should_arm_and_reset_broker_failure_simulation() {
    let (server, _) = server().await;

    let armed = server
        .put("/broker/failure-simulation")
        .json(&json!({ "failuresBeforeSuccess": 2 }))
        .await;
    armed.assert_status_ok();
    let armed = armed.json::<Value>();
    assert_eq!(armed["simulateFailure"], true);
    assert_eq!(armed["remainingFailures"], 2);

    let stats = server.get("/broker/stats").await.json::<Value>();
    assert_eq!(stats["eventKinds"], json!(["ORDER_PAID"]));
    assert_eq!(stats["totalSubscribers"], 1);
    assert_eq!(stats["failureSimulation"]["failuresBeforeSuccess"], 2);

    let reset = server.delete("/broker/failure-simulation").await;
    reset.assert_status_ok();
    assert_eq!(reset.json::<Value>()["simulateFailure"], false);
}
