//! Driver earnings: crediting on delivery, summaries and payouts.

mod common;

use axum::http::{Method, StatusCode};
use common::{customer, decimal_at, str_at, uuid_at, SeededStore, TestApp};
use chrono::Utc;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set};
use serde_json::{json, Value};
use storefront_api::{auth::Actor, entities::driver_earnings, models::EarningsPaymentStatus};
use uuid::Uuid;

/// Runs a delivery order from placement to `concluido` and returns the outcome
/// of the deliver action.
async fn deliver_one(app: &TestApp, store: &SeededStore, driver: &Actor) -> Value {
    let order_id = app.place_order(store, &customer(), "delivery", "10.00").await;
    for (actor, action) in [
        (&store.admin, json!({"action": "accept"})),
        (&store.admin, json!({"action": "assign_driver", "driver_id": driver.id})),
        (driver, json!({"action": "accept_assignment"})),
        (&store.admin, json!({"action": "mark_ready"})),
        (driver, json!({"action": "pick_up"})),
    ] {
        app.act(order_id, actor, action, StatusCode::OK).await;
    }
    app.act(order_id, driver, json!({"action": "deliver"}), StatusCode::OK)
        .await
}

#[tokio::test]
async fn deliveries_accumulate_and_payouts_move_between_totals() {
    let app = TestApp::new().await;
    let store = app.seed_store("entrega-rapida", "6.50").await;
    let driver = app.seed_driver(&store, "Hugo").await;

    let first = deliver_one(&app, &store, &driver).await;
    deliver_one(&app, &store, &driver).await;
    let first_earnings = uuid_at(&first, "/data/earnings/id");

    let summary_uri = format!("/api/v1/drivers/{}/earnings/summary", driver.id);
    let summary = app
        .call(Method::GET, &summary_uri, &driver, None, StatusCode::OK)
        .await;
    assert_eq!(decimal_at(&summary, "/data/pending_total"), dec!(13.00));
    assert_eq!(decimal_at(&summary, "/data/paid_total"), dec!(0));
    assert_eq!(summary["data"]["deliveries"], json!(2));

    let paid = app
        .call(
            Method::POST,
            &format!("/api/v1/earnings/{first_earnings}/pay"),
            &store.admin,
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(str_at(&paid, "/data/payment_status"), "paid");
    assert!(paid["data"]["paid_at"].is_string());

    app.call(
        Method::POST,
        &format!("/api/v1/earnings/{first_earnings}/pay"),
        &store.admin,
        None,
        StatusCode::CONFLICT,
    )
    .await;

    let summary = app
        .call(Method::GET, &summary_uri, &store.admin, None, StatusCode::OK)
        .await;
    assert_eq!(decimal_at(&summary, "/data/pending_total"), dec!(6.50));
    assert_eq!(decimal_at(&summary, "/data/paid_total"), dec!(6.50));

    let pending_only = app
        .call(
            Method::GET,
            &format!("/api/v1/drivers/{}/earnings?payment_status=pending", driver.id),
            &driver,
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(pending_only["data"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn earnings_are_private_to_the_driver_and_their_store() {
    let app = TestApp::new().await;
    let store = app.seed_store("privada", "5.00").await;
    let other = app.seed_store("vizinha", "5.00").await;
    let driver = app.seed_driver(&store, "Iris").await;
    let colleague = app.seed_driver(&store, "Joao").await;

    let delivered = deliver_one(&app, &store, &driver).await;
    let earnings_id = uuid_at(&delivered, "/data/earnings/id");
    let uri = format!("/api/v1/drivers/{}/earnings", driver.id);

    app.call(Method::GET, &uri, &colleague, None, StatusCode::FORBIDDEN)
        .await;
    app.call(Method::GET, &uri, &other.admin, None, StatusCode::FORBIDDEN)
        .await;
    app.call(Method::GET, &uri, &customer(), None, StatusCode::FORBIDDEN)
        .await;
    app.call(Method::GET, &uri, &app.master, None, StatusCode::OK)
        .await;
    app.call(
        Method::GET,
        &format!("/api/v1/drivers/{}/earnings", Uuid::new_v4()),
        &app.master,
        None,
        StatusCode::NOT_FOUND,
    )
    .await;

    // Drivers cannot pay themselves and other stores cannot pay them
    app.call(
        Method::POST,
        &format!("/api/v1/earnings/{earnings_id}/pay"),
        &driver,
        None,
        StatusCode::FORBIDDEN,
    )
    .await;
    app.call(
        Method::POST,
        &format!("/api/v1/earnings/{earnings_id}/pay"),
        &other.admin,
        None,
        StatusCode::FORBIDDEN,
    )
    .await;
    app.call(
        Method::POST,
        &format!("/api/v1/earnings/{earnings_id}/pay"),
        &app.master,
        None,
        StatusCode::OK,
    )
    .await;
}

#[tokio::test]
async fn pickup_orders_never_credit_earnings() {
    let app = TestApp::new().await;
    let store = app.seed_store("balcao", "5.00").await;
    let driver = app.seed_driver(&store, "Kai").await;

    let order_id = app.place_order(&store, &customer(), "retirada", "4.00").await;
    for action in ["accept", "mark_ready", "complete_pickup"] {
        app.act(order_id, &store.admin, json!({ "action": action }), StatusCode::OK)
            .await;
    }

    let summary = app
        .call(
            Method::GET,
            &format!("/api/v1/drivers/{}/earnings/summary", driver.id),
            &driver,
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(summary["data"]["deliveries"], json!(0));
}

#[tokio::test]
async fn delivering_an_already_credited_order_keeps_one_record() {
    let app = TestApp::new().await;
    let store = app.seed_store("ja-pago", "7.00").await;
    let driver = app.seed_driver(&store, "Lia").await;

    let order_id = app.place_order(&store, &customer(), "delivery", "10.00").await;
    for (actor, action) in [
        (&store.admin, json!({"action": "accept"})),
        (&store.admin, json!({"action": "assign_driver", "driver_id": driver.id})),
        (&driver, json!({"action": "accept_assignment"})),
        (&store.admin, json!({"action": "mark_ready"})),
        (&driver, json!({"action": "pick_up"})),
    ] {
        app.act(order_id, actor, action, StatusCode::OK).await;
    }
    let detail = app.order(order_id, &store.admin).await;
    let assignment_id = uuid_at(&detail, "/data/assignment/id");

    // A record for this order already exists, e.g. from an earlier attempt
    let db = app.state.db.as_ref();
    let existing = driver_earnings::ActiveModel {
        id: Set(Uuid::new_v4()),
        order_id: Set(order_id),
        assignment_id: Set(assignment_id),
        driver_id: Set(driver.id),
        store_id: Set(store.id),
        amount: Set(dec!(7.00)),
        payment_status: Set(EarningsPaymentStatus::Pending),
        created_at: Set(Utc::now()),
        paid_at: Set(None),
    }
    .insert(db)
    .await
    .expect("seed earnings");

    let delivered = app
        .act(order_id, &driver, json!({"action": "deliver"}), StatusCode::OK)
        .await;
    assert_eq!(str_at(&delivered, "/data/to_status"), "concluido");
    assert!(delivered["data"]["earnings"].is_null());

    let records = driver_earnings::Entity::find()
        .filter(driver_earnings::Column::OrderId.eq(order_id))
        .count(db)
        .await
        .expect("count earnings");
    assert_eq!(records, 1);
    let kept = driver_earnings::Entity::find()
        .filter(driver_earnings::Column::OrderId.eq(order_id))
        .one(db)
        .await
        .expect("load earnings")
        .expect("earnings row");
    assert_eq!(kept.id, existing.id);
}
