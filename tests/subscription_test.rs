//! Store onboarding, subscription state and the payment review workflow.

mod common;

use axum::http::{Method, StatusCode};
use chrono::{DateTime, Duration, Utc};
use common::{customer, order_payload, str_at, uuid_at, TestApp};
use serde_json::json;
use storefront_api::auth::Actor;
use uuid::Uuid;

async fn store_without_subscription(app: &TestApp, slug: &str) -> (Uuid, Actor) {
    let body = app
        .call(
            Method::POST,
            "/api/v1/stores",
            &app.master,
            Some(json!({
                "name": "Fresh Store",
                "slug": slug,
                "delivery_fee": "4.00",
                "subscription_plan": "trial",
            })),
            StatusCode::CREATED,
        )
        .await;
    let id = uuid_at(&body, "/data/id");
    (id, Actor::store_admin(Uuid::new_v4(), id))
}

fn parse_time(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .expect("rfc3339 timestamp")
        .with_timezone(&Utc)
}

#[tokio::test]
async fn approved_payment_reopens_an_expired_store() {
    let app = TestApp::new().await;
    let (store_id, admin) = store_without_subscription(&app, "quiosque").await;

    let status = app
        .call(
            Method::GET,
            &format!("/api/v1/stores/{store_id}/subscription"),
            &admin,
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(str_at(&status, "/data/state"), "expired");
    assert_eq!(status["data"]["days_remaining"], json!(0));

    let orders_uri = format!("/api/v1/stores/{store_id}/orders");
    app.call(
        Method::POST,
        &orders_uri,
        &customer(),
        Some(order_payload("retirada", "2.00")),
        StatusCode::PAYMENT_REQUIRED,
    )
    .await;

    let submitted = app
        .call(
            Method::POST,
            &format!("/api/v1/stores/{store_id}/payments"),
            &admin,
            Some(json!({ "plan": "pro", "months": 2, "amount": "99.90" })),
            StatusCode::CREATED,
        )
        .await;
    assert_eq!(str_at(&submitted, "/data/status"), "pending");
    let approval_id = uuid_at(&submitted, "/data/id");

    let pending = app
        .call(Method::GET, "/api/v1/payments?status=pending", &app.master, None, StatusCode::OK)
        .await;
    assert_eq!(pending["data"].as_array().map(Vec::len), Some(1));

    let before = Utc::now();
    let approved = app
        .call(
            Method::POST,
            &format!("/api/v1/payments/{approval_id}/approve"),
            &app.master,
            Some(json!({ "note": "pix received" })),
            StatusCode::OK,
        )
        .await;
    assert_eq!(str_at(&approved, "/data/approval/status"), "approved");
    assert_eq!(str_at(&approved, "/data/approval/review_note"), "pix received");
    assert_eq!(uuid_at(&approved, "/data/approval/reviewed_by"), app.master.id);
    assert_eq!(str_at(&approved, "/data/store/subscription_plan"), "pro");

    let expiry = parse_time(str_at(&approved, "/data/store/subscription_expires_at"));
    assert!(expiry >= before + Duration::days(60));
    assert!(expiry <= Utc::now() + Duration::days(60));

    let status = app
        .call(
            Method::GET,
            &format!("/api/v1/stores/{store_id}/subscription"),
            &admin,
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(str_at(&status, "/data/state"), "active");

    app.call(
        Method::POST,
        &orders_uri,
        &customer(),
        Some(order_payload("retirada", "2.00")),
        StatusCode::CREATED,
    )
    .await;

    // A reviewed payment cannot be reviewed again
    app.call(
        Method::POST,
        &format!("/api/v1/payments/{approval_id}/approve"),
        &app.master,
        None,
        StatusCode::CONFLICT,
    )
    .await;
    app.call(
        Method::POST,
        &format!("/api/v1/payments/{approval_id}/reject"),
        &app.master,
        None,
        StatusCode::CONFLICT,
    )
    .await;
}

#[tokio::test]
async fn early_renewal_extends_from_the_current_expiry() {
    let app = TestApp::new().await;
    let store = app.seed_store("renova", "1.00").await;
    let current = app
        .call(
            Method::GET,
            &format!("/api/v1/stores/{}", store.id),
            &store.admin,
            None,
            StatusCode::OK,
        )
        .await;
    let current_expiry = parse_time(str_at(&current, "/data/subscription_expires_at"));

    let submitted = app
        .call(
            Method::POST,
            &format!("/api/v1/stores/{}/payments", store.id),
            &store.admin,
            Some(json!({ "plan": "basic", "months": 1, "amount": "49.90" })),
            StatusCode::CREATED,
        )
        .await;
    let approved = app
        .call(
            Method::POST,
            &format!("/api/v1/payments/{}/approve", uuid_at(&submitted, "/data/id")),
            &app.master,
            None,
            StatusCode::OK,
        )
        .await;
    let renewed = parse_time(str_at(&approved, "/data/store/subscription_expires_at"));
    let gained = renewed - current_expiry;
    assert!(gained >= Duration::days(30) - Duration::seconds(1));
    assert!(gained <= Duration::days(30) + Duration::seconds(1));
}

#[tokio::test]
async fn rejected_payment_leaves_the_store_untouched() {
    let app = TestApp::new().await;
    let (store_id, admin) = store_without_subscription(&app, "recusa").await;

    let submitted = app
        .call(
            Method::POST,
            &format!("/api/v1/stores/{store_id}/payments"),
            &admin,
            Some(json!({ "plan": "pro", "months": 1, "amount": "10.00" })),
            StatusCode::CREATED,
        )
        .await;
    let approval_id = uuid_at(&submitted, "/data/id");

    let rejected = app
        .call(
            Method::POST,
            &format!("/api/v1/payments/{approval_id}/reject"),
            &app.master,
            Some(json!({ "note": "receipt unreadable" })),
            StatusCode::OK,
        )
        .await;
    assert_eq!(str_at(&rejected, "/data/approval/status"), "rejected");
    assert_eq!(str_at(&rejected, "/data/store/subscription_plan"), "trial");
    assert!(rejected["data"]["store"]["subscription_expires_at"].is_null());

    let listed = app
        .call(Method::GET, "/api/v1/payments?status=rejected", &app.master, None, StatusCode::OK)
        .await;
    assert_eq!(listed["data"].as_array().map(Vec::len), Some(1));
    let none_pending = app
        .call(Method::GET, "/api/v1/payments?status=pending", &app.master, None, StatusCode::OK)
        .await;
    assert_eq!(none_pending["data"].as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn payment_submission_is_validated_and_scoped() {
    let app = TestApp::new().await;
    let store = app.seed_store("valida-pag", "1.00").await;
    let other = app.seed_store("outra-loja", "1.00").await;
    let uri = format!("/api/v1/stores/{}/payments", store.id);

    for body in [
        json!({ "plan": "pro", "months": 0, "amount": "10.00" }),
        json!({ "plan": "pro", "months": 25, "amount": "10.00" }),
        json!({ "plan": "pro", "months": 1, "amount": "0" }),
        json!({ "plan": "", "months": 1, "amount": "10.00" }),
    ] {
        app.call(Method::POST, &uri, &store.admin, Some(body), StatusCode::BAD_REQUEST)
            .await;
    }

    app.call(
        Method::POST,
        &uri,
        &other.admin,
        Some(json!({ "plan": "pro", "months": 1, "amount": "10.00" })),
        StatusCode::FORBIDDEN,
    )
    .await;

    // Reviewing and listing belong to the platform
    app.call(Method::GET, "/api/v1/payments", &store.admin, None, StatusCode::FORBIDDEN)
        .await;
    let submitted = app
        .call(
            Method::POST,
            &uri,
            &store.admin,
            Some(json!({ "plan": "pro", "months": 1, "amount": "10.00" })),
            StatusCode::CREATED,
        )
        .await;
    app.call(
        Method::POST,
        &format!("/api/v1/payments/{}/approve", uuid_at(&submitted, "/data/id")),
        &store.admin,
        None,
        StatusCode::FORBIDDEN,
    )
    .await;
    app.call(
        Method::POST,
        &format!("/api/v1/payments/{}/approve", Uuid::new_v4()),
        &app.master,
        None,
        StatusCode::NOT_FOUND,
    )
    .await;
}

#[tokio::test]
async fn store_creation_rules() {
    let app = TestApp::new().await;
    app.seed_store("unica", "1.00").await;

    let duplicate = json!({
        "name": "Copy",
        "slug": "unica",
        "delivery_fee": "1.00",
        "subscription_plan": "basic",
    });
    app.call(Method::POST, "/api/v1/stores", &app.master, Some(duplicate), StatusCode::CONFLICT)
        .await;

    for body in [
        json!({ "name": "Bad", "slug": "Not A Slug", "delivery_fee": "1.00", "subscription_plan": "basic" }),
        json!({ "name": "Bad", "slug": "-edge", "delivery_fee": "1.00", "subscription_plan": "basic" }),
        json!({ "name": "Bad", "slug": "negativa", "delivery_fee": "-1.00", "subscription_plan": "basic" }),
    ] {
        app.call(Method::POST, "/api/v1/stores", &app.master, Some(body), StatusCode::BAD_REQUEST)
            .await;
    }

    app.call(
        Method::POST,
        "/api/v1/stores",
        &customer(),
        Some(json!({ "name": "X", "slug": "by-customer", "delivery_fee": "1.00", "subscription_plan": "basic" })),
        StatusCode::FORBIDDEN,
    )
    .await;
}

#[tokio::test]
async fn expiring_subscription_is_flagged_but_still_takes_orders() {
    let app = TestApp::new().await;
    let body = app
        .call(
            Method::POST,
            "/api/v1/stores",
            &app.master,
            Some(json!({
                "name": "Quase",
                "slug": "quase-vence",
                "delivery_fee": "1.00",
                "subscription_plan": "basic",
                "subscription_expires_at": Utc::now() + Duration::days(3) + Duration::hours(1),
            })),
            StatusCode::CREATED,
        )
        .await;
    let store_id = uuid_at(&body, "/data/id");

    let status = app
        .call(
            Method::GET,
            &format!("/api/v1/stores/{store_id}/subscription"),
            &app.master,
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(str_at(&status, "/data/state"), "expiring_soon");
    assert_eq!(status["data"]["days_remaining"], json!(3));

    app.call(
        Method::POST,
        &format!("/api/v1/stores/{store_id}/orders"),
        &customer(),
        Some(order_payload("retirada", "1.00")),
        StatusCode::CREATED,
    )
    .await;
}

#[tokio::test]
async fn drivers_are_managed_by_their_store() {
    let app = TestApp::new().await;
    let store = app.seed_store("frota", "1.00").await;
    let other = app.seed_store("frota-b", "1.00").await;
    app.seed_driver(&store, "Zeca").await;
    app.seed_driver(&store, "Ana").await;

    let listed = app
        .call(
            Method::GET,
            &format!("/api/v1/stores/{}/drivers", store.id),
            &store.admin,
            None,
            StatusCode::OK,
        )
        .await;
    let names: Vec<&str> = listed["data"]
        .as_array()
        .expect("drivers")
        .iter()
        .filter_map(|d| d["name"].as_str())
        .collect();
    assert_eq!(names, vec!["Ana", "Zeca"]);

    app.call(
        Method::POST,
        &format!("/api/v1/stores/{}/drivers", store.id),
        &other.admin,
        Some(json!({ "name": "Intruso" })),
        StatusCode::FORBIDDEN,
    )
    .await;
    app.call(
        Method::GET,
        &format!("/api/v1/stores/{}/drivers", store.id),
        &other.admin,
        None,
        StatusCode::FORBIDDEN,
    )
    .await;
}
