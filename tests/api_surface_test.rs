//! Health checks, metrics, docs and the response envelope.

mod common;

use axum::http::{Method, StatusCode};
use common::{customer, response_json, TestApp};
use serde_json::json;
use storefront_api::tracing::REQUEST_ID_HEADER;

#[tokio::test]
async fn health_reports_the_database() {
    let app = TestApp::new().await;
    let response = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["checks"]["database"], json!("healthy"));
}

#[tokio::test]
async fn status_names_the_service() {
    let app = TestApp::new().await;
    let body = response_json(app.request(Method::GET, "/status", None, None).await).await;
    assert_eq!(body["data"]["service"], json!("storefront-api"));
    assert_eq!(body["data"]["environment"], json!("test"));
}

#[tokio::test]
async fn metrics_are_exposed_after_traffic() {
    let app = TestApp::new().await;
    let store = app.seed_store("metricas", "1.00").await;
    app.place_order(&store, &customer(), "retirada", "1.00").await;

    let response = app.request(Method::GET, "/metrics", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("metrics body");
    let text = String::from_utf8(bytes.to_vec()).expect("utf8 metrics");
    assert!(text.contains("storefront_orders_created_total"));
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = TestApp::new().await;
    let response = app
        .request(Method::GET, "/api-docs/openapi.json", None, None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let doc = response_json(response).await;
    assert!(doc["paths"]["/api/v1/orders/{id}/actions"].is_object());
}

#[tokio::test]
async fn responses_and_errors_carry_the_request_id() {
    let app = TestApp::new().await;
    let store = app.seed_store("rastreio", "1.00").await;

    let ok = app
        .request(
            Method::GET,
            &format!("/api/v1/stores/{}", store.id),
            Some(&store.admin),
            None,
        )
        .await;
    let echoed = ok
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .expect("request id header");
    let body = response_json(ok).await;
    assert_eq!(body["meta"]["request_id"], json!(echoed));

    let missing = app
        .request(
            Method::GET,
            &format!("/api/v1/orders/{}", uuid::Uuid::new_v4()),
            Some(&store.admin),
            None,
        )
        .await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    let body = response_json(missing).await;
    assert_eq!(body["error"], json!("Not Found"));
    assert!(body["request_id"].is_string());
}

#[tokio::test]
async fn unknown_roles_are_unauthorized() {
    let app = TestApp::new().await;
    let request = axum::http::Request::builder()
        .uri("/api/v1/payments")
        .header("x-actor-role", "superuser")
        .header("x-actor-id", uuid::Uuid::new_v4().to_string())
        .body(axum::body::Body::empty())
        .expect("request");
    let response = tower::ServiceExt::oneshot(storefront_api::build_router(app.state.clone()), request)
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn malformed_requests_use_the_error_envelope() {
    let app = TestApp::new().await;
    let store = app.seed_store("envelope", "1.00").await;
    let order_id = app.place_order(&store, &customer(), "retirada", "1.00").await;

    let unknown_action = app
        .request(
            Method::POST,
            &format!("/api/v1/orders/{order_id}/actions"),
            Some(&store.admin),
            Some(json!({ "action": "fly" })),
        )
        .await;
    let bad_path = app
        .request(Method::GET, "/api/v1/orders/not-a-uuid", Some(&store.admin), None)
        .await;
    let bad_query = app
        .request(Method::GET, "/api/v1/orders?store_id=nope", Some(&app.master), None)
        .await;

    for response in [unknown_action, bad_path, bad_query] {
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = response_json(response).await;
        assert_eq!(body["error"], json!("Bad Request"));
        assert!(body["message"].is_string());
        assert!(body["request_id"].is_string());
    }
}

#[tokio::test]
async fn huge_page_numbers_are_rejected_not_fatal() {
    let app = TestApp::new().await;
    let uri = format!("/api/v1/orders?page={}&limit=100", u64::MAX);
    let response = app.request(Method::GET, &uri, Some(&app.master), None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert!(body["request_id"].is_string());

    let far_page = app
        .request(Method::GET, "/api/v1/orders?page=1000000&limit=100", Some(&app.master), None)
        .await;
    assert_eq!(far_page.status(), StatusCode::OK);
    let body = response_json(far_page).await;
    assert_eq!(body["data"]["items"].as_array().map(Vec::len), Some(0));
}
