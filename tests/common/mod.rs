#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Method, Request, StatusCode},
    response::Response,
    Router,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use storefront_api::{
    auth::{Actor, ActorRole, ACTOR_ID_HEADER, ACTOR_ROLE_HEADER, ACTOR_STORE_HEADER},
    build_router,
    config::AppConfig,
    db,
    events::{self, EventSender},
    AppState,
};
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

/// Helper harness for spinning up the application backed by an in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub master: Actor,
    _event_task: tokio::task::JoinHandle<()>,
}

/// A store created through the API, with its admin.
pub struct SeededStore {
    pub id: Uuid,
    pub admin: Actor,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let (event_tx, event_rx) = mpsc::channel(256);
        let event_task = tokio::spawn(events::process_events(event_rx));
        let state = AppState::new(Arc::new(pool), cfg, EventSender::new(event_tx));

        Self {
            router: build_router(state.clone()),
            state,
            master: Actor::new(ActorRole::MasterAdmin, Uuid::new_v4()),
            _event_task: event_task,
        }
    }

    /// Issue a request as `actor` (or anonymously) and return the raw response.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        actor: Option<&Actor>,
        body: Option<Value>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(actor) = actor {
            builder = builder
                .header(ACTOR_ROLE_HEADER, actor.role.as_str())
                .header(ACTOR_ID_HEADER, actor.id.to_string());
            if let Some(store_id) = actor.store_id {
                builder = builder.header(ACTOR_STORE_HEADER, store_id.to_string());
            }
        }

        let request = match body {
            Some(payload) => builder
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))
                .expect("request"),
            None => builder.body(Body::empty()).expect("request"),
        };

        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router response")
    }

    /// Issue a request and decode the JSON body, asserting the status first.
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        actor: &Actor,
        body: Option<Value>,
        expected: StatusCode,
    ) -> Value {
        let response = self.request(method.clone(), uri, Some(actor), body).await;
        let status = response.status();
        let json = response_json(response).await;
        assert_eq!(status, expected, "{method} {uri} returned {json}");
        json
    }

    /// Creates a store whose subscription runs for another 30 days.
    pub async fn seed_store(&self, slug: &str, delivery_fee: &str) -> SeededStore {
        let expires_at = Utc::now() + Duration::days(30);
        let body = self
            .call(
                Method::POST,
                "/api/v1/stores",
                &self.master,
                Some(json!({
                    "name": format!("Store {slug}"),
                    "slug": slug,
                    "delivery_fee": delivery_fee,
                    "subscription_plan": "basic",
                    "subscription_expires_at": expires_at,
                })),
                StatusCode::CREATED,
            )
            .await;
        let id = uuid_at(&body, "/data/id");
        SeededStore {
            id,
            admin: Actor::store_admin(Uuid::new_v4(), id),
        }
    }

    pub async fn seed_driver(&self, store: &SeededStore, name: &str) -> Actor {
        let body = self
            .call(
                Method::POST,
                &format!("/api/v1/stores/{}/drivers", store.id),
                &store.admin,
                Some(json!({ "name": name, "phone": "+55 11 99999-0000" })),
                StatusCode::CREATED,
            )
            .await;
        Actor::new(ActorRole::Driver, uuid_at(&body, "/data/id"))
    }

    /// Places a single-item order and returns its id.
    pub async fn place_order(
        &self,
        store: &SeededStore,
        customer: &Actor,
        delivery_type: &str,
        unit_price: &str,
    ) -> Uuid {
        let body = self
            .call(
                Method::POST,
                &format!("/api/v1/stores/{}/orders", store.id),
                customer,
                Some(order_payload(delivery_type, unit_price)),
                StatusCode::CREATED,
            )
            .await;
        uuid_at(&body, "/data/order/id")
    }

    /// Applies an order action and returns the decoded body.
    pub async fn act(&self, order_id: Uuid, actor: &Actor, action: Value, expected: StatusCode) -> Value {
        self.call(
            Method::POST,
            &format!("/api/v1/orders/{order_id}/actions"),
            actor,
            Some(action),
            expected,
        )
        .await
    }

    pub async fn order(&self, order_id: Uuid, actor: &Actor) -> Value {
        self.call(
            Method::GET,
            &format!("/api/v1/orders/{order_id}"),
            actor,
            None,
            StatusCode::OK,
        )
        .await
    }
}

pub fn customer() -> Actor {
    Actor::new(ActorRole::Customer, Uuid::new_v4())
}

pub fn order_payload(delivery_type: &str, unit_price: &str) -> Value {
    json!({
        "customer_name": "Ana Souza",
        "delivery_type": delivery_type,
        "delivery_address": "Rua das Flores, 12",
        "items": [
            { "product_name": "X-Burger", "quantity": 2, "unit_price": unit_price }
        ]
    })
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).expect("json response")
}

pub fn uuid_at(body: &Value, pointer: &str) -> Uuid {
    body.pointer(pointer)
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(|| panic!("no uuid at {pointer} in {body}"))
}

pub fn str_at<'a>(body: &'a Value, pointer: &str) -> &'a str {
    body.pointer(pointer)
        .and_then(Value::as_str)
        .unwrap_or_else(|| panic!("no string at {pointer} in {body}"))
}

/// Decimal fields serialize as strings; compare them numerically.
pub fn decimal_at(body: &Value, pointer: &str) -> rust_decimal::Decimal {
    let raw = body
        .pointer(pointer)
        .unwrap_or_else(|| panic!("no value at {pointer} in {body}"));
    let text = match raw {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    text.parse::<rust_decimal::Decimal>()
        .unwrap_or_else(|_| panic!("{text} is not a decimal"))
        .round_dp(2)
}
