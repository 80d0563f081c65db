//! Prometheus counters for the order lifecycle, exposed in text format at
//! `/metrics`.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use lazy_static::lazy_static;
use prometheus::{IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use tracing::error;

lazy_static! {
    pub static ref ORDERS_CREATED: IntCounter =
        IntCounter::new("storefront_orders_created_total", "Total number of orders created")
            .expect("metric can be created");
    pub static ref ORDER_TRANSITIONS: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "storefront_order_transitions_total",
            "Lifecycle actions applied, by action"
        ),
        &["action"]
    )
    .expect("metric can be created");
    pub static ref ORDER_ACTION_FAILURES: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "storefront_order_action_failures_total",
            "Lifecycle actions refused, by reason"
        ),
        &["reason"]
    )
    .expect("metric can be created");
    pub static ref EARNINGS_CREDITED: IntCounter = IntCounter::new(
        "storefront_driver_earnings_credited_total",
        "Driver earnings records created on delivery"
    )
    .expect("metric can be created");
    pub static ref PAYMENT_REVIEWS: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "storefront_payment_reviews_total",
            "Subscription payment reviews, by outcome"
        ),
        &["outcome"]
    )
    .expect("metric can be created");
    pub static ref EVENTS_PROCESSED: IntCounterVec = IntCounterVec::new(
        Opts::new("storefront_events_processed_total", "Domain events processed, by event"),
        &["event"]
    )
    .expect("metric can be created");
    pub static ref REGISTRY: Registry = build_registry();
}

fn build_registry() -> Registry {
    let registry = Registry::new();
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(ORDERS_CREATED.clone()),
        Box::new(ORDER_TRANSITIONS.clone()),
        Box::new(ORDER_ACTION_FAILURES.clone()),
        Box::new(EARNINGS_CREDITED.clone()),
        Box::new(PAYMENT_REVIEWS.clone()),
        Box::new(EVENTS_PROCESSED.clone()),
    ];
    for collector in collectors {
        if let Err(e) = registry.register(collector) {
            error!("Failed to register metric: {}", e);
        }
    }
    registry
}

/// Renders every registered metric in the Prometheus text format.
pub fn render() -> Result<String, prometheus::Error> {
    TextEncoder::new().encode_to_string(&REGISTRY.gather())
}

pub async fn metrics_handler() -> Response {
    match render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered_counters_are_rendered() {
        ORDER_TRANSITIONS.with_label_values(&["accept"]).inc();
        let text = render().unwrap();
        assert!(text.contains("storefront_order_transitions_total"));
        assert!(text.contains("action=\"accept\""));
    }
}
