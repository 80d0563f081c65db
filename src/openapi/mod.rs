use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Storefront API",
        version = "1.0.0",
        description = r#"
# Storefront API

Multi-tenant ordering backend for small storefronts: customers place orders,
stores prepare them, drivers deliver them and the platform bills stores by
subscription.

## Caller identity

Credentials are verified by the gateway in front of this service, which
forwards the caller in three headers:

- `X-Actor-Role`: `store_admin`, `driver`, `customer` or `master_admin`
- `X-Actor-Id`: the caller's UUID
- `X-Actor-Store-Id`: the store a store admin manages

## Order lifecycle

`entrada → em_preparo → aguarda_retirada → em_transito → concluido`, with
`cancelado` reachable from any non-terminal status. Use
`GET /api/v1/orders/{id}/actions` to see what the caller may do next and
`POST /api/v1/orders/{id}/actions` to do it. Send `expected_version` to reject
writes against a stale read with `409`.

## Error Handling

Failures share one body:

```json
{
  "error": "Conflict",
  "message": "Order ... was modified by another request; reload and retry",
  "request_id": "2b7c...",
  "timestamp": "2026-01-01T00:00:00Z"
}
```
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "orders", description = "Order placement and lifecycle"),
        (name = "stores", description = "Stores, drivers and subscription state"),
        (name = "payments", description = "Subscription payment review"),
        (name = "earnings", description = "Driver earnings and payouts")
    ),
    paths(
        // Orders
        crate::handlers::orders::create_order,
        crate::handlers::orders::list_orders,
        crate::handlers::orders::get_order,
        crate::handlers::orders::order_history,
        crate::handlers::orders::available_actions,
        crate::handlers::orders::apply_action,

        // Stores
        crate::handlers::stores::create_store,
        crate::handlers::stores::get_store,
        crate::handlers::stores::subscription_status,
        crate::handlers::stores::register_driver,
        crate::handlers::stores::list_drivers,

        // Payments
        crate::handlers::payments::submit_payment,
        crate::handlers::payments::list_payments,
        crate::handlers::payments::approve_payment,
        crate::handlers::payments::reject_payment,

        // Earnings
        crate::handlers::earnings::list_earnings,
        crate::handlers::earnings::earnings_summary,
        crate::handlers::earnings::mark_earnings_paid,
    ),
    components(
        schemas(
            crate::ListQuery,

            // Order types
            crate::commands::orders::CreateOrderRequest,
            crate::commands::orders::CreateOrderItem,
            crate::handlers::orders::OrderActionRequest,
            crate::lifecycle::OrderAction,
            crate::lifecycle::ActionKind,
            crate::models::OrderStatus,
            crate::models::DeliveryType,
            crate::models::AssignmentStatus,

            // Billing types
            crate::models::SubscriptionStatus,
            crate::models::SubscriptionState,
            crate::models::PaymentApprovalStatus,
            crate::models::EarningsPaymentStatus,
            crate::auth::ActorRole,

            // Error types
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
