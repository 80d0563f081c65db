use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    auth::Actor,
    handlers::common::{ApiJson, ApiPath, ApiQuery},
    commands::orders::{ActionOutcome, CreateOrderRequest},
    entities::{order, order_status_history},
    errors::ServiceError,
    lifecycle::OrderAction,
    services::orders::{AvailableActions, CreateOrderResult, OrderDetail, OrderFilter},
    ApiResponse, ApiResult, AppState, ListQuery, PaginatedResponse,
};

/// Body of `POST /orders/{id}/actions`: the action fields plus an optional
/// optimistic-concurrency token.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderActionRequest {
    #[serde(flatten)]
    pub action: OrderAction,
    /// Version from the last read; omit to skip the check
    pub expected_version: Option<i32>,
}

/// Place an order in a store
#[utoipa::path(
    post,
    path = "/api/v1/stores/{id}/orders",
    summary = "Create order",
    params(("id" = Uuid, Path, description = "Store ID")),
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created", body = ApiResponse<CreateOrderResult>,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 402, description = "Store subscription expired", body = crate::errors::ErrorResponse),
        (status = 403, description = "Only customers place orders", body = crate::errors::ErrorResponse),
        (status = 404, description = "Store not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Store is inactive", body = crate::errors::ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    ApiPath(store_id): ApiPath<Uuid>,
    actor: Actor,
    ApiJson(request): ApiJson<CreateOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CreateOrderResult>>), ServiceError> {
    let created = state
        .services
        .orders
        .create_order(store_id, actor, request)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

/// List orders visible to the caller
#[utoipa::path(
    get,
    path = "/api/v1/orders",
    summary = "List orders",
    description = "Paginated, newest first. Results are narrowed to what the caller may see.",
    params(
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("limit" = Option<u64>, Query, description = "Items per page (default: 20, max: 100)"),
        ("store_id" = Option<Uuid>, Query, description = "Filter by store"),
        ("status" = Option<String>, Query, description = "Filter by order status"),
        ("customer_id" = Option<Uuid>, Query, description = "Filter by customer"),
        ("driver_id" = Option<Uuid>, Query, description = "Filter by assigned driver"),
    ),
    responses(
        (status = 200, description = "Orders retrieved", body = ApiResponse<PaginatedResponse<order::Model>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
    ApiQuery(filter): ApiQuery<OrderFilter>,
    actor: Actor,
) -> ApiResult<PaginatedResponse<order::Model>> {
    let page = state
        .services
        .orders
        .list_orders(actor, filter, query.page, query.limit)
        .await?;
    let total_pages = (page.total + page.limit - 1) / page.limit;
    Ok(Json(ApiResponse::success(PaginatedResponse {
        items: page.orders,
        total: page.total,
        page: page.page,
        limit: page.limit,
        total_pages,
    })))
}

/// Get an order with its items and active assignment
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    summary = "Get order",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order retrieved", body = ApiResponse<OrderDetail>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    ApiPath(order_id): ApiPath<Uuid>,
    actor: Actor,
) -> ApiResult<OrderDetail> {
    let detail = state.services.orders.get_order(order_id, actor).await?;
    Ok(Json(ApiResponse::success(detail)))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}/history",
    summary = "Order history",
    description = "Every accepted action on the order, oldest first",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "History retrieved", body = ApiResponse<Vec<order_status_history::Model>>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn order_history(
    State(state): State<AppState>,
    ApiPath(order_id): ApiPath<Uuid>,
    actor: Actor,
) -> ApiResult<Vec<order_status_history::Model>> {
    let rows = state.services.orders.status_history(order_id, actor).await?;
    Ok(Json(ApiResponse::success(rows)))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}/actions",
    summary = "Available actions",
    description = "Actions the caller may apply to the order right now",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Actions listed", body = ApiResponse<AvailableActions>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn available_actions(
    State(state): State<AppState>,
    ApiPath(order_id): ApiPath<Uuid>,
    actor: Actor,
) -> ApiResult<AvailableActions> {
    let actions = state
        .services
        .orders
        .available_actions(order_id, actor)
        .await?;
    Ok(Json(ApiResponse::success(actions)))
}

/// Apply a lifecycle action
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/actions",
    summary = "Apply action",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = OrderActionRequest,
    responses(
        (status = 200, description = "Action applied", body = ApiResponse<ActionOutcome>),
        (status = 400, description = "Action not valid in the current state", body = crate::errors::ErrorResponse),
        (status = 403, description = "Caller may not perform this action", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order or driver not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Stale version or active assignment exists", body = crate::errors::ErrorResponse),
        (status = 422, description = "Order and assignment disagree", body = crate::errors::ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn apply_action(
    State(state): State<AppState>,
    ApiPath(order_id): ApiPath<Uuid>,
    actor: Actor,
    ApiJson(request): ApiJson<OrderActionRequest>,
) -> ApiResult<ActionOutcome> {
    let outcome = state
        .services
        .orders
        .apply_action(order_id, actor, request.action, request.expected_version)
        .await?;
    Ok(Json(ApiResponse::success(outcome)))
}
