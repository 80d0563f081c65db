use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use uuid::Uuid;

use crate::{
    auth::Actor,
    handlers::common::{ApiJson, ApiPath},
    entities::{driver, store},
    errors::ServiceError,
    models::SubscriptionStatus,
    services::stores::{CreateStoreRequest, RegisterDriverRequest},
    ApiResponse, ApiResult, AppState,
};

/// Create a store (master admin)
#[utoipa::path(
    post,
    path = "/api/v1/stores",
    summary = "Create store",
    request_body = CreateStoreRequest,
    responses(
        (status = 201, description = "Store created", body = ApiResponse<store::Model>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 409, description = "Slug already taken", body = crate::errors::ErrorResponse),
    ),
    tag = "stores"
)]
pub async fn create_store(
    State(state): State<AppState>,
    actor: Actor,
    ApiJson(request): ApiJson<CreateStoreRequest>,
) -> Result<(StatusCode, Json<ApiResponse<store::Model>>), ServiceError> {
    let created = state.services.stores.create_store(actor, request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

#[utoipa::path(
    get,
    path = "/api/v1/stores/{id}",
    summary = "Get store",
    params(("id" = Uuid, Path, description = "Store ID")),
    responses(
        (status = 200, description = "Store retrieved", body = ApiResponse<store::Model>),
        (status = 404, description = "Store not found", body = crate::errors::ErrorResponse),
    ),
    tag = "stores"
)]
pub async fn get_store(
    State(state): State<AppState>,
    ApiPath(store_id): ApiPath<Uuid>,
    _actor: Actor,
) -> ApiResult<store::Model> {
    let store = state.services.stores.get_store(store_id).await?;
    Ok(Json(ApiResponse::success(store)))
}

#[utoipa::path(
    get,
    path = "/api/v1/stores/{id}/subscription",
    summary = "Subscription status",
    params(("id" = Uuid, Path, description = "Store ID")),
    responses(
        (status = 200, description = "Subscription evaluated", body = ApiResponse<SubscriptionStatus>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Store not found", body = crate::errors::ErrorResponse),
    ),
    tag = "stores"
)]
pub async fn subscription_status(
    State(state): State<AppState>,
    ApiPath(store_id): ApiPath<Uuid>,
    actor: Actor,
) -> ApiResult<SubscriptionStatus> {
    let status = state
        .services
        .stores
        .subscription_status(store_id, actor)
        .await?;
    Ok(Json(ApiResponse::success(status)))
}

#[utoipa::path(
    post,
    path = "/api/v1/stores/{id}/drivers",
    summary = "Register driver",
    params(("id" = Uuid, Path, description = "Store ID")),
    request_body = RegisterDriverRequest,
    responses(
        (status = 201, description = "Driver registered", body = ApiResponse<driver::Model>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Store not found", body = crate::errors::ErrorResponse),
    ),
    tag = "stores"
)]
pub async fn register_driver(
    State(state): State<AppState>,
    ApiPath(store_id): ApiPath<Uuid>,
    actor: Actor,
    ApiJson(request): ApiJson<RegisterDriverRequest>,
) -> Result<(StatusCode, Json<ApiResponse<driver::Model>>), ServiceError> {
    let created = state
        .services
        .stores
        .register_driver(store_id, actor, request)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

#[utoipa::path(
    get,
    path = "/api/v1/stores/{id}/drivers",
    summary = "List drivers",
    params(("id" = Uuid, Path, description = "Store ID")),
    responses(
        (status = 200, description = "Drivers listed", body = ApiResponse<Vec<driver::Model>>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    tag = "stores"
)]
pub async fn list_drivers(
    State(state): State<AppState>,
    ApiPath(store_id): ApiPath<Uuid>,
    actor: Actor,
) -> ApiResult<Vec<driver::Model>> {
    let drivers = state.services.stores.list_drivers(store_id, actor).await?;
    Ok(Json(ApiResponse::success(drivers)))
}
