use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    auth::Actor,
    handlers::common::{ApiJson, ApiPath, ApiQuery},
    entities::payment_approval,
    errors::ServiceError,
    models::PaymentApprovalStatus,
    services::subscriptions::{ReviewPaymentRequest, ReviewedPayment, SubmitPaymentRequest},
    ApiResponse, ApiResult, AppState,
};

#[derive(Debug, Default, Deserialize)]
pub struct PaymentListQuery {
    pub status: Option<PaymentApprovalStatus>,
}

/// Submit a subscription payment for review
#[utoipa::path(
    post,
    path = "/api/v1/stores/{id}/payments",
    summary = "Submit payment",
    params(("id" = Uuid, Path, description = "Store ID")),
    request_body = SubmitPaymentRequest,
    responses(
        (status = 201, description = "Payment submitted", body = ApiResponse<payment_approval::Model>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Store not found", body = crate::errors::ErrorResponse),
    ),
    tag = "payments"
)]
pub async fn submit_payment(
    State(state): State<AppState>,
    ApiPath(store_id): ApiPath<Uuid>,
    actor: Actor,
    ApiJson(request): ApiJson<SubmitPaymentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<payment_approval::Model>>), ServiceError> {
    let approval = state
        .services
        .subscriptions
        .submit_payment(store_id, actor, request)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(approval))))
}

#[utoipa::path(
    get,
    path = "/api/v1/payments",
    summary = "List payments",
    params(("status" = Option<String>, Query, description = "pending, approved or rejected")),
    responses(
        (status = 200, description = "Payments listed", body = ApiResponse<Vec<payment_approval::Model>>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    tag = "payments"
)]
pub async fn list_payments(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PaymentListQuery>,
    actor: Actor,
) -> ApiResult<Vec<payment_approval::Model>> {
    let approvals = state
        .services
        .subscriptions
        .list_payments(actor, query.status)
        .await?;
    Ok(Json(ApiResponse::success(approvals)))
}

#[utoipa::path(
    post,
    path = "/api/v1/payments/{id}/approve",
    summary = "Approve payment",
    params(("id" = Uuid, Path, description = "Payment approval ID")),
    request_body = ReviewPaymentRequest,
    responses(
        (status = 200, description = "Payment approved and subscription extended", body = ApiResponse<ReviewedPayment>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Payment not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Payment already reviewed", body = crate::errors::ErrorResponse),
    ),
    tag = "payments"
)]
pub async fn approve_payment(
    State(state): State<AppState>,
    ApiPath(approval_id): ApiPath<Uuid>,
    actor: Actor,
    request: Option<ApiJson<ReviewPaymentRequest>>,
) -> ApiResult<ReviewedPayment> {
    let request = request.map(|ApiJson(r)| r).unwrap_or_default();
    let reviewed = state
        .services
        .subscriptions
        .approve_payment(approval_id, actor, request)
        .await?;
    Ok(Json(ApiResponse::success(reviewed)))
}

#[utoipa::path(
    post,
    path = "/api/v1/payments/{id}/reject",
    summary = "Reject payment",
    params(("id" = Uuid, Path, description = "Payment approval ID")),
    request_body = ReviewPaymentRequest,
    responses(
        (status = 200, description = "Payment rejected", body = ApiResponse<ReviewedPayment>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Payment not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Payment already reviewed", body = crate::errors::ErrorResponse),
    ),
    tag = "payments"
)]
pub async fn reject_payment(
    State(state): State<AppState>,
    ApiPath(approval_id): ApiPath<Uuid>,
    actor: Actor,
    request: Option<ApiJson<ReviewPaymentRequest>>,
) -> ApiResult<ReviewedPayment> {
    let request = request.map(|ApiJson(r)| r).unwrap_or_default();
    let reviewed = state
        .services
        .subscriptions
        .reject_payment(approval_id, actor, request)
        .await?;
    Ok(Json(ApiResponse::success(reviewed)))
}
