use axum::{
    extract::State,
    response::Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    auth::Actor,
    handlers::common::{ApiPath, ApiQuery},
    entities::driver_earnings,
    models::EarningsPaymentStatus,
    services::earnings::EarningsSummary,
    ApiResponse, ApiResult, AppState,
};

#[derive(Debug, Default, Deserialize)]
pub struct EarningsQuery {
    pub payment_status: Option<EarningsPaymentStatus>,
}

#[utoipa::path(
    get,
    path = "/api/v1/drivers/{id}/earnings",
    summary = "Driver earnings",
    params(
        ("id" = Uuid, Path, description = "Driver ID"),
        ("payment_status" = Option<String>, Query, description = "pending or paid"),
    ),
    responses(
        (status = 200, description = "Earnings listed", body = ApiResponse<Vec<driver_earnings::Model>>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Driver not found", body = crate::errors::ErrorResponse),
    ),
    tag = "earnings"
)]
pub async fn list_earnings(
    State(state): State<AppState>,
    ApiPath(driver_id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<EarningsQuery>,
    actor: Actor,
) -> ApiResult<Vec<driver_earnings::Model>> {
    let records = state
        .services
        .earnings
        .list_earnings(driver_id, actor, query.payment_status)
        .await?;
    Ok(Json(ApiResponse::success(records)))
}

#[utoipa::path(
    get,
    path = "/api/v1/drivers/{id}/earnings/summary",
    summary = "Driver earnings summary",
    params(("id" = Uuid, Path, description = "Driver ID")),
    responses(
        (status = 200, description = "Totals by payout state", body = ApiResponse<EarningsSummary>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Driver not found", body = crate::errors::ErrorResponse),
    ),
    tag = "earnings"
)]
pub async fn earnings_summary(
    State(state): State<AppState>,
    ApiPath(driver_id): ApiPath<Uuid>,
    actor: Actor,
) -> ApiResult<EarningsSummary> {
    let summary = state
        .services
        .earnings
        .earnings_summary(driver_id, actor)
        .await?;
    Ok(Json(ApiResponse::success(summary)))
}

/// Mark an earnings record as paid out
#[utoipa::path(
    post,
    path = "/api/v1/earnings/{id}/pay",
    summary = "Pay earnings",
    params(("id" = Uuid, Path, description = "Earnings ID")),
    responses(
        (status = 200, description = "Earnings marked as paid", body = ApiResponse<driver_earnings::Model>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Earnings not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Already paid", body = crate::errors::ErrorResponse),
    ),
    tag = "earnings"
)]
pub async fn mark_earnings_paid(
    State(state): State<AppState>,
    ApiPath(earnings_id): ApiPath<Uuid>,
    actor: Actor,
) -> ApiResult<driver_earnings::Model> {
    let paid = state
        .services
        .earnings
        .mark_earnings_paid(earnings_id, actor)
        .await?;
    Ok(Json(ApiResponse::success(paid)))
}
