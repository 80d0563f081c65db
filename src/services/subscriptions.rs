use crate::{
    auth::Actor,
    db::DbPool,
    entities::{payment_approval, store},
    errors::ServiceError,
    events::{Event, EventSender},
    metrics::PAYMENT_REVIEWS,
    models::{extended_expiry, not_blank, PaymentApprovalStatus},
    services::stores::find_store,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct SubmitPaymentRequest {
    #[validate(length(min = 1, max = 50), custom = "not_blank")]
    pub plan: String,
    #[validate(range(min = 1, max = 24, message = "months must be between 1 and 24"))]
    pub months: i32,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct ReviewPaymentRequest {
    #[validate(length(max = 500))]
    pub note: Option<String>,
}

/// Outcome of a payment review together with the store it affected.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReviewedPayment {
    pub approval: payment_approval::Model,
    pub store: store::Model,
}

/// Subscription payments submitted by stores and reviewed by the platform.
#[derive(Clone)]
pub struct SubscriptionService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    period_days: i64,
}

impl SubscriptionService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, period_days: i64) -> Self {
        Self {
            db_pool,
            event_sender,
            period_days,
        }
    }

    #[instrument(skip(self, request), fields(%store_id, months = request.months))]
    pub async fn submit_payment(
        &self,
        store_id: Uuid,
        actor: Actor,
        request: SubmitPaymentRequest,
    ) -> Result<payment_approval::Model, ServiceError> {
        actor.require_store_manager(store_id)?;
        request.validate()?;
        if request.amount <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "amount must be greater than zero".to_string(),
            ));
        }

        let db = &*self.db_pool;
        find_store(db, store_id).await?;

        let approval = payment_approval::ActiveModel {
            id: Set(Uuid::new_v4()),
            store_id: Set(store_id),
            plan: Set(request.plan.trim().to_string()),
            months: Set(request.months),
            amount: Set(request.amount.round_dp(2)),
            status: Set(PaymentApprovalStatus::Pending),
            submitted_by: Set(actor.id),
            review_note: Set(None),
            reviewed_by: Set(None),
            reviewed_at: Set(None),
            created_at: Set(Utc::now()),
        }
        .insert(db)
        .await?;

        info!(approval_id = %approval.id, "Subscription payment submitted");
        Ok(approval)
    }

    /// Approves a pending payment and extends the store's subscription.
    #[instrument(skip(self, request), fields(%approval_id))]
    pub async fn approve_payment(
        &self,
        approval_id: Uuid,
        actor: Actor,
        request: ReviewPaymentRequest,
    ) -> Result<ReviewedPayment, ServiceError> {
        actor.require_master()?;
        request.validate()?;

        let txn = self.db_pool.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for payment approval");
            ServiceError::DatabaseError(e)
        })?;

        let pending = find_pending(&txn, approval_id).await?;
        let current = find_store(&txn, pending.store_id).await?;

        let now = Utc::now();
        let expires_at = extended_expiry(
            current.subscription_expires_at,
            now,
            pending.months,
            self.period_days,
        );

        let mut store_update: store::ActiveModel = current.into();
        store_update.subscription_plan = Set(pending.plan.clone());
        store_update.subscription_expires_at = Set(Some(expires_at));
        let store = store_update.update(&txn).await?;

        let approval = review(&txn, pending, PaymentApprovalStatus::Approved, &actor, request.note).await?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, "Failed to commit payment approval");
            ServiceError::DatabaseError(e)
        })?;

        PAYMENT_REVIEWS.with_label_values(&["approved"]).inc();
        info!(store_id = %store.id, %expires_at, "Subscription extended");
        self.event_sender
            .send_or_log(Event::PaymentApproved {
                approval_id,
                store_id: store.id,
                expires_at,
            })
            .await;

        Ok(ReviewedPayment { approval, store })
    }

    /// Rejects a pending payment. The store is left untouched.
    #[instrument(skip(self, request), fields(%approval_id))]
    pub async fn reject_payment(
        &self,
        approval_id: Uuid,
        actor: Actor,
        request: ReviewPaymentRequest,
    ) -> Result<ReviewedPayment, ServiceError> {
        actor.require_master()?;
        request.validate()?;

        let txn = self.db_pool.begin().await?;
        let pending = find_pending(&txn, approval_id).await?;
        let store = find_store(&txn, pending.store_id).await?;
        let approval = review(&txn, pending, PaymentApprovalStatus::Rejected, &actor, request.note).await?;
        txn.commit().await?;

        PAYMENT_REVIEWS.with_label_values(&["rejected"]).inc();
        warn!(store_id = %store.id, "Subscription payment rejected");
        self.event_sender
            .send_or_log(Event::PaymentRejected {
                approval_id,
                store_id: store.id,
            })
            .await;

        Ok(ReviewedPayment { approval, store })
    }

    /// Every store's payments, newest first.
    pub async fn list_payments(
        &self,
        actor: Actor,
        status: Option<PaymentApprovalStatus>,
    ) -> Result<Vec<payment_approval::Model>, ServiceError> {
        actor.require_master()?;
        let mut query = payment_approval::Entity::find();
        if let Some(status) = status {
            query = query.filter(payment_approval::Column::Status.eq(status));
        }
        let approvals = query
            .order_by_desc(payment_approval::Column::CreatedAt)
            .all(&*self.db_pool)
            .await?;
        Ok(approvals)
    }
}

async fn find_pending(
    txn: &DatabaseTransaction,
    approval_id: Uuid,
) -> Result<payment_approval::Model, ServiceError> {
    let approval = payment_approval::Entity::find_by_id(approval_id)
        .one(txn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Payment {} not found", approval_id)))?;
    if approval.status != PaymentApprovalStatus::Pending {
        return Err(ServiceError::Conflict(format!(
            "Payment {} was already reviewed",
            approval_id
        )));
    }
    Ok(approval)
}

/// Closes a pending approval. Guarded on the pending status so two reviewers
/// cannot both succeed.
async fn review(
    txn: &DatabaseTransaction,
    pending: payment_approval::Model,
    outcome: PaymentApprovalStatus,
    reviewer: &Actor,
    note: Option<String>,
) -> Result<payment_approval::Model, ServiceError> {
    let approval_id = pending.id;
    let mut update: payment_approval::ActiveModel = pending.into();
    update.status = Set(outcome);
    update.review_note = Set(note);
    update.reviewed_by = Set(Some(reviewer.id));
    update.reviewed_at = Set(Some(Utc::now()));

    payment_approval::Entity::update(update)
        .filter(payment_approval::Column::Status.eq(PaymentApprovalStatus::Pending))
        .exec(txn)
        .await
        .map_err(|e| match e {
            DbErr::RecordNotUpdated => ServiceError::Conflict(format!(
                "Payment {} was already reviewed",
                approval_id
            )),
            other => ServiceError::DatabaseError(other),
        })
}
