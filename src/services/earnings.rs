use crate::{
    auth::Actor,
    db::DbPool,
    entities::{driver, driver_earnings},
    errors::ServiceError,
    events::{Event, EventSender},
    models::EarningsPaymentStatus,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, DbErr, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct EarningsSummary {
    pub driver_id: Uuid,
    pub pending_total: Decimal,
    pub paid_total: Decimal,
    /// Completed deliveries that produced an earnings record
    pub deliveries: u64,
}

impl EarningsSummary {
    pub fn from_records(driver_id: Uuid, records: &[driver_earnings::Model]) -> Self {
        let total_for = |status: EarningsPaymentStatus| {
            records
                .iter()
                .filter(|r| r.payment_status == status)
                .map(|r| r.amount)
                .sum::<Decimal>()
                .round_dp(2)
        };
        Self {
            driver_id,
            pending_total: total_for(EarningsPaymentStatus::Pending),
            paid_total: total_for(EarningsPaymentStatus::Paid),
            deliveries: records.len() as u64,
        }
    }
}

/// Read and payout operations over driver earnings. Records themselves are
/// only created by the deliver transition.
#[derive(Clone)]
pub struct EarningsService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl EarningsService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self), fields(actor_role = %actor.role))]
    pub async fn list_earnings(
        &self,
        driver_id: Uuid,
        actor: Actor,
        payment_status: Option<EarningsPaymentStatus>,
    ) -> Result<Vec<driver_earnings::Model>, ServiceError> {
        self.authorize(driver_id, &actor).await?;

        let mut query = driver_earnings::Entity::find()
            .filter(driver_earnings::Column::DriverId.eq(driver_id));
        if let Some(status) = payment_status {
            query = query.filter(driver_earnings::Column::PaymentStatus.eq(status));
        }
        let records = query
            .order_by_desc(driver_earnings::Column::CreatedAt)
            .all(&*self.db_pool)
            .await?;
        Ok(records)
    }

    pub async fn earnings_summary(
        &self,
        driver_id: Uuid,
        actor: Actor,
    ) -> Result<EarningsSummary, ServiceError> {
        let records = self.list_earnings(driver_id, actor, None).await?;
        Ok(EarningsSummary::from_records(driver_id, &records))
    }

    /// Marks a pending record as paid. Paying twice is a conflict.
    #[instrument(skip(self), fields(actor_role = %actor.role))]
    pub async fn mark_earnings_paid(
        &self,
        earnings_id: Uuid,
        actor: Actor,
    ) -> Result<driver_earnings::Model, ServiceError> {
        let db = &*self.db_pool;
        let record = driver_earnings::Entity::find_by_id(earnings_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Earnings {} not found", earnings_id)))?;
        actor.require_store_manager(record.store_id)?;

        if record.payment_status == EarningsPaymentStatus::Paid {
            return Err(ServiceError::Conflict(format!(
                "Earnings {} are already paid",
                earnings_id
            )));
        }

        let paid_at = Utc::now();
        let mut update: driver_earnings::ActiveModel = record.into();
        update.payment_status = Set(EarningsPaymentStatus::Paid);
        update.paid_at = Set(Some(paid_at));

        let paid = driver_earnings::Entity::update(update)
            .filter(driver_earnings::Column::PaymentStatus.eq(EarningsPaymentStatus::Pending))
            .exec(db)
            .await
            .map_err(|e| match e {
                DbErr::RecordNotUpdated => ServiceError::Conflict(format!(
                    "Earnings {} are already paid",
                    earnings_id
                )),
                other => ServiceError::DatabaseError(other),
            })?;

        info!(%earnings_id, driver_id = %paid.driver_id, amount = %paid.amount, "Earnings paid");
        self.event_sender
            .send_or_log(Event::EarningsPaid {
                earnings_id,
                driver_id: paid.driver_id,
                paid_at,
            })
            .await;
        Ok(paid)
    }

    async fn authorize(&self, driver_id: Uuid, actor: &Actor) -> Result<(), ServiceError> {
        let driver = driver::Entity::find_by_id(driver_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Driver {} not found", driver_id)))?;
        actor.require_driver_access(driver.id, driver.store_id)
    }
}
