use crate::{
    auth::Actor,
    commands::{orders::OrderAggregate, Command},
    db::DbPool,
    entities::{delivery_assignment, driver, driver_earnings, order, order_status_history},
    errors::ServiceError,
    events::{Event, EventSender},
    lifecycle::{self, ActionKind, AssignmentChange, OrderAction, TransitionError, TransitionPlan},
    metrics::{EARNINGS_CREDITED, ORDER_ACTION_FAILURES, ORDER_TRANSITIONS},
    models::{AssignmentStatus, EarningsPaymentStatus, OrderStatus},
};
use chrono::{DateTime, Utc};
use sea_orm::{sea_query::OnConflict, *};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

/// Runs one lifecycle action against an order aggregate.
#[derive(Debug, Clone)]
pub struct ApplyOrderActionCommand {
    pub order_id: Uuid,
    pub actor: Actor,
    pub action: OrderAction,
    /// Version the caller last saw; a mismatch fails with 409 before any write.
    pub expected_version: Option<i32>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ActionOutcome {
    pub action: ActionKind,
    pub from_status: OrderStatus,
    pub to_status: OrderStatus,
    pub order: order::Model,
    /// The assignment the action touched, if any
    pub assignment: Option<delivery_assignment::Model>,
    /// Earnings credited by this action
    pub earnings: Option<driver_earnings::Model>,
}

#[async_trait::async_trait]
impl Command for ApplyOrderActionCommand {
    type Result = ActionOutcome;

    #[instrument(
        skip(self, db_pool, event_sender),
        fields(order_id = %self.order_id, action = %self.action.kind(), actor_role = %self.actor.role)
    )]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let db = db_pool.as_ref();
        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for order action");
            ServiceError::DatabaseError(e)
        })?;

        let aggregate = OrderAggregate::load(&txn, self.order_id).await?;
        let current = &aggregate.order;
        self.actor
            .require_order_scope(current.store_id, current.customer_id)?;

        if let Some(expected) = self.expected_version {
            if expected != current.version {
                ORDER_ACTION_FAILURES.with_label_values(&["stale_version"]).inc();
                warn!(expected, actual = current.version, "Stale order version");
                return Err(ServiceError::ConcurrentModification(current.id));
            }
        }

        let plan = lifecycle::plan(&aggregate.snapshot(), &self.actor, &self.action).map_err(|e| {
            ORDER_ACTION_FAILURES
                .with_label_values(&[failure_label(&e)])
                .inc();
            warn!(error = %e, "Order action refused");
            ServiceError::from(e)
        })?;

        let now = Utc::now();
        let updated_order = write_order(&txn, current, &plan, now).await?;
        let assignment = self
            .write_assignment(&txn, &aggregate, &plan, now)
            .await?;
        self.write_history(&txn, &plan, now).await?;

        let earnings = match (&assignment, plan.credit_earnings) {
            (Some(assignment), true) => {
                credit_earnings(&txn, &updated_order, assignment, now).await?
            }
            _ => None,
        };

        txn.commit().await.map_err(|e| {
            error!(error = %e, "Failed to commit order action");
            ServiceError::DatabaseError(e)
        })?;

        ORDER_TRANSITIONS
            .with_label_values(&[plan.action.as_str()])
            .inc();
        info!(
            from = %plan.from,
            to = %plan.to,
            version = updated_order.version,
            "Order action applied"
        );

        self.publish(&event_sender, &plan, &updated_order, assignment.as_ref(), earnings.as_ref())
            .await;

        Ok(ActionOutcome {
            action: plan.action,
            from_status: plan.from,
            to_status: plan.to,
            order: updated_order,
            assignment,
            earnings,
        })
    }
}

impl ApplyOrderActionCommand {
    async fn write_assignment(
        &self,
        txn: &DatabaseTransaction,
        aggregate: &OrderAggregate,
        plan: &TransitionPlan,
        now: DateTime<Utc>,
    ) -> Result<Option<delivery_assignment::Model>, ServiceError> {
        match plan.assignment {
            AssignmentChange::Unchanged => Ok(None),
            AssignmentChange::Create { driver_id } => {
                let driver = driver::Entity::find_by_id(driver_id)
                    .one(txn)
                    .await?
                    .filter(|d| d.store_id == aggregate.order.store_id)
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Driver {} not found for this store", driver_id))
                    })?;
                if !driver.active {
                    return Err(ServiceError::InvalidInput(format!(
                        "Driver {} is inactive",
                        driver.id
                    )));
                }

                let created = delivery_assignment::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    order_id: Set(aggregate.order.id),
                    driver_id: Set(driver.id),
                    status: Set(AssignmentStatus::Assigned),
                    assigned_at: Set(now),
                    accepted_at: Set(None),
                    picked_up_at: Set(None),
                    delivered_at: Set(None),
                    rejected_at: Set(None),
                    cancelled_at: Set(None),
                    rejection_reason: Set(None),
                    updated_at: Set(now),
                }
                .insert(txn)
                .await?;
                Ok(Some(created))
            }
            AssignmentChange::Update { id, from, to } => {
                let current = aggregate
                    .assignment
                    .clone()
                    .filter(|a| a.id == id)
                    .ok_or_else(|| {
                        ServiceError::InconsistentState(format!(
                            "Assignment {} is not the active assignment",
                            id
                        ))
                    })?;

                let mut active: delivery_assignment::ActiveModel = current.into();
                active.status = Set(to);
                active.updated_at = Set(now);
                match to {
                    AssignmentStatus::Accepted => active.accepted_at = Set(Some(now)),
                    AssignmentStatus::PickedUp => active.picked_up_at = Set(Some(now)),
                    AssignmentStatus::Delivered => active.delivered_at = Set(Some(now)),
                    AssignmentStatus::Rejected => {
                        active.rejected_at = Set(Some(now));
                        active.rejection_reason = Set(plan.note.clone());
                    }
                    AssignmentStatus::Cancelled => active.cancelled_at = Set(Some(now)),
                    AssignmentStatus::Assigned => {}
                }

                let updated = delivery_assignment::Entity::update(active)
                    .filter(delivery_assignment::Column::Status.eq(from))
                    .exec(txn)
                    .await
                    .map_err(|e| match e {
                        DbErr::RecordNotUpdated => ServiceError::ConcurrentModification(aggregate.order.id),
                        other => ServiceError::DatabaseError(other),
                    })?;
                Ok(Some(updated))
            }
        }
    }

    async fn write_history(
        &self,
        txn: &DatabaseTransaction,
        plan: &TransitionPlan,
        now: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        order_status_history::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(self.order_id),
            action: Set(plan.action.as_str().to_string()),
            from_status: Set(Some(plan.from)),
            to_status: Set(plan.to),
            actor_role: Set(self.actor.role),
            actor_id: Set(self.actor.id),
            note: Set(plan.note.clone()),
            created_at: Set(now),
        }
        .insert(txn)
        .await?;
        Ok(())
    }

    async fn publish(
        &self,
        event_sender: &EventSender,
        plan: &TransitionPlan,
        order: &order::Model,
        assignment: Option<&delivery_assignment::Model>,
        earnings: Option<&driver_earnings::Model>,
    ) {
        if plan.changes_order_status() {
            event_sender
                .send_or_log(Event::OrderStatusChanged {
                    order_id: order.id,
                    old_status: plan.from,
                    new_status: plan.to,
                    action: plan.action.as_str().to_string(),
                })
                .await;
        }

        if let Some(assignment) = assignment {
            let event = match plan.assignment {
                AssignmentChange::Create { driver_id } => Some(Event::DriverAssigned {
                    order_id: order.id,
                    assignment_id: assignment.id,
                    driver_id,
                }),
                AssignmentChange::Update { from, to, .. } => Some(Event::AssignmentStatusChanged {
                    assignment_id: assignment.id,
                    order_id: order.id,
                    old_status: from,
                    new_status: to,
                }),
                AssignmentChange::Unchanged => None,
            };
            if let Some(event) = event {
                event_sender.send_or_log(event).await;
            }
        }

        if let Some(earnings) = earnings {
            event_sender
                .send_or_log(Event::EarningsCredited {
                    earnings_id: earnings.id,
                    driver_id: earnings.driver_id,
                    order_id: earnings.order_id,
                    amount: earnings.amount,
                })
                .await;
        }
    }
}

/// Every accepted action bumps the version, guarded by the version read
/// at the start of the transaction.
async fn write_order(
    txn: &DatabaseTransaction,
    current: &order::Model,
    plan: &TransitionPlan,
    now: DateTime<Utc>,
) -> Result<order::Model, ServiceError> {
    let mut active: order::ActiveModel = current.clone().into();
    active.status = Set(plan.to);
    active.version = Set(current.version + 1);
    active.updated_at = Set(now);
    if plan.to == OrderStatus::Cancelled {
        active.cancel_reason = Set(plan.note.clone());
    }

    order::Entity::update(active)
        .filter(order::Column::Version.eq(current.version))
        .exec(txn)
        .await
        .map_err(|e| match e {
            DbErr::RecordNotUpdated => {
                ORDER_ACTION_FAILURES.with_label_values(&["stale_version"]).inc();
                ServiceError::ConcurrentModification(current.id)
            }
            other => {
                error!(error = %other, "Failed to update order");
                ServiceError::DatabaseError(other)
            }
        })
}

/// Inserts the delivery's earnings unless the order already has a record.
/// Returns the record only when this call created it.
async fn credit_earnings(
    txn: &DatabaseTransaction,
    order: &order::Model,
    assignment: &delivery_assignment::Model,
    now: DateTime<Utc>,
) -> Result<Option<driver_earnings::Model>, ServiceError> {
    let earnings_id = Uuid::new_v4();
    let inserted = driver_earnings::Entity::insert(driver_earnings::ActiveModel {
        id: Set(earnings_id),
        order_id: Set(order.id),
        assignment_id: Set(assignment.id),
        driver_id: Set(assignment.driver_id),
        store_id: Set(order.store_id),
        amount: Set(order.delivery_fee),
        payment_status: Set(EarningsPaymentStatus::Pending),
        created_at: Set(now),
        paid_at: Set(None),
    })
    .on_conflict(
        OnConflict::column(driver_earnings::Column::OrderId)
            .do_nothing()
            .to_owned(),
    )
    .exec_without_returning(txn)
    .await?;

    if inserted == 0 {
        warn!(order_id = %order.id, "Earnings already credited for order");
        return Ok(None);
    }

    EARNINGS_CREDITED.inc();
    let earnings = driver_earnings::Entity::find_by_id(earnings_id)
        .one(txn)
        .await?
        .ok_or_else(|| ServiceError::InternalError("Credited earnings vanished".to_string()))?;
    Ok(Some(earnings))
}

fn failure_label(err: &TransitionError) -> &'static str {
    match err {
        TransitionError::NotAllowed { .. } => "not_allowed",
        TransitionError::Forbidden { .. } => "forbidden",
        TransitionError::NotAssignedDriver => "not_assigned_driver",
        TransitionError::NoActiveAssignment => "no_active_assignment",
        TransitionError::AssignmentAlreadyActive => "assignment_already_active",
        TransitionError::NotDeliveryOrder => "not_delivery_order",
        TransitionError::NotPickupOrder => "not_pickup_order",
        TransitionError::InvalidAssignmentState { .. } => "invalid_assignment_state",
        TransitionError::Inconsistent(_) => "inconsistent",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::{establish_connection_with_config, run_migrations, DbConfig},
        entities::store,
        models::DeliveryType,
    };
    use assert_matches::assert_matches;
    use rust_decimal::Decimal;

    async fn seeded_order() -> (DbPool, order::Model) {
        let db = establish_connection_with_config(&DbConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            sqlx_logging: false,
            ..Default::default()
        })
        .await
        .unwrap();
        run_migrations(&db).await.unwrap();

        let now = Utc::now();
        let store = store::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set("Guarded".to_string()),
            slug: Set("guarded".to_string()),
            delivery_fee: Set(Decimal::new(500, 2)),
            order_sequence: Set(1),
            subscription_plan: Set("basic".to_string()),
            subscription_expires_at: Set(Some(now + chrono::Duration::days(30))),
            active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&db)
        .await
        .unwrap();

        let order = order::ActiveModel {
            id: Set(Uuid::new_v4()),
            store_id: Set(store.id),
            order_number: Set(1),
            customer_id: Set(Uuid::new_v4()),
            customer_name: Set("Rita".to_string()),
            delivery_type: Set(DeliveryType::Pickup),
            status: Set(OrderStatus::Received),
            delivery_address: Set(None),
            notes: Set(None),
            subtotal: Set(Decimal::new(1000, 2)),
            delivery_fee: Set(Decimal::ZERO),
            discount: Set(Decimal::ZERO),
            total: Set(Decimal::new(1000, 2)),
            cancel_reason: Set(None),
            version: Set(1),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&db)
        .await
        .unwrap();
        (db, order)
    }

    fn accept_plan() -> TransitionPlan {
        TransitionPlan {
            action: ActionKind::Accept,
            from: OrderStatus::Received,
            to: OrderStatus::Preparing,
            assignment: AssignmentChange::Unchanged,
            credit_earnings: false,
            note: None,
        }
    }

    #[tokio::test]
    async fn write_through_a_stale_read_is_a_conflict() {
        let (db, stale) = seeded_order().await;

        // Another writer moves the row on after `stale` was read
        let mut bumped: order::ActiveModel = stale.clone().into();
        bumped.version = Set(2);
        bumped.notes = Set(Some("changed elsewhere".to_string()));
        bumped.update(&db).await.unwrap();

        let txn = db.begin().await.unwrap();
        let result = write_order(&txn, &stale, &accept_plan(), Utc::now()).await;
        assert_matches!(result, Err(ServiceError::ConcurrentModification(id)) if id == stale.id);
        txn.rollback().await.unwrap();

        let row = order::Entity::find_by_id(stale.id).one(&db).await.unwrap().unwrap();
        assert_eq!(row.status, OrderStatus::Received);
        assert_eq!(row.version, 2);
        assert_eq!(row.notes.as_deref(), Some("changed elsewhere"));
    }

    #[tokio::test]
    async fn write_through_a_current_read_bumps_the_version() {
        let (db, current) = seeded_order().await;
        let txn = db.begin().await.unwrap();
        let updated = write_order(&txn, &current, &accept_plan(), Utc::now())
            .await
            .unwrap();
        txn.commit().await.unwrap();
        assert_eq!(updated.status, OrderStatus::Preparing);
        assert_eq!(updated.version, 2);
    }
}
