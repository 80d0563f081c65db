pub mod apply_order_action_command;
pub mod create_order_command;

pub use apply_order_action_command::{ActionOutcome, ApplyOrderActionCommand};
pub use create_order_command::{
    CreateOrderCommand, CreateOrderItem, CreateOrderRequest, CreateOrderResult, OrderAmounts,
};

use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use tracing::error;
use uuid::Uuid;

use crate::entities::{delivery_assignment, order};
use crate::errors::ServiceError;
use crate::lifecycle::{AssignmentSnapshot, OrderSnapshot};
use crate::models::AssignmentStatus;

pub const ACTIVE_ASSIGNMENT_STATUSES: [AssignmentStatus; 4] = [
    AssignmentStatus::Assigned,
    AssignmentStatus::Accepted,
    AssignmentStatus::PickedUp,
    AssignmentStatus::Delivered,
];

/// An order together with its active delivery assignment.
#[derive(Debug, Clone)]
pub struct OrderAggregate {
    pub order: order::Model,
    pub assignment: Option<delivery_assignment::Model>,
}

impl OrderAggregate {
    pub async fn load<C>(conn: &C, order_id: Uuid) -> Result<Self, ServiceError>
    where
        C: ConnectionTrait,
    {
        let order = order::Entity::find_by_id(order_id)
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let mut active = delivery_assignment::Entity::find()
            .filter(delivery_assignment::Column::OrderId.eq(order_id))
            .filter(delivery_assignment::Column::Status.is_in(ACTIVE_ASSIGNMENT_STATUSES))
            .all(conn)
            .await?;

        if active.len() > 1 {
            error!(%order_id, count = active.len(), "Order has more than one active assignment");
            return Err(ServiceError::InconsistentState(format!(
                "Order {} has {} active delivery assignments",
                order_id,
                active.len()
            )));
        }

        Ok(Self {
            order,
            assignment: active.pop(),
        })
    }

    pub fn snapshot(&self) -> OrderSnapshot {
        OrderSnapshot {
            status: self.order.status,
            delivery_type: self.order.delivery_type,
            assignment: self.assignment.as_ref().map(|a| AssignmentSnapshot {
                id: a.id,
                driver_id: a.driver_id,
                status: a.status,
            }),
        }
    }

    pub fn assigned_driver(&self) -> Option<Uuid> {
        self.assignment.as_ref().map(|a| a.driver_id)
    }
}
