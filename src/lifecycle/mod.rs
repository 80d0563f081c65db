//! Order and delivery-assignment lifecycle.
//!
//! An order and its active delivery assignment are one aggregate. Every
//! mutation of either record is planned here by [`plan`], a pure function over an
//! [`OrderSnapshot`]. The caller persists the returned [`TransitionPlan`] as a
//! unit. What a caller may do next ([`available_actions`]) is derived from the
//! same function, so the set of offered actions and the set of accepted actions
//! cannot drift apart.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{Actor, ActorRole};
use crate::errors::ServiceError;
use crate::models::{AssignmentStatus, DeliveryType, OrderStatus};

/// The active assignment of an order as seen by the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssignmentSnapshot {
    pub id: Uuid,
    pub driver_id: Uuid,
    pub status: AssignmentStatus,
}

/// The aggregate state a transition is planned against. `assignment` only ever
/// holds the active assignment; rejected and cancelled ones are history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderSnapshot {
    pub status: OrderStatus,
    pub delivery_type: DeliveryType,
    pub assignment: Option<AssignmentSnapshot>,
}

impl OrderSnapshot {
    pub fn new(delivery_type: DeliveryType) -> Self {
        Self {
            status: OrderStatus::Received,
            delivery_type,
            assignment: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum OrderAction {
    Accept,
    MarkReady,
    AssignDriver { driver_id: Uuid },
    AcceptAssignment,
    RejectAssignment { reason: Option<String> },
    PickUp,
    Deliver,
    CompletePickup,
    Cancel { reason: Option<String> },
}

impl OrderAction {
    pub fn kind(&self) -> ActionKind {
        match self {
            OrderAction::Accept => ActionKind::Accept,
            OrderAction::MarkReady => ActionKind::MarkReady,
            OrderAction::AssignDriver { .. } => ActionKind::AssignDriver,
            OrderAction::AcceptAssignment => ActionKind::AcceptAssignment,
            OrderAction::RejectAssignment { .. } => ActionKind::RejectAssignment,
            OrderAction::PickUp => ActionKind::PickUp,
            OrderAction::Deliver => ActionKind::Deliver,
            OrderAction::CompletePickup => ActionKind::CompletePickup,
            OrderAction::Cancel { .. } => ActionKind::Cancel,
        }
    }

    fn note(&self) -> Option<String> {
        match self {
            OrderAction::RejectAssignment { reason } | OrderAction::Cancel { reason } => {
                reason.clone()
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Accept,
    MarkReady,
    AssignDriver,
    AcceptAssignment,
    RejectAssignment,
    PickUp,
    Deliver,
    CompletePickup,
    Cancel,
}

impl ActionKind {
    pub const ALL: [ActionKind; 9] = [
        ActionKind::Accept,
        ActionKind::MarkReady,
        ActionKind::AssignDriver,
        ActionKind::AcceptAssignment,
        ActionKind::RejectAssignment,
        ActionKind::PickUp,
        ActionKind::Deliver,
        ActionKind::CompletePickup,
        ActionKind::Cancel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Accept => "accept",
            ActionKind::MarkReady => "mark_ready",
            ActionKind::AssignDriver => "assign_driver",
            ActionKind::AcceptAssignment => "accept_assignment",
            ActionKind::RejectAssignment => "reject_assignment",
            ActionKind::PickUp => "pick_up",
            ActionKind::Deliver => "deliver",
            ActionKind::CompletePickup => "complete_pickup",
            ActionKind::Cancel => "cancel",
        }
    }

    /// A representative action of this kind. Payload fields do not influence
    /// whether a transition is allowed.
    fn sample(&self) -> OrderAction {
        match self {
            ActionKind::Accept => OrderAction::Accept,
            ActionKind::MarkReady => OrderAction::MarkReady,
            ActionKind::AssignDriver => OrderAction::AssignDriver {
                driver_id: Uuid::nil(),
            },
            ActionKind::AcceptAssignment => OrderAction::AcceptAssignment,
            ActionKind::RejectAssignment => OrderAction::RejectAssignment { reason: None },
            ActionKind::PickUp => OrderAction::PickUp,
            ActionKind::Deliver => OrderAction::Deliver,
            ActionKind::CompletePickup => OrderAction::CompletePickup,
            ActionKind::Cancel => OrderAction::Cancel { reason: None },
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentChange {
    Unchanged,
    Create {
        driver_id: Uuid,
    },
    Update {
        id: Uuid,
        from: AssignmentStatus,
        to: AssignmentStatus,
    },
}

/// Everything one transition writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionPlan {
    pub action: ActionKind,
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub assignment: AssignmentChange,
    /// The driver is owed the delivery fee for this order.
    pub credit_earnings: bool,
    pub note: Option<String>,
}

impl TransitionPlan {
    pub fn changes_order_status(&self) -> bool {
        self.from != self.to
    }

    /// Snapshot after the plan is applied. `new_assignment_id` is used only
    /// when the plan creates an assignment.
    pub fn apply(&self, snapshot: &OrderSnapshot, new_assignment_id: Uuid) -> OrderSnapshot {
        let assignment = match self.assignment {
            AssignmentChange::Unchanged => snapshot.assignment,
            AssignmentChange::Create { driver_id } => Some(AssignmentSnapshot {
                id: new_assignment_id,
                driver_id,
                status: AssignmentStatus::Assigned,
            }),
            AssignmentChange::Update { to, .. } if !to.is_active() => None,
            AssignmentChange::Update { id, to, .. } => snapshot
                .assignment
                .map(|a| AssignmentSnapshot { id, status: to, ..a }),
        };

        OrderSnapshot {
            status: self.to,
            delivery_type: snapshot.delivery_type,
            assignment,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("action {action} is not allowed while the order is {status}")]
    NotAllowed {
        action: ActionKind,
        status: OrderStatus,
    },
    #[error("{role} may not {action} this order")]
    Forbidden { role: ActorRole, action: ActionKind },
    #[error("the order is assigned to another driver")]
    NotAssignedDriver,
    #[error("the order has no active delivery assignment")]
    NoActiveAssignment,
    #[error("the order already has an active delivery assignment")]
    AssignmentAlreadyActive,
    #[error("only delivery orders can be handled by a driver")]
    NotDeliveryOrder,
    #[error("only pickup orders can be collected at the counter")]
    NotPickupOrder,
    #[error("the assignment is {actual}, expected {}", list_statuses(.expected))]
    InvalidAssignmentState {
        expected: Vec<AssignmentStatus>,
        actual: AssignmentStatus,
    },
    #[error("order and assignment disagree: {0}")]
    Inconsistent(String),
}

fn list_statuses(statuses: &[AssignmentStatus]) -> String {
    statuses
        .iter()
        .map(AssignmentStatus::as_str)
        .collect::<Vec<_>>()
        .join(" or ")
}

impl From<TransitionError> for ServiceError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::Forbidden { .. } | TransitionError::NotAssignedDriver => {
                ServiceError::Forbidden(err.to_string())
            }
            TransitionError::AssignmentAlreadyActive => ServiceError::Conflict(err.to_string()),
            TransitionError::Inconsistent(_) => ServiceError::InconsistentState(err.to_string()),
            TransitionError::NotAllowed { .. }
            | TransitionError::NoActiveAssignment
            | TransitionError::NotDeliveryOrder
            | TransitionError::NotPickupOrder
            | TransitionError::InvalidAssignmentState { .. } => {
                ServiceError::InvalidStatus(err.to_string())
            }
        }
    }
}

/// Checks that the active assignment mirrors the order status.
pub fn check_mirror(snapshot: &OrderSnapshot) -> Result<(), TransitionError> {
    use AssignmentStatus as A;
    use OrderStatus as O;

    let assignment = snapshot.assignment.map(|a| a.status);

    if let Some(status) = assignment {
        if !status.is_active() {
            return Err(TransitionError::Inconsistent(format!(
                "closed assignment ({status}) used as the active one"
            )));
        }
        if snapshot.delivery_type == DeliveryType::Pickup {
            return Err(TransitionError::Inconsistent(
                "pickup order carries a delivery assignment".to_string(),
            ));
        }
    }

    let consistent = match (snapshot.status, assignment) {
        (O::Received, None) => true,
        (O::Preparing | O::AwaitingPickup, None | Some(A::Assigned) | Some(A::Accepted)) => true,
        (O::InTransit, Some(A::PickedUp)) => true,
        (O::Completed, Some(A::Delivered)) => snapshot.delivery_type == DeliveryType::Delivery,
        (O::Completed, None) => snapshot.delivery_type == DeliveryType::Pickup,
        (O::Cancelled, None) => true,
        _ => false,
    };

    if consistent {
        Ok(())
    } else {
        Err(TransitionError::Inconsistent(format!(
            "order is {} but assignment is {}",
            snapshot.status,
            assignment.map_or("absent", |s| s.as_str())
        )))
    }
}

fn authorize(actor: &Actor, action: ActionKind, status: OrderStatus) -> Result<(), TransitionError> {
    let allowed = match action {
        ActionKind::Accept
        | ActionKind::MarkReady
        | ActionKind::AssignDriver
        | ActionKind::CompletePickup => actor.role == ActorRole::StoreAdmin,
        ActionKind::AcceptAssignment
        | ActionKind::RejectAssignment
        | ActionKind::PickUp
        | ActionKind::Deliver => actor.role == ActorRole::Driver,
        ActionKind::Cancel => match actor.role {
            ActorRole::StoreAdmin | ActorRole::MasterAdmin => true,
            ActorRole::Customer => status == OrderStatus::Received,
            ActorRole::Driver => false,
        },
    };

    if allowed {
        Ok(())
    } else {
        Err(TransitionError::Forbidden {
            role: actor.role,
            action,
        })
    }
}

fn require_status(
    snapshot: &OrderSnapshot,
    action: ActionKind,
    expected: &[OrderStatus],
) -> Result<(), TransitionError> {
    if expected.contains(&snapshot.status) {
        Ok(())
    } else {
        Err(TransitionError::NotAllowed {
            action,
            status: snapshot.status,
        })
    }
}

/// The active assignment, owned by the acting driver, in one of `expected`.
fn driver_assignment(
    snapshot: &OrderSnapshot,
    actor: &Actor,
    expected: &[AssignmentStatus],
) -> Result<AssignmentSnapshot, TransitionError> {
    let assignment = snapshot
        .assignment
        .ok_or(TransitionError::NoActiveAssignment)?;
    if assignment.driver_id != actor.id {
        return Err(TransitionError::NotAssignedDriver);
    }
    if !expected.contains(&assignment.status) {
        return Err(TransitionError::InvalidAssignmentState {
            expected: expected.to_vec(),
            actual: assignment.status,
        });
    }
    Ok(assignment)
}

/// Plans `action` by `actor` against `snapshot`. This is the only place order
/// and assignment transitions are decided.
pub fn plan(
    snapshot: &OrderSnapshot,
    actor: &Actor,
    action: &OrderAction,
) -> Result<TransitionPlan, TransitionError> {
    use AssignmentStatus as A;
    use OrderStatus as O;

    check_mirror(snapshot)?;

    let kind = action.kind();
    if snapshot.status.is_terminal() {
        return Err(TransitionError::NotAllowed {
            action: kind,
            status: snapshot.status,
        });
    }
    authorize(actor, kind, snapshot.status)?;

    let stay = snapshot.status;
    let (to, assignment, credit_earnings) = match action {
        OrderAction::Accept => {
            require_status(snapshot, kind, &[O::Received])?;
            (O::Preparing, AssignmentChange::Unchanged, false)
        }
        OrderAction::MarkReady => {
            require_status(snapshot, kind, &[O::Preparing])?;
            (O::AwaitingPickup, AssignmentChange::Unchanged, false)
        }
        OrderAction::AssignDriver { driver_id } => {
            if snapshot.delivery_type != DeliveryType::Delivery {
                return Err(TransitionError::NotDeliveryOrder);
            }
            require_status(snapshot, kind, &[O::Preparing, O::AwaitingPickup])?;
            if snapshot.assignment.is_some() {
                return Err(TransitionError::AssignmentAlreadyActive);
            }
            (
                stay,
                AssignmentChange::Create {
                    driver_id: *driver_id,
                },
                false,
            )
        }
        OrderAction::AcceptAssignment => {
            let current = driver_assignment(snapshot, actor, &[A::Assigned])?;
            (
                stay,
                AssignmentChange::Update {
                    id: current.id,
                    from: current.status,
                    to: A::Accepted,
                },
                false,
            )
        }
        OrderAction::RejectAssignment { .. } => {
            let current = driver_assignment(snapshot, actor, &[A::Assigned, A::Accepted])?;
            (
                stay,
                AssignmentChange::Update {
                    id: current.id,
                    from: current.status,
                    to: A::Rejected,
                },
                false,
            )
        }
        OrderAction::PickUp => {
            if snapshot.delivery_type != DeliveryType::Delivery {
                return Err(TransitionError::NotDeliveryOrder);
            }
            require_status(snapshot, kind, &[O::AwaitingPickup])?;
            let current = driver_assignment(snapshot, actor, &[A::Accepted])?;
            (
                O::InTransit,
                AssignmentChange::Update {
                    id: current.id,
                    from: current.status,
                    to: A::PickedUp,
                },
                false,
            )
        }
        OrderAction::Deliver => {
            require_status(snapshot, kind, &[O::InTransit])?;
            let current = driver_assignment(snapshot, actor, &[A::PickedUp])?;
            (
                O::Completed,
                AssignmentChange::Update {
                    id: current.id,
                    from: current.status,
                    to: A::Delivered,
                },
                true,
            )
        }
        OrderAction::CompletePickup => {
            if snapshot.delivery_type != DeliveryType::Pickup {
                return Err(TransitionError::NotPickupOrder);
            }
            require_status(snapshot, kind, &[O::AwaitingPickup])?;
            (O::Completed, AssignmentChange::Unchanged, false)
        }
        OrderAction::Cancel { .. } => {
            let assignment = match snapshot.assignment {
                Some(current) => AssignmentChange::Update {
                    id: current.id,
                    from: current.status,
                    to: A::Cancelled,
                },
                None => AssignmentChange::Unchanged,
            };
            (O::Cancelled, assignment, false)
        }
    };

    Ok(TransitionPlan {
        action: kind,
        from: snapshot.status,
        to,
        assignment,
        credit_earnings,
        note: action.note(),
    })
}

/// Actions `actor` may take right now.
pub fn available_actions(snapshot: &OrderSnapshot, actor: &Actor) -> Vec<ActionKind> {
    ActionKind::ALL
        .into_iter()
        .filter(|kind| plan(snapshot, actor, &kind.sample()).is_ok())
        .collect()
}
