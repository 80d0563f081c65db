use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::models::{AssignmentStatus, OrderStatus};

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), ServiceError> {
        self.sender
            .send(event)
            .await
            .map_err(|e| ServiceError::EventError(format!("Failed to send event: {}", e)))
    }

    /// Sends after a commit. The write already happened, so a closed channel
    /// is logged rather than surfaced to the caller.
    pub async fn send_or_log(&self, event: Event) {
        let name = event.name();
        if let Err(e) = self.send(event).await {
            warn!(event = name, error = %e, "Dropping domain event");
        }
    }
}

/// Domain events emitted after a transaction commits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    OrderCreated {
        order_id: Uuid,
        store_id: Uuid,
        order_number: i32,
    },
    OrderStatusChanged {
        order_id: Uuid,
        old_status: OrderStatus,
        new_status: OrderStatus,
        action: String,
    },
    DriverAssigned {
        order_id: Uuid,
        assignment_id: Uuid,
        driver_id: Uuid,
    },
    AssignmentStatusChanged {
        assignment_id: Uuid,
        order_id: Uuid,
        old_status: AssignmentStatus,
        new_status: AssignmentStatus,
    },
    EarningsCredited {
        earnings_id: Uuid,
        driver_id: Uuid,
        order_id: Uuid,
        amount: Decimal,
    },
    EarningsPaid {
        earnings_id: Uuid,
        driver_id: Uuid,
        paid_at: DateTime<Utc>,
    },
    PaymentApproved {
        approval_id: Uuid,
        store_id: Uuid,
        expires_at: DateTime<Utc>,
    },
    PaymentRejected {
        approval_id: Uuid,
        store_id: Uuid,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::OrderCreated { .. } => "order_created",
            Event::OrderStatusChanged { .. } => "order_status_changed",
            Event::DriverAssigned { .. } => "driver_assigned",
            Event::AssignmentStatusChanged { .. } => "assignment_status_changed",
            Event::EarningsCredited { .. } => "earnings_credited",
            Event::EarningsPaid { .. } => "earnings_paid",
            Event::PaymentApproved { .. } => "payment_approved",
            Event::PaymentRejected { .. } => "payment_rejected",
        }
    }
}

/// Drains the event channel, logging each event until every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        crate::metrics::EVENTS_PROCESSED
            .with_label_values(&[event.name()])
            .inc();

        match &event {
            Event::OrderCreated {
                order_id,
                store_id,
                order_number,
            } => {
                info!(%order_id, %store_id, order_number, "Order created");
            }
            Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
                action,
            } => {
                info!(%order_id, %old_status, %new_status, action = %action, "Order status changed");
            }
            Event::DriverAssigned {
                order_id,
                assignment_id,
                driver_id,
            } => {
                info!(%order_id, %assignment_id, %driver_id, "Driver assigned");
            }
            Event::AssignmentStatusChanged {
                assignment_id,
                order_id,
                old_status,
                new_status,
            } => {
                info!(%assignment_id, %order_id, %old_status, %new_status, "Assignment status changed");
            }
            Event::EarningsCredited {
                earnings_id,
                driver_id,
                order_id,
                amount,
            } => {
                info!(%earnings_id, %driver_id, %order_id, %amount, "Driver earnings credited");
            }
            Event::EarningsPaid {
                earnings_id,
                driver_id,
                paid_at,
            } => {
                info!(%earnings_id, %driver_id, %paid_at, "Driver earnings paid");
            }
            Event::PaymentApproved {
                approval_id,
                store_id,
                expires_at,
            } => {
                info!(%approval_id, %store_id, %expires_at, "Subscription payment approved");
            }
            Event::PaymentRejected {
                approval_id,
                store_id,
            } => {
                warn!(%approval_id, %store_id, "Subscription payment rejected");
            }
        }
    }

    warn!("Event processing loop has ended");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_delivers_to_receiver() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);
        let order_id = Uuid::new_v4();
        sender
            .send(Event::PaymentRejected {
                approval_id: order_id,
                store_id: order_id,
            })
            .await
            .unwrap();
        assert_eq!(rx.recv().await.map(|e| e.name()), Some("payment_rejected"));
    }

    #[tokio::test]
    async fn closed_channel_is_an_event_error() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);
        let err = sender
            .send(Event::PaymentRejected {
                approval_id: Uuid::nil(),
                store_id: Uuid::nil(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::EventError(_)));

        sender
            .send_or_log(Event::PaymentRejected {
                approval_id: Uuid::nil(),
                store_id: Uuid::nil(),
            })
            .await;
    }

    #[tokio::test]
    async fn process_events_stops_when_senders_drop() {
        let (tx, rx) = mpsc::channel(4);
        let handle = tokio::spawn(process_events(rx));
        EventSender::new(tx)
            .send(Event::OrderCreated {
                order_id: Uuid::new_v4(),
                store_id: Uuid::new_v4(),
                order_number: 1,
            })
            .await
            .unwrap();
        handle.await.unwrap();
    }
}
