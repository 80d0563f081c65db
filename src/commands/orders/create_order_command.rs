use crate::{
    auth::Actor,
    commands::Command,
    db::DbPool,
    entities::{order, order_item, order_status_history, store},
    errors::ServiceError,
    events::{Event, EventSender},
    metrics::ORDERS_CREATED,
    models::{not_blank, DeliveryType, OrderStatus, SubscriptionStatus},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{sea_query::Expr, *};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateOrderItem {
    #[validate(
        length(min = 1, max = 200, message = "Product name must be between 1 and 200 characters"),
        custom = "not_blank"
    )]
    pub product_name: String,
    #[validate(range(min = 1, max = 1000, message = "Quantity must be between 1 and 1000"))]
    pub quantity: i32,
    pub unit_price: Decimal,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateOrderRequest {
    #[validate(
        length(min = 1, max = 120, message = "Customer name must be between 1 and 120 characters"),
        custom = "not_blank"
    )]
    pub customer_name: String,
    pub delivery_type: DeliveryType,
    #[validate(length(max = 500))]
    pub delivery_address: Option<String>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
    #[serde(default)]
    pub discount: Decimal,
    #[validate(length(min = 1, message = "At least one item is required"))]
    pub items: Vec<CreateOrderItem>,
}

impl CreateOrderRequest {
    /// Field rules the derive cannot express: nested items, money signs and
    /// the address a delivery needs.
    fn check(&self) -> Result<(), ServiceError> {
        self.validate()?;
        for (index, item) in self.items.iter().enumerate() {
            item.validate()
                .map_err(|e| ServiceError::ValidationError(format!("items[{}]: {}", index, e)))?;
            if item.unit_price.is_sign_negative() {
                return Err(ServiceError::ValidationError(format!(
                    "items[{}]: unit_price must not be negative",
                    index
                )));
            }
        }
        if self.discount.is_sign_negative() {
            return Err(ServiceError::ValidationError(
                "discount must not be negative".to_string(),
            ));
        }
        let has_address = self
            .delivery_address
            .as_deref()
            .map_or(false, |a| !a.trim().is_empty());
        if self.delivery_type == DeliveryType::Delivery && !has_address {
            return Err(ServiceError::ValidationError(
                "delivery_address is required for delivery orders".to_string(),
            ));
        }
        Ok(())
    }

    pub fn subtotal(&self) -> Decimal {
        self.items
            .iter()
            .map(|item| item.unit_price * Decimal::from(item.quantity))
            .sum::<Decimal>()
            .round_dp(2)
    }
}

/// Money of a new order. The total never goes below zero, however large the
/// discount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderAmounts {
    pub subtotal: Decimal,
    pub delivery_fee: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
}

impl OrderAmounts {
    pub fn compute(subtotal: Decimal, delivery_fee: Decimal, discount: Decimal) -> Self {
        let total = (subtotal + delivery_fee - discount).max(Decimal::ZERO).round_dp(2);
        Self {
            subtotal: subtotal.round_dp(2),
            delivery_fee: delivery_fee.round_dp(2),
            discount: discount.round_dp(2),
            total,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateOrderCommand {
    pub store_id: Uuid,
    pub actor: Actor,
    pub request: CreateOrderRequest,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CreateOrderResult {
    pub order: order::Model,
    pub items: Vec<order_item::Model>,
}

#[async_trait::async_trait]
impl Command for CreateOrderCommand {
    type Result = CreateOrderResult;

    #[instrument(skip(self, db_pool, event_sender), fields(store_id = %self.store_id, customer_id = %self.actor.id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.request.check().map_err(|e| {
            warn!(error = %e, "Rejected order request");
            e
        })?;

        let db = db_pool.as_ref();
        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for order creation");
            ServiceError::DatabaseError(e)
        })?;

        let store = store::Entity::find_by_id(self.store_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Store {} not found", self.store_id)))?;

        if !store.active {
            return Err(ServiceError::Conflict(format!(
                "Store {} is not accepting orders",
                store.slug
            )));
        }

        let now = Utc::now();
        let subscription = SubscriptionStatus::evaluate(
            Some(store.subscription_plan.clone()),
            store.subscription_expires_at,
            now,
            0,
        );
        if !subscription.allows_orders() {
            return Err(ServiceError::SubscriptionExpired(format!(
                "Store {} cannot receive orders until its subscription is renewed",
                store.slug
            )));
        }

        let order_number = self.next_order_number(&txn).await?;

        let delivery_fee = match self.request.delivery_type {
            DeliveryType::Delivery => store.delivery_fee,
            DeliveryType::Pickup => Decimal::ZERO,
        };
        let amounts = OrderAmounts::compute(self.request.subtotal(), delivery_fee, self.request.discount);

        let order_id = Uuid::new_v4();
        let saved_order = order::ActiveModel {
            id: Set(order_id),
            store_id: Set(store.id),
            order_number: Set(order_number),
            customer_id: Set(self.actor.id),
            customer_name: Set(self.request.customer_name.trim().to_string()),
            delivery_type: Set(self.request.delivery_type),
            status: Set(OrderStatus::Received),
            delivery_address: Set(match self.request.delivery_type {
                DeliveryType::Delivery => self.request.delivery_address.clone(),
                DeliveryType::Pickup => None,
            }),
            notes: Set(self.request.notes.clone()),
            subtotal: Set(amounts.subtotal),
            delivery_fee: Set(amounts.delivery_fee),
            discount: Set(amounts.discount),
            total: Set(amounts.total),
            cancel_reason: Set(None),
            version: Set(1),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            error!(error = %e, %order_id, "Failed to insert order");
            ServiceError::DatabaseError(e)
        })?;

        let mut items = Vec::with_capacity(self.request.items.len());
        for item in &self.request.items {
            let saved_item = order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_name: Set(item.product_name.trim().to_string()),
                quantity: Set(item.quantity),
                unit_price: Set(item.unit_price.round_dp(2)),
                total_price: Set((item.unit_price * Decimal::from(item.quantity)).round_dp(2)),
                notes: Set(item.notes.clone()),
            }
            .insert(&txn)
            .await?;
            items.push(saved_item);
        }

        order_status_history::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            action: Set("create".to_string()),
            from_status: Set(None),
            to_status: Set(OrderStatus::Received),
            actor_role: Set(self.actor.role),
            actor_id: Set(self.actor.id),
            note: Set(None),
            created_at: Set(now),
        }
        .insert(&txn)
        .await?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, %order_id, "Failed to commit order creation");
            ServiceError::DatabaseError(e)
        })?;

        ORDERS_CREATED.inc();
        info!(
            %order_id,
            order_number,
            total = %amounts.total,
            items_count = items.len(),
            "Order created"
        );

        event_sender
            .send_or_log(Event::OrderCreated {
                order_id,
                store_id: store.id,
                order_number,
            })
            .await;

        Ok(CreateOrderResult {
            order: saved_order,
            items,
        })
    }
}

impl CreateOrderCommand {
    /// Bumps the store's sequence and reads it back. The update takes the row
    /// lock first, so concurrent creations for one store serialize here.
    async fn next_order_number(&self, txn: &DatabaseTransaction) -> Result<i32, ServiceError> {
        let result = store::Entity::update_many()
            .col_expr(
                store::Column::OrderSequence,
                Expr::col(store::Column::OrderSequence).add(1),
            )
            .filter(store::Column::Id.eq(self.store_id))
            .exec(txn)
            .await?;
        if result.rows_affected != 1 {
            return Err(ServiceError::NotFound(format!(
                "Store {} not found",
                self.store_id
            )));
        }

        let store = store::Entity::find_by_id(self.store_id)
            .one(txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Store {} not found", self.store_id)))?;
        Ok(store.order_sequence)
    }
}
