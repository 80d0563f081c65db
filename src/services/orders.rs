use crate::{
    auth::{Actor, ActorRole},
    commands::{
        orders::{
            ActionOutcome, ApplyOrderActionCommand, CreateOrderCommand, CreateOrderRequest,
            OrderAggregate, ACTIVE_ASSIGNMENT_STATUSES,
        },
        Command,
    },
    db::DbPool,
    entities::{delivery_assignment, order, order_item, order_status_history},
    errors::ServiceError,
    events::EventSender,
    lifecycle::{self, ActionKind, OrderAction},
    models::OrderStatus,
    services::page_bounds,
};
use sea_orm::{
    ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, QueryTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

pub use crate::commands::orders::create_order_command::CreateOrderResult;

/// An order with everything a caller needs to render it.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderDetail {
    pub order: order::Model,
    pub items: Vec<order_item::Model>,
    /// The active delivery assignment, if a driver holds the order
    pub assignment: Option<delivery_assignment::Model>,
}

/// Optional narrowing of an order listing. The caller's role may tighten it
/// further; see [`OrderService::list_orders`].
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct OrderFilter {
    pub store_id: Option<Uuid>,
    pub status: Option<OrderStatus>,
    pub customer_id: Option<Uuid>,
    pub driver_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderPage {
    pub orders: Vec<order::Model>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AvailableActions {
    pub order_id: Uuid,
    pub status: OrderStatus,
    pub version: i32,
    pub actions: Vec<ActionKind>,
}

/// Order queries and the entry points for order writes
#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl OrderService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Places an order on behalf of the calling customer.
    #[instrument(skip(self, request), fields(%store_id, actor_id = %actor.id))]
    pub async fn create_order(
        &self,
        store_id: Uuid,
        actor: Actor,
        request: CreateOrderRequest,
    ) -> Result<CreateOrderResult, ServiceError> {
        if actor.role != ActorRole::Customer {
            return Err(ServiceError::Forbidden(format!(
                "{} may not place orders",
                actor.role
            )));
        }

        CreateOrderCommand {
            store_id,
            actor,
            request,
        }
        .execute(self.db_pool.clone(), self.event_sender.clone())
        .await
    }

    #[instrument(skip(self), fields(actor_role = %actor.role))]
    pub async fn get_order(&self, order_id: Uuid, actor: Actor) -> Result<OrderDetail, ServiceError> {
        let db = &*self.db_pool;
        let aggregate = self.load_visible(order_id, &actor).await?;

        let items = order_item::Entity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(db)
            .await
            .map_err(|e| {
                error!(error = %e, %order_id, "Failed to load order items");
                ServiceError::DatabaseError(e)
            })?;

        Ok(OrderDetail {
            order: aggregate.order,
            items,
            assignment: aggregate.assignment,
        })
    }

    /// Lists orders newest first. Store admins only see their store, customers
    /// their own orders and drivers the orders they currently hold.
    #[instrument(skip(self, filter), fields(actor_role = %actor.role))]
    pub async fn list_orders(
        &self,
        actor: Actor,
        filter: OrderFilter,
        page: u64,
        limit: u64,
    ) -> Result<OrderPage, ServiceError> {
        let db = &*self.db_pool;
        let (page, limit) = page_bounds(page, limit)?;
        let filter = scope_filter(&actor, filter)?;

        let mut query = order::Entity::find();
        if let Some(store_id) = filter.store_id {
            query = query.filter(order::Column::StoreId.eq(store_id));
        }
        if let Some(status) = filter.status {
            query = query.filter(order::Column::Status.eq(status));
        }
        if let Some(customer_id) = filter.customer_id {
            query = query.filter(order::Column::CustomerId.eq(customer_id));
        }
        if let Some(driver_id) = filter.driver_id {
            let held = delivery_assignment::Entity::find()
                .select_only()
                .column(delivery_assignment::Column::OrderId)
                .filter(delivery_assignment::Column::DriverId.eq(driver_id))
                .filter(delivery_assignment::Column::Status.is_in(ACTIVE_ASSIGNMENT_STATUSES))
                .into_query();
            query = query.filter(order::Column::Id.in_subquery(held));
        }

        let paginator = query
            .order_by_desc(order::Column::CreatedAt)
            .order_by_desc(order::Column::OrderNumber)
            .paginate(db, limit);
        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page - 1).await.map_err(|e| {
            error!(error = %e, "Failed to fetch orders page");
            ServiceError::DatabaseError(e)
        })?;

        Ok(OrderPage {
            orders,
            total,
            page,
            limit,
        })
    }

    /// History rows for an order, oldest first.
    #[instrument(skip(self), fields(actor_role = %actor.role))]
    pub async fn status_history(
        &self,
        order_id: Uuid,
        actor: Actor,
    ) -> Result<Vec<order_status_history::Model>, ServiceError> {
        self.load_visible(order_id, &actor).await?;

        let rows = order_status_history::Entity::find()
            .filter(order_status_history::Column::OrderId.eq(order_id))
            .order_by_asc(order_status_history::Column::CreatedAt)
            .all(&*self.db_pool)
            .await?;
        Ok(rows)
    }

    #[instrument(skip(self), fields(actor_role = %actor.role))]
    pub async fn available_actions(
        &self,
        order_id: Uuid,
        actor: Actor,
    ) -> Result<AvailableActions, ServiceError> {
        let aggregate = self.load_visible(order_id, &actor).await?;
        Ok(AvailableActions {
            order_id,
            status: aggregate.order.status,
            version: aggregate.order.version,
            actions: lifecycle::available_actions(&aggregate.snapshot(), &actor),
        })
    }

    pub async fn apply_action(
        &self,
        order_id: Uuid,
        actor: Actor,
        action: OrderAction,
        expected_version: Option<i32>,
    ) -> Result<ActionOutcome, ServiceError> {
        ApplyOrderActionCommand {
            order_id,
            actor,
            action,
            expected_version,
        }
        .execute(self.db_pool.clone(), self.event_sender.clone())
        .await
    }

    async fn load_visible(&self, order_id: Uuid, actor: &Actor) -> Result<OrderAggregate, ServiceError> {
        let aggregate = OrderAggregate::load(&*self.db_pool, order_id).await?;
        actor.require_order_view(
            aggregate.order.store_id,
            aggregate.order.customer_id,
            aggregate.assigned_driver(),
        )?;
        Ok(aggregate)
    }
}

/// Pins the filter to what the actor may see.
fn scope_filter(actor: &Actor, mut filter: OrderFilter) -> Result<OrderFilter, ServiceError> {
    fn pin(requested: Option<Uuid>, own: Uuid, what: &str) -> Result<Option<Uuid>, ServiceError> {
        match requested {
            Some(id) if id != own => Err(ServiceError::Forbidden(format!(
                "cannot list orders of another {what}"
            ))),
            _ => Ok(Some(own)),
        }
    }

    match actor.role {
        ActorRole::MasterAdmin => {}
        ActorRole::StoreAdmin => {
            let own = actor.store_id.ok_or_else(|| {
                ServiceError::Unauthorized("store admin without a store".to_string())
            })?;
            filter.store_id = pin(filter.store_id, own, "store")?;
        }
        ActorRole::Customer => filter.customer_id = pin(filter.customer_id, actor.id, "customer")?,
        ActorRole::Driver => filter.driver_id = pin(filter.driver_id, actor.id, "driver")?,
    }
    Ok(filter)
}
