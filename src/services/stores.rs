use crate::{
    auth::Actor,
    db::DbPool,
    entities::{driver, store},
    errors::ServiceError,
    models::{not_blank, SubscriptionStatus},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, SqlErr,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    let well_formed = slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !slug.starts_with('-')
        && !slug.ends_with('-');
    if well_formed {
        Ok(())
    } else {
        Err(ValidationError::new("slug"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateStoreRequest {
    #[validate(length(min = 1, max = 120), custom = "not_blank")]
    pub name: String,
    #[validate(length(min = 2, max = 64), custom = "validate_slug")]
    pub slug: String,
    pub delivery_fee: Decimal,
    #[validate(length(min = 1, max = 50))]
    pub subscription_plan: String,
    pub subscription_expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct RegisterDriverRequest {
    #[validate(length(min = 1, max = 120), custom = "not_blank")]
    pub name: String,
    #[validate(length(min = 4, max = 32))]
    pub phone: Option<String>,
}

/// Tenant and driver management
#[derive(Clone)]
pub struct StoreService {
    db_pool: Arc<DbPool>,
    warning_days: i64,
}

impl StoreService {
    pub fn new(db_pool: Arc<DbPool>, warning_days: i64) -> Self {
        Self {
            db_pool,
            warning_days,
        }
    }

    #[instrument(skip(self, request), fields(slug = %request.slug))]
    pub async fn create_store(
        &self,
        actor: Actor,
        request: CreateStoreRequest,
    ) -> Result<store::Model, ServiceError> {
        actor.require_master()?;
        request.validate()?;
        if request.delivery_fee.is_sign_negative() {
            return Err(ServiceError::ValidationError(
                "delivery_fee must not be negative".to_string(),
            ));
        }

        let db = &*self.db_pool;
        let taken = store::Entity::find()
            .filter(store::Column::Slug.eq(request.slug.as_str()))
            .one(db)
            .await?;
        if taken.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Store slug '{}' is already taken",
                request.slug
            )));
        }

        let now = Utc::now();
        let created = store::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name.trim().to_string()),
            slug: Set(request.slug.clone()),
            delivery_fee: Set(request.delivery_fee.round_dp(2)),
            order_sequence: Set(0),
            subscription_plan: Set(request.subscription_plan.clone()),
            subscription_expires_at: Set(request.subscription_expires_at),
            active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await
        .map_err(|e| match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => ServiceError::Conflict(format!(
                "Store slug '{}' is already taken",
                request.slug
            )),
            _ => {
                error!(error = %e, "Failed to create store");
                ServiceError::DatabaseError(e)
            }
        })?;

        info!(store_id = %created.id, "Store created");
        Ok(created)
    }

    /// Public storefront data; any authenticated caller may read it.
    pub async fn get_store(&self, store_id: Uuid) -> Result<store::Model, ServiceError> {
        find_store(&*self.db_pool, store_id).await
    }

    #[instrument(skip(self, request))]
    pub async fn register_driver(
        &self,
        store_id: Uuid,
        actor: Actor,
        request: RegisterDriverRequest,
    ) -> Result<driver::Model, ServiceError> {
        actor.require_store_manager(store_id)?;
        request.validate()?;

        let db = &*self.db_pool;
        find_store(db, store_id).await?;

        let created = driver::ActiveModel {
            id: Set(Uuid::new_v4()),
            store_id: Set(store_id),
            name: Set(request.name.trim().to_string()),
            phone: Set(request.phone.clone()),
            active: Set(true),
            created_at: Set(Utc::now()),
        }
        .insert(db)
        .await?;

        info!(driver_id = %created.id, %store_id, "Driver registered");
        Ok(created)
    }

    pub async fn list_drivers(
        &self,
        store_id: Uuid,
        actor: Actor,
    ) -> Result<Vec<driver::Model>, ServiceError> {
        actor.require_store_manager(store_id)?;
        let drivers = driver::Entity::find()
            .filter(driver::Column::StoreId.eq(store_id))
            .order_by_asc(driver::Column::Name)
            .all(&*self.db_pool)
            .await?;
        Ok(drivers)
    }

    /// Subscription state of a store at this moment.
    pub async fn subscription_status(
        &self,
        store_id: Uuid,
        actor: Actor,
    ) -> Result<SubscriptionStatus, ServiceError> {
        actor.require_store_manager(store_id)?;
        let store = find_store(&*self.db_pool, store_id).await?;
        Ok(SubscriptionStatus::evaluate(
            Some(store.subscription_plan),
            store.subscription_expires_at,
            Utc::now(),
            self.warning_days,
        ))
    }
}

pub(crate) async fn find_store<C>(conn: &C, store_id: Uuid) -> Result<store::Model, ServiceError>
where
    C: sea_orm::ConnectionTrait,
{
    store::Entity::find_by_id(store_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Store {} not found", store_id)))
}
