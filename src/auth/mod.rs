/*!
 * # Caller identity
 *
 * Credentials are verified upstream by the gateway, which forwards the caller as
 * trusted headers:
 *
 * - `X-Actor-Role`: one of `store_admin`, `driver`, `customer`, `master_admin`
 * - `X-Actor-Id`: the caller's UUID (driver id for drivers, customer id for customers)
 * - `X-Actor-Store-Id`: the tenant a store admin manages (required for store admins)
 *
 * Handlers take an [`Actor`] extractor and services use its scope checks to keep
 * tenants apart.
 */

use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::ServiceError;

pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";
pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_STORE_HEADER: &str = "x-actor-store-id";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    #[sea_orm(string_value = "store_admin")]
    StoreAdmin,
    #[sea_orm(string_value = "driver")]
    Driver,
    #[sea_orm(string_value = "customer")]
    Customer,
    #[sea_orm(string_value = "master_admin")]
    MasterAdmin,
}

impl ActorRole {
    pub const ALL: [ActorRole; 4] = [
        ActorRole::StoreAdmin,
        ActorRole::Driver,
        ActorRole::Customer,
        ActorRole::MasterAdmin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActorRole::StoreAdmin => "store_admin",
            ActorRole::Driver => "driver",
            ActorRole::Customer => "customer",
            ActorRole::MasterAdmin => "master_admin",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(value.trim()))
    }
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The caller of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub role: ActorRole,
    pub id: Uuid,
    pub store_id: Option<Uuid>,
}

impl Actor {
    pub fn new(role: ActorRole, id: Uuid) -> Self {
        Self {
            role,
            id,
            store_id: None,
        }
    }

    pub fn store_admin(id: Uuid, store_id: Uuid) -> Self {
        Self {
            role: ActorRole::StoreAdmin,
            id,
            store_id: Some(store_id),
        }
    }

    pub fn is_master(&self) -> bool {
        self.role == ActorRole::MasterAdmin
    }

    /// Master admins manage every tenant; store admins only their own.
    pub fn can_manage_store(&self, store_id: Uuid) -> bool {
        match self.role {
            ActorRole::MasterAdmin => true,
            ActorRole::StoreAdmin => self.store_id == Some(store_id),
            ActorRole::Driver | ActorRole::Customer => false,
        }
    }

    /// Tenant scope of an order. Drivers pass here; whether a driver may act is
    /// decided per assignment by the lifecycle.
    pub fn require_order_scope(&self, store_id: Uuid, customer_id: Uuid) -> Result<(), ServiceError> {
        let allowed = match self.role {
            ActorRole::MasterAdmin | ActorRole::Driver => true,
            ActorRole::StoreAdmin => self.store_id == Some(store_id),
            ActorRole::Customer => self.id == customer_id,
        };
        if allowed {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(format!(
                "{} {} may not access this order",
                self.role, self.id
            )))
        }
    }

    /// Read access to an order: its store, its customer, or the driver holding
    /// the active assignment.
    pub fn require_order_view(
        &self,
        store_id: Uuid,
        customer_id: Uuid,
        assigned_driver: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        if self.role == ActorRole::Driver && assigned_driver != Some(self.id) {
            return Err(ServiceError::Forbidden(format!(
                "driver {} is not assigned to this order",
                self.id
            )));
        }
        self.require_order_scope(store_id, customer_id)
    }

    /// A driver sees their own records; admins see the drivers of their store.
    pub fn require_driver_access(&self, driver_id: Uuid, driver_store_id: Uuid) -> Result<(), ServiceError> {
        let allowed = match self.role {
            ActorRole::Driver => self.id == driver_id,
            ActorRole::StoreAdmin | ActorRole::MasterAdmin => self.can_manage_store(driver_store_id),
            ActorRole::Customer => false,
        };
        if allowed {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(format!(
                "{} {} may not access driver {}",
                self.role, self.id, driver_id
            )))
        }
    }

    pub fn require_master(&self) -> Result<(), ServiceError> {
        if self.is_master() {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(format!(
                "{} may not perform platform administration",
                self.role
            )))
        }
    }

    pub fn require_store_manager(&self, store_id: Uuid) -> Result<(), ServiceError> {
        if self.can_manage_store(store_id) {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(format!(
                "{} {} does not manage store {}",
                self.role, self.id, store_id
            )))
        }
    }
}

fn header_value<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn parse_uuid_header(parts: &Parts, name: &str) -> Result<Option<Uuid>, ServiceError> {
    header_value(parts, name)
        .map(|raw| {
            Uuid::parse_str(raw)
                .map_err(|_| ServiceError::Unauthorized(format!("{name} must be a valid UUID")))
        })
        .transpose()
}

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let role = header_value(parts, ACTOR_ROLE_HEADER)
            .ok_or_else(|| ServiceError::Unauthorized("missing X-Actor-Role header".to_string()))?;
        let role = ActorRole::parse(role)
            .ok_or_else(|| ServiceError::Unauthorized(format!("unknown actor role: {role}")))?;
        let id = parse_uuid_header(parts, ACTOR_ID_HEADER)?
            .ok_or_else(|| ServiceError::Unauthorized("missing X-Actor-Id header".to_string()))?;
        let store_id = parse_uuid_header(parts, ACTOR_STORE_HEADER)?;

        if role == ActorRole::StoreAdmin && store_id.is_none() {
            return Err(ServiceError::Unauthorized(
                "store admins must send X-Actor-Store-Id".to_string(),
            ));
        }

        Ok(Actor { role, id, store_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(headers: &[(&str, &str)]) -> Result<Actor, ServiceError> {
        let mut builder = Request::builder().uri("/");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        Actor::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn extracts_driver_from_headers() {
        let id = Uuid::new_v4();
        let actor = extract(&[("x-actor-role", "driver"), ("x-actor-id", &id.to_string())])
            .await
            .unwrap();
        assert_eq!(actor, Actor::new(ActorRole::Driver, id));
    }

    #[tokio::test]
    async fn store_admin_requires_store_scope() {
        let id = Uuid::new_v4().to_string();
        let err = extract(&[("x-actor-role", "store_admin"), ("x-actor-id", &id)])
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn rejects_unknown_role_and_bad_uuid() {
        let id = Uuid::new_v4().to_string();
        assert!(extract(&[("x-actor-role", "courier"), ("x-actor-id", &id)])
            .await
            .is_err());
        assert!(extract(&[("x-actor-role", "customer"), ("x-actor-id", "nope")])
            .await
            .is_err());
        assert!(extract(&[]).await.is_err());
    }

    #[test]
    fn store_scope_is_enforced() {
        let store = Uuid::new_v4();
        let admin = Actor::store_admin(Uuid::new_v4(), store);
        assert!(admin.can_manage_store(store));
        assert!(!admin.can_manage_store(Uuid::new_v4()));
        assert!(Actor::new(ActorRole::MasterAdmin, Uuid::new_v4()).can_manage_store(store));
        assert!(!Actor::new(ActorRole::Driver, Uuid::new_v4()).can_manage_store(store));
    }

    #[test]
    fn order_visibility_follows_role() {
        let store = Uuid::new_v4();
        let customer = Uuid::new_v4();
        let driver = Uuid::new_v4();

        assert!(Actor::new(ActorRole::Customer, customer)
            .require_order_view(store, customer, None)
            .is_ok());
        assert!(Actor::new(ActorRole::Customer, Uuid::new_v4())
            .require_order_view(store, customer, None)
            .is_err());
        assert!(Actor::new(ActorRole::Driver, driver)
            .require_order_view(store, customer, Some(driver))
            .is_ok());
        assert!(Actor::new(ActorRole::Driver, driver)
            .require_order_view(store, customer, None)
            .is_err());
        assert!(Actor::store_admin(Uuid::new_v4(), Uuid::new_v4())
            .require_order_scope(store, customer)
            .is_err());
    }

    #[test]
    fn drivers_only_see_themselves() {
        let store = Uuid::new_v4();
        let driver = Uuid::new_v4();
        assert!(Actor::new(ActorRole::Driver, driver)
            .require_driver_access(driver, store)
            .is_ok());
        assert!(Actor::new(ActorRole::Driver, Uuid::new_v4())
            .require_driver_access(driver, store)
            .is_err());
        assert!(Actor::store_admin(Uuid::new_v4(), store)
            .require_driver_access(driver, store)
            .is_ok());
    }
}
