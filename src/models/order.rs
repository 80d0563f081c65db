use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Lifecycle status of an order. Wire values are the storefront's own
/// vocabulary and are stored verbatim.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum OrderStatus {
    /// New order, not yet accepted by the store.
    #[sea_orm(string_value = "entrada")]
    #[serde(rename = "entrada")]
    Received,
    #[sea_orm(string_value = "em_preparo")]
    #[serde(rename = "em_preparo")]
    Preparing,
    #[sea_orm(string_value = "aguarda_retirada")]
    #[serde(rename = "aguarda_retirada")]
    AwaitingPickup,
    #[sea_orm(string_value = "em_transito")]
    #[serde(rename = "em_transito")]
    InTransit,
    #[sea_orm(string_value = "concluido")]
    #[serde(rename = "concluido")]
    Completed,
    #[sea_orm(string_value = "cancelado")]
    #[serde(rename = "cancelado")]
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Received => "entrada",
            OrderStatus::Preparing => "em_preparo",
            OrderStatus::AwaitingPickup => "aguarda_retirada",
            OrderStatus::InTransit => "em_transito",
            OrderStatus::Completed => "concluido",
            OrderStatus::Cancelled => "cancelado",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "entrada" => Some(OrderStatus::Received),
            "em_preparo" => Some(OrderStatus::Preparing),
            "aguarda_retirada" => Some(OrderStatus::AwaitingPickup),
            "em_transito" => Some(OrderStatus::InTransit),
            "concluido" => Some(OrderStatus::Completed),
            "cancelado" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the order reaches the customer.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum DeliveryType {
    /// A driver carries the order to the customer.
    #[sea_orm(string_value = "delivery")]
    #[serde(rename = "delivery")]
    Delivery,
    /// The customer collects the order at the store counter.
    #[sea_orm(string_value = "retirada")]
    #[serde(rename = "retirada")]
    Pickup,
}

impl fmt::Display for DeliveryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryType::Delivery => f.write_str("delivery"),
            DeliveryType::Pickup => f.write_str("retirada"),
        }
    }
}
