//! Domain enumerations shared by entities, the lifecycle and the HTTP layer.

pub mod billing;
pub mod delivery;
pub mod order;

pub use billing::{extended_expiry, PaymentApprovalStatus, SubscriptionState, SubscriptionStatus};
pub use delivery::{AssignmentStatus, EarningsPaymentStatus};
pub use order::{DeliveryType, OrderStatus};

use validator::ValidationError;

/// Rejects values that are empty once surrounding whitespace is trimmed.
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("must not be blank".into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::not_blank;

    #[test]
    fn whitespace_only_is_blank() {
        assert!(not_blank("").is_err());
        assert!(not_blank(" \t\n").is_err());
        assert!(not_blank(" Ana ").is_ok());
    }
}
