use chrono::{DateTime, Duration, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Review state of a subscription payment submitted by a store.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum PaymentApprovalStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

/// Derived subscription state; never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionState {
    Active,
    ExpiringSoon,
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SubscriptionStatus {
    pub state: SubscriptionState,
    pub plan: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    /// Whole days left before expiry; zero once expired.
    pub days_remaining: i64,
}

impl SubscriptionStatus {
    /// Compares the expiry against `now`. A missing expiry counts as expired.
    pub fn evaluate(
        plan: Option<String>,
        expires_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
        warning_days: i64,
    ) -> Self {
        let (state, days_remaining) = match expires_at {
            Some(expiry) if expiry > now => {
                let days = (expiry - now).num_days();
                if expiry - now <= Duration::days(warning_days) {
                    (SubscriptionState::ExpiringSoon, days)
                } else {
                    (SubscriptionState::Active, days)
                }
            }
            _ => (SubscriptionState::Expired, 0),
        };

        Self {
            state,
            plan,
            expires_at,
            days_remaining,
        }
    }

    pub fn allows_orders(&self) -> bool {
        self.state != SubscriptionState::Expired
    }
}

/// New expiry after an approved payment: extends from whichever is later,
/// now or the current expiry, so early renewals are not lost.
pub fn extended_expiry(
    current: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    months: i32,
    period_days: i64,
) -> DateTime<Utc> {
    let base = match current {
        Some(expiry) if expiry > now => expiry,
        _ => now,
    };
    base + Duration::days(i64::from(months) * period_days)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn missing_expiry_is_expired() {
        let status = SubscriptionStatus::evaluate(None, None, now(), 7);
        assert_eq!(status.state, SubscriptionState::Expired);
        assert_eq!(status.days_remaining, 0);
        assert!(!status.allows_orders());
    }

    #[test]
    fn expiry_exactly_now_is_expired() {
        let status = SubscriptionStatus::evaluate(Some("basic".into()), Some(now()), now(), 7);
        assert_eq!(status.state, SubscriptionState::Expired);
    }

    #[test]
    fn expiry_inside_warning_window_is_expiring_soon() {
        let status =
            SubscriptionStatus::evaluate(None, Some(now() + Duration::days(3)), now(), 7);
        assert_eq!(status.state, SubscriptionState::ExpiringSoon);
        assert_eq!(status.days_remaining, 3);
        assert!(status.allows_orders());
    }

    #[test]
    fn expiry_beyond_warning_window_is_active() {
        let status =
            SubscriptionStatus::evaluate(None, Some(now() + Duration::days(40)), now(), 7);
        assert_eq!(status.state, SubscriptionState::Active);
        assert_eq!(status.days_remaining, 40);
    }

    #[test]
    fn renewal_extends_from_future_expiry() {
        let current = now() + Duration::days(10);
        assert_eq!(
            extended_expiry(Some(current), now(), 2, 30),
            current + Duration::days(60)
        );
    }

    #[test]
    fn renewal_after_lapse_extends_from_now() {
        let lapsed = now() - Duration::days(5);
        assert_eq!(
            extended_expiry(Some(lapsed), now(), 1, 30),
            now() + Duration::days(30)
        );
        assert_eq!(extended_expiry(None, now(), 1, 30), now() + Duration::days(30));
    }
}
