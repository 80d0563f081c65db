// Order lifecycle
pub mod orders;

// Tenants, drivers and billing
pub mod stores;
pub mod subscriptions;

// Driver payouts
pub mod earnings;

use crate::errors::ServiceError;

/// Largest number of rows a list endpoint returns per page.
pub const MAX_PAGE_SIZE: u64 = 100;

/// Clamps list paging to sane bounds. Pages are 1-based and the row offset
/// they imply must fit a signed 64-bit SQL `OFFSET`.
pub(crate) fn page_bounds(page: u64, limit: u64) -> Result<(u64, u64), ServiceError> {
    let page = page.max(1);
    let limit = limit.clamp(1, MAX_PAGE_SIZE);
    (page - 1)
        .checked_mul(limit)
        .filter(|offset| i64::try_from(*offset).is_ok())
        .ok_or_else(|| ServiceError::InvalidInput(format!("page {} is out of range", page)))?;
    Ok((page, limit))
}
