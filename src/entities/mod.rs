pub mod delivery_assignment;
pub mod driver;
pub mod driver_earnings;
pub mod order;
pub mod order_item;
pub mod order_status_history;
pub mod payment_approval;
pub mod store;
