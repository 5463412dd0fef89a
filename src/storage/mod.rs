mod repository;

pub use repository::*;

/// SQL migration for customers and the daily ledger
pub const MIGRATION_001_INITIAL: &str = include_str!("migrations/001_initial.sql");

/// SQL migration for prices and monthly bills
pub const MIGRATION_002_BILLING: &str = include_str!("migrations/002_billing.sql");

/// SQL migration for one-off orders
pub const MIGRATION_003_ORDERS: &str = include_str!("migrations/003_orders.sql");
