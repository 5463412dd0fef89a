use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::{BillMonth, HoldingError, OrderError};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Invalid month '{0}', expected YYYY-MM")]
    InvalidMonth(String),

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    #[error("Customer already exists: {0}")]
    CustomerAlreadyExists(String),

    #[error("Customer is inactive: {0}")]
    CustomerInactive(String),

    #[error(
        "Cannot collect {requested} cans from {customer} on {date}: only {available} with the customer"
    )]
    CollectionExceedsHolding {
        customer: String,
        date: NaiveDate,
        available: i64,
        requested: i64,
    },

    #[error("Holding for {customer} on {date} would become {holding}")]
    HoldingWouldGoNegative {
        customer: String,
        date: NaiveDate,
        holding: i64,
    },

    #[error("No prices configured; set prices before billing")]
    PricesNotConfigured,

    #[error("Bill not found for {customer} in {month}")]
    BillNotFound { customer: String, month: BillMonth },

    #[error("Bill #{index} rejected: {reason}")]
    InvalidBill { index: usize, reason: String },

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Invalid order operation: {0}")]
    InvalidOrderState(#[from] OrderError),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}

impl AppError {
    /// Map a holding-arithmetic failure for a customer and day.
    pub fn from_holding(customer: &str, date: NaiveDate, err: HoldingError) -> Self {
        match err {
            HoldingError::NegativeQuantity { .. } | HoldingError::Overflow => {
                AppError::InvalidQuantity(err.to_string())
            }
            HoldingError::CollectionExceedsHolding {
                available,
                requested,
            } => AppError::CollectionExceedsHolding {
                customer: customer.to_string(),
                date,
                available,
                requested,
            },
            HoldingError::WouldGoNegative { date, holding } => AppError::HoldingWouldGoNegative {
                customer: customer.to_string(),
                date,
                holding,
            },
        }
    }

    /// True for failures caused by the request itself rather than the system.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, AppError::Database(_))
    }
}
