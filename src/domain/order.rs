use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type OrderId = Uuid;

/// Lifecycle of a one-off order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Delivered,
    Collected,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Collected => "collected",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(OrderStatus::Pending),
            "delivered" => Some(OrderStatus::Delivered),
            "collected" => Some(OrderStatus::Collected),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A non-recurring delivery request, tracked outside the daily ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub can_qty: i64,
    pub delivery_date: NaiveDate,
    pub status: OrderStatus,
    pub collected_qty: i64,
    pub collection_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn new(customer_name: String, can_qty: i64, delivery_date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            customer_name,
            phone: None,
            address: None,
            can_qty,
            delivery_date,
            status: OrderStatus::Pending,
            collected_qty: 0,
            collection_date: None,
            notes: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_phone(mut self, phone: Option<String>) -> Self {
        self.phone = phone;
        self
    }

    pub fn with_address(mut self, address: Option<String>) -> Self {
        self.address = address;
        self
    }

    pub fn with_notes(mut self, notes: Option<String>) -> Self {
        self.notes = notes;
        self
    }

    /// Cans delivered on this order that are still out.
    pub fn outstanding(&self) -> i64 {
        match self.status {
            OrderStatus::Pending => 0,
            _ => self.can_qty - self.collected_qty,
        }
    }

    pub fn mark_delivered(&mut self) -> Result<(), OrderError> {
        match self.status {
            OrderStatus::Pending => {
                self.status = OrderStatus::Delivered;
                Ok(())
            }
            other => Err(OrderError::InvalidTransition {
                from: other,
                to: OrderStatus::Delivered,
            }),
        }
    }

    /// Record cans picked back up. The order must have been delivered first.
    pub fn collect(&mut self, collected_qty: i64, date: NaiveDate) -> Result<(), OrderError> {
        if self.status == OrderStatus::Pending {
            return Err(OrderError::InvalidTransition {
                from: self.status,
                to: OrderStatus::Collected,
            });
        }
        if collected_qty < 0 || collected_qty > self.can_qty {
            return Err(OrderError::CollectedExceedsDelivered {
                delivered: self.can_qty,
                collected: collected_qty,
            });
        }
        if date < self.delivery_date {
            return Err(OrderError::CollectionBeforeDelivery {
                delivery_date: self.delivery_date,
                collection_date: date,
            });
        }

        self.collected_qty = collected_qty;
        self.collection_date = Some(date);
        self.status = OrderStatus::Collected;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    InvalidTransition {
        from: OrderStatus,
        to: OrderStatus,
    },
    CollectedExceedsDelivered {
        delivered: i64,
        collected: i64,
    },
    CollectionBeforeDelivery {
        delivery_date: NaiveDate,
        collection_date: NaiveDate,
    },
}

impl std::fmt::Display for OrderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderError::InvalidTransition { from, to } => {
                write!(f, "order cannot move from {} to {}", from, to)
            }
            OrderError::CollectedExceedsDelivered {
                delivered,
                collected,
            } => write!(
                f,
                "collected quantity {} must be between 0 and the {} cans delivered",
                collected, delivered
            ),
            OrderError::CollectionBeforeDelivery {
                delivery_date,
                collection_date,
            } => write!(
                f,
                "collection date {} is before delivery date {}",
                collection_date, delivery_date
            ),
        }
    }
}

impl std::error::Error for OrderError {}
