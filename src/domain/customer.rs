use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Cents;

pub type CustomerId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomerType {
    /// Shops and businesses on a daily route
    Shop,
    /// Households billed once a month
    Monthly,
    /// Occasional customers who order on demand
    Order,
}

impl CustomerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerType::Shop => "shop",
            CustomerType::Monthly => "monthly",
            CustomerType::Order => "order",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "shop" => Some(CustomerType::Shop),
            "monthly" => Some(CustomerType::Monthly),
            "order" => Some(CustomerType::Order),
            _ => None,
        }
    }
}

impl std::fmt::Display for CustomerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub customer_type: CustomerType,
    /// Baseline number of cans dropped on a regular delivery
    pub can_qty: i64,
    /// Money paid up front, if any
    pub advance_cents: Option<Cents>,
    pub created_at: DateTime<Utc>,
    pub deactivated_at: Option<DateTime<Utc>>,
}

impl Customer {
    pub fn new(name: String, customer_type: CustomerType, can_qty: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            phone: None,
            address: None,
            customer_type,
            can_qty,
            advance_cents: None,
            created_at: Utc::now(),
            deactivated_at: None,
        }
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn with_advance(mut self, advance_cents: Cents) -> Self {
        self.advance_cents = Some(advance_cents);
        self
    }

    pub fn is_active(&self) -> bool {
        self.deactivated_at.is_none()
    }

    /// Apply a partial edit. Fields left as `None` are untouched.
    pub fn apply(&mut self, patch: CustomerPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(phone) = patch.phone {
            self.phone = Some(phone);
        }
        if let Some(address) = patch.address {
            self.address = Some(address);
        }
        if let Some(customer_type) = patch.customer_type {
            self.customer_type = customer_type;
        }
        if let Some(can_qty) = patch.can_qty {
            self.can_qty = can_qty;
        }
        if let Some(advance) = patch.advance_cents {
            self.advance_cents = Some(advance);
        }
    }
}

/// Edit submitted for an existing customer.
#[derive(Debug, Clone, Default)]
pub struct CustomerPatch {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub customer_type: Option<CustomerType>,
    pub can_qty: Option<i64>,
    pub advance_cents: Option<Cents>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_customer_type_parsing() {
        assert_eq!(CustomerType::from_str("Shop"), Some(CustomerType::Shop));
        assert_eq!(
            CustomerType::from_str(" monthly "),
            Some(CustomerType::Monthly)
        );
        assert_eq!(CustomerType::from_str("order"), Some(CustomerType::Order));
        assert_eq!(CustomerType::from_str("weekly"), None);
    }

    #[test]
    fn test_apply_patch_keeps_untouched_fields() {
        let mut customer = Customer::new("Hotel Sagar".into(), CustomerType::Shop, 4)
            .with_phone("555-0101")
            .with_advance(50000);

        customer.apply(CustomerPatch {
            can_qty: Some(6),
            address: Some("Main Road 12".into()),
            ..Default::default()
        });

        assert_eq!(customer.can_qty, 6);
        assert_eq!(customer.address.as_deref(), Some("Main Road 12"));
        assert_eq!(customer.phone.as_deref(), Some("555-0101"));
        assert_eq!(customer.advance_cents, Some(50000));
        assert_eq!(customer.customer_type, CustomerType::Shop);
    }
}
