use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Cents, CustomerType};

pub type PriceSettingsId = Uuid;

/// Per-can prices for each customer type.
///
/// Prices are append-only: changing them deactivates the current row and
/// inserts a new one, so exactly one row is active at any time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceSettings {
    pub id: PriceSettingsId,
    pub shop_price: Cents,
    pub monthly_price: Cents,
    pub order_price: Cents,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl PriceSettings {
    pub fn new(shop_price: Cents, monthly_price: Cents, order_price: Cents) -> Self {
        Self {
            id: Uuid::new_v4(),
            shop_price,
            monthly_price,
            order_price,
            active: true,
            created_at: Utc::now(),
        }
    }

    /// Unit price billed to a customer of the given type.
    pub fn price_for(&self, customer_type: CustomerType) -> Cents {
        match customer_type {
            CustomerType::Shop => self.shop_price,
            CustomerType::Monthly => self.monthly_price,
            CustomerType::Order => self.order_price,
        }
    }

    /// First negative price, if any.
    pub fn first_negative(&self) -> Option<(CustomerType, Cents)> {
        [
            (CustomerType::Shop, self.shop_price),
            (CustomerType::Monthly, self.monthly_price),
            (CustomerType::Order, self.order_price),
        ]
        .into_iter()
        .find(|(_, price)| *price < 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_for_each_type() {
        let prices = PriceSettings::new(2000, 2500, 3000);
        assert_eq!(prices.price_for(CustomerType::Shop), 2000);
        assert_eq!(prices.price_for(CustomerType::Monthly), 2500);
        assert_eq!(prices.price_for(CustomerType::Order), 3000);
        assert!(prices.active);
    }

    #[test]
    fn test_first_negative() {
        assert_eq!(PriceSettings::new(1, 2, 3).first_negative(), None);
        assert_eq!(
            PriceSettings::new(1, -2, -3).first_negative(),
            Some((CustomerType::Monthly, -2))
        );
    }
}
