use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::CustomerId;

pub type EntryId = Uuid;

/// One customer's deliveries and collections for one day.
/// There is at most one entry per (customer, date).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: EntryId,
    pub customer_id: CustomerId,
    pub date: NaiveDate,
    pub delivered_qty: i64,
    pub collected_qty: i64,
    /// Cans with the customer at the end of the day
    pub holding_status: i64,
    pub notes: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn new(
        customer_id: CustomerId,
        date: NaiveDate,
        delivered_qty: i64,
        collected_qty: i64,
        holding_status: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            customer_id,
            date,
            delivered_qty,
            collected_qty,
            holding_status,
            notes: None,
            updated_at: Utc::now(),
        }
    }

    pub fn with_notes(mut self, notes: Option<String>) -> Self {
        self.notes = notes;
        self
    }
}

/// Compute the end-of-day holding from the previous holding and the day's movements.
///
/// Cans cannot be collected beyond what the customer has on hand that day.
pub fn next_holding(previous: i64, delivered: i64, collected: i64) -> Result<i64, HoldingError> {
    if delivered < 0 {
        return Err(HoldingError::NegativeQuantity {
            field: "delivered",
            value: delivered,
        });
    }
    if collected < 0 {
        return Err(HoldingError::NegativeQuantity {
            field: "collected",
            value: collected,
        });
    }

    let available = previous
        .checked_add(delivered)
        .ok_or(HoldingError::Overflow)?;
    if collected > available {
        return Err(HoldingError::CollectionExceedsHolding {
            available,
            requested: collected,
        });
    }

    Ok(available - collected)
}

/// Recompute the holding chain for entries that follow a changed day.
///
/// `entries` must be sorted by date. Returns the indices whose holding changed.
pub fn rechain(start_holding: i64, entries: &mut [LedgerEntry]) -> Result<Vec<usize>, HoldingError> {
    let mut holding = start_holding;
    let mut changed = Vec::new();

    for (idx, entry) in entries.iter_mut().enumerate() {
        let next = holding
            .checked_add(entry.delivered_qty)
            .and_then(|h| h.checked_sub(entry.collected_qty))
            .ok_or(HoldingError::Overflow)?;
        if next < 0 {
            return Err(HoldingError::WouldGoNegative {
                date: entry.date,
                holding: next,
            });
        }
        if next != entry.holding_status {
            entry.holding_status = next;
            changed.push(idx);
        }
        holding = next;
    }

    Ok(changed)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HoldingError {
    NegativeQuantity {
        field: &'static str,
        value: i64,
    },
    CollectionExceedsHolding {
        available: i64,
        requested: i64,
    },
    /// A later day would end with fewer than zero cans
    WouldGoNegative {
        date: NaiveDate,
        holding: i64,
    },
    Overflow,
}

impl std::fmt::Display for HoldingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HoldingError::NegativeQuantity { field, value } => {
                write!(f, "{} quantity cannot be negative (got {})", field, value)
            }
            HoldingError::CollectionExceedsHolding {
                available,
                requested,
            } => write!(
                f,
                "cannot collect {} cans, only {} with the customer",
                requested, available
            ),
            HoldingError::WouldGoNegative { date, holding } => write!(
                f,
                "holding on {} would become {}",
                date.format("%Y-%m-%d"),
                holding
            ),
            HoldingError::Overflow => write!(f, "can count is too large"),
        }
    }
}

impl std::error::Error for HoldingError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn entry(d: u32, delivered: i64, collected: i64, holding: i64) -> LedgerEntry {
        LedgerEntry::new(Uuid::nil(), day(d), delivered, collected, holding)
    }

    #[test]
    fn test_first_delivery_starts_from_zero() {
        assert_eq!(next_holding(0, 10, 0), Ok(10));
    }

    #[test]
    fn test_delivery_and_collection_carry_forward() {
        assert_eq!(next_holding(10, 5, 8), Ok(7));
    }

    #[test]
    fn test_collect_everything() {
        assert_eq!(next_holding(4, 0, 4), Ok(0));
    }

    #[test]
    fn test_collection_beyond_holding_rejected() {
        assert_eq!(
            next_holding(3, 2, 6),
            Err(HoldingError::CollectionExceedsHolding {
                available: 5,
                requested: 6
            })
        );
    }

    #[test]
    fn test_negative_quantities_rejected() {
        assert!(matches!(
            next_holding(0, -1, 0),
            Err(HoldingError::NegativeQuantity {
                field: "delivered",
                ..
            })
        ));
        assert!(matches!(
            next_holding(5, 0, -2),
            Err(HoldingError::NegativeQuantity {
                field: "collected",
                ..
            })
        ));
    }

    #[test]
    fn test_rechain_updates_following_days() {
        // Originally started from 10; day 1 was edited so day 2 now opens with 12
        let mut later = vec![entry(2, 5, 8, 7), entry(3, 0, 7, 0)];
        let changed = rechain(12, &mut later).unwrap();

        assert_eq!(changed, vec![0, 1]);
        assert_eq!(later[0].holding_status, 9);
        assert_eq!(later[1].holding_status, 2);
    }

    #[test]
    fn test_rechain_no_change() {
        let mut later = vec![entry(2, 5, 8, 7)];
        assert!(rechain(10, &mut later).unwrap().is_empty());
    }

    #[test]
    fn test_rechain_rejects_negative() {
        let mut later = vec![entry(2, 0, 6, 4), entry(3, 0, 4, 0)];
        assert_eq!(
            rechain(5, &mut later),
            Err(HoldingError::WouldGoNegative {
                date: day(2),
                holding: -1
            })
        );
    }

    #[test]
    fn test_overflowing_counts_rejected() {
        assert_eq!(next_holding(1, i64::MAX, 0), Err(HoldingError::Overflow));
        assert_eq!(next_holding(0, i64::MAX, 0), Ok(i64::MAX));

        let mut later = vec![entry(2, i64::MAX, 0, 0)];
        assert_eq!(rechain(1, &mut later), Err(HoldingError::Overflow));
    }
}
