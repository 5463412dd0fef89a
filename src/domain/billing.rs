use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{amount_for, Cents, CustomerId, LedgerEntry};

/// A calendar month, written `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BillMonth {
    year: i32,
    month: u32,
}

impl BillMonth {
    /// Years are limited to four digits, as in the `YYYY-MM` form.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if !(0..=9999).contains(&year) {
            return None;
        }
        NaiveDate::from_ymd_opt(year, month, 1)?;
        Some(Self { year, month })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// First day of the month.
    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).expect("validated on construction")
    }

    /// First day of the following month (exclusive end of this one).
    pub fn next_first_day(&self) -> NaiveDate {
        let (year, month) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        NaiveDate::from_ymd_opt(year, month, 1).expect("month after a valid month")
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    pub fn as_string(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for BillMonth {
    type Err = ParseMonthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (year, month) = s.split_once('-').ok_or(ParseMonthError)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(ParseMonthError);
        }
        let year: i32 = year.parse().map_err(|_| ParseMonthError)?;
        let month: u32 = month.parse().map_err(|_| ParseMonthError)?;
        BillMonth::new(year, month).ok_or(ParseMonthError)
    }
}

impl std::fmt::Display for BillMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for BillMonth {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.as_string())
    }
}

impl<'de> Deserialize<'de> for BillMonth {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseMonthError;

impl std::fmt::Display for ParseMonthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid month, expected YYYY-MM")
    }
}

impl std::error::Error for ParseMonthError {}

/// Delivered totals for one customer over one month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MonthTotals {
    pub total_cans_delivered: i64,
    pub total_delivery_days: i64,
}

/// Sum deliveries per customer over the entries that fall in `month`.
///
/// A delivery day is a distinct date with `delivered_qty > 0`. Entries outside
/// the month are ignored, so the caller may pass a wider slice.
/// Returns `None` if a customer's total overflows.
pub fn aggregate_month(
    month: BillMonth,
    entries: &[LedgerEntry],
) -> Option<BTreeMap<CustomerId, MonthTotals>> {
    let mut cans: BTreeMap<CustomerId, i64> = BTreeMap::new();
    let mut days: HashMap<CustomerId, BTreeSet<NaiveDate>> = HashMap::new();

    for entry in entries.iter().filter(|e| month.contains(e.date)) {
        let total = cans.entry(entry.customer_id).or_insert(0);
        *total = total.checked_add(entry.delivered_qty)?;
        if entry.delivered_qty > 0 {
            days.entry(entry.customer_id).or_default().insert(entry.date);
        }
    }

    let totals = cans
        .into_iter()
        .map(|(customer_id, total)| {
            let delivery_days = days.get(&customer_id).map_or(0, |d| d.len() as i64);
            (
                customer_id,
                MonthTotals {
                    total_cans_delivered: total,
                    total_delivery_days: delivery_days,
                },
            )
        })
        .collect();
    Some(totals)
}

/// A saved monthly bill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyBill {
    pub customer_id: CustomerId,
    pub bill_month: BillMonth,
    pub total_cans_delivered: i64,
    pub total_delivery_days: i64,
    pub unit_price_cents: Cents,
    pub bill_amount_cents: Cents,
    pub paid: bool,
    pub sent: bool,
    pub updated_at: DateTime<Utc>,
}

impl MonthlyBill {
    /// Build a bill from computed totals. Returns `None` if the amount overflows.
    pub fn from_totals(
        customer_id: CustomerId,
        bill_month: BillMonth,
        totals: MonthTotals,
        unit_price_cents: Cents,
    ) -> Option<Self> {
        Some(Self {
            customer_id,
            bill_month,
            total_cans_delivered: totals.total_cans_delivered,
            total_delivery_days: totals.total_delivery_days,
            unit_price_cents,
            bill_amount_cents: amount_for(totals.total_cans_delivered, unit_price_cents)?,
            paid: false,
            sent: false,
            updated_at: Utc::now(),
        })
    }
}

/// A bill submitted for saving, before validation.
///
/// Every field is optional on the wire; `validate` reports the first one missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BillDraft {
    pub customer: Option<String>,
    pub bill_month: Option<String>,
    pub total_cans_delivered: Option<i64>,
    pub total_delivery_days: Option<i64>,
    pub unit_price: Option<Cents>,
    pub bill_amount: Option<Cents>,
    #[serde(default)]
    pub paid: bool,
    #[serde(default)]
    pub sent: bool,
}

/// A draft whose required fields are all present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckedDraft {
    pub customer: String,
    pub bill_month: BillMonth,
    pub total_cans_delivered: i64,
    pub total_delivery_days: i64,
    pub unit_price: Option<Cents>,
    pub bill_amount: Cents,
    pub paid: bool,
    pub sent: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftError {
    MissingField(&'static str),
    InvalidMonth(String),
    Negative(&'static str),
}

impl std::fmt::Display for DraftError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DraftError::MissingField(field) => write!(f, "missing required field '{}'", field),
            DraftError::InvalidMonth(value) => write!(f, "invalid bill month '{}'", value),
            DraftError::Negative(field) => write!(f, "'{}' cannot be negative", field),
        }
    }
}

impl std::error::Error for DraftError {}

impl BillDraft {
    pub fn validate(&self) -> Result<CheckedDraft, DraftError> {
        let customer = self
            .customer
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or(DraftError::MissingField("customer"))?;
        let month_str = self
            .bill_month
            .as_deref()
            .ok_or(DraftError::MissingField("bill_month"))?;
        let bill_month = month_str
            .parse::<BillMonth>()
            .map_err(|_| DraftError::InvalidMonth(month_str.to_string()))?;
        let total_cans_delivered = self
            .total_cans_delivered
            .ok_or(DraftError::MissingField("total_cans_delivered"))?;
        let total_delivery_days = self
            .total_delivery_days
            .ok_or(DraftError::MissingField("total_delivery_days"))?;
        let bill_amount = self
            .bill_amount
            .ok_or(DraftError::MissingField("bill_amount"))?;

        if total_cans_delivered < 0 {
            return Err(DraftError::Negative("total_cans_delivered"));
        }
        if total_delivery_days < 0 {
            return Err(DraftError::Negative("total_delivery_days"));
        }
        if bill_amount < 0 {
            return Err(DraftError::Negative("bill_amount"));
        }

        Ok(CheckedDraft {
            customer: customer.to_string(),
            bill_month,
            total_cans_delivered,
            total_delivery_days,
            unit_price: self.unit_price,
            bill_amount,
            paid: self.paid,
            sent: self.sent,
        })
    }
}
