use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{BillMonth, Cents, Customer, CustomerType, LedgerEntry, MonthlyBill};

/// Outcome of recording a day's delivery/collection.
#[derive(Debug, Clone, Serialize)]
pub struct RecordResult {
    pub customer_name: String,
    pub entry: LedgerEntry,
    /// Holding carried in from the previous entry
    pub previous_holding: i64,
    /// False when an existing entry for the day was overwritten
    pub created: bool,
    /// Later entries whose holding was recomputed
    pub rechained: usize,
}

/// One line of the daily entry screen.
#[derive(Debug, Clone, Serialize)]
pub struct DaySheetRow {
    pub customer: Customer,
    pub previous_holding: i64,
    pub entry: Option<LedgerEntry>,
}

/// A customer with cans to pick up on the reference date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionCandidate {
    pub customer_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub holding: i64,
    /// Date of the entry the holding comes from (reference date - 1)
    pub as_of: NaiveDate,
}

#[derive(Debug, Clone, Serialize)]
pub struct HoldingRow {
    pub customer_name: String,
    pub customer_type: CustomerType,
    pub holding: i64,
    pub last_entry_date: Option<NaiveDate>,
}

/// Computed bill for one customer, merged with the saved paid/sent flags.
#[derive(Debug, Clone, Serialize)]
pub struct MonthlySummaryRow {
    pub customer_name: String,
    pub customer_type: CustomerType,
    pub bill: MonthlyBill,
    /// Whether a bill for this (customer, month) has been saved before
    pub saved: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthlySummary {
    pub month: BillMonth,
    pub rows: Vec<MonthlySummaryRow>,
    pub total_cans: i64,
    pub total_amount: Cents,
}

/// A saved bill with the customer's name attached.
#[derive(Debug, Clone, Serialize)]
pub struct BillView {
    pub customer_name: String,
    pub bill: MonthlyBill,
}

/// A customer's entries within one month.
#[derive(Debug, Clone, Serialize)]
pub struct CustomerLedger {
    pub customer: Customer,
    pub month: BillMonth,
    pub opening_holding: i64,
    pub entries: Vec<LedgerEntry>,
    pub total_delivered: i64,
    pub total_collected: i64,
    pub closing_holding: i64,
}

impl CustomerLedger {
    pub fn new(
        customer: Customer,
        month: BillMonth,
        opening_holding: i64,
        entries: Vec<LedgerEntry>,
    ) -> Self {
        let total_delivered = entries.iter().map(|e| e.delivered_qty).sum();
        let total_collected = entries.iter().map(|e| e.collected_qty).sum();
        let closing_holding = entries
            .last()
            .map_or(opening_holding, |e| e.holding_status);
        Self {
            customer,
            month,
            opening_holding,
            entries,
            total_delivered,
            total_collected,
            closing_holding,
        }
    }
}
