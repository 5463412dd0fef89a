use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;

use crate::application::{DeliveryService, MonthlySummaryRow};
use crate::domain::{format_cents, BillMonth, Cents};

/// Receipt data for a month, as written by the JSON export.
#[derive(Debug, Clone, Serialize)]
pub struct BillStatement {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub month: BillMonth,
    pub bills: Vec<MonthlySummaryRow>,
    pub total_cans: i64,
    pub total_amount_cents: Cents,
}

/// Exporter for bills and ledgers
pub struct Exporter<'a> {
    service: &'a DeliveryService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a DeliveryService) -> Self {
        Self { service }
    }

    /// Export the month's bills to CSV, one row per customer.
    pub async fn export_bills_csv<W: Write>(&self, month: BillMonth, writer: W) -> Result<usize> {
        let summary = self.service.monthly_summary(month).await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "customer",
            "type",
            "month",
            "cans_delivered",
            "delivery_days",
            "unit_price",
            "amount",
            "paid",
            "sent",
        ])?;

        for row in &summary.rows {
            csv_writer.write_record([
                row.customer_name.clone(),
                row.customer_type.as_str().to_string(),
                row.bill.bill_month.to_string(),
                row.bill.total_cans_delivered.to_string(),
                row.bill.total_delivery_days.to_string(),
                format_cents(row.bill.unit_price_cents),
                format_cents(row.bill.bill_amount_cents),
                row.bill.paid.to_string(),
                row.bill.sent.to_string(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(summary.rows.len())
    }

    /// Export the month's bills as a JSON statement.
    pub async fn export_bills_json<W: Write>(
        &self,
        month: BillMonth,
        mut writer: W,
    ) -> Result<BillStatement> {
        let summary = self.service.monthly_summary(month).await?;

        let statement = BillStatement {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            month,
            bills: summary.rows,
            total_cans: summary.total_cans,
            total_amount_cents: summary.total_amount,
        };

        serde_json::to_writer_pretty(&mut writer, &statement)?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        Ok(statement)
    }

    /// Export one customer's ledger for a month to CSV.
    pub async fn export_ledger_csv<W: Write>(
        &self,
        customer: &str,
        month: BillMonth,
        writer: W,
    ) -> Result<usize> {
        let ledger = self.service.customer_ledger(customer, month).await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["date", "delivered", "collected", "holding", "notes"])?;
        for entry in &ledger.entries {
            csv_writer.write_record([
                entry.date.format("%Y-%m-%d").to_string(),
                entry.delivered_qty.to_string(),
                entry.collected_qty.to_string(),
                entry.holding_status.to_string(),
                entry.notes.clone().unwrap_or_default(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(ledger.entries.len())
    }
}
