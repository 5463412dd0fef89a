use anyhow::Result;
use std::io::Read;

use crate::application::{parse_day, DeliveryService};
use crate::domain::BillDraft;

/// Result of an import operation
#[derive(Debug, Clone)]
pub struct ImportResult {
    pub imported: usize,
    pub skipped: usize,
    pub errors: Vec<ImportError>,
}

/// Error that occurred during import
#[derive(Debug, Clone)]
pub struct ImportError {
    pub line: usize,
    pub field: Option<String>,
    pub error: String,
}

/// Options for import operations
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    pub dry_run: bool,
}

/// Importer for loading day entries and bill batches
pub struct Importer<'a> {
    service: &'a DeliveryService,
}

impl<'a> Importer<'a> {
    pub fn new(service: &'a DeliveryService) -> Self {
        Self { service }
    }

    /// Import day entries from CSV with columns
    /// `customer,date,delivered,collected,notes`.
    ///
    /// Rows are recorded one at a time in file order; a bad row is reported
    /// and does not stop the rest.
    pub async fn import_entries_csv<R: Read>(
        &self,
        reader: R,
        options: ImportOptions,
    ) -> Result<ImportResult> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut imported = 0;
        let mut skipped = 0;
        let mut errors = Vec::new();

        for (line_num, result) in csv_reader.records().enumerate() {
            let line = line_num + 2; // header + 1-based

            let record = match result {
                Ok(r) => r,
                Err(e) => {
                    errors.push(ImportError {
                        line,
                        field: None,
                        error: format!("CSV parse error: {}", e),
                    });
                    continue;
                }
            };

            let customer = record.get(0).unwrap_or("").trim();
            if customer.is_empty() {
                errors.push(ImportError {
                    line,
                    field: Some("customer".to_string()),
                    error: "missing customer".to_string(),
                });
                continue;
            }

            let date = match parse_day(record.get(1).unwrap_or("")) {
                Ok(d) => d,
                Err(e) => {
                    errors.push(ImportError {
                        line,
                        field: Some("date".to_string()),
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            let delivered = match parse_qty(record.get(2)) {
                Ok(q) => q,
                Err(e) => {
                    errors.push(ImportError {
                        line,
                        field: Some("delivered".to_string()),
                        error: e,
                    });
                    continue;
                }
            };
            let collected = match parse_qty(record.get(3)) {
                Ok(q) => q,
                Err(e) => {
                    errors.push(ImportError {
                        line,
                        field: Some("collected".to_string()),
                        error: e,
                    });
                    continue;
                }
            };
            let notes = record
                .get(4)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string);

            if options.dry_run {
                skipped += 1;
                continue;
            }

            match self
                .service
                .record_day(customer, date, delivered, collected, notes)
                .await
            {
                Ok(_) => imported += 1,
                Err(e) => errors.push(ImportError {
                    line,
                    field: None,
                    error: e.to_string(),
                }),
            }
        }

        Ok(ImportResult {
            imported,
            skipped,
            errors,
        })
    }

    /// Import a JSON array of bill drafts. The batch is saved all or nothing.
    pub async fn import_bills_json<R: Read>(
        &self,
        reader: R,
        options: ImportOptions,
    ) -> Result<ImportResult> {
        let drafts: Vec<BillDraft> = serde_json::from_reader(reader)?;

        if options.dry_run {
            let errors = drafts
                .iter()
                .enumerate()
                .filter_map(|(idx, draft)| {
                    draft.validate().err().map(|e| ImportError {
                        line: idx + 1,
                        field: None,
                        error: e.to_string(),
                    })
                })
                .collect();
            return Ok(ImportResult {
                imported: 0,
                skipped: drafts.len(),
                errors,
            });
        }

        let imported = self.service.save_monthly_bills(&drafts).await?;
        Ok(ImportResult {
            imported,
            skipped: 0,
            errors: Vec::new(),
        })
    }
}

fn parse_qty(value: Option<&str>) -> std::result::Result<i64, String> {
    let value = value.unwrap_or("").trim();
    if value.is_empty() {
        return Ok(0);
    }
    value
        .parse::<i64>()
        .map_err(|_| format!("invalid quantity '{}'", value))
}
