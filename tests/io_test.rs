mod common;

use anyhow::Result;
use canledger::domain::BillMonth;
use canledger::io::{Exporter, ImportOptions, Importer};
use common::{date, test_service, StandardRoute};

#[tokio::test]
async fn test_import_entries_csv() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardRoute::create_customers(&service).await?;

    let csv = "\
customer,date,delivered,collected,notes
Hotel Sagar,2024-03-01,10,0,
Hotel Sagar,2024-03-02,5,8,late
Nobody,2024-03-02,1,0,
Mehta House,03/02/2024,1,0,
Mehta House,2024-03-02,x,0,
Mehta House,2024-03-02,4,,
";
    let importer = Importer::new(&service);
    let result = importer
        .import_entries_csv(csv.as_bytes(), ImportOptions::default())
        .await?;

    assert_eq!(result.imported, 3);
    assert_eq!(result.errors.len(), 3);
    assert_eq!(result.errors[0].line, 4);
    assert_eq!(result.errors[1].field.as_deref(), Some("date"));
    assert_eq!(result.errors[2].field.as_deref(), Some("delivered"));

    let holdings = service.holding_summary(date("2024-03-02")).await?;
    let hotel = holdings
        .iter()
        .find(|h| h.customer_name == "Hotel Sagar")
        .unwrap();
    assert_eq!(hotel.holding, 7);

    Ok(())
}

#[tokio::test]
async fn test_import_entries_dry_run() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardRoute::create_customers(&service).await?;

    let csv = "customer,date,delivered,collected,notes\nHotel Sagar,2024-03-01,10,0,\n";
    let result = Importer::new(&service)
        .import_entries_csv(csv.as_bytes(), ImportOptions { dry_run: true })
        .await?;
    assert_eq!(result.imported, 0);
    assert_eq!(result.skipped, 1);

    let sheet = service.day_sheet(date("2024-03-01")).await?;
    assert!(sheet.iter().all(|row| row.entry.is_none()));

    Ok(())
}

#[tokio::test]
async fn test_import_bills_json() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardRoute::create_with_prices(&service).await?;

    let json = r#"[
        {"customer": "Hotel Sagar", "bill_month": "2024-03", "total_cans_delivered": 15,
         "total_delivery_days": 2, "bill_amount": 30000, "paid": true},
        {"customer": "Mehta House", "bill_month": "2024-03", "total_cans_delivered": 4,
         "total_delivery_days": 1, "unit_price": 2500, "bill_amount": 10000}
    ]"#;

    let importer = Importer::new(&service);
    let checked = importer
        .import_bills_json(json.as_bytes(), ImportOptions { dry_run: true })
        .await?;
    assert_eq!(checked.skipped, 2);
    assert!(checked.errors.is_empty());
    assert!(service
        .list_bills(BillMonth::new(2024, 3).unwrap())
        .await?
        .is_empty());

    let result = importer
        .import_bills_json(json.as_bytes(), ImportOptions::default())
        .await?;
    assert_eq!(result.imported, 2);

    let bills = service.list_bills(BillMonth::new(2024, 3).unwrap()).await?;
    assert_eq!(bills.len(), 2);
    assert!(bills[0].bill.paid);
    assert!(!bills[1].bill.paid);

    Ok(())
}

#[tokio::test]
async fn test_export_bills() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardRoute::create_with_prices(&service).await?;
    service
        .record_day("Hotel Sagar", date("2024-03-01"), 10, 0, None)
        .await?;
    service
        .record_day("Hotel Sagar", date("2024-03-02"), 5, 8, None)
        .await?;

    let exporter = Exporter::new(&service);
    let month = BillMonth::new(2024, 3).unwrap();

    let mut csv = Vec::new();
    let count = exporter.export_bills_csv(month, &mut csv).await?;
    assert_eq!(count, 1);
    let csv = String::from_utf8(csv)?;
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("customer,type,month"));
    assert_eq!(lines[1], "Hotel Sagar,shop,2024-03,15,2,20.00,300.00,false,false");

    let mut json = Vec::new();
    let statement = exporter.export_bills_json(month, &mut json).await?;
    assert_eq!(statement.total_amount_cents, 30000);
    let value: serde_json::Value = serde_json::from_slice(&json)?;
    assert_eq!(value["month"], "2024-03");
    assert_eq!(value["bills"][0]["bill"]["total_cans_delivered"], 15);

    let mut ledger = Vec::new();
    let rows = exporter
        .export_ledger_csv("Hotel Sagar", month, &mut ledger)
        .await?;
    assert_eq!(rows, 2);
    let ledger = String::from_utf8(ledger)?;
    assert!(ledger.contains("2024-03-02,5,8,7,"));

    Ok(())
}
