mod common;

use anyhow::Result;
use canledger::application::AppError;
use canledger::domain::BillMonth;
use common::{date, test_service, StandardRoute};

#[tokio::test]
async fn test_holding_carries_forward() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardRoute::create_customers(&service).await?;

    let first = service
        .record_day("Hotel Sagar", date("2024-03-01"), 10, 0, None)
        .await?;
    assert!(first.created);
    assert_eq!(first.previous_holding, 0);
    assert_eq!(first.entry.holding_status, 10);

    let second = service
        .record_day("Hotel Sagar", date("2024-03-02"), 5, 8, Some("short one".into()))
        .await?;
    assert_eq!(second.previous_holding, 10);
    assert_eq!(second.entry.holding_status, 7);
    assert_eq!(second.entry.notes.as_deref(), Some("short one"));

    Ok(())
}

#[tokio::test]
async fn test_rerecording_a_day_overwrites_the_entry() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardRoute::create_customers(&service).await?;

    service
        .record_day("Hotel Sagar", date("2024-03-01"), 10, 0, None)
        .await?;
    let again = service
        .record_day("Hotel Sagar", date("2024-03-01"), 6, 1, None)
        .await?;
    assert!(!again.created);
    assert_eq!(again.entry.holding_status, 5);

    let ledger = service
        .customer_ledger("Hotel Sagar", BillMonth::new(2024, 3).unwrap())
        .await?;
    assert_eq!(ledger.entries.len(), 1);
    assert_eq!(ledger.entries[0].delivered_qty, 6);
    assert_eq!(ledger.closing_holding, 5);

    Ok(())
}

#[tokio::test]
async fn test_collecting_more_than_held_is_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardRoute::create_customers(&service).await?;

    service
        .record_day("Hotel Sagar", date("2024-03-01"), 10, 0, None)
        .await?;

    let result = service
        .record_day("Hotel Sagar", date("2024-03-02"), 0, 11, None)
        .await;
    match result {
        Err(AppError::CollectionExceedsHolding {
            available,
            requested,
            ..
        }) => {
            assert_eq!(available, 10);
            assert_eq!(requested, 11);
        }
        other => panic!("expected CollectionExceedsHolding, got {:?}", other),
    }

    // Nothing was written for the rejected day
    let ledger = service
        .customer_ledger("Hotel Sagar", BillMonth::new(2024, 3).unwrap())
        .await?;
    assert_eq!(ledger.entries.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_invalid_quantities_and_unknown_customer() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardRoute::create_customers(&service).await?;

    let result = service
        .record_day("Hotel Sagar", date("2024-03-01"), -1, 0, None)
        .await;
    assert!(matches!(result, Err(AppError::InvalidQuantity(_))));

    let result = service
        .record_day("Nobody", date("2024-03-01"), 1, 0, None)
        .await;
    assert!(matches!(result, Err(AppError::CustomerNotFound(_))));

    let result = service.record_day("  ", date("2024-03-01"), 1, 0, None).await;
    assert!(matches!(result, Err(AppError::MissingField(_))));

    Ok(())
}

#[tokio::test]
async fn test_oversized_delivery_is_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardRoute::create_customers(&service).await?;

    service
        .record_day("Hotel Sagar", date("2024-03-01"), 1, 0, None)
        .await?;

    let result = service
        .record_day("Hotel Sagar", date("2024-03-02"), i64::MAX, 0, None)
        .await;
    assert!(matches!(result, Err(AppError::InvalidQuantity(_))));

    let ledger = service
        .customer_ledger("Hotel Sagar", BillMonth::new(2024, 3).unwrap())
        .await?;
    assert_eq!(ledger.entries.len(), 1);
    assert_eq!(ledger.closing_holding, 1);

    Ok(())
}

#[tokio::test]
async fn test_backdated_entry_rechains_later_days() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardRoute::create_customers(&service).await?;

    service
        .record_day("Hotel Sagar", date("2024-03-01"), 10, 0, None)
        .await?;
    service
        .record_day("Hotel Sagar", date("2024-03-03"), 0, 4, None)
        .await?;

    // Insert a missed day in between
    let inserted = service
        .record_day("Hotel Sagar", date("2024-03-02"), 5, 0, None)
        .await?;
    assert_eq!(inserted.entry.holding_status, 15);
    assert_eq!(inserted.rechained, 1);

    let ledger = service
        .customer_ledger("Hotel Sagar", BillMonth::new(2024, 3).unwrap())
        .await?;
    let holdings: Vec<i64> = ledger.entries.iter().map(|e| e.holding_status).collect();
    assert_eq!(holdings, vec![10, 15, 11]);

    // Correct the first day; every later holding moves with it
    service
        .record_day("Hotel Sagar", date("2024-03-01"), 0, 0, None)
        .await?;
    let ledger = service
        .customer_ledger("Hotel Sagar", BillMonth::new(2024, 3).unwrap())
        .await?;
    let holdings: Vec<i64> = ledger.entries.iter().map(|e| e.holding_status).collect();
    assert_eq!(holdings, vec![0, 5, 1]);

    Ok(())
}

#[tokio::test]
async fn test_backdated_edit_that_breaks_a_later_day_is_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardRoute::create_customers(&service).await?;

    service
        .record_day("Hotel Sagar", date("2024-03-01"), 5, 0, None)
        .await?;
    service
        .record_day("Hotel Sagar", date("2024-03-02"), 0, 4, None)
        .await?;

    let result = service
        .record_day("Hotel Sagar", date("2024-03-01"), 2, 0, None)
        .await;
    match result {
        Err(AppError::HoldingWouldGoNegative { date: day, holding, .. }) => {
            assert_eq!(day, date("2024-03-02"));
            assert_eq!(holding, -2);
        }
        other => panic!("expected HoldingWouldGoNegative, got {:?}", other),
    }

    // The whole edit rolled back
    let ledger = service
        .customer_ledger("Hotel Sagar", BillMonth::new(2024, 3).unwrap())
        .await?;
    assert_eq!(ledger.entries[0].delivered_qty, 5);
    assert_eq!(ledger.entries[0].holding_status, 5);
    assert_eq!(ledger.entries[1].holding_status, 1);

    Ok(())
}

#[tokio::test]
async fn test_collection_candidates_use_previous_day() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardRoute::create_customers(&service).await?;

    // Holds cans at the end of 03-03
    service
        .record_day("Hotel Sagar", date("2024-03-03"), 3, 0, None)
        .await?;
    // Holds cans, but the last entry is two days before the reference
    service
        .record_day("Mehta House", date("2024-03-02"), 2, 0, None)
        .await?;
    // Entry on 03-03 with nothing left
    service
        .record_day("Rao Events", date("2024-03-03"), 2, 2, None)
        .await?;

    let candidates = service.collection_candidates(date("2024-03-04")).await?;
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].customer_name, "Hotel Sagar");
    assert_eq!(candidates[0].holding, 3);
    assert_eq!(candidates[0].as_of, date("2024-03-03"));
    assert_eq!(candidates[0].phone.as_deref(), Some("555-0101"));

    let none = service.collection_candidates(date("2024-03-10")).await?;
    assert!(none.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_deactivated_customers_are_skipped() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardRoute::create_customers(&service).await?;

    service
        .record_day("Mehta House", date("2024-03-03"), 2, 0, None)
        .await?;
    service.deactivate_customer("Mehta House").await?;

    let candidates = service.collection_candidates(date("2024-03-04")).await?;
    assert!(candidates.is_empty());

    let result = service
        .record_day("Mehta House", date("2024-03-04"), 0, 2, None)
        .await;
    assert!(matches!(result, Err(AppError::CustomerInactive(_))));

    Ok(())
}

#[tokio::test]
async fn test_day_sheet_and_holdings() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardRoute::create_customers(&service).await?;

    service
        .record_day("Hotel Sagar", date("2024-03-01"), 10, 0, None)
        .await?;
    service
        .record_day("Hotel Sagar", date("2024-03-02"), 2, 3, None)
        .await?;
    service
        .record_day("Mehta House", date("2024-03-01"), 4, 0, None)
        .await?;

    let sheet = service.day_sheet(date("2024-03-02")).await?;
    assert_eq!(sheet.len(), 3);

    let hotel = sheet
        .iter()
        .find(|r| r.customer.name == "Hotel Sagar")
        .unwrap();
    assert_eq!(hotel.previous_holding, 10);
    assert_eq!(hotel.entry.as_ref().map(|e| e.holding_status), Some(9));

    let mehta = sheet
        .iter()
        .find(|r| r.customer.name == "Mehta House")
        .unwrap();
    assert_eq!(mehta.previous_holding, 4);
    assert!(mehta.entry.is_none());

    let holdings = service.holding_summary(date("2024-03-02")).await?;
    let by_name = |name: &str| holdings.iter().find(|h| h.customer_name == name).unwrap();
    assert_eq!(by_name("Hotel Sagar").holding, 9);
    assert_eq!(by_name("Mehta House").holding, 4);
    assert_eq!(
        by_name("Mehta House").last_entry_date,
        Some(date("2024-03-01"))
    );
    assert_eq!(by_name("Rao Events").holding, 0);
    assert_eq!(by_name("Rao Events").last_entry_date, None);

    // Holdings as of an earlier date ignore later entries
    let earlier = service.holding_summary(date("2024-03-01")).await?;
    let hotel = earlier
        .iter()
        .find(|h| h.customer_name == "Hotel Sagar")
        .unwrap();
    assert_eq!(hotel.holding, 10);

    Ok(())
}

#[tokio::test]
async fn test_customer_ledger_opening_holding() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardRoute::create_customers(&service).await?;

    service
        .record_day("Hotel Sagar", date("2024-02-28"), 6, 0, None)
        .await?;
    service
        .record_day("Hotel Sagar", date("2024-03-01"), 2, 5, None)
        .await?;
    service
        .record_day("Hotel Sagar", date("2024-03-15"), 4, 0, None)
        .await?;

    let ledger = service
        .customer_ledger("Hotel Sagar", BillMonth::new(2024, 3).unwrap())
        .await?;
    assert_eq!(ledger.opening_holding, 6);
    assert_eq!(ledger.entries.len(), 2);
    assert_eq!(ledger.total_delivered, 6);
    assert_eq!(ledger.total_collected, 5);
    assert_eq!(ledger.closing_holding, 7);

    Ok(())
}
