mod common;

use anyhow::Result;
use canledger::application::{AppError, NewCustomer};
use canledger::domain::{CustomerPatch, CustomerType};
use common::{date, new_customer, test_service, StandardRoute};

#[tokio::test]
async fn test_create_and_get_customer() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let created = service
        .create_customer(NewCustomer {
            phone: Some("555-0199".into()),
            advance_cents: Some(50000),
            ..new_customer("  Green Cafe ", CustomerType::Shop)
        })
        .await?;
    assert_eq!(created.name, "Green Cafe");

    let fetched = service.get_customer("Green Cafe").await?;
    assert_eq!(fetched.id, created.id);
    assert_eq!(fetched.customer_type, CustomerType::Shop);
    assert_eq!(fetched.can_qty, 2);
    assert_eq!(fetched.phone.as_deref(), Some("555-0199"));
    assert_eq!(fetched.advance_cents, Some(50000));
    assert!(fetched.is_active());

    Ok(())
}

#[tokio::test]
async fn test_duplicate_and_invalid_customers() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardRoute::create_customers(&service).await?;

    let result = service
        .create_customer(new_customer("Hotel Sagar", CustomerType::Monthly))
        .await;
    assert!(matches!(result, Err(AppError::CustomerAlreadyExists(_))));

    let result = service
        .create_customer(new_customer("", CustomerType::Shop))
        .await;
    assert!(matches!(result, Err(AppError::MissingField(_))));

    let result = service
        .create_customer(NewCustomer {
            can_qty: -1,
            ..new_customer("Negative", CustomerType::Shop)
        })
        .await;
    assert!(matches!(result, Err(AppError::InvalidQuantity(_))));

    let result = service.get_customer("Nobody").await;
    assert!(matches!(result, Err(AppError::CustomerNotFound(_))));

    Ok(())
}

#[tokio::test]
async fn test_update_customer() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardRoute::create_customers(&service).await?;

    let updated = service
        .update_customer(
            "Mehta House",
            CustomerPatch {
                name: Some("Mehta Residence".into()),
                can_qty: Some(3),
                address: Some("Lake View 9".into()),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(updated.name, "Mehta Residence");

    let fetched = service.get_customer("Mehta Residence").await?;
    assert_eq!(fetched.can_qty, 3);
    assert_eq!(fetched.address.as_deref(), Some("Lake View 9"));
    assert_eq!(fetched.customer_type, CustomerType::Monthly);
    assert!(matches!(
        service.get_customer("Mehta House").await,
        Err(AppError::CustomerNotFound(_))
    ));

    // Renaming onto another customer's name is rejected
    let result = service
        .update_customer(
            "Mehta Residence",
            CustomerPatch {
                name: Some("Hotel Sagar".into()),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(result, Err(AppError::CustomerAlreadyExists(_))));

    Ok(())
}

#[tokio::test]
async fn test_deactivate_keeps_history() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardRoute::create_customers(&service).await?;

    service
        .record_day("Rao Events", date("2024-03-01"), 5, 0, None)
        .await?;
    let customer = service.deactivate_customer("Rao Events").await?;
    assert!(!customer.is_active());

    let active = service.list_customers(false).await?;
    assert_eq!(active.len(), 2);
    assert!(active.iter().all(|c| c.name != "Rao Events"));

    let all = service.list_customers(true).await?;
    assert_eq!(all.len(), 3);

    // Ledger is still readable
    let fetched = service.get_customer("Rao Events").await?;
    assert!(fetched.deactivated_at.is_some());
    let ledger = service
        .customer_ledger("Rao Events", "2024-03".parse().unwrap())
        .await?;
    assert_eq!(ledger.entries.len(), 1);

    Ok(())
}
