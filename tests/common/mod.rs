// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use canledger::application::{DeliveryService, NewCustomer};
use canledger::domain::CustomerType;
use canledger::storage::Repository;
use chrono::NaiveDate;
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(DeliveryService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = DeliveryService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// Open a second handle on the database behind `test_service`
pub async fn test_repository(temp_dir: &TempDir) -> Result<Repository> {
    let db_path = temp_dir.path().join("test.db");
    Repository::connect(&format!("sqlite:{}", db_path.to_str().unwrap())).await
}

/// Helper to parse a YYYY-MM-DD string
pub fn date(date_str: &str) -> NaiveDate {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d").unwrap()
}

pub fn new_customer(name: &str, customer_type: CustomerType) -> NewCustomer {
    NewCustomer {
        name: name.to_string(),
        customer_type,
        can_qty: 2,
        phone: None,
        address: None,
        advance_cents: None,
    }
}

/// Test fixture: a small delivery route
pub struct StandardRoute;

impl StandardRoute {
    /// Hotel Sagar (shop), Mehta House (monthly), Rao Events (order)
    pub async fn create_customers(service: &DeliveryService) -> Result<()> {
        service
            .create_customer(NewCustomer {
                phone: Some("555-0101".into()),
                address: Some("Station Road 4".into()),
                ..new_customer("Hotel Sagar", CustomerType::Shop)
            })
            .await?;
        service
            .create_customer(new_customer("Mehta House", CustomerType::Monthly))
            .await?;
        service
            .create_customer(new_customer("Rao Events", CustomerType::Order))
            .await?;
        Ok(())
    }

    /// Shop 20.00, monthly 25.00, order 30.00 per can
    pub async fn set_prices(service: &DeliveryService) -> Result<()> {
        service.set_prices(2000, 2500, 3000).await?;
        Ok(())
    }

    pub async fn create_with_prices(service: &DeliveryService) -> Result<()> {
        Self::create_customers(service).await?;
        Self::set_prices(service).await
    }
}
