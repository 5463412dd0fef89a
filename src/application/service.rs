use std::collections::HashMap;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use tracing::{debug, error, info};

use crate::domain::{
    aggregate_month, next_holding, rechain, BillDraft, BillMonth, Cents, Customer, CustomerId,
    CustomerPatch, CustomerType, LedgerEntry, MonthlyBill, Order, OrderId, OrderStatus,
    PriceSettings,
};
use crate::storage::Repository;

use super::input::require_name;
use super::{
    AppError, BillView, CollectionCandidate, CustomerLedger, DaySheetRow, HoldingRow,
    MonthlySummary, MonthlySummaryRow, RecordResult,
};

/// Application service for the delivery ledger.
/// This is the primary interface for any client (CLI, API, dashboard).
pub struct DeliveryService {
    repo: Repository,
}

/// Fields for a new customer
#[derive(Debug, Clone)]
pub struct NewCustomer {
    pub name: String,
    pub customer_type: CustomerType,
    pub can_qty: i64,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub advance_cents: Option<Cents>,
}

/// Fields for a new one-off order
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub customer_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub can_qty: i64,
    pub delivery_date: NaiveDate,
    pub notes: Option<String>,
}

impl DeliveryService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Ok(Self::new(repo))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::new(repo))
    }

    // ========================
    // Customer operations
    // ========================

    pub async fn create_customer(&self, new: NewCustomer) -> Result<Customer, AppError> {
        let name = require_name("name", &new.name)?.to_string();
        validate_customer_numbers(Some(new.can_qty), new.advance_cents)?;

        if self.repo.get_customer_by_name(&name).await?.is_some() {
            return Err(AppError::CustomerAlreadyExists(name));
        }

        let mut customer = Customer::new(name, new.customer_type, new.can_qty);
        if let Some(phone) = new.phone {
            customer = customer.with_phone(phone);
        }
        if let Some(address) = new.address {
            customer = customer.with_address(address);
        }
        if let Some(advance) = new.advance_cents {
            customer = customer.with_advance(advance);
        }

        self.repo.save_customer(&customer).await?;
        info!(customer = %customer.name, kind = %customer.customer_type, "created customer");
        Ok(customer)
    }

    /// Get a customer by name.
    pub async fn get_customer(&self, name: &str) -> Result<Customer, AppError> {
        let name = require_name("customer", name)?;
        self.repo
            .get_customer_by_name(name)
            .await?
            .ok_or_else(|| AppError::CustomerNotFound(name.to_string()))
    }

    pub async fn list_customers(&self, include_inactive: bool) -> Result<Vec<Customer>, AppError> {
        Ok(self.repo.list_customers(include_inactive).await?)
    }

    /// Edit an existing customer.
    pub async fn update_customer(
        &self,
        name: &str,
        patch: CustomerPatch,
    ) -> Result<Customer, AppError> {
        let mut customer = self.get_customer(name).await?;
        validate_customer_numbers(patch.can_qty, patch.advance_cents)?;

        if let Some(new_name) = &patch.name {
            let new_name = require_name("name", new_name)?;
            if new_name != customer.name && self.repo.get_customer_by_name(new_name).await?.is_some()
            {
                return Err(AppError::CustomerAlreadyExists(new_name.to_string()));
            }
        }
        let patch = CustomerPatch {
            name: patch.name.map(|n| n.trim().to_string()),
            ..patch
        };

        customer.apply(patch);
        self.repo.update_customer(&customer).await?;
        info!(customer = %customer.name, "updated customer");
        Ok(customer)
    }

    /// Deactivate a customer. Their ledger and bills are kept.
    pub async fn deactivate_customer(&self, name: &str) -> Result<Customer, AppError> {
        let mut customer = self.get_customer(name).await?;
        self.repo.deactivate_customer(customer.id).await?;
        customer.deactivated_at = Some(Utc::now());
        info!(customer = %customer.name, "deactivated customer");
        Ok(customer)
    }

    async fn customers_by_id(
        &self,
        include_inactive: bool,
    ) -> Result<HashMap<CustomerId, Customer>, AppError> {
        let customers = self.repo.list_customers(include_inactive).await?;
        Ok(customers.into_iter().map(|c| (c.id, c)).collect())
    }

    // ========================
    // Ledger operations
    // ========================

    /// Record a day's delivery and collection for a customer.
    ///
    /// The previous holding is read, the entry is written, and every later
    /// entry is re-chained inside one transaction. Collecting more cans than
    /// the customer holds is rejected and nothing is written.
    pub async fn record_day(
        &self,
        customer_name: &str,
        date: NaiveDate,
        delivered: i64,
        collected: i64,
        notes: Option<String>,
    ) -> Result<RecordResult, AppError> {
        let customer = self.get_customer(customer_name).await?;
        if !customer.is_active() {
            return Err(AppError::CustomerInactive(customer.name));
        }

        let mut tx = self.repo.begin().await?;

        let previous_holding = Repository::previous_entry(&mut tx, customer.id, date)
            .await?
            .map_or(0, |e| e.holding_status);
        let holding = next_holding(previous_holding, delivered, collected)
            .map_err(|e| AppError::from_holding(&customer.name, date, e))?;

        let existing = Repository::get_entry(&mut tx, customer.id, date).await?;
        let created = existing.is_none();
        let entry = match existing {
            Some(mut entry) => {
                entry.delivered_qty = delivered;
                entry.collected_qty = collected;
                entry.holding_status = holding;
                entry.notes = notes;
                entry.updated_at = Utc::now();
                entry
            }
            None => LedgerEntry::new(customer.id, date, delivered, collected, holding)
                .with_notes(notes),
        };
        Repository::upsert_entry(&mut tx, &entry).await?;

        let mut later = Repository::entries_after(&mut tx, customer.id, date).await?;
        let changed = rechain(holding, &mut later)
            .map_err(|e| AppError::from_holding(&customer.name, date, e))?;
        for idx in &changed {
            Repository::update_holding(&mut tx, &later[*idx]).await?;
        }

        tx.commit()
            .await
            .context("Failed to commit ledger entry")?;

        info!(
            customer = %customer.name,
            %date,
            delivered,
            collected,
            holding,
            rechained = changed.len(),
            "recorded ledger entry"
        );

        Ok(RecordResult {
            customer_name: customer.name,
            entry,
            previous_holding,
            created,
            rechained: changed.len(),
        })
    }

    /// Every active customer with their entry for `date` and the holding
    /// carried into that day.
    pub async fn day_sheet(&self, date: NaiveDate) -> Result<Vec<DaySheetRow>, AppError> {
        let customers = self.repo.list_customers(false).await?;
        let mut todays: HashMap<CustomerId, LedgerEntry> = self
            .repo
            .list_entries_on(date)
            .await?
            .into_iter()
            .map(|e| (e.customer_id, e))
            .collect();
        let previous: HashMap<CustomerId, i64> = self
            .repo
            .latest_entries(date, false)
            .await?
            .into_iter()
            .map(|e| (e.customer_id, e.holding_status))
            .collect();

        Ok(customers
            .into_iter()
            .map(|customer| DaySheetRow {
                previous_holding: previous.get(&customer.id).copied().unwrap_or(0),
                entry: todays.remove(&customer.id),
                customer,
            })
            .collect())
    }

    /// Customers whose entry on the day before `reference` still holds cans.
    /// These are the pickups due on `reference`.
    pub async fn collection_candidates(
        &self,
        reference: NaiveDate,
    ) -> Result<Vec<CollectionCandidate>, AppError> {
        let previous_day = reference
            .pred_opt()
            .ok_or_else(|| AppError::InvalidDate(reference.to_string()))?;

        let outstanding = self.repo.list_outstanding_on(previous_day).await?;
        let customers = self.customers_by_id(false).await?;

        let mut candidates: Vec<CollectionCandidate> = outstanding
            .into_iter()
            .filter_map(|entry| {
                customers.get(&entry.customer_id).map(|c| CollectionCandidate {
                    customer_name: c.name.clone(),
                    phone: c.phone.clone(),
                    address: c.address.clone(),
                    holding: entry.holding_status,
                    as_of: entry.date,
                })
            })
            .collect();
        candidates.sort_by(|a, b| a.customer_name.cmp(&b.customer_name));

        debug!(%reference, count = candidates.len(), "collection candidates");
        Ok(candidates)
    }

    /// Current holding per active customer, from the latest entry on or before `as_of`.
    pub async fn holding_summary(&self, as_of: NaiveDate) -> Result<Vec<HoldingRow>, AppError> {
        let customers = self.repo.list_customers(false).await?;
        let latest: HashMap<CustomerId, LedgerEntry> = self
            .repo
            .latest_entries(as_of, true)
            .await?
            .into_iter()
            .map(|e| (e.customer_id, e))
            .collect();

        Ok(customers
            .into_iter()
            .map(|customer| {
                let entry = latest.get(&customer.id);
                HoldingRow {
                    holding: entry.map_or(0, |e| e.holding_status),
                    last_entry_date: entry.map(|e| e.date),
                    customer_name: customer.name,
                    customer_type: customer.customer_type,
                }
            })
            .collect())
    }

    /// A customer's entries within one month.
    pub async fn customer_ledger(
        &self,
        customer_name: &str,
        month: BillMonth,
    ) -> Result<CustomerLedger, AppError> {
        let customer = self.get_customer(customer_name).await?;
        let entries = self
            .repo
            .list_entries_between(Some(customer.id), month.first_day(), month.next_first_day())
            .await?;
        let opening = self
            .repo
            .holding_before(customer.id, month.first_day())
            .await?;

        Ok(CustomerLedger::new(customer, month, opening, entries))
    }

    // ========================
    // Billing operations
    // ========================

    /// Compute bills for every customer with entries in `month`.
    ///
    /// This reads ledger rows only; saved bills contribute their paid/sent
    /// flags and nothing else, so running it twice gives the same figures.
    pub async fn monthly_summary(&self, month: BillMonth) -> Result<MonthlySummary, AppError> {
        let prices = self.active_prices().await?;
        let entries = self
            .repo
            .list_entries_between(None, month.first_day(), month.next_first_day())
            .await?;
        let totals = aggregate_month(month, &entries).ok_or_else(|| {
            AppError::InvalidAmount(format!("delivered totals for {} overflow", month))
        })?;

        let customers = self.customers_by_id(true).await?;
        let saved: HashMap<CustomerId, MonthlyBill> = self
            .repo
            .list_bills(month)
            .await?
            .into_iter()
            .map(|b| (b.customer_id, b))
            .collect();

        let mut rows = Vec::with_capacity(totals.len());
        for (customer_id, month_totals) in totals {
            let customer = customers
                .get(&customer_id)
                .ok_or_else(|| AppError::CustomerNotFound(customer_id.to_string()))?;
            let unit_price = prices.price_for(customer.customer_type);
            let mut bill = MonthlyBill::from_totals(customer_id, month, month_totals, unit_price)
                .ok_or_else(|| {
                    AppError::InvalidAmount(format!("bill for {} overflows", customer.name))
                })?;

            let previous = saved.get(&customer_id);
            if let Some(previous) = previous {
                bill.paid = previous.paid;
                bill.sent = previous.sent;
            }

            rows.push(MonthlySummaryRow {
                customer_name: customer.name.clone(),
                customer_type: customer.customer_type,
                bill,
                saved: previous.is_some(),
            });
        }
        rows.sort_by(|a, b| a.customer_name.cmp(&b.customer_name));

        let total_cans = rows
            .iter()
            .try_fold(0i64, |acc, r| acc.checked_add(r.bill.total_cans_delivered))
            .ok_or_else(|| AppError::InvalidAmount(format!("total cans for {} overflow", month)))?;
        let total_amount = rows
            .iter()
            .try_fold(0i64, |acc, r| acc.checked_add(r.bill.bill_amount_cents))
            .ok_or_else(|| {
                AppError::InvalidAmount(format!("total amount for {} overflows", month))
            })?;
        debug!(%month, customers = rows.len(), total_cans, "computed monthly summary");

        Ok(MonthlySummary {
            month,
            rows,
            total_cans,
            total_amount,
        })
    }

    /// Compute the month and save every bill, keeping saved paid/sent flags.
    pub async fn finalize_month(&self, month: BillMonth) -> Result<usize, AppError> {
        let summary = self.monthly_summary(month).await?;
        let bills: Vec<MonthlyBill> = summary.rows.into_iter().map(|r| r.bill).collect();
        self.persist_bills(&bills).await
    }

    /// Save a batch of bill drafts, all or nothing.
    ///
    /// Every draft is validated and its customer resolved before the first
    /// row is written. A draft without a unit price gets the active price
    /// for the customer's type (0 when no prices are configured).
    pub async fn save_monthly_bills(&self, drafts: &[BillDraft]) -> Result<usize, AppError> {
        let mut checked = Vec::with_capacity(drafts.len());
        for (index, draft) in drafts.iter().enumerate() {
            let valid = draft.validate().map_err(|e| AppError::InvalidBill {
                index,
                reason: e.to_string(),
            })?;
            checked.push(valid);
        }

        let prices = self.repo.get_active_prices().await?;
        let mut bills = Vec::with_capacity(checked.len());
        for draft in checked {
            let customer = self.get_customer(&draft.customer).await?;
            let unit_price = draft.unit_price.unwrap_or_else(|| {
                prices
                    .as_ref()
                    .map_or(0, |p| p.price_for(customer.customer_type))
            });
            bills.push(MonthlyBill {
                customer_id: customer.id,
                bill_month: draft.bill_month,
                total_cans_delivered: draft.total_cans_delivered,
                total_delivery_days: draft.total_delivery_days,
                unit_price_cents: unit_price,
                bill_amount_cents: draft.bill_amount,
                paid: draft.paid,
                sent: draft.sent,
                updated_at: Utc::now(),
            });
        }

        self.persist_bills(&bills).await
    }

    async fn persist_bills(&self, bills: &[MonthlyBill]) -> Result<usize, AppError> {
        if bills.is_empty() {
            return Ok(0);
        }

        let mut tx = self.repo.begin().await?;
        for bill in bills {
            // Dropping `tx` on the error path rolls back rows already written
            if let Err(e) = Repository::upsert_bill(&mut tx, bill).await {
                error!(
                    customer_id = %bill.customer_id,
                    month = %bill.bill_month,
                    error = %e,
                    "monthly bill batch failed, rolling back"
                );
                return Err(e.into());
            }
        }
        tx.commit()
            .await
            .context("Failed to commit monthly bills")?;

        info!(count = bills.len(), "saved monthly bills");
        Ok(bills.len())
    }

    /// Saved bills for a month, ordered by customer name.
    pub async fn list_bills(&self, month: BillMonth) -> Result<Vec<BillView>, AppError> {
        let customers = self.customers_by_id(true).await?;
        let mut views: Vec<BillView> = self
            .repo
            .list_bills(month)
            .await?
            .into_iter()
            .map(|bill| BillView {
                customer_name: customers
                    .get(&bill.customer_id)
                    .map_or_else(|| bill.customer_id.to_string(), |c| c.name.clone()),
                bill,
            })
            .collect();
        views.sort_by(|a, b| a.customer_name.cmp(&b.customer_name));
        Ok(views)
    }

    pub async fn mark_bill_paid(
        &self,
        customer_name: &str,
        month: BillMonth,
        paid: bool,
    ) -> Result<MonthlyBill, AppError> {
        self.set_bill_flags(customer_name, month, Some(paid), None)
            .await
    }

    pub async fn mark_bill_sent(
        &self,
        customer_name: &str,
        month: BillMonth,
        sent: bool,
    ) -> Result<MonthlyBill, AppError> {
        self.set_bill_flags(customer_name, month, None, Some(sent))
            .await
    }

    async fn set_bill_flags(
        &self,
        customer_name: &str,
        month: BillMonth,
        paid: Option<bool>,
        sent: Option<bool>,
    ) -> Result<MonthlyBill, AppError> {
        let customer = self.get_customer(customer_name).await?;
        let not_found = || AppError::BillNotFound {
            customer: customer.name.clone(),
            month,
        };

        let touched = self
            .repo
            .set_bill_flags(customer.id, month, paid, sent)
            .await?;
        if touched == 0 {
            return Err(not_found());
        }
        info!(customer = %customer.name, %month, ?paid, ?sent, "updated bill flags");

        self.repo
            .get_bill(customer.id, month)
            .await?
            .ok_or_else(not_found)
    }

    // ========================
    // Price operations
    // ========================

    pub async fn active_prices(&self) -> Result<PriceSettings, AppError> {
        self.repo
            .get_active_prices()
            .await?
            .ok_or(AppError::PricesNotConfigured)
    }

    /// Replace the active prices. The previous row stays in the history.
    pub async fn set_prices(
        &self,
        shop_price: Cents,
        monthly_price: Cents,
        order_price: Cents,
    ) -> Result<PriceSettings, AppError> {
        let prices = PriceSettings::new(shop_price, monthly_price, order_price);
        if let Some((kind, price)) = prices.first_negative() {
            return Err(AppError::InvalidAmount(format!(
                "{} price cannot be negative ({})",
                kind, price
            )));
        }

        let mut tx = self.repo.begin().await?;
        let replaced = Repository::deactivate_prices(&mut tx).await?;
        Repository::insert_prices(&mut tx, &prices).await?;
        tx.commit().await.context("Failed to commit prices")?;

        info!(
            shop = prices.shop_price,
            monthly = prices.monthly_price,
            order = prices.order_price,
            replaced,
            "updated prices"
        );
        Ok(prices)
    }

    pub async fn price_history(&self) -> Result<Vec<PriceSettings>, AppError> {
        Ok(self.repo.list_price_history().await?)
    }

    // ========================
    // Order operations
    // ========================

    pub async fn create_order(&self, new: NewOrder) -> Result<Order, AppError> {
        let name = require_name("customer", &new.customer_name)?.to_string();
        if new.can_qty <= 0 {
            return Err(AppError::InvalidQuantity(format!(
                "order quantity must be positive (got {})",
                new.can_qty
            )));
        }

        let order = Order::new(name, new.can_qty, new.delivery_date)
            .with_phone(new.phone)
            .with_address(new.address)
            .with_notes(new.notes);
        self.repo.save_order(&order).await?;

        info!(order = %order.id, customer = %order.customer_name, cans = order.can_qty, "created order");
        Ok(order)
    }

    pub async fn get_order(&self, id: OrderId) -> Result<Order, AppError> {
        self.repo
            .get_order(id)
            .await?
            .ok_or_else(|| AppError::OrderNotFound(id.to_string()))
    }

    pub async fn list_orders(&self, status: Option<OrderStatus>) -> Result<Vec<Order>, AppError> {
        Ok(self.repo.list_orders(status).await?)
    }

    pub async fn mark_order_delivered(&self, id: OrderId) -> Result<Order, AppError> {
        let mut order = self.get_order(id).await?;
        order.mark_delivered()?;
        self.repo.update_order_status(&order).await?;
        info!(order = %order.id, "order delivered");
        Ok(order)
    }

    pub async fn collect_order(
        &self,
        id: OrderId,
        collected_qty: i64,
        collection_date: NaiveDate,
    ) -> Result<Order, AppError> {
        let mut order = self.get_order(id).await?;
        order.collect(collected_qty, collection_date)?;
        self.repo.update_order_status(&order).await?;
        info!(order = %order.id, collected = collected_qty, "order collected");
        Ok(order)
    }
}

fn validate_customer_numbers(
    can_qty: Option<i64>,
    advance_cents: Option<Cents>,
) -> Result<(), AppError> {
    if let Some(qty) = can_qty.filter(|q| *q < 0) {
        return Err(AppError::InvalidQuantity(format!(
            "can quantity cannot be negative (got {})",
            qty
        )));
    }
    if let Some(advance) = advance_cents.filter(|a| *a < 0) {
        return Err(AppError::InvalidAmount(format!(
            "advance cannot be negative (got {})",
            advance
        )));
    }
    Ok(())
}
