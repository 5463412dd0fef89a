use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqliteConnection, SqlitePool, Transaction};
use uuid::Uuid;

use crate::domain::{
    BillMonth, Customer, CustomerId, CustomerType, LedgerEntry, MonthlyBill, Order, OrderId,
    OrderStatus, PriceSettings,
};

use super::{MIGRATION_001_INITIAL, MIGRATION_002_BILLING, MIGRATION_003_ORDERS};

const DATE_FORMAT: &str = "%Y-%m-%d";

const CUSTOMER_COLUMNS: &str = "id, name, phone, address, customer_type, can_qty, advance_cents, created_at, deactivated_at";

const ENTRY_COLUMNS: &str = "id, customer_id, entry_date, delivered_qty, collected_qty, holding_status, notes, updated_at";

const BILL_COLUMNS: &str = "customer_id, bill_month, total_cans_delivered, total_delivery_days, unit_price_cents, bill_amount_cents, paid, sent, updated_at";

const ORDER_COLUMNS: &str = "id, customer_name, phone, address, can_qty, delivery_date, status, collected_qty, collection_date, notes, created_at";

/// Repository for persisting and querying customers, ledger entries, bills,
/// prices and orders.
///
/// Methods that take a `&mut SqliteConnection` are meant to run inside a
/// transaction obtained from [`Repository::begin`].
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations. Safe to run more than once.
    pub async fn migrate(&self) -> Result<()> {
        for (name, sql) in [
            ("001", MIGRATION_001_INITIAL),
            ("002", MIGRATION_002_BILLING),
            ("003", MIGRATION_003_ORDERS),
        ] {
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .with_context(|| format!("Failed to run migration {}", name))?;
        }
        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    /// Start a transaction. It rolls back when dropped without `commit`.
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>> {
        self.pool
            .begin()
            .await
            .context("Failed to begin transaction")
    }

    // ========================
    // Customer operations
    // ========================

    pub async fn save_customer(&self, customer: &Customer) -> Result<()> {
        sqlx::query(&format!(
            "INSERT INTO customers ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            CUSTOMER_COLUMNS
        ))
        .bind(customer.id.to_string())
        .bind(&customer.name)
        .bind(&customer.phone)
        .bind(&customer.address)
        .bind(customer.customer_type.as_str())
        .bind(customer.can_qty)
        .bind(customer.advance_cents)
        .bind(customer.created_at.to_rfc3339())
        .bind(customer.deactivated_at.map(|dt| dt.to_rfc3339()))
        .execute(&self.pool)
        .await
        .context("Failed to save customer")?;
        Ok(())
    }

    /// Overwrite the editable fields of an existing customer.
    pub async fn update_customer(&self, customer: &Customer) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE customers
            SET name = ?, phone = ?, address = ?, customer_type = ?, can_qty = ?, advance_cents = ?
            WHERE id = ?
            "#,
        )
        .bind(&customer.name)
        .bind(&customer.phone)
        .bind(&customer.address)
        .bind(customer.customer_type.as_str())
        .bind(customer.can_qty)
        .bind(customer.advance_cents)
        .bind(customer.id.to_string())
        .execute(&self.pool)
        .await
        .context("Failed to update customer")?;
        Ok(())
    }

    pub async fn get_customer_by_name(&self, name: &str) -> Result<Option<Customer>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM customers WHERE name = ?",
            CUSTOMER_COLUMNS
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch customer by name")?;

        row.as_ref().map(Self::row_to_customer).transpose()
    }

    /// List customers ordered by name (optionally including deactivated ones).
    pub async fn list_customers(&self, include_inactive: bool) -> Result<Vec<Customer>> {
        let filter = if include_inactive {
            ""
        } else {
            "WHERE deactivated_at IS NULL"
        };
        let rows = sqlx::query(&format!(
            "SELECT {} FROM customers {} ORDER BY name",
            CUSTOMER_COLUMNS, filter
        ))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list customers")?;

        rows.iter().map(Self::row_to_customer).collect()
    }

    /// Deactivate a customer (soft delete).
    pub async fn deactivate_customer(&self, id: CustomerId) -> Result<()> {
        sqlx::query("UPDATE customers SET deactivated_at = ? WHERE id = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to deactivate customer")?;
        Ok(())
    }

    fn row_to_customer(row: &SqliteRow) -> Result<Customer> {
        let id_str: String = row.get("id");
        let type_str: String = row.get("customer_type");
        let created_at_str: String = row.get("created_at");
        let deactivated_at_str: Option<String> = row.get("deactivated_at");

        Ok(Customer {
            id: Uuid::parse_str(&id_str).context("Invalid customer ID")?,
            name: row.get("name"),
            phone: row.get("phone"),
            address: row.get("address"),
            customer_type: CustomerType::from_str(&type_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid customer type: {}", type_str))?,
            can_qty: row.get("can_qty"),
            advance_cents: row.get("advance_cents"),
            created_at: parse_timestamp(&created_at_str).context("Invalid created_at")?,
            deactivated_at: deactivated_at_str
                .as_deref()
                .map(parse_timestamp)
                .transpose()
                .context("Invalid deactivated_at")?,
        })
    }

    // ========================
    // Ledger operations
    // ========================

    /// The entry for exactly (customer, date).
    pub async fn get_entry(
        conn: &mut SqliteConnection,
        customer_id: CustomerId,
        date: NaiveDate,
    ) -> Result<Option<LedgerEntry>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM ledger_entries WHERE customer_id = ? AND entry_date = ?",
            ENTRY_COLUMNS
        ))
        .bind(customer_id.to_string())
        .bind(format_date(date))
        .fetch_optional(&mut *conn)
        .await
        .context("Failed to fetch ledger entry")?;

        row.as_ref().map(Self::row_to_entry).transpose()
    }

    /// The most recent entry strictly before `date`.
    pub async fn previous_entry(
        conn: &mut SqliteConnection,
        customer_id: CustomerId,
        date: NaiveDate,
    ) -> Result<Option<LedgerEntry>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {} FROM ledger_entries
            WHERE customer_id = ? AND entry_date < ?
            ORDER BY entry_date DESC
            LIMIT 1
            "#,
            ENTRY_COLUMNS
        ))
        .bind(customer_id.to_string())
        .bind(format_date(date))
        .fetch_optional(&mut *conn)
        .await
        .context("Failed to fetch previous ledger entry")?;

        row.as_ref().map(Self::row_to_entry).transpose()
    }

    /// All entries strictly after `date`, oldest first.
    pub async fn entries_after(
        conn: &mut SqliteConnection,
        customer_id: CustomerId,
        date: NaiveDate,
    ) -> Result<Vec<LedgerEntry>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {} FROM ledger_entries
            WHERE customer_id = ? AND entry_date > ?
            ORDER BY entry_date
            "#,
            ENTRY_COLUMNS
        ))
        .bind(customer_id.to_string())
        .bind(format_date(date))
        .fetch_all(&mut *conn)
        .await
        .context("Failed to fetch later ledger entries")?;

        rows.iter().map(Self::row_to_entry).collect()
    }

    /// Insert an entry, or overwrite the quantities of the existing one for
    /// the same (customer, date). The existing row keeps its id.
    pub async fn upsert_entry(conn: &mut SqliteConnection, entry: &LedgerEntry) -> Result<()> {
        sqlx::query(&format!(
            r#"
            INSERT INTO ledger_entries ({})
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (customer_id, entry_date) DO UPDATE SET
                delivered_qty = excluded.delivered_qty,
                collected_qty = excluded.collected_qty,
                holding_status = excluded.holding_status,
                notes = excluded.notes,
                updated_at = excluded.updated_at
            "#,
            ENTRY_COLUMNS
        ))
        .bind(entry.id.to_string())
        .bind(entry.customer_id.to_string())
        .bind(format_date(entry.date))
        .bind(entry.delivered_qty)
        .bind(entry.collected_qty)
        .bind(entry.holding_status)
        .bind(&entry.notes)
        .bind(entry.updated_at.to_rfc3339())
        .execute(&mut *conn)
        .await
        .context("Failed to save ledger entry")?;
        Ok(())
    }

    pub async fn update_holding(
        conn: &mut SqliteConnection,
        entry: &LedgerEntry,
    ) -> Result<()> {
        sqlx::query("UPDATE ledger_entries SET holding_status = ?, updated_at = ? WHERE id = ?")
            .bind(entry.holding_status)
            .bind(Utc::now().to_rfc3339())
            .bind(entry.id.to_string())
            .execute(&mut *conn)
            .await
            .context("Failed to update holding status")?;
        Ok(())
    }

    /// Holding at the end of the last entry strictly before `date` (0 if none).
    pub async fn holding_before(&self, customer_id: CustomerId, date: NaiveDate) -> Result<i64> {
        let row = sqlx::query(
            r#"
            SELECT holding_status FROM ledger_entries
            WHERE customer_id = ? AND entry_date < ?
            ORDER BY entry_date DESC
            LIMIT 1
            "#,
        )
        .bind(customer_id.to_string())
        .bind(format_date(date))
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch previous holding")?;

        Ok(row.map_or(0, |r| r.get("holding_status")))
    }

    /// All entries recorded for a given day.
    pub async fn list_entries_on(&self, date: NaiveDate) -> Result<Vec<LedgerEntry>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM ledger_entries WHERE entry_date = ?",
            ENTRY_COLUMNS
        ))
        .bind(format_date(date))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list ledger entries for date")?;

        rows.iter().map(Self::row_to_entry).collect()
    }

    /// Entries for `date` whose holding is still above zero.
    pub async fn list_outstanding_on(&self, date: NaiveDate) -> Result<Vec<LedgerEntry>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM ledger_entries WHERE entry_date = ? AND holding_status > 0",
            ENTRY_COLUMNS
        ))
        .bind(format_date(date))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list outstanding holdings")?;

        rows.iter().map(Self::row_to_entry).collect()
    }

    /// Entries in `[from, to)`, optionally for a single customer, ordered by date.
    pub async fn list_entries_between(
        &self,
        customer_id: Option<CustomerId>,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<LedgerEntry>> {
        let mut query = format!(
            "SELECT {} FROM ledger_entries WHERE entry_date >= ? AND entry_date < ?",
            ENTRY_COLUMNS
        );
        if customer_id.is_some() {
            query.push_str(" AND customer_id = ?");
        }
        query.push_str(" ORDER BY entry_date, customer_id");

        let mut sql_query = sqlx::query(&query)
            .bind(format_date(from))
            .bind(format_date(to));
        if let Some(id) = customer_id {
            sql_query = sql_query.bind(id.to_string());
        }

        let rows = sql_query
            .fetch_all(&self.pool)
            .await
            .context("Failed to list ledger entries")?;

        rows.iter().map(Self::row_to_entry).collect()
    }

    /// The latest entry per customer dated before `date`
    /// (or on it, when `inclusive` is set).
    pub async fn latest_entries(&self, date: NaiveDate, inclusive: bool) -> Result<Vec<LedgerEntry>> {
        let cmp = if inclusive { "<=" } else { "<" };
        let rows = sqlx::query(&format!(
            r#"
            SELECT {cols} FROM ledger_entries e
            WHERE e.entry_date = (
                SELECT MAX(entry_date) FROM ledger_entries
                WHERE customer_id = e.customer_id AND entry_date {cmp} ?
            )
            "#,
            cols = ENTRY_COLUMNS,
            cmp = cmp
        ))
        .bind(format_date(date))
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch latest ledger entries")?;

        rows.iter().map(Self::row_to_entry).collect()
    }

    fn row_to_entry(row: &SqliteRow) -> Result<LedgerEntry> {
        let id_str: String = row.get("id");
        let customer_str: String = row.get("customer_id");
        let date_str: String = row.get("entry_date");
        let updated_at_str: String = row.get("updated_at");

        Ok(LedgerEntry {
            id: Uuid::parse_str(&id_str).context("Invalid ledger entry ID")?,
            customer_id: Uuid::parse_str(&customer_str).context("Invalid customer ID")?,
            date: parse_date(&date_str).context("Invalid entry_date")?,
            delivered_qty: row.get("delivered_qty"),
            collected_qty: row.get("collected_qty"),
            holding_status: row.get("holding_status"),
            notes: row.get("notes"),
            updated_at: parse_timestamp(&updated_at_str).context("Invalid updated_at")?,
        })
    }

    // ========================
    // Price operations
    // ========================

    pub async fn get_active_prices(&self) -> Result<Option<PriceSettings>> {
        let row = sqlx::query(
            r#"
            SELECT id, shop_price, monthly_price, order_price, active, created_at
            FROM price_settings
            WHERE active = 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch active prices")?;

        row.as_ref().map(Self::row_to_prices).transpose()
    }

    /// All price rows, newest first.
    pub async fn list_price_history(&self) -> Result<Vec<PriceSettings>> {
        let rows = sqlx::query(
            r#"
            SELECT id, shop_price, monthly_price, order_price, active, created_at
            FROM price_settings
            ORDER BY rowid DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list price history")?;

        rows.iter().map(Self::row_to_prices).collect()
    }

    pub async fn deactivate_prices(conn: &mut SqliteConnection) -> Result<u64> {
        let result = sqlx::query("UPDATE price_settings SET active = 0 WHERE active = 1")
            .execute(&mut *conn)
            .await
            .context("Failed to deactivate prices")?;
        Ok(result.rows_affected())
    }

    pub async fn insert_prices(conn: &mut SqliteConnection, prices: &PriceSettings) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO price_settings (id, shop_price, monthly_price, order_price, active, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(prices.id.to_string())
        .bind(prices.shop_price)
        .bind(prices.monthly_price)
        .bind(prices.order_price)
        .bind(prices.active)
        .bind(prices.created_at.to_rfc3339())
        .execute(&mut *conn)
        .await
        .context("Failed to save prices")?;
        Ok(())
    }

    fn row_to_prices(row: &SqliteRow) -> Result<PriceSettings> {
        let id_str: String = row.get("id");
        let created_at_str: String = row.get("created_at");

        Ok(PriceSettings {
            id: Uuid::parse_str(&id_str).context("Invalid price settings ID")?,
            shop_price: row.get("shop_price"),
            monthly_price: row.get("monthly_price"),
            order_price: row.get("order_price"),
            active: row.get::<i32, _>("active") != 0,
            created_at: parse_timestamp(&created_at_str).context("Invalid created_at")?,
        })
    }

    // ========================
    // Monthly bill operations
    // ========================

    /// Insert a bill, or update the one saved for the same (customer, month).
    pub async fn upsert_bill(conn: &mut SqliteConnection, bill: &MonthlyBill) -> Result<()> {
        sqlx::query(&format!(
            r#"
            INSERT INTO monthly_bills ({})
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (customer_id, bill_month) DO UPDATE SET
                total_cans_delivered = excluded.total_cans_delivered,
                total_delivery_days = excluded.total_delivery_days,
                unit_price_cents = excluded.unit_price_cents,
                bill_amount_cents = excluded.bill_amount_cents,
                paid = excluded.paid,
                sent = excluded.sent,
                updated_at = excluded.updated_at
            "#,
            BILL_COLUMNS
        ))
        .bind(bill.customer_id.to_string())
        .bind(bill.bill_month.as_string())
        .bind(bill.total_cans_delivered)
        .bind(bill.total_delivery_days)
        .bind(bill.unit_price_cents)
        .bind(bill.bill_amount_cents)
        .bind(bill.paid)
        .bind(bill.sent)
        .bind(bill.updated_at.to_rfc3339())
        .execute(&mut *conn)
        .await
        .context("Failed to save monthly bill")?;
        Ok(())
    }

    pub async fn get_bill(
        &self,
        customer_id: CustomerId,
        month: BillMonth,
    ) -> Result<Option<MonthlyBill>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM monthly_bills WHERE customer_id = ? AND bill_month = ?",
            BILL_COLUMNS
        ))
        .bind(customer_id.to_string())
        .bind(month.as_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch monthly bill")?;

        row.as_ref().map(Self::row_to_bill).transpose()
    }

    pub async fn list_bills(&self, month: BillMonth) -> Result<Vec<MonthlyBill>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM monthly_bills WHERE bill_month = ?",
            BILL_COLUMNS
        ))
        .bind(month.as_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list monthly bills")?;

        rows.iter().map(Self::row_to_bill).collect()
    }

    /// Set the paid and/or sent flag of a saved bill. Returns the number of rows touched.
    pub async fn set_bill_flags(
        &self,
        customer_id: CustomerId,
        month: BillMonth,
        paid: Option<bool>,
        sent: Option<bool>,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE monthly_bills
            SET paid = COALESCE(?, paid), sent = COALESCE(?, sent), updated_at = ?
            WHERE customer_id = ? AND bill_month = ?
            "#,
        )
        .bind(paid)
        .bind(sent)
        .bind(Utc::now().to_rfc3339())
        .bind(customer_id.to_string())
        .bind(month.as_string())
        .execute(&self.pool)
        .await
        .context("Failed to update bill flags")?;
        Ok(result.rows_affected())
    }

    fn row_to_bill(row: &SqliteRow) -> Result<MonthlyBill> {
        let customer_str: String = row.get("customer_id");
        let month_str: String = row.get("bill_month");
        let updated_at_str: String = row.get("updated_at");

        Ok(MonthlyBill {
            customer_id: Uuid::parse_str(&customer_str).context("Invalid customer ID")?,
            bill_month: month_str
                .parse::<BillMonth>()
                .with_context(|| format!("Invalid bill month: {}", month_str))?,
            total_cans_delivered: row.get("total_cans_delivered"),
            total_delivery_days: row.get("total_delivery_days"),
            unit_price_cents: row.get("unit_price_cents"),
            bill_amount_cents: row.get("bill_amount_cents"),
            paid: row.get::<i32, _>("paid") != 0,
            sent: row.get::<i32, _>("sent") != 0,
            updated_at: parse_timestamp(&updated_at_str).context("Invalid updated_at")?,
        })
    }

    // ========================
    // Order operations
    // ========================

    pub async fn save_order(&self, order: &Order) -> Result<()> {
        sqlx::query(&format!(
            "INSERT INTO orders ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            ORDER_COLUMNS
        ))
        .bind(order.id.to_string())
        .bind(&order.customer_name)
        .bind(&order.phone)
        .bind(&order.address)
        .bind(order.can_qty)
        .bind(format_date(order.delivery_date))
        .bind(order.status.as_str())
        .bind(order.collected_qty)
        .bind(order.collection_date.map(format_date))
        .bind(&order.notes)
        .bind(order.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save order")?;
        Ok(())
    }

    /// Persist status and collection fields of an existing order.
    pub async fn update_order_status(&self, order: &Order) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE orders
            SET status = ?, collected_qty = ?, collection_date = ?
            WHERE id = ?
            "#,
        )
        .bind(order.status.as_str())
        .bind(order.collected_qty)
        .bind(order.collection_date.map(format_date))
        .bind(order.id.to_string())
        .execute(&self.pool)
        .await
        .context("Failed to update order")?;
        Ok(())
    }

    pub async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!("SELECT {} FROM orders WHERE id = ?", ORDER_COLUMNS))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch order")?;

        row.as_ref().map(Self::row_to_order).transpose()
    }

    /// List orders by delivery date, optionally filtered by status.
    pub async fn list_orders(&self, status: Option<OrderStatus>) -> Result<Vec<Order>> {
        let mut query = format!("SELECT {} FROM orders", ORDER_COLUMNS);
        if status.is_some() {
            query.push_str(" WHERE status = ?");
        }
        query.push_str(" ORDER BY delivery_date, created_at");

        let mut sql_query = sqlx::query(&query);
        if let Some(status) = status {
            sql_query = sql_query.bind(status.as_str());
        }

        let rows = sql_query
            .fetch_all(&self.pool)
            .await
            .context("Failed to list orders")?;

        rows.iter().map(Self::row_to_order).collect()
    }

    fn row_to_order(row: &SqliteRow) -> Result<Order> {
        let id_str: String = row.get("id");
        let status_str: String = row.get("status");
        let delivery_str: String = row.get("delivery_date");
        let collection_str: Option<String> = row.get("collection_date");
        let created_at_str: String = row.get("created_at");

        Ok(Order {
            id: Uuid::parse_str(&id_str).context("Invalid order ID")?,
            customer_name: row.get("customer_name"),
            phone: row.get("phone"),
            address: row.get("address"),
            can_qty: row.get("can_qty"),
            delivery_date: parse_date(&delivery_str).context("Invalid delivery_date")?,
            status: OrderStatus::from_str(&status_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid order status: {}", status_str))?,
            collected_qty: row.get("collected_qty"),
            collection_date: collection_str
                .as_deref()
                .map(parse_date)
                .transpose()
                .context("Invalid collection_date")?,
            notes: row.get("notes"),
            created_at: parse_timestamp(&created_at_str).context("Invalid created_at")?,
        })
    }
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    Ok(NaiveDate::parse_from_str(s, DATE_FORMAT)?)
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc))
}
