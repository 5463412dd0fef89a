use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::application::{parse_day, parse_month, parse_price, DeliveryService, NewCustomer, NewOrder};
use crate::domain::{format_cents, CustomerPatch, CustomerType, Order, OrderId, OrderStatus};

/// canledger - can delivery and billing ledger
#[derive(Parser)]
#[command(name = "canledger")]
#[command(about = "Track daily can deliveries, collections and monthly bills")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "CANLEDGER_DB", default_value = "canledger.db")]
    pub database: String,

    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Customer management commands
    #[command(subcommand)]
    Customer(CustomerCommands),

    /// Daily delivery/collection entries
    #[command(subcommand)]
    Day(DayCommands),

    /// Customers with cans to collect on a date (holding left the day before)
    Collect {
        /// Reference date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,

        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Cans currently held by each customer
    Holdings {
        /// As of date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,
    },

    /// Show a customer's ledger for a month
    Ledger {
        /// Customer name
        customer: String,

        /// Month (YYYY-MM)
        #[arg(long)]
        month: String,

        /// Output format: table, csv
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Monthly billing commands
    #[command(subcommand)]
    Bill(BillCommands),

    /// Unit price commands
    #[command(subcommand)]
    Price(PriceCommands),

    /// One-off order commands
    #[command(subcommand)]
    Order(OrderCommands),
}

#[derive(Subcommand)]
pub enum CustomerCommands {
    /// Create a new customer
    Create {
        /// Customer name (must be unique)
        name: String,

        /// Customer type: shop, monthly, order
        #[arg(short = 't', long = "type")]
        customer_type: String,

        /// Default cans per delivery
        #[arg(long, default_value = "0")]
        cans: i64,

        #[arg(long)]
        phone: Option<String>,

        #[arg(long)]
        address: Option<String>,

        /// Advance paid (e.g., "500.00")
        #[arg(long)]
        advance: Option<String>,
    },

    /// List customers
    List {
        /// Include deactivated customers
        #[arg(long)]
        all: bool,
    },

    /// Show a customer
    Show {
        /// Customer name
        name: String,
    },

    /// Edit a customer
    Update {
        /// Current customer name
        name: String,

        /// New name
        #[arg(long)]
        rename: Option<String>,

        /// Customer type: shop, monthly, order
        #[arg(short = 't', long = "type")]
        customer_type: Option<String>,

        #[arg(long)]
        cans: Option<i64>,

        #[arg(long)]
        phone: Option<String>,

        #[arg(long)]
        address: Option<String>,

        #[arg(long)]
        advance: Option<String>,
    },

    /// Deactivate a customer (ledger and bills are kept)
    Deactivate {
        /// Customer name
        name: String,
    },
}

#[derive(Subcommand)]
pub enum DayCommands {
    /// Record deliveries and collections for a customer on a day
    Record {
        /// Customer name
        customer: String,

        /// Date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,

        /// Cans delivered
        #[arg(long, default_value = "0")]
        delivered: i64,

        /// Empty cans collected
        #[arg(long, default_value = "0")]
        collected: i64,

        #[arg(short, long)]
        notes: Option<String>,
    },

    /// Show every active customer with their entry for a day
    Sheet {
        /// Date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,
    },

    /// Import day entries from CSV (customer,date,delivered,collected,notes)
    Import {
        /// Input file (stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,

        /// Validate without recording
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Subcommand)]
pub enum BillCommands {
    /// Compute bills for a month from the ledger
    Summary {
        /// Month (YYYY-MM)
        #[arg(long)]
        month: String,

        /// Output format: table, json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Compute and save bills for a month
    Finalize {
        /// Month (YYYY-MM)
        #[arg(long)]
        month: String,
    },

    /// Save a batch of bills from a JSON array (all or nothing)
    Save {
        /// Input file (stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,

        /// Validate without saving
        #[arg(long)]
        dry_run: bool,
    },

    /// List saved bills for a month
    List {
        /// Month (YYYY-MM)
        #[arg(long)]
        month: String,
    },

    /// Mark a saved bill as paid
    Paid {
        customer: String,

        #[arg(long)]
        month: String,

        /// Clear the flag instead of setting it
        #[arg(long)]
        undo: bool,
    },

    /// Mark a saved bill as sent
    Sent {
        customer: String,

        #[arg(long)]
        month: String,

        /// Clear the flag instead of setting it
        #[arg(long)]
        undo: bool,
    },

    /// Export a month's bills
    Export {
        #[arg(long)]
        month: String,

        /// Format: csv, json
        #[arg(short, long, default_value = "csv")]
        format: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum PriceCommands {
    /// Show the active prices
    Show,

    /// Replace the active prices
    Set {
        /// Price per can for shops (e.g., "20.00")
        #[arg(long)]
        shop: String,

        /// Price per can for monthly customers
        #[arg(long)]
        monthly: String,

        /// Price per can for order customers
        #[arg(long)]
        order: String,
    },

    /// Show all price changes, newest first
    History,
}

#[derive(Subcommand)]
pub enum OrderCommands {
    /// Create a one-off order
    Create {
        /// Customer name
        customer: String,

        /// Cans ordered
        #[arg(long)]
        cans: i64,

        /// Delivery date (YYYY-MM-DD)
        #[arg(long)]
        date: String,

        #[arg(long)]
        phone: Option<String>,

        #[arg(long)]
        address: Option<String>,

        #[arg(short, long)]
        notes: Option<String>,
    },

    /// List orders
    List {
        /// Filter by status: pending, delivered, collected
        #[arg(long)]
        status: Option<String>,
    },

    /// Show an order
    Show { id: String },

    /// Mark an order as delivered
    Deliver { id: String },

    /// Record cans collected back from an order
    Collect {
        id: String,

        /// Cans collected
        #[arg(long)]
        cans: i64,

        /// Collection date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Init => {
                DeliveryService::init(&self.database).await?;
                println!("Database initialized: {}", self.database);
            }

            Commands::Customer(cmd) => {
                let service = DeliveryService::connect(&self.database).await?;
                run_customer_command(&service, cmd).await?;
            }

            Commands::Day(cmd) => {
                let service = DeliveryService::connect(&self.database).await?;
                run_day_command(&service, cmd).await?;
            }

            Commands::Collect { date, format } => {
                check_format(&format, &["table", "json"])?;
                let service = DeliveryService::connect(&self.database).await?;
                let reference = date_or_today(date.as_deref())?;
                let candidates = service.collection_candidates(reference).await?;

                if format == "json" {
                    println!("{}", serde_json::to_string_pretty(&candidates)?);
                } else if candidates.is_empty() {
                    println!("Nothing to collect on {}.", reference);
                } else {
                    println!("To collect on {}:", reference);
                    println!("{:<24} {:>8} {:<16} {}", "CUSTOMER", "CANS", "PHONE", "ADDRESS");
                    println!("{}", "-".repeat(70));
                    for c in &candidates {
                        println!(
                            "{:<24} {:>8} {:<16} {}",
                            truncate(&c.customer_name, 24),
                            c.holding,
                            c.phone.as_deref().unwrap_or("-"),
                            c.address.as_deref().unwrap_or("-")
                        );
                    }
                }
            }

            Commands::Holdings { date } => {
                let service = DeliveryService::connect(&self.database).await?;
                let as_of = date_or_today(date.as_deref())?;
                let rows = service.holding_summary(as_of).await?;

                println!("Holdings as of {}", as_of);
                println!("{:<24} {:<8} {:>8} {:<12}", "CUSTOMER", "TYPE", "CANS", "LAST ENTRY");
                println!("{}", "-".repeat(56));
                let mut total = 0;
                for row in &rows {
                    total += row.holding;
                    println!(
                        "{:<24} {:<8} {:>8} {:<12}",
                        truncate(&row.customer_name, 24),
                        row.customer_type,
                        row.holding,
                        row.last_entry_date
                            .map(|d| d.to_string())
                            .unwrap_or_else(|| "-".to_string())
                    );
                }
                println!("{}", "-".repeat(56));
                println!("{:<33} {:>8}", "TOTAL", total);
            }

            Commands::Ledger {
                customer,
                month,
                format,
            } => {
                check_format(&format, &["table", "csv"])?;
                let service = DeliveryService::connect(&self.database).await?;
                let month = parse_month(&month)?;

                if format == "csv" {
                    let exporter = crate::io::Exporter::new(&service);
                    exporter
                        .export_ledger_csv(&customer, month, std::io::stdout())
                        .await?;
                } else {
                    let ledger = service.customer_ledger(&customer, month).await?;
                    println!("Ledger: {} ({})", ledger.customer.name, ledger.month);
                    println!("Opening holding: {}", ledger.opening_holding);
                    println!();
                    println!(
                        "{:<12} {:>10} {:>10} {:>8}  {}",
                        "DATE", "DELIVERED", "COLLECTED", "HOLDING", "NOTES"
                    );
                    println!("{}", "-".repeat(60));
                    for e in &ledger.entries {
                        println!(
                            "{:<12} {:>10} {:>10} {:>8}  {}",
                            e.date,
                            e.delivered_qty,
                            e.collected_qty,
                            e.holding_status,
                            e.notes.as_deref().unwrap_or("")
                        );
                    }
                    println!("{}", "-".repeat(60));
                    println!(
                        "{:<12} {:>10} {:>10} {:>8}",
                        "TOTAL", ledger.total_delivered, ledger.total_collected, ledger.closing_holding
                    );
                }
            }

            Commands::Bill(cmd) => {
                let service = DeliveryService::connect(&self.database).await?;
                run_bill_command(&service, cmd).await?;
            }

            Commands::Price(cmd) => {
                let service = DeliveryService::connect(&self.database).await?;
                run_price_command(&service, cmd).await?;
            }

            Commands::Order(cmd) => {
                let service = DeliveryService::connect(&self.database).await?;
                run_order_command(&service, cmd).await?;
            }
        }

        Ok(())
    }
}

async fn run_customer_command(service: &DeliveryService, cmd: CustomerCommands) -> Result<()> {
    match cmd {
        CustomerCommands::Create {
            name,
            customer_type,
            cans,
            phone,
            address,
            advance,
        } => {
            let customer = service
                .create_customer(NewCustomer {
                    name,
                    customer_type: parse_customer_type(&customer_type)?,
                    can_qty: cans,
                    phone,
                    address,
                    advance_cents: advance.as_deref().map(parse_price).transpose()?,
                })
                .await?;
            println!(
                "Created customer: {} ({}, {} cans)",
                customer.name, customer.customer_type, customer.can_qty
            );
        }

        CustomerCommands::List { all } => {
            let customers = service.list_customers(all).await?;
            if customers.is_empty() {
                println!("No customers found.");
            } else {
                println!("{:<24} {:<8} {:>6} {:<16}", "NAME", "TYPE", "CANS", "PHONE");
                println!("{}", "-".repeat(58));
                for c in customers {
                    let marker = if c.is_active() { "" } else { " (inactive)" };
                    println!(
                        "{:<24} {:<8} {:>6} {:<16}{}",
                        truncate(&c.name, 24),
                        c.customer_type,
                        c.can_qty,
                        c.phone.as_deref().unwrap_or("-"),
                        marker
                    );
                }
            }
        }

        CustomerCommands::Show { name } => {
            let c = service.get_customer(&name).await?;
            println!("Customer: {}", c.name);
            println!("  ID:          {}", c.id);
            println!("  Type:        {}", c.customer_type);
            println!("  Cans:        {}", c.can_qty);
            println!("  Phone:       {}", c.phone.as_deref().unwrap_or("-"));
            println!("  Address:     {}", c.address.as_deref().unwrap_or("-"));
            if let Some(advance) = c.advance_cents {
                println!("  Advance:     {}", format_cents(advance));
            }
            println!("  Created:     {}", c.created_at.format("%Y-%m-%d %H:%M:%S"));
            if let Some(at) = c.deactivated_at {
                println!("  Deactivated: {}", at.format("%Y-%m-%d %H:%M:%S"));
            }
        }

        CustomerCommands::Update {
            name,
            rename,
            customer_type,
            cans,
            phone,
            address,
            advance,
        } => {
            let patch = CustomerPatch {
                name: rename,
                phone,
                address,
                customer_type: customer_type
                    .as_deref()
                    .map(parse_customer_type)
                    .transpose()?,
                can_qty: cans,
                advance_cents: advance.as_deref().map(parse_price).transpose()?,
            };
            let customer = service.update_customer(&name, patch).await?;
            println!("Updated customer: {}", customer.name);
        }

        CustomerCommands::Deactivate { name } => {
            let customer = service.deactivate_customer(&name).await?;
            println!("Deactivated customer: {}", customer.name);
        }
    }

    Ok(())
}

async fn run_day_command(service: &DeliveryService, cmd: DayCommands) -> Result<()> {
    match cmd {
        DayCommands::Record {
            customer,
            date,
            delivered,
            collected,
            notes,
        } => {
            let date = date_or_today(date.as_deref())?;
            let result = service
                .record_day(&customer, date, delivered, collected, notes)
                .await?;

            let action = if result.created { "Recorded" } else { "Updated" };
            println!(
                "{} {} on {}: +{} -{} => holding {} (was {})",
                action,
                result.customer_name,
                result.entry.date,
                result.entry.delivered_qty,
                result.entry.collected_qty,
                result.entry.holding_status,
                result.previous_holding
            );
            if result.rechained > 0 {
                println!("  Recomputed {} later entries", result.rechained);
            }
        }

        DayCommands::Sheet { date } => {
            let date = date_or_today(date.as_deref())?;
            let rows = service.day_sheet(date).await?;

            println!("Day sheet for {}", date);
            println!(
                "{:<24} {:>6} {:>10} {:>10} {:>8}",
                "CUSTOMER", "PREV", "DELIVERED", "COLLECTED", "HOLDING"
            );
            println!("{}", "-".repeat(62));
            for row in &rows {
                match &row.entry {
                    Some(e) => println!(
                        "{:<24} {:>6} {:>10} {:>10} {:>8}",
                        truncate(&row.customer.name, 24),
                        row.previous_holding,
                        e.delivered_qty,
                        e.collected_qty,
                        e.holding_status
                    ),
                    None => println!(
                        "{:<24} {:>6} {:>10} {:>10} {:>8}",
                        truncate(&row.customer.name, 24),
                        row.previous_holding,
                        "-",
                        "-",
                        row.previous_holding
                    ),
                }
            }
        }

        DayCommands::Import { input, dry_run } => {
            use crate::io::{ImportOptions, Importer};

            let importer = Importer::new(service);
            let reader = open_input(input.as_deref())?;
            let result = importer
                .import_entries_csv(reader, ImportOptions { dry_run })
                .await?;
            print_import_result(&result, dry_run);
        }
    }

    Ok(())
}

async fn run_bill_command(service: &DeliveryService, cmd: BillCommands) -> Result<()> {
    match cmd {
        BillCommands::Summary { month, format } => {
            check_format(&format, &["table", "json", "csv"])?;
            let month = parse_month(&month)?;

            match format.as_str() {
                "json" => {
                    let summary = service.monthly_summary(month).await?;
                    println!("{}", serde_json::to_string_pretty(&summary)?);
                }
                "csv" => {
                    crate::io::Exporter::new(service)
                        .export_bills_csv(month, std::io::stdout())
                        .await?;
                }
                _ => {
                    let summary = service.monthly_summary(month).await?;
                    println!("Bills for {}", summary.month);
                    println!();
                    println!(
                        "{:<24} {:<8} {:>6} {:>5} {:>10} {:>12} {:>5} {:>5}",
                        "CUSTOMER", "TYPE", "CANS", "DAYS", "PRICE", "AMOUNT", "PAID", "SENT"
                    );
                    println!("{}", "-".repeat(84));
                    for row in &summary.rows {
                        println!(
                            "{:<24} {:<8} {:>6} {:>5} {:>10} {:>12} {:>5} {:>5}",
                            truncate(&row.customer_name, 24),
                            row.customer_type,
                            row.bill.total_cans_delivered,
                            row.bill.total_delivery_days,
                            format_cents(row.bill.unit_price_cents),
                            format_cents(row.bill.bill_amount_cents),
                            yes_no(row.bill.paid),
                            yes_no(row.bill.sent)
                        );
                    }
                    println!("{}", "-".repeat(84));
                    println!(
                        "{:<33} {:>6} {:>29}",
                        "TOTAL",
                        summary.total_cans,
                        format_cents(summary.total_amount)
                    );
                }
            }
        }

        BillCommands::Finalize { month } => {
            let month = parse_month(&month)?;
            let count = service.finalize_month(month).await?;
            println!("Saved {} bills for {}", count, month);
        }

        BillCommands::Save { input, dry_run } => {
            use crate::io::{ImportOptions, Importer};

            let importer = Importer::new(service);
            let reader = open_input(input.as_deref())?;
            let result = importer
                .import_bills_json(reader, ImportOptions { dry_run })
                .await?;
            print_import_result(&result, dry_run);
        }

        BillCommands::List { month } => {
            let month = parse_month(&month)?;
            let bills = service.list_bills(month).await?;
            if bills.is_empty() {
                println!("No saved bills for {}.", month);
            } else {
                println!(
                    "{:<24} {:>6} {:>12} {:>5} {:>5}",
                    "CUSTOMER", "CANS", "AMOUNT", "PAID", "SENT"
                );
                println!("{}", "-".repeat(56));
                for view in &bills {
                    println!(
                        "{:<24} {:>6} {:>12} {:>5} {:>5}",
                        truncate(&view.customer_name, 24),
                        view.bill.total_cans_delivered,
                        format_cents(view.bill.bill_amount_cents),
                        yes_no(view.bill.paid),
                        yes_no(view.bill.sent)
                    );
                }
            }
        }

        BillCommands::Paid {
            customer,
            month,
            undo,
        } => {
            let month = parse_month(&month)?;
            let bill = service.mark_bill_paid(&customer, month, !undo).await?;
            println!(
                "Bill {} {}: paid = {}",
                customer,
                bill.bill_month,
                yes_no(bill.paid)
            );
        }

        BillCommands::Sent {
            customer,
            month,
            undo,
        } => {
            let month = parse_month(&month)?;
            let bill = service.mark_bill_sent(&customer, month, !undo).await?;
            println!(
                "Bill {} {}: sent = {}",
                customer,
                bill.bill_month,
                yes_no(bill.sent)
            );
        }

        BillCommands::Export {
            month,
            format,
            output,
        } => {
            use std::fs::File;
            use std::io::{stdout, Write};

            check_format(&format, &["csv", "json"])?;
            let month = parse_month(&month)?;
            let exporter = crate::io::Exporter::new(service);
            let writer: Box<dyn Write> = match &output {
                Some(path) => Box::new(
                    File::create(path)
                        .with_context(|| format!("Failed to create output file: {}", path))?,
                ),
                None => Box::new(stdout()),
            };

            match format.as_str() {
                "json" => {
                    let statement = exporter.export_bills_json(month, writer).await?;
                    eprintln!("Exported {} bills", statement.bills.len());
                }
                "csv" => {
                    let count = exporter.export_bills_csv(month, writer).await?;
                    eprintln!("Exported {} bills", count);
                }
                other => anyhow::bail!("Invalid format '{}'. Valid formats: csv, json", other),
            }
        }
    }

    Ok(())
}

async fn run_price_command(service: &DeliveryService, cmd: PriceCommands) -> Result<()> {
    match cmd {
        PriceCommands::Show => {
            let prices = service.active_prices().await?;
            println!("Active prices (since {})", prices.created_at.format("%Y-%m-%d"));
            println!("  Shop:     {}", format_cents(prices.shop_price));
            println!("  Monthly:  {}", format_cents(prices.monthly_price));
            println!("  Order:    {}", format_cents(prices.order_price));
        }

        PriceCommands::Set {
            shop,
            monthly,
            order,
        } => {
            let prices = service
                .set_prices(parse_price(&shop)?, parse_price(&monthly)?, parse_price(&order)?)
                .await?;
            println!(
                "Prices updated: shop {}, monthly {}, order {}",
                format_cents(prices.shop_price),
                format_cents(prices.monthly_price),
                format_cents(prices.order_price)
            );
        }

        PriceCommands::History => {
            let history = service.price_history().await?;
            if history.is_empty() {
                println!("No prices set.");
            } else {
                println!(
                    "{:<20} {:>10} {:>10} {:>10} {:>7}",
                    "SET AT", "SHOP", "MONTHLY", "ORDER", "ACTIVE"
                );
                println!("{}", "-".repeat(61));
                for p in &history {
                    println!(
                        "{:<20} {:>10} {:>10} {:>10} {:>7}",
                        p.created_at.format("%Y-%m-%d %H:%M"),
                        format_cents(p.shop_price),
                        format_cents(p.monthly_price),
                        format_cents(p.order_price),
                        yes_no(p.active)
                    );
                }
            }
        }
    }

    Ok(())
}

async fn run_order_command(service: &DeliveryService, cmd: OrderCommands) -> Result<()> {
    match cmd {
        OrderCommands::Create {
            customer,
            cans,
            date,
            phone,
            address,
            notes,
        } => {
            let order = service
                .create_order(NewOrder {
                    customer_name: customer,
                    phone,
                    address,
                    can_qty: cans,
                    delivery_date: parse_day(&date)?,
                    notes,
                })
                .await?;
            println!("Created order {}", order.id);
            print_order(&order);
        }

        OrderCommands::List { status } => {
            let status = status
                .as_deref()
                .map(|s| {
                    OrderStatus::from_str(s).with_context(|| {
                        format!(
                            "Invalid status '{}'. Valid statuses: pending, delivered, collected",
                            s
                        )
                    })
                })
                .transpose()?;
            let orders = service.list_orders(status).await?;

            if orders.is_empty() {
                println!("No orders found.");
            } else {
                println!(
                    "{:<36} {:<20} {:>5} {:<12} {:<10}",
                    "ID", "CUSTOMER", "CANS", "DELIVERY", "STATUS"
                );
                println!("{}", "-".repeat(87));
                for o in &orders {
                    println!(
                        "{:<36} {:<20} {:>5} {:<12} {:<10}",
                        o.id,
                        truncate(&o.customer_name, 20),
                        o.can_qty,
                        o.delivery_date,
                        o.status
                    );
                }
            }
        }

        OrderCommands::Show { id } => {
            let order = service.get_order(parse_order_id(&id)?).await?;
            print_order(&order);
        }

        OrderCommands::Deliver { id } => {
            let order = service.mark_order_delivered(parse_order_id(&id)?).await?;
            println!("Order {} delivered", order.id);
        }

        OrderCommands::Collect { id, cans, date } => {
            let date = date_or_today(date.as_deref())?;
            let order = service
                .collect_order(parse_order_id(&id)?, cans, date)
                .await?;
            println!(
                "Order {} collected: {} of {} cans ({} outstanding)",
                order.id,
                order.collected_qty,
                order.can_qty,
                order.outstanding()
            );
        }
    }

    Ok(())
}

fn print_order(order: &Order) {
    println!("Order: {}", order.id);
    println!("  Customer:    {}", order.customer_name);
    println!("  Phone:       {}", order.phone.as_deref().unwrap_or("-"));
    println!("  Address:     {}", order.address.as_deref().unwrap_or("-"));
    println!("  Cans:        {}", order.can_qty);
    println!("  Delivery:    {}", order.delivery_date);
    println!("  Status:      {}", order.status);
    if let Some(date) = order.collection_date {
        println!("  Collected:   {} on {}", order.collected_qty, date);
    }
    if let Some(notes) = &order.notes {
        println!("  Notes:       {}", notes);
    }
}

fn print_import_result(result: &crate::io::ImportResult, dry_run: bool) {
    if dry_run {
        println!("Validation complete");
    } else {
        println!("Import complete");
    }
    println!("  Imported: {}", result.imported);
    println!("  Skipped:  {}", result.skipped);
    println!("  Errors:   {}", result.errors.len());

    if !result.errors.is_empty() {
        println!("\nErrors:");
        for error in result.errors.iter().take(10) {
            let field = error
                .field
                .as_ref()
                .map(|f| format!("{}: ", f))
                .unwrap_or_default();
            println!("  Line {}: {}{}", error.line, field, error.error);
        }
        if result.errors.len() > 10 {
            println!("  ... and {} more errors", result.errors.len() - 10);
        }
    }
}

fn open_input(path: Option<&str>) -> Result<Box<dyn std::io::Read>> {
    match path {
        Some(path) => {
            let file = std::fs::File::open(path)
                .with_context(|| format!("Failed to open input file: {}", path))?;
            Ok(Box::new(file))
        }
        None => Ok(Box::new(std::io::stdin())),
    }
}

fn date_or_today(date: Option<&str>) -> Result<NaiveDate> {
    match date {
        Some(s) => Ok(parse_day(s)?),
        None => Ok(Utc::now().date_naive()),
    }
}

fn parse_customer_type(s: &str) -> Result<CustomerType> {
    CustomerType::from_str(s).with_context(|| {
        format!(
            "Invalid customer type '{}'. Valid types: shop, monthly, order",
            s
        )
    })
}

fn parse_order_id(s: &str) -> Result<OrderId> {
    Uuid::parse_str(s.trim()).with_context(|| format!("Invalid order ID: {}", s))
}

fn check_format(format: &str, valid: &[&str]) -> Result<()> {
    if !valid.contains(&format) {
        anyhow::bail!(
            "Invalid format '{}'. Valid formats: {}",
            format,
            valid.join(", ")
        );
    }
    Ok(())
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_format() {
        assert!(check_format("csv", &["table", "csv"]).is_ok());
        let err = check_format("xml", &["table", "csv"]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid format 'xml'. Valid formats: table, csv"
        );
    }

    #[tokio::test]
    async fn test_unknown_format_rejected_before_output() {
        let temp = tempfile::TempDir::new().unwrap();
        let db_path = temp.path().join("cli.db");
        let db = db_path.to_str().unwrap();
        DeliveryService::init(db).await.unwrap();

        for args in [
            vec!["collect", "--format", "xml"],
            vec!["ledger", "Hotel Sagar", "--month", "2024-03", "--format", "json"],
            vec!["bill", "summary", "--month", "2024-03", "--format", "pdf"],
            vec!["bill", "export", "--month", "2024-03", "--format", "table"],
        ] {
            let cli = Cli::try_parse_from(
                ["canledger", "--database", db].into_iter().chain(args.iter().copied()),
            )
            .unwrap();
            let err = cli.run().await.unwrap_err();
            assert!(
                err.to_string().starts_with("Invalid format"),
                "{:?}: {}",
                args,
                err
            );
        }
    }
}
