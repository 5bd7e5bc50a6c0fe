use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use sqlx::SqlitePool;

use mostrador_lib::catalog::clients::ClientInput;
use mostrador_lib::catalog::products::ProductInput;
use mostrador_lib::catalog::{categories, clients, products, regions};
use mostrador_lib::{db, export, import, invoicing, migrate, money, reporting, seed};
use mostrador_lib::{AppError, InvoiceInput};

#[derive(Debug, Parser)]
#[command(
    name = "mostrador",
    about = "Inventory and invoicing for a single retail counter",
    version
)]
struct Cli {
    /// Database file. Falls back to MOSTRADOR_DB, then the platform data dir.
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance and inspection commands.
    #[command(subcommand)]
    Db(DbCommand),
    /// Append per-table CSV files from a directory into the store.
    Import {
        /// Directory holding `<table>.csv` files.
        #[arg(long)]
        dir: PathBuf,
    },
    /// Export every table as CSV and JSON plus a manifest.
    Export {
        /// Parent directory for the export bundle.
        #[arg(long)]
        out: PathBuf,
    },
    /// Sales dashboard: top products and categories by quantity sold.
    Report {
        /// Emit raw JSON instead of the table view.
        #[arg(long)]
        json: bool,
    },
    /// Invoice operations.
    #[command(subcommand)]
    Invoice(InvoiceCommand),
    /// Product catalog.
    #[command(subcommand)]
    Product(ProductCommand),
    /// Clients.
    #[command(subcommand)]
    Client(ClientCommand),
    /// Product categories.
    #[command(subcommand)]
    Category(NameCommand),
    /// Client regions.
    #[command(subcommand)]
    Region(NameCommand),
}

#[derive(Debug, Subcommand)]
enum DbCommand {
    /// Create the database, apply migrations and seed first-run reference data.
    Init,
    /// Report schema version, integrity checks and per-table row counts.
    Status {
        /// Emit the raw JSON report instead of the table view.
        #[arg(long)]
        json: bool,
    },
    /// Delete the database file.
    Reset(ResetArgs),
}

#[derive(Debug, Args)]
struct ResetArgs {
    /// Required confirmation; without it the command refuses to run.
    #[arg(long)]
    yes: bool,
}

#[derive(Debug, Subcommand)]
enum InvoiceCommand {
    /// List all invoices with recomputed totals.
    List {
        #[arg(long)]
        json: bool,
    },
    /// Show one invoice with its lines and total.
    Show { id: String },
    /// Create an invoice from a JSON payload:
    /// {"client_id": "...", "date": "YYYY-MM-DD", "lines": [{"product_id": "...", "quantity": N}]}
    Create {
        #[arg(long)]
        input: PathBuf,
    },
    /// Replace an invoice's header and lines from a JSON payload.
    Edit {
        id: String,
        #[arg(long)]
        input: PathBuf,
    },
    /// Delete an invoice, releasing its stock.
    Delete { id: String },
}

#[derive(Debug, Subcommand)]
enum ProductCommand {
    List {
        #[arg(long)]
        json: bool,
    },
    Add {
        #[arg(long)]
        description: String,
        /// Unit price as a decimal, e.g. 1499.90
        #[arg(long)]
        price: String,
        #[arg(long, default_value_t = 0)]
        stock: i64,
        /// Category id.
        #[arg(long)]
        category: String,
    },
    Edit {
        id: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        price: String,
        #[arg(long)]
        category: String,
    },
    /// Correct the on-hand quantity outside the invoice flow.
    SetStock { id: String, stock: i64 },
    Delete { id: String },
}

#[derive(Debug, Subcommand)]
enum ClientCommand {
    List {
        #[arg(long)]
        json: bool,
    },
    Add {
        #[arg(long)]
        name: String,
        /// Region id.
        #[arg(long)]
        region: String,
        #[arg(long)]
        address: String,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
    Edit {
        id: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        region: String,
        #[arg(long)]
        address: String,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
    Delete { id: String },
}

/// Categories and regions share the same flat shape: id plus a name.
#[derive(Debug, Subcommand)]
enum NameCommand {
    List {
        #[arg(long)]
        json: bool,
    },
    Add { name: String },
    Rename { id: String, name: String },
    Delete { id: String },
}

fn main() {
    mostrador_lib::init_logging();

    let cli = Cli::parse();
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(err) => {
            eprintln!("Error: failed to start async runtime: {err}");
            process::exit(1);
        }
    };

    match runtime.block_on(handle_cli(cli)) {
        Ok(code) => process::exit(code),
        Err(err) => {
            eprintln!("Error: {err:#}");
            process::exit(1);
        }
    }
}

fn resolve_db_path(cli_db: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = cli_db {
        return Ok(path);
    }
    if let Ok(env_path) = std::env::var("MOSTRADOR_DB") {
        if !env_path.trim().is_empty() {
            return Ok(PathBuf::from(env_path));
        }
    }
    let base = dirs::data_dir()
        .or_else(dirs::home_dir)
        .context("determine a data directory for the database")?;
    Ok(base.join("mostrador").join("mostrador.sqlite3"))
}

/// Open the store and bring it up to date. Migrations are idempotent, so
/// every command path goes through here.
async fn open_store(db_path: &Path) -> Result<SqlitePool> {
    let pool = db::open_pool(db_path).await.context("open database")?;
    migrate::apply_migrations(&pool)
        .await
        .context("apply migrations")?;
    seed::ensure_reference_data(&pool)
        .await
        .context("seed reference data")?;
    Ok(pool)
}

async fn handle_cli(cli: Cli) -> Result<i32> {
    let db_path = resolve_db_path(cli.db)?;

    match cli.command {
        Commands::Db(DbCommand::Init) => {
            let pool = open_store(&db_path).await?;
            let version = migrate::current_schema_version(&pool).await?;
            pool.close().await;
            println!("Database ready at {} (schema {version})", db_path.display());
            Ok(0)
        }
        Commands::Db(DbCommand::Status { json }) => {
            let pool = open_store(&db_path).await?;
            let report = status_report(&pool).await?;
            pool.close().await;

            let healthy = report["integrity"] == "ok" && report["foreign_keys"] == "ok";
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "schema:       {}",
                    report["schema_version"].as_str().unwrap_or("?")
                );
                println!(
                    "integrity:    {}",
                    report["integrity"].as_str().unwrap_or("?")
                );
                println!(
                    "foreign keys: {}",
                    report["foreign_keys"].as_str().unwrap_or("?")
                );
                if let Some(counts) = report["tables"].as_object() {
                    for (table, count) in counts {
                        println!("{table:>14}: {count} rows");
                    }
                }
            }
            Ok(if healthy { 0 } else { 1 })
        }
        Commands::Db(DbCommand::Reset(args)) => {
            if !args.yes {
                eprintln!("Refusing to delete {} without --yes", db_path.display());
                return Ok(1);
            }
            if db_path.exists() {
                fs::remove_file(&db_path)
                    .with_context(|| format!("delete database {}", db_path.display()))?;
                println!("Deleted {}", db_path.display());
            } else {
                println!("Nothing to delete at {}", db_path.display());
            }
            Ok(0)
        }
        Commands::Import { dir } => {
            let pool = open_store(&db_path).await?;
            let result = import::import_dir(&pool, &dir).await;
            pool.close().await;

            match result {
                Ok(report) => {
                    for entry in &report.tables {
                        println!("{}: {} rows appended", entry.table, entry.rows);
                    }
                    for table in &report.skipped {
                        println!("{table}: no file, skipped");
                    }
                    Ok(0)
                }
                Err(err) => reject(err),
            }
        }
        Commands::Export { out } => {
            let pool = open_store(&db_path).await?;
            let entry = export::create_export(&pool, export::ExportOptions { out_parent: out })
                .await
                .map_err(anyhow::Error::from)?;
            pool.close().await;

            println!("Export written to {}", entry.directory.display());
            println!("Manifest at {}", entry.manifest_path.display());
            Ok(0)
        }
        Commands::Report { json } => {
            let pool = open_store(&db_path).await?;
            let report = reporting::sales_report(&pool)
                .await
                .map_err(anyhow::Error::from)?;
            pool.close().await;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else if report.top_products.is_empty() {
                println!("No sales recorded.");
            } else {
                println!("Top products by quantity sold:");
                for row in &report.top_products {
                    println!("  {:>6}  {}", row.quantity_sold, row.description);
                }
                println!("Top categories by quantity sold:");
                for row in &report.top_categories {
                    println!("  {:>6}  {}", row.quantity_sold, row.name);
                }
            }
            Ok(0)
        }
        Commands::Invoice(cmd) => {
            let pool = open_store(&db_path).await?;
            let result = handle_invoice(&pool, cmd).await;
            pool.close().await;
            result
        }
        Commands::Product(cmd) => {
            let pool = open_store(&db_path).await?;
            let result = handle_product(&pool, cmd).await;
            pool.close().await;
            result
        }
        Commands::Client(cmd) => {
            let pool = open_store(&db_path).await?;
            let result = handle_client(&pool, cmd).await;
            pool.close().await;
            result
        }
        Commands::Category(cmd) => {
            let pool = open_store(&db_path).await?;
            let result = handle_category(&pool, cmd).await;
            pool.close().await;
            result
        }
        Commands::Region(cmd) => {
            let pool = open_store(&db_path).await?;
            let result = handle_region(&pool, cmd).await;
            pool.close().await;
            result
        }
    }
}

async fn handle_invoice(pool: &SqlitePool, cmd: InvoiceCommand) -> Result<i32> {
    match cmd {
        InvoiceCommand::List { json } => {
            let rows = invoicing::list_invoices(pool)
                .await
                .map_err(anyhow::Error::from)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else if rows.is_empty() {
                println!("No invoices.");
            } else {
                for row in &rows {
                    println!(
                        "{}  {}  {:>12}  {}",
                        row.id,
                        row.date,
                        money::format_cents(row.total_cents),
                        row.client_name
                    );
                }
            }
            Ok(0)
        }
        InvoiceCommand::Show { id } => match invoicing::get_invoice(pool, &id).await {
            Ok(Some(invoice)) => {
                println!(
                    "Invoice {}  {}  client {}",
                    invoice.summary.id, invoice.summary.date, invoice.summary.client_name
                );
                for line in &invoice.lines {
                    println!(
                        "  {:>4} x {:<30} @ {:>10} = {:>12}",
                        line.quantity,
                        line.product_description,
                        money::format_cents(line.unit_price_cents),
                        money::format_cents(line.subtotal_cents)
                    );
                }
                println!(
                    "Total: {}",
                    money::format_cents(invoice.summary.total_cents)
                );
                Ok(0)
            }
            Ok(None) => {
                eprintln!("Error: invoice {id} not found");
                Ok(1)
            }
            Err(err) => Err(anyhow::Error::from(err)),
        },
        InvoiceCommand::Create { input } => {
            let payload = read_invoice_input(&input)?;
            match invoicing::create_invoice(pool, payload).await {
                Ok(id) => {
                    // Render from a fresh read, like every mutation path.
                    let invoice = invoicing::get_invoice(pool, &id)
                        .await
                        .map_err(anyhow::Error::from)?
                        .context("created invoice vanished before re-read")?;
                    println!(
                        "Created invoice {} (total {})",
                        invoice.summary.id,
                        money::format_cents(invoice.summary.total_cents)
                    );
                    Ok(0)
                }
                Err(err) => reject(AppError::from(err)),
            }
        }
        InvoiceCommand::Edit { id, input } => {
            let payload = read_invoice_input(&input)?;
            match invoicing::update_invoice(pool, &id, payload).await {
                Ok(()) => {
                    let invoice = invoicing::get_invoice(pool, &id)
                        .await
                        .map_err(anyhow::Error::from)?
                        .context("edited invoice vanished before re-read")?;
                    println!(
                        "Updated invoice {} (total {})",
                        invoice.summary.id,
                        money::format_cents(invoice.summary.total_cents)
                    );
                    Ok(0)
                }
                Err(err) => reject(AppError::from(err)),
            }
        }
        InvoiceCommand::Delete { id } => match invoicing::delete_invoice(pool, &id).await {
            Ok(()) => {
                println!("Deleted invoice {id}");
                Ok(0)
            }
            Err(err) => reject(AppError::from(err)),
        },
    }
}

async fn handle_product(pool: &SqlitePool, cmd: ProductCommand) -> Result<i32> {
    match cmd {
        ProductCommand::List { json } => {
            let rows = products::list_products(pool)
                .await
                .map_err(anyhow::Error::from)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                for p in &rows {
                    println!(
                        "{}  {:<30} {:>10}  stock {:>5}  {}",
                        p.id,
                        p.description,
                        money::format_cents(p.price_cents),
                        p.stock,
                        p.category_name
                    );
                }
            }
            Ok(0)
        }
        ProductCommand::Add {
            description,
            price,
            stock,
            category,
        } => {
            let price_cents = match money::parse_price(&price) {
                Ok(cents) => cents,
                Err(err) => return reject(err),
            };
            match products::create_product(
                pool,
                ProductInput {
                    description,
                    price_cents,
                    stock,
                    category_id: category,
                },
            )
            .await
            {
                Ok(p) => {
                    println!("Created product {}", p.id);
                    Ok(0)
                }
                Err(err) => reject(err),
            }
        }
        ProductCommand::Edit {
            id,
            description,
            price,
            category,
        } => {
            let price_cents = match money::parse_price(&price) {
                Ok(cents) => cents,
                Err(err) => return reject(err),
            };
            match products::update_product(pool, &id, &description, price_cents, &category).await {
                Ok(p) => {
                    println!("Updated product {}", p.id);
                    Ok(0)
                }
                Err(err) => reject(err),
            }
        }
        ProductCommand::SetStock { id, stock } => {
            match products::set_product_stock(pool, &id, stock).await {
                Ok(p) => {
                    println!("Product {} stock set to {}", p.id, p.stock);
                    Ok(0)
                }
                Err(err) => reject(err),
            }
        }
        ProductCommand::Delete { id } => match products::delete_product(pool, &id).await {
            Ok(()) => {
                println!("Deleted product {id}");
                Ok(0)
            }
            Err(err) => reject(err),
        },
    }
}

async fn handle_client(pool: &SqlitePool, cmd: ClientCommand) -> Result<i32> {
    match cmd {
        ClientCommand::List { json } => {
            let rows = clients::list_clients(pool)
                .await
                .map_err(anyhow::Error::from)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                for c in &rows {
                    println!(
                        "{}  {:<25} {:<15} {}",
                        c.id, c.name, c.region_name, c.address
                    );
                }
            }
            Ok(0)
        }
        ClientCommand::Add {
            name,
            region,
            address,
            phone,
            email,
        } => {
            match clients::create_client(
                pool,
                ClientInput {
                    name,
                    region_id: region,
                    address,
                    phone,
                    email,
                },
            )
            .await
            {
                Ok(c) => {
                    println!("Created client {}", c.id);
                    Ok(0)
                }
                Err(err) => reject(err),
            }
        }
        ClientCommand::Edit {
            id,
            name,
            region,
            address,
            phone,
            email,
        } => {
            match clients::update_client(
                pool,
                &id,
                ClientInput {
                    name,
                    region_id: region,
                    address,
                    phone,
                    email,
                },
            )
            .await
            {
                Ok(c) => {
                    println!("Updated client {}", c.id);
                    Ok(0)
                }
                Err(err) => reject(err),
            }
        }
        ClientCommand::Delete { id } => match clients::delete_client(pool, &id).await {
            Ok(()) => {
                println!("Deleted client {id}");
                Ok(0)
            }
            Err(err) => reject(err),
        },
    }
}

async fn handle_category(pool: &SqlitePool, cmd: NameCommand) -> Result<i32> {
    match cmd {
        NameCommand::List { json } => {
            let rows = categories::list_categories(pool)
                .await
                .map_err(anyhow::Error::from)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                for c in &rows {
                    println!("{}  {}", c.id, c.name);
                }
            }
            Ok(0)
        }
        NameCommand::Add { name } => match categories::create_category(pool, &name).await {
            Ok(c) => {
                println!("Created category {}", c.id);
                Ok(0)
            }
            Err(err) => reject(err),
        },
        NameCommand::Rename { id, name } => {
            match categories::update_category(pool, &id, &name).await {
                Ok(c) => {
                    println!("Renamed category {} to {}", c.id, c.name);
                    Ok(0)
                }
                Err(err) => reject(err),
            }
        }
        NameCommand::Delete { id } => match categories::delete_category(pool, &id).await {
            Ok(()) => {
                println!("Deleted category {id}");
                Ok(0)
            }
            Err(err) => reject(err),
        },
    }
}

async fn handle_region(pool: &SqlitePool, cmd: NameCommand) -> Result<i32> {
    match cmd {
        NameCommand::List { json } => {
            let rows = regions::list_regions(pool)
                .await
                .map_err(anyhow::Error::from)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                for r in &rows {
                    println!("{}  {}", r.id, r.name);
                }
            }
            Ok(0)
        }
        NameCommand::Add { name } => match regions::create_region(pool, &name).await {
            Ok(r) => {
                println!("Created region {}", r.id);
                Ok(0)
            }
            Err(err) => reject(err),
        },
        NameCommand::Rename { id, name } => match regions::update_region(pool, &id, &name).await {
            Ok(r) => {
                println!("Renamed region {} to {}", r.id, r.name);
                Ok(0)
            }
            Err(err) => reject(err),
        },
        NameCommand::Delete { id } => match regions::delete_region(pool, &id).await {
            Ok(()) => {
                println!("Deleted region {id}");
                Ok(0)
            }
            Err(err) => reject(err),
        },
    }
}

/// A rejected action is an expected outcome, not a crash: print the
/// structured error and exit nonzero.
fn reject(err: AppError) -> Result<i32> {
    eprintln!("Rejected: {err}");
    Ok(1)
}

fn read_invoice_input(path: &Path) -> Result<InvoiceInput> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read invoice payload {}", path.display()))?;
    let input: InvoiceInput = serde_json::from_str(&raw)
        .with_context(|| format!("parse invoice payload {}", path.display()))?;
    Ok(input)
}

async fn status_report(pool: &SqlitePool) -> Result<serde_json::Value> {
    let schema_version = migrate::current_schema_version(pool).await?;

    let integrity: String = sqlx::query_scalar("PRAGMA quick_check;")
        .fetch_one(pool)
        .await
        .unwrap_or_else(|_| "failed".to_string());

    let fk_violations = sqlx::query("PRAGMA foreign_key_check;")
        .fetch_all(pool)
        .await
        .map(|rows| rows.len())
        .unwrap_or(usize::MAX);
    let foreign_keys = if fk_violations == 0 { "ok" } else { "violations" };

    let mut tables = serde_json::Map::new();
    for table in [
        "regions",
        "categories",
        "clients",
        "products",
        "invoices",
        "invoice_lines",
    ] {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(pool)
            .await
            .unwrap_or(-1);
        tables.insert(table.to_string(), json!(count));
    }

    Ok(json!({
        "schema_version": schema_version,
        "integrity": if integrity == "ok" { "ok" } else { "corrupt" },
        "foreign_keys": foreign_keys,
        "tables": tables,
    }))
}
