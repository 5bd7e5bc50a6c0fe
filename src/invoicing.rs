//! Invoice reconciliation: the one procedure in this crate with real
//! invariants. Product stock must always equal the initial stock minus the
//! quantities held by currently-existing invoice lines, so create, edit and
//! delete all run inside a single transaction via [`with_tx`].

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqliteConnection, SqlitePool};
use thiserror::Error;

use crate::db::with_tx;
use crate::id::new_uuid_v7;
use crate::model::{Invoice, InvoiceLine, InvoiceSummary};
use crate::time::{now_ms, parse_invoice_date};
use crate::{AppError, AppResult};

#[derive(Debug, Error)]
pub enum InvoiceError {
    #[error("invoice {0} not found")]
    NotFound(String),
    #[error("client {0} does not exist")]
    UnknownClient(String),
    #[error("invalid invoice date {0:?}, expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("invoice must have at least one line")]
    EmptyLines,
    #[error("product {0} appears in more than one line")]
    DuplicateProduct(String),
    #[error("quantity must be a positive integer for product {0}")]
    InvalidQuantity(String),
    #[error("product {0} does not exist")]
    UnknownProduct(String),
    #[error(
        "insufficient stock for {description}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: String,
        description: String,
        requested: i64,
        available: i64,
    },
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

impl From<InvoiceError> for AppError {
    fn from(err: InvoiceError) -> Self {
        match err {
            InvoiceError::NotFound(id) => {
                AppError::new("INVOICE/NOT_FOUND", "Invoice not found").with_context("id", id)
            }
            InvoiceError::UnknownClient(id) => {
                AppError::new("INVOICE/UNKNOWN_CLIENT", "Client does not exist")
                    .with_context("client_id", id)
            }
            InvoiceError::InvalidDate(date) => {
                AppError::new("INVOICE/INVALID_DATE", "Date must be YYYY-MM-DD")
                    .with_context("date", date)
            }
            InvoiceError::EmptyLines => AppError::new(
                "INVOICE/EMPTY_LINES",
                "Invoice must have at least one line item",
            ),
            InvoiceError::DuplicateProduct(id) => AppError::new(
                "INVOICE/DUPLICATE_PRODUCT",
                "Product appears in more than one line",
            )
            .with_context("product_id", id),
            InvoiceError::InvalidQuantity(id) => AppError::new(
                "INVOICE/INVALID_QUANTITY",
                "Quantity must be a positive integer",
            )
            .with_context("product_id", id),
            InvoiceError::UnknownProduct(id) => {
                AppError::new("INVOICE/UNKNOWN_PRODUCT", "Product does not exist")
                    .with_context("product_id", id)
            }
            InvoiceError::InsufficientStock {
                product_id,
                description,
                requested,
                available,
            } => AppError::new(
                "INVOICE/INSUFFICIENT_STOCK",
                format!("Not enough stock of {description}"),
            )
            .with_context("product_id", product_id)
            .with_context("requested", requested.to_string())
            .with_context("available", available.to_string()),
            InvoiceError::Db(e) => AppError::from(e),
        }
    }
}

/// One requested line: which product, how many units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineInput {
    pub product_id: String,
    pub quantity: i64,
}

/// Payload for invoice create and for replace-all-lines edit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceInput {
    pub client_id: String,
    pub date: String,
    pub lines: Vec<LineInput>,
}

/// A validated line with the unit price snapshotted from the product at
/// save time. Later price changes never touch existing invoices.
struct PricedLine {
    product_id: String,
    quantity: i64,
    unit_price_cents: i64,
}

/// Create an invoice. Everything is validated before the first write; the
/// header insert, line inserts and stock decrements commit or roll back as
/// one unit. Returns the new invoice id.
pub async fn create_invoice(pool: &SqlitePool, input: InvoiceInput) -> Result<String, InvoiceError> {
    check_shape(&input.lines)?;
    let date = normalize_date(&input.date)?;

    let invoice_id = new_uuid_v7();
    let client_id = input.client_id.trim().to_string();
    let lines = input.lines.clone();

    with_tx(pool, move |conn| {
        async move {
            check_client(&mut *conn, &client_id).await?;
            let priced = validate_lines(&mut *conn, &lines).await?;

            let now = now_ms();
            sqlx::query(
                "INSERT INTO invoices (id, client_id, date, created_at, updated_at) \
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&invoice_id)
            .bind(&client_id)
            .bind(&date)
            .bind(now)
            .bind(now)
            .execute(&mut *conn)
            .await?;

            insert_lines(&mut *conn, &invoice_id, &priced).await?;
            Ok(invoice_id)
        }
        .boxed()
    })
    .await
    .inspect(|id| {
        tracing::info!(target = "mostrador", event = "invoice_created", id = %id);
    })
}

/// Replace an invoice wholesale: release the stock held by its current
/// lines, rewrite the header, drop the old lines, then validate the new
/// lines against post-release stock and apply them. One transaction; a
/// failed validation rolls everything back, releases included.
pub async fn update_invoice(
    pool: &SqlitePool,
    invoice_id: &str,
    input: InvoiceInput,
) -> Result<(), InvoiceError> {
    check_shape(&input.lines)?;
    let date = normalize_date(&input.date)?;

    let id = invoice_id.to_string();
    let client_id = input.client_id.trim().to_string();
    let lines = input.lines.clone();

    with_tx(pool, move |conn| {
        async move {
            let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM invoices WHERE id = ?")
                .bind(&id)
                .fetch_optional(&mut *conn)
                .await?;
            if exists.is_none() {
                return Err(InvoiceError::NotFound(id));
            }

            check_client(&mut *conn, &client_id).await?;

            release_lines(&mut *conn, &id).await?;

            sqlx::query("UPDATE invoices SET client_id = ?, date = ?, updated_at = ? WHERE id = ?")
                .bind(&client_id)
                .bind(&date)
                .bind(now_ms())
                .bind(&id)
                .execute(&mut *conn)
                .await?;

            sqlx::query("DELETE FROM invoice_lines WHERE invoice_id = ?")
                .bind(&id)
                .execute(&mut *conn)
                .await?;

            let priced = validate_lines(&mut *conn, &lines).await?;
            insert_lines(&mut *conn, &id, &priced).await?;
            Ok(())
        }
        .boxed()
    })
    .await
    .inspect(|_| {
        tracing::info!(target = "mostrador", event = "invoice_updated", id = %invoice_id);
    })
}

/// Delete an invoice: give the stock back, drop the lines, drop the header,
/// as one unit.
pub async fn delete_invoice(pool: &SqlitePool, invoice_id: &str) -> Result<(), InvoiceError> {
    let id = invoice_id.to_string();

    with_tx(pool, move |conn| {
        async move {
            let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM invoices WHERE id = ?")
                .bind(&id)
                .fetch_optional(&mut *conn)
                .await?;
            if exists.is_none() {
                return Err(InvoiceError::NotFound(id));
            }

            release_lines(&mut *conn, &id).await?;

            sqlx::query("DELETE FROM invoice_lines WHERE invoice_id = ?")
                .bind(&id)
                .execute(&mut *conn)
                .await?;

            sqlx::query("DELETE FROM invoices WHERE id = ?")
                .bind(&id)
                .execute(&mut *conn)
                .await?;
            Ok(())
        }
        .boxed()
    })
    .await
    .inspect(|_| {
        tracing::info!(target = "mostrador", event = "invoice_deleted", id = %invoice_id);
    })
}

/// All invoices with the client name and the total recomputed from the
/// current lines.
pub async fn list_invoices(pool: &SqlitePool) -> AppResult<Vec<InvoiceSummary>> {
    let rows = sqlx::query(
        "SELECT i.id, i.client_id, c.name AS client_name, i.date, \
                COALESCE(SUM(l.quantity * l.unit_price_cents), 0) AS total_cents \
         FROM invoices AS i \
         JOIN clients AS c ON i.client_id = c.id \
         LEFT JOIN invoice_lines AS l ON l.invoice_id = i.id \
         GROUP BY i.id, i.client_id, c.name, i.date \
         ORDER BY i.date, i.id",
    )
    .fetch_all(pool)
    .await
    .map_err(|err| AppError::from(err).with_context("operation", "list_invoices"))?;
    rows.iter().map(InvoiceSummary::try_from).collect()
}

/// The lines of one invoice with product names and computed subtotals.
pub async fn invoice_lines(pool: &SqlitePool, invoice_id: &str) -> AppResult<Vec<InvoiceLine>> {
    let rows = sqlx::query(
        "SELECT l.product_id, p.description AS product_description, l.quantity, \
                l.unit_price_cents, (l.quantity * l.unit_price_cents) AS subtotal_cents \
         FROM invoice_lines AS l \
         JOIN products AS p ON l.product_id = p.id \
         WHERE l.invoice_id = ? \
         ORDER BY p.description, l.product_id",
    )
    .bind(invoice_id)
    .fetch_all(pool)
    .await
    .map_err(|err| {
        AppError::from(err)
            .with_context("operation", "invoice_lines")
            .with_context("invoice_id", invoice_id.to_string())
    })?;
    rows.iter().map(InvoiceLine::try_from).collect()
}

/// Header plus lines plus recomputed total, or `None` for an unknown id.
pub async fn get_invoice(pool: &SqlitePool, invoice_id: &str) -> AppResult<Option<Invoice>> {
    let row = sqlx::query(
        "SELECT i.id, i.client_id, c.name AS client_name, i.date, \
                COALESCE(SUM(l.quantity * l.unit_price_cents), 0) AS total_cents \
         FROM invoices AS i \
         JOIN clients AS c ON i.client_id = c.id \
         LEFT JOIN invoice_lines AS l ON l.invoice_id = i.id \
         WHERE i.id = ? \
         GROUP BY i.id, i.client_id, c.name, i.date",
    )
    .bind(invoice_id)
    .fetch_optional(pool)
    .await
    .map_err(|err| {
        AppError::from(err)
            .with_context("operation", "get_invoice")
            .with_context("invoice_id", invoice_id.to_string())
    })?;

    let Some(row) = row else { return Ok(None) };
    let summary = InvoiceSummary::try_from(&row)?;
    let lines = invoice_lines(pool, invoice_id).await?;
    Ok(Some(Invoice { summary, lines }))
}

/// Shape checks that need no database: a non-empty line set, positive
/// quantities, no product listed twice.
fn check_shape(lines: &[LineInput]) -> Result<(), InvoiceError> {
    if lines.is_empty() {
        return Err(InvoiceError::EmptyLines);
    }
    let mut seen: Vec<&str> = Vec::with_capacity(lines.len());
    for line in lines {
        if line.quantity <= 0 {
            return Err(InvoiceError::InvalidQuantity(line.product_id.clone()));
        }
        if seen.contains(&line.product_id.as_str()) {
            return Err(InvoiceError::DuplicateProduct(line.product_id.clone()));
        }
        seen.push(&line.product_id);
    }
    Ok(())
}

fn normalize_date(date: &str) -> Result<String, InvoiceError> {
    match parse_invoice_date(date) {
        Some(parsed) => Ok(parsed.format("%Y-%m-%d").to_string()),
        None => Err(InvoiceError::InvalidDate(date.to_string())),
    }
}

async fn check_client(conn: &mut SqliteConnection, client_id: &str) -> Result<(), InvoiceError> {
    let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM clients WHERE id = ?")
        .bind(client_id)
        .fetch_optional(&mut *conn)
        .await?;
    if exists.is_none() {
        return Err(InvoiceError::UnknownClient(client_id.to_string()));
    }
    Ok(())
}

/// Read-only pass over the requested lines: resolve each product, check the
/// requested quantity against current stock, and snapshot the unit price.
/// Nothing is written until every line has passed.
async fn validate_lines(
    conn: &mut SqliteConnection,
    lines: &[LineInput],
) -> Result<Vec<PricedLine>, InvoiceError> {
    let mut priced = Vec::with_capacity(lines.len());
    for line in lines {
        let row = sqlx::query("SELECT description, price_cents, stock FROM products WHERE id = ?")
            .bind(&line.product_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| InvoiceError::UnknownProduct(line.product_id.clone()))?;

        let description: String = row.try_get("description")?;
        let price_cents: i64 = row.try_get("price_cents")?;
        let stock: i64 = row.try_get("stock")?;

        if line.quantity > stock {
            return Err(InvoiceError::InsufficientStock {
                product_id: line.product_id.clone(),
                description,
                requested: line.quantity,
                available: stock,
            });
        }

        priced.push(PricedLine {
            product_id: line.product_id.clone(),
            quantity: line.quantity,
            unit_price_cents: price_cents,
        });
    }
    Ok(priced)
}

async fn insert_lines(
    conn: &mut SqliteConnection,
    invoice_id: &str,
    lines: &[PricedLine],
) -> Result<(), InvoiceError> {
    let now = now_ms();
    for line in lines {
        sqlx::query(
            "INSERT INTO invoice_lines (invoice_id, product_id, quantity, unit_price_cents) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(invoice_id)
        .bind(&line.product_id)
        .bind(line.quantity)
        .bind(line.unit_price_cents)
        .execute(&mut *conn)
        .await?;

        sqlx::query("UPDATE products SET stock = stock - ?, updated_at = ? WHERE id = ?")
            .bind(line.quantity)
            .bind(now)
            .bind(&line.product_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

/// Give back the stock currently held by an invoice's lines.
async fn release_lines(conn: &mut SqliteConnection, invoice_id: &str) -> Result<(), InvoiceError> {
    let rows = sqlx::query("SELECT product_id, quantity FROM invoice_lines WHERE invoice_id = ?")
        .bind(invoice_id)
        .fetch_all(&mut *conn)
        .await?;

    let now = now_ms();
    for row in rows {
        let product_id: String = row.try_get("product_id")?;
        let quantity: i64 = row.try_get("quantity")?;
        sqlx::query("UPDATE products SET stock = stock + ?, updated_at = ? WHERE id = ?")
            .bind(quantity)
            .bind(now)
            .bind(&product_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}
