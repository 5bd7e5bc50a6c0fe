//! Sales read-model for the dashboard: a fixed join of invoice lines to
//! products to categories. Reference data is always read from the store,
//! so the report needs no runtime shape inference.

use serde::Serialize;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

use crate::{AppError, AppResult};

pub const TOP_PRODUCTS_LIMIT: i64 = 5;
pub const TOP_CATEGORIES_LIMIT: i64 = 3;

/// Units sold per product, most sold first.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ProductSales {
    pub product_id: String,
    pub description: String,
    pub quantity_sold: i64,
}

/// Units sold per category, most sold first.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CategorySales {
    pub category_id: String,
    pub name: String,
    pub quantity_sold: i64,
}

/// The two dashboard tables in one struct. Empty vectors mean no sales are
/// recorded yet; rendering that as a notice is the caller's concern.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SalesReport {
    pub top_products: Vec<ProductSales>,
    pub top_categories: Vec<CategorySales>,
}

pub async fn sales_report(pool: &SqlitePool) -> AppResult<SalesReport> {
    Ok(SalesReport {
        top_products: top_products(pool, TOP_PRODUCTS_LIMIT).await?,
        top_categories: top_categories(pool, TOP_CATEGORIES_LIMIT).await?,
    })
}

pub async fn top_products(pool: &SqlitePool, limit: i64) -> AppResult<Vec<ProductSales>> {
    let rows = sqlx::query(
        "SELECT p.id AS product_id, p.description, SUM(l.quantity) AS quantity_sold \
         FROM invoice_lines AS l \
         JOIN products AS p ON l.product_id = p.id \
         GROUP BY p.id, p.description \
         ORDER BY quantity_sold DESC, p.description \
         LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(|err| AppError::from(err).with_context("operation", "top_products"))?;

    rows.iter().map(product_sales_from_row).collect()
}

pub async fn top_categories(pool: &SqlitePool, limit: i64) -> AppResult<Vec<CategorySales>> {
    let rows = sqlx::query(
        "SELECT c.id AS category_id, c.name, SUM(l.quantity) AS quantity_sold \
         FROM invoice_lines AS l \
         JOIN products AS p ON l.product_id = p.id \
         JOIN categories AS c ON p.category_id = c.id \
         GROUP BY c.id, c.name \
         ORDER BY quantity_sold DESC, c.name \
         LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(|err| AppError::from(err).with_context("operation", "top_categories"))?;

    rows.iter().map(category_sales_from_row).collect()
}

fn product_sales_from_row(row: &SqliteRow) -> AppResult<ProductSales> {
    Ok(ProductSales {
        product_id: row.try_get("product_id").map_err(AppError::from)?,
        description: row.try_get("description").map_err(AppError::from)?,
        quantity_sold: row.try_get("quantity_sold").map_err(AppError::from)?,
    })
}

fn category_sales_from_row(row: &SqliteRow) -> AppResult<CategorySales> {
    Ok(CategorySales {
        category_id: row.try_get("category_id").map_err(AppError::from)?,
        name: row.try_get("name").map_err(AppError::from)?,
        quantity_sold: row.try_get("quantity_sold").map_err(AppError::from)?,
    })
}
