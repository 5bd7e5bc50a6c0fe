use sqlx::SqlitePool;

use super::require_text;
use crate::id::new_uuid_v7;
use crate::model::Product;
use crate::time::now_ms;
use crate::{AppError, AppResult};

/// Payload for product create/update. Price is exact cents; stock is the
/// on-hand quantity, only ever mutated through invoice reconciliation after
/// the product exists.
#[derive(Debug, Clone)]
pub struct ProductInput {
    pub description: String,
    pub price_cents: i64,
    pub stock: i64,
    pub category_id: String,
}

const SELECT_PRODUCT: &str = "SELECT p.id, p.description, p.price_cents, p.stock, \
     p.category_id, c.name AS category_name, p.created_at, p.updated_at \
     FROM products AS p JOIN categories AS c ON p.category_id = c.id";

pub async fn list_products(pool: &SqlitePool) -> AppResult<Vec<Product>> {
    let sql = format!("{SELECT_PRODUCT} ORDER BY p.description, p.id");
    let rows = sqlx::query(&sql)
        .fetch_all(pool)
        .await
        .map_err(|err| AppError::from(err).with_context("operation", "list_products"))?;
    rows.iter().map(Product::try_from).collect()
}

pub async fn get_product(pool: &SqlitePool, id: &str) -> AppResult<Option<Product>> {
    let sql = format!("{SELECT_PRODUCT} WHERE p.id = ?");
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|err| {
            AppError::from(err)
                .with_context("operation", "get_product")
                .with_context("id", id.to_string())
        })?;
    row.as_ref().map(Product::try_from).transpose()
}

pub async fn create_product(pool: &SqlitePool, input: ProductInput) -> AppResult<Product> {
    let input = validate(pool, input).await?;

    let id = new_uuid_v7();
    let now = now_ms();
    sqlx::query(
        "INSERT INTO products (id, description, price_cents, stock, category_id, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(&input.description)
    .bind(input.price_cents)
    .bind(input.stock)
    .bind(&input.category_id)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .map_err(|err| AppError::from(err).with_context("operation", "create_product"))?;

    get_product(pool, &id).await?.ok_or_else(|| not_found(&id))
}

/// Update description, price and category. Stock is intentionally not part
/// of the update payload; it belongs to the invoice reconciliation ledger.
pub async fn update_product(
    pool: &SqlitePool,
    id: &str,
    description: &str,
    price_cents: i64,
    category_id: &str,
) -> AppResult<Product> {
    let description = require_text(description, "PRODUCT/EMPTY_DESCRIPTION", "description")?;
    if price_cents < 0 {
        return Err(
            AppError::new("PRODUCT/INVALID_PRICE", "Price must not be negative")
                .with_context("price_cents", price_cents.to_string()),
        );
    }
    let category_id = require_text(category_id, "PRODUCT/UNKNOWN_CATEGORY", "category_id")?;
    check_category_exists(pool, &category_id).await?;

    let res = sqlx::query(
        "UPDATE products SET description = ?, price_cents = ?, category_id = ?, updated_at = ? \
         WHERE id = ?",
    )
    .bind(&description)
    .bind(price_cents)
    .bind(&category_id)
    .bind(now_ms())
    .bind(id)
    .execute(pool)
    .await
    .map_err(|err| AppError::from(err).with_context("operation", "update_product"))?;
    if res.rows_affected() == 0 {
        return Err(not_found(id));
    }

    get_product(pool, id).await?.ok_or_else(|| not_found(id))
}

/// Restock or correct the on-hand quantity outside the invoice flow, e.g.
/// after receiving goods. Rejects corrections below zero.
pub async fn set_product_stock(pool: &SqlitePool, id: &str, stock: i64) -> AppResult<Product> {
    if stock < 0 {
        return Err(
            AppError::new("PRODUCT/INVALID_STOCK", "Stock must not be negative")
                .with_context("stock", stock.to_string()),
        );
    }

    let res = sqlx::query("UPDATE products SET stock = ?, updated_at = ? WHERE id = ?")
        .bind(stock)
        .bind(now_ms())
        .bind(id)
        .execute(pool)
        .await
        .map_err(|err| AppError::from(err).with_context("operation", "set_product_stock"))?;
    if res.rows_affected() == 0 {
        return Err(not_found(id));
    }

    get_product(pool, id).await?.ok_or_else(|| not_found(id))
}

pub async fn delete_product(pool: &SqlitePool, id: &str) -> AppResult<()> {
    let in_use: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM invoice_lines WHERE product_id = ?")
        .bind(id)
        .fetch_one(pool)
        .await
        .map_err(|err| AppError::from(err).with_context("operation", "delete_product"))?;
    if in_use > 0 {
        return Err(
            AppError::new("PRODUCT/IN_USE", "Product is referenced by invoice lines")
                .with_context("id", id.to_string())
                .with_context("invoice_lines", in_use.to_string()),
        );
    }

    let res = sqlx::query("DELETE FROM products WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .map_err(|err| AppError::from(err).with_context("operation", "delete_product"))?;
    if res.rows_affected() == 0 {
        return Err(not_found(id));
    }
    Ok(())
}

async fn validate(pool: &SqlitePool, input: ProductInput) -> AppResult<ProductInput> {
    let description = require_text(&input.description, "PRODUCT/EMPTY_DESCRIPTION", "description")?;
    if input.price_cents < 0 {
        return Err(
            AppError::new("PRODUCT/INVALID_PRICE", "Price must not be negative")
                .with_context("price_cents", input.price_cents.to_string()),
        );
    }
    if input.stock < 0 {
        return Err(
            AppError::new("PRODUCT/INVALID_STOCK", "Stock must not be negative")
                .with_context("stock", input.stock.to_string()),
        );
    }
    let category_id = require_text(&input.category_id, "PRODUCT/UNKNOWN_CATEGORY", "category_id")?;
    check_category_exists(pool, &category_id).await?;

    Ok(ProductInput {
        description,
        price_cents: input.price_cents,
        stock: input.stock,
        category_id,
    })
}

async fn check_category_exists(pool: &SqlitePool, category_id: &str) -> AppResult<()> {
    let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM categories WHERE id = ?")
        .bind(category_id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::from)?;
    if exists.is_none() {
        return Err(
            AppError::new("PRODUCT/UNKNOWN_CATEGORY", "Category does not exist")
                .with_context("category_id", category_id.to_string()),
        );
    }
    Ok(())
}

fn not_found(id: &str) -> AppError {
    AppError::new("PRODUCT/NOT_FOUND", "Product not found").with_context("id", id.to_string())
}
