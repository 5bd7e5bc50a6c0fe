use sqlx::SqlitePool;

use super::require_text;
use crate::id::new_uuid_v7;
use crate::model::Category;
use crate::time::now_ms;
use crate::{AppError, AppResult};

pub async fn list_categories(pool: &SqlitePool) -> AppResult<Vec<Category>> {
    let rows = sqlx::query("SELECT * FROM categories ORDER BY name, id")
        .fetch_all(pool)
        .await
        .map_err(|err| AppError::from(err).with_context("operation", "list_categories"))?;
    rows.iter().map(Category::try_from).collect()
}

pub async fn get_category(pool: &SqlitePool, id: &str) -> AppResult<Option<Category>> {
    let row = sqlx::query("SELECT * FROM categories WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|err| {
            AppError::from(err)
                .with_context("operation", "get_category")
                .with_context("id", id.to_string())
        })?;
    row.as_ref().map(Category::try_from).transpose()
}

pub async fn create_category(pool: &SqlitePool, name: &str) -> AppResult<Category> {
    let name = require_text(name, "CATEGORY/EMPTY_NAME", "name")?;
    ensure_name_free(pool, &name, None).await?;

    let id = new_uuid_v7();
    let now = now_ms();
    sqlx::query("INSERT INTO categories (id, name, created_at, updated_at) VALUES (?, ?, ?, ?)")
        .bind(&id)
        .bind(&name)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await
        .map_err(|err| AppError::from(err).with_context("operation", "create_category"))?;

    Ok(Category {
        id,
        name,
        created_at: now,
        updated_at: now,
    })
}

pub async fn update_category(pool: &SqlitePool, id: &str, name: &str) -> AppResult<Category> {
    let name = require_text(name, "CATEGORY/EMPTY_NAME", "name")?;
    ensure_name_free(pool, &name, Some(id)).await?;

    let res = sqlx::query("UPDATE categories SET name = ?, updated_at = ? WHERE id = ?")
        .bind(&name)
        .bind(now_ms())
        .bind(id)
        .execute(pool)
        .await
        .map_err(|err| AppError::from(err).with_context("operation", "update_category"))?;
    if res.rows_affected() == 0 {
        return Err(not_found(id));
    }

    get_category(pool, id).await?.ok_or_else(|| not_found(id))
}

pub async fn delete_category(pool: &SqlitePool, id: &str) -> AppResult<()> {
    let in_use: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE category_id = ?")
        .bind(id)
        .fetch_one(pool)
        .await
        .map_err(|err| AppError::from(err).with_context("operation", "delete_category"))?;
    if in_use > 0 {
        return Err(
            AppError::new("CATEGORY/IN_USE", "Category is referenced by products")
                .with_context("id", id.to_string())
                .with_context("products", in_use.to_string()),
        );
    }

    let res = sqlx::query("DELETE FROM categories WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .map_err(|err| AppError::from(err).with_context("operation", "delete_category"))?;
    if res.rows_affected() == 0 {
        return Err(not_found(id));
    }
    Ok(())
}

async fn ensure_name_free(pool: &SqlitePool, name: &str, except: Option<&str>) -> AppResult<()> {
    let existing: Option<String> = sqlx::query_scalar("SELECT id FROM categories WHERE name = ?")
        .bind(name)
        .fetch_optional(pool)
        .await
        .map_err(AppError::from)?;
    match existing {
        Some(id) if Some(id.as_str()) != except => Err(AppError::new(
            "CATEGORY/DUPLICATE_NAME",
            "A category with this name already exists",
        )
        .with_context("name", name.to_string())),
        _ => Ok(()),
    }
}

fn not_found(id: &str) -> AppError {
    AppError::new("CATEGORY/NOT_FOUND", "Category not found").with_context("id", id.to_string())
}
