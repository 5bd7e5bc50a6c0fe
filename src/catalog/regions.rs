use sqlx::SqlitePool;

use super::require_text;
use crate::id::new_uuid_v7;
use crate::model::Region;
use crate::time::now_ms;
use crate::{AppError, AppResult};

pub async fn list_regions(pool: &SqlitePool) -> AppResult<Vec<Region>> {
    let rows = sqlx::query("SELECT * FROM regions ORDER BY name, id")
        .fetch_all(pool)
        .await
        .map_err(|err| AppError::from(err).with_context("operation", "list_regions"))?;
    rows.iter().map(Region::try_from).collect()
}

pub async fn get_region(pool: &SqlitePool, id: &str) -> AppResult<Option<Region>> {
    let row = sqlx::query("SELECT * FROM regions WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|err| {
            AppError::from(err)
                .with_context("operation", "get_region")
                .with_context("id", id.to_string())
        })?;
    row.as_ref().map(Region::try_from).transpose()
}

pub async fn create_region(pool: &SqlitePool, name: &str) -> AppResult<Region> {
    let name = require_text(name, "REGION/EMPTY_NAME", "name")?;
    ensure_name_free(pool, &name, None).await?;

    let id = new_uuid_v7();
    let now = now_ms();
    sqlx::query("INSERT INTO regions (id, name, created_at, updated_at) VALUES (?, ?, ?, ?)")
        .bind(&id)
        .bind(&name)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await
        .map_err(|err| AppError::from(err).with_context("operation", "create_region"))?;

    Ok(Region {
        id,
        name,
        created_at: now,
        updated_at: now,
    })
}

pub async fn update_region(pool: &SqlitePool, id: &str, name: &str) -> AppResult<Region> {
    let name = require_text(name, "REGION/EMPTY_NAME", "name")?;
    ensure_name_free(pool, &name, Some(id)).await?;

    let res = sqlx::query("UPDATE regions SET name = ?, updated_at = ? WHERE id = ?")
        .bind(&name)
        .bind(now_ms())
        .bind(id)
        .execute(pool)
        .await
        .map_err(|err| AppError::from(err).with_context("operation", "update_region"))?;
    if res.rows_affected() == 0 {
        return Err(not_found(id));
    }

    get_region(pool, id).await?.ok_or_else(|| not_found(id))
}

pub async fn delete_region(pool: &SqlitePool, id: &str) -> AppResult<()> {
    let in_use: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM clients WHERE region_id = ?")
        .bind(id)
        .fetch_one(pool)
        .await
        .map_err(|err| AppError::from(err).with_context("operation", "delete_region"))?;
    if in_use > 0 {
        return Err(
            AppError::new("REGION/IN_USE", "Region is referenced by clients")
                .with_context("id", id.to_string())
                .with_context("clients", in_use.to_string()),
        );
    }

    let res = sqlx::query("DELETE FROM regions WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .map_err(|err| AppError::from(err).with_context("operation", "delete_region"))?;
    if res.rows_affected() == 0 {
        return Err(not_found(id));
    }
    Ok(())
}

async fn ensure_name_free(pool: &SqlitePool, name: &str, except: Option<&str>) -> AppResult<()> {
    let existing: Option<String> = sqlx::query_scalar("SELECT id FROM regions WHERE name = ?")
        .bind(name)
        .fetch_optional(pool)
        .await
        .map_err(AppError::from)?;
    match existing {
        Some(id) if Some(id.as_str()) != except => Err(AppError::new(
            "REGION/DUPLICATE_NAME",
            "A region with this name already exists",
        )
        .with_context("name", name.to_string())),
        _ => Ok(()),
    }
}

fn not_found(id: &str) -> AppError {
    AppError::new("REGION/NOT_FOUND", "Region not found").with_context("id", id.to_string())
}
