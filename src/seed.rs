//! First-run reference data. The store is the single source of truth for
//! categories and regions; these defaults are inserted only when the
//! corresponding table is completely empty, never merged afterwards.

use sqlx::SqlitePool;

use crate::id::new_uuid_v7;
use crate::time::now_ms;

const DEFAULT_CATEGORIES: &[&str] = &[
    "Almacenamiento",
    "Memorias",
    "Monitores",
    "Notebooks",
    "Periféricos",
];

const DEFAULT_REGIONS: &[&str] = &[
    "Buenos Aires",
    "Córdoba",
    "Mendoza",
    "Santa Fe",
    "Tucumán",
];

pub async fn ensure_reference_data(pool: &SqlitePool) -> anyhow::Result<()> {
    seed_if_empty(pool, "categories", DEFAULT_CATEGORIES).await?;
    seed_if_empty(pool, "regions", DEFAULT_REGIONS).await?;
    Ok(())
}

async fn seed_if_empty(pool: &SqlitePool, table: &str, names: &[&str]) -> anyhow::Result<()> {
    let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await?;
    if count > 0 {
        return Ok(());
    }

    let now = now_ms();
    for name in names {
        sqlx::query(&format!(
            "INSERT INTO {table} (id, name, created_at, updated_at) VALUES (?, ?, ?, ?)"
        ))
        .bind(new_uuid_v7())
        .bind(name)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?;
    }
    tracing::info!(
        target = "mostrador",
        event = "reference_data_seeded",
        table = %table,
        rows = names.len()
    );
    Ok(())
}
