use sha2::{Digest, Sha256};
use sqlx::{Executor, Row, SqlitePool};
use std::collections::HashMap;

use crate::time::now_ms;
use tracing::{error, info};

fn preview(sql: &str) -> String {
    let one_line = sql.replace(['\n', '\t'], " ");
    let trimmed = one_line.trim();
    if trimmed.len() > 160 {
        format!("{}…", &trimmed[..160])
    } else {
        trimmed.to_string()
    }
}

static MIGRATIONS: &[(&str, &str)] = &[(
    "202601121000_initial.sql",
    include_str!("../migrations/202601121000_initial.sql"),
)];

fn strip_comments(raw_sql: &str) -> String {
    raw_sql
        .lines()
        .filter(|line| {
            let t = line.trim_start();
            !(t.is_empty() || t.starts_with("--"))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Apply pending migrations, verifying that already-applied files have not
/// been edited since they ran.
pub async fn apply_migrations(pool: &SqlitePool) -> anyhow::Result<()> {
    pool.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (\
           version   TEXT PRIMARY KEY,\
           applied_at INTEGER NOT NULL,\
           checksum TEXT NOT NULL\
         )",
    )
    .await?;

    let rows = sqlx::query("SELECT version, checksum FROM schema_migrations")
        .fetch_all(pool)
        .await?;
    let mut applied: HashMap<String, String> = HashMap::new();
    for r in rows {
        if let (Ok(v), Ok(c)) = (
            r.try_get::<String, _>("version"),
            r.try_get::<String, _>("checksum"),
        ) {
            applied.insert(v, c);
        }
    }

    for (filename, raw_sql) in MIGRATIONS {
        let cleaned = strip_comments(raw_sql);
        let checksum = format!("{:x}", Sha256::digest(cleaned.as_bytes()));

        if let Some(stored) = applied.get(*filename) {
            if stored != &checksum {
                anyhow::bail!("migration {} edited after application", filename);
            }
            info!(target = "mostrador", event = "migration_skip_file", file = %filename);
            continue;
        }

        let mut tx = pool.begin().await?;
        for stmt in cleaned.split(';') {
            let s = stmt.trim();
            if s.is_empty() {
                continue;
            }
            info!(target = "mostrador", event = "migration_stmt", file = %filename, sql = %preview(s));
            if let Err(e) = sqlx::query(s).execute(&mut *tx).await {
                error!(target = "mostrador", event = "migration_stmt_error", file = %filename, sql = %preview(s), error = %e);
                return Err(e.into());
            }
        }

        sqlx::query(
            "INSERT INTO schema_migrations (version, applied_at, checksum) VALUES (?, ?, ?)",
        )
        .bind(*filename)
        .bind(now_ms())
        .bind(&checksum)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        info!(target = "mostrador", event = "migration_file_applied", file = %filename);
    }

    Ok(())
}

/// Latest applied migration version, used by export manifests and `db status`.
pub async fn current_schema_version(pool: &SqlitePool) -> anyhow::Result<String> {
    let version = sqlx::query_scalar::<_, String>(
        "SELECT version FROM schema_migrations ORDER BY version DESC LIMIT 1",
    )
    .fetch_optional(pool)
    .await?;
    Ok(version.unwrap_or_else(|| "unmigrated".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_comments_drops_blank_and_comment_lines() {
        let cleaned = strip_comments("-- header\n\nCREATE TABLE t (id TEXT);\n  -- trailing\n");
        assert_eq!(cleaned, "CREATE TABLE t (id TEXT);");
    }

    #[tokio::test]
    async fn apply_twice_is_idempotent() {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        apply_migrations(&pool).await.unwrap();
        apply_migrations(&pool).await.unwrap();

        let version = current_schema_version(&pool).await.unwrap();
        assert_eq!(version, "202601121000_initial.sql");
    }

    #[tokio::test]
    async fn tampered_checksum_is_rejected() {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        apply_migrations(&pool).await.unwrap();

        sqlx::query("UPDATE schema_migrations SET checksum = 'deadbeef'")
            .execute(&pool)
            .await
            .unwrap();

        let err = apply_migrations(&pool).await.unwrap_err();
        assert!(err.to_string().contains("edited after application"));
    }
}
