//! Bulk export: one CSV and one JSON file per table plus a manifest with
//! row counts and SHA-256 digests, all written atomically into a fresh
//! `export-YYYYMMDD-HHMMSS[-NN]` directory.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool, TypeInfo, ValueRef};

use crate::db::write_atomic;
use crate::migrate::current_schema_version;
use crate::tables::{TableSpec, TABLES};
use crate::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub out_parent: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ExportEntry {
    pub directory: PathBuf,
    pub manifest_path: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableInfo {
    pub rows: u64,
    pub csv_sha256: String,
    pub json_sha256: String,
}

#[derive(Debug, Serialize)]
struct ExportManifest {
    app_version: String,
    schema_version: String,
    created_at: String,
    tables: BTreeMap<String, TableInfo>,
}

/// Create an export bundle under `<out_parent>/export-YYYYMMDD-HHMMSS/...`.
pub async fn create_export(pool: &SqlitePool, opts: ExportOptions) -> AppResult<ExportEntry> {
    let schema_version = current_schema_version(pool)
        .await
        .map_err(|err| AppError::from(err).with_context("operation", "schema_version"))?;

    fs::create_dir_all(&opts.out_parent).map_err(|err| {
        AppError::from(err)
            .with_context("operation", "create_out_parent")
            .with_context("path", opts.out_parent.display().to_string())
    })?;

    let timestamp = Utc::now();
    let export_dir = unique_export_dir(&opts.out_parent, &timestamp)
        .map_err(|err| err.with_context("operation", "alloc_export_dir"))?;
    let data_dir = export_dir.join("data");
    let json_dir = export_dir.join("json");
    for dir in [&export_dir, &data_dir, &json_dir] {
        fs::create_dir_all(dir).map_err(|err| {
            AppError::from(err)
                .with_context("operation", "create_export_dir")
                .with_context("path", dir.display().to_string())
        })?;
    }

    let mut tables = BTreeMap::new();
    for spec in TABLES {
        let rows = fetch_table(pool, spec).await?;

        let csv_bytes = rows_to_csv(spec, &rows)?;
        let csv_path = data_dir.join(format!("{}.csv", spec.name));
        write_atomic(&csv_path, &csv_bytes).map_err(|err| {
            AppError::from(err)
                .with_context("operation", "write_table_csv")
                .with_context("table", spec.name)
        })?;

        let json_bytes = rows_to_json(spec, &rows)?;
        let json_path = json_dir.join(format!("{}.json", spec.name));
        write_atomic(&json_path, &json_bytes).map_err(|err| {
            AppError::from(err)
                .with_context("operation", "write_table_json")
                .with_context("table", spec.name)
        })?;

        tables.insert(
            spec.name.to_string(),
            TableInfo {
                rows: rows.len() as u64,
                csv_sha256: sha256_hex(&csv_bytes),
                json_sha256: sha256_hex(&json_bytes),
            },
        );
        tracing::info!(
            target = "mostrador",
            event = "export_table",
            table = %spec.name,
            rows = rows.len()
        );
    }

    let manifest = ExportManifest {
        app_version: env!("CARGO_PKG_VERSION").to_string(),
        schema_version,
        created_at: timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
        tables,
    };
    let manifest_path = export_dir.join("manifest.json");
    let payload = serde_json::to_vec_pretty(&manifest)
        .map_err(|err| AppError::from(err).with_context("operation", "serialize_manifest"))?;
    write_atomic(&manifest_path, &payload)
        .map_err(|err| AppError::from(err).with_context("operation", "write_manifest"))?;

    Ok(ExportEntry {
        directory: export_dir,
        manifest_path,
    })
}

async fn fetch_table(pool: &SqlitePool, spec: &TableSpec) -> AppResult<Vec<SqliteRow>> {
    let sql = format!(
        "SELECT {} FROM {} ORDER BY {}",
        spec.columns.join(", "),
        spec.name,
        spec.order_by
    );
    sqlx::query(&sql).fetch_all(pool).await.map_err(|err| {
        AppError::from(err)
            .with_context("operation", "dump_table")
            .with_context("table", spec.name)
    })
}

fn rows_to_csv(spec: &TableSpec, rows: &[SqliteRow]) -> AppResult<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer
        .write_record(spec.columns)
        .map_err(|err| csv_error(err, spec.name))?;

    for row in rows {
        let mut record = Vec::with_capacity(spec.columns.len());
        for (idx, _) in spec.columns.iter().enumerate() {
            record.push(match cell_value(row, idx) {
                Value::Null => String::new(),
                Value::String(s) => s,
                other => other.to_string(),
            });
        }
        writer
            .write_record(&record)
            .map_err(|err| csv_error(err, spec.name))?;
    }

    writer.into_inner().map_err(|err| {
        AppError::new("EXPORT/CSV", err.to_string()).with_context("table", spec.name)
    })
}

fn rows_to_json(spec: &TableSpec, rows: &[SqliteRow]) -> AppResult<Vec<u8>> {
    let records: Vec<Value> = rows
        .iter()
        .map(|row| {
            let mut map = Map::new();
            for (idx, col) in spec.columns.iter().enumerate() {
                map.insert(col.to_string(), cell_value(row, idx));
            }
            Value::Object(map)
        })
        .collect();
    serde_json::to_vec_pretty(&records).map_err(AppError::from)
}

/// Decode one cell by its SQLite type; anything unreadable degrades to NULL
/// rather than failing the whole dump.
fn cell_value(row: &SqliteRow, idx: usize) -> Value {
    match row.try_get_raw(idx) {
        Ok(raw) if !raw.is_null() => match raw.type_info().name() {
            "INTEGER" => row
                .try_get::<i64, _>(idx)
                .map(Value::from)
                .unwrap_or(Value::Null),
            "REAL" => row
                .try_get::<f64, _>(idx)
                .map(Value::from)
                .unwrap_or(Value::Null),
            _ => row
                .try_get::<String, _>(idx)
                .map(Value::from)
                .unwrap_or(Value::Null),
        },
        _ => Value::Null,
    }
}

fn unique_export_dir(out_parent: &Path, timestamp: &DateTime<Utc>) -> AppResult<PathBuf> {
    let base = format!("export-{}", timestamp.format("%Y%m%d-%H%M%S"));
    let mut candidate = out_parent.join(&base);
    let mut counter = 0u32;
    while candidate.exists() {
        counter += 1;
        if counter > 99 {
            return Err(AppError::new(
                "EXPORT/DIR_ALLOC",
                "Could not allocate a unique export directory",
            )
            .with_context("base", base));
        }
        candidate = out_parent.join(format!("{base}-{counter:02}"));
    }
    Ok(candidate)
}

fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

fn csv_error(err: csv::Error, table: &str) -> AppError {
    AppError::new("EXPORT/CSV", err.to_string()).with_context("table", table.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn export_dirs_get_numbered_suffixes() {
        let parent = tempdir().unwrap();
        let ts = Utc::now();

        let first = unique_export_dir(parent.path(), &ts).unwrap();
        fs::create_dir_all(&first).unwrap();
        let second = unique_export_dir(parent.path(), &ts).unwrap();

        assert_ne!(first, second);
        assert!(second
            .file_name()
            .unwrap()
            .to_string_lossy()
            .ends_with("-01"));
    }
}
