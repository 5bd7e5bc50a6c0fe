//! Bulk load: append `<table>.csv` files from a directory into the store,
//! walking tables in foreign-key-safe order. Each table loads inside its
//! own transaction; a bad row aborts that table without touching the rows
//! already committed for earlier tables. Missing files are skipped and
//! reported, not treated as errors.

use std::fs::File;
use std::path::Path;

use futures::FutureExt;
use serde::Serialize;
use sqlx::SqlitePool;

use crate::db::with_tx;
use crate::tables::{TableSpec, TABLES};
use crate::{AppError, AppResult};

#[derive(Debug, Clone, Serialize)]
pub struct TableImport {
    pub table: String,
    pub rows: u64,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct ImportReport {
    pub tables: Vec<TableImport>,
    pub skipped: Vec<String>,
}

/// A parsed CSV row: one binding per column, `None` for NULL.
enum Field {
    Text(String),
    Integer(i64),
    Null,
}

pub async fn import_dir(pool: &SqlitePool, dir: &Path) -> AppResult<ImportReport> {
    if !dir.is_dir() {
        return Err(
            AppError::new("IMPORT/NO_SUCH_DIR", "Import directory does not exist")
                .with_context("path", dir.display().to_string()),
        );
    }

    let mut report = ImportReport::default();
    for spec in TABLES {
        let path = dir.join(format!("{}.csv", spec.name));
        if !path.exists() {
            tracing::warn!(
                target = "mostrador",
                event = "import_file_missing",
                table = %spec.name,
                path = %path.display()
            );
            report.skipped.push(spec.name.to_string());
            continue;
        }

        let rows = read_rows(spec, &path)?;
        let inserted = insert_rows(pool, spec, rows).await?;
        tracing::info!(
            target = "mostrador",
            event = "import_table",
            table = %spec.name,
            rows = inserted
        );
        report.tables.push(TableImport {
            table: spec.name.to_string(),
            rows: inserted,
        });
    }
    Ok(report)
}

fn read_rows(spec: &TableSpec, path: &Path) -> AppResult<Vec<Vec<Field>>> {
    let file = File::open(path).map_err(|err| {
        AppError::from(err)
            .with_context("operation", "open_import_file")
            .with_context("path", path.display().to_string())
    })?;
    let mut reader = csv::ReaderBuilder::new().from_reader(file);

    let headers = reader
        .headers()
        .map_err(|err| csv_error(err, spec.name))?
        .clone();
    let actual: Vec<&str> = headers.iter().collect();
    if actual != spec.columns {
        return Err(AppError::new(
            "IMPORT/BAD_HEADER",
            "CSV header does not match the table's columns",
        )
        .with_context("table", spec.name)
        .with_context("expected", spec.columns.join(","))
        .with_context("found", actual.join(",")));
    }

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.map_err(|err| csv_error(err, spec.name))?;
        if record.len() != spec.columns.len() {
            return Err(AppError::new("IMPORT/BAD_ROW", "Row has the wrong column count")
                .with_context("table", spec.name)
                .with_context("row", (line + 1).to_string()));
        }

        let mut fields = Vec::with_capacity(spec.columns.len());
        for (column, value) in spec.columns.iter().zip(record.iter()) {
            fields.push(parse_field(spec, column, value).map_err(|err| {
                err.with_context("table", spec.name)
                    .with_context("row", (line + 1).to_string())
            })?);
        }
        rows.push(fields);
    }
    Ok(rows)
}

fn parse_field(spec: &TableSpec, column: &str, value: &str) -> AppResult<Field> {
    if value.is_empty() && spec.nullable_columns.contains(&column) {
        return Ok(Field::Null);
    }
    if spec.integer_columns.contains(&column) {
        let parsed = value.trim().parse::<i64>().map_err(|_| {
            AppError::new("IMPORT/BAD_FIELD", "Expected an integer value")
                .with_context("column", column.to_string())
                .with_context("value", value.to_string())
        })?;
        return Ok(Field::Integer(parsed));
    }
    if value.is_empty() {
        return Err(AppError::new("IMPORT/BAD_FIELD", "Field must not be empty")
            .with_context("column", column.to_string()));
    }
    Ok(Field::Text(value.to_string()))
}

async fn insert_rows(
    pool: &SqlitePool,
    spec: &TableSpec,
    rows: Vec<Vec<Field>>,
) -> AppResult<u64> {
    let placeholders = vec!["?"; spec.columns.len()].join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        spec.name,
        spec.columns.join(", "),
        placeholders
    );
    let table = spec.name;

    with_tx(pool, move |conn| {
        async move {
            let mut inserted = 0u64;
            for fields in &rows {
                bind_row(&sql, fields)
                    .execute(&mut *conn)
                    .await
                    .map_err(|err| {
                        AppError::from(err)
                            .with_context("operation", "import_row")
                            .with_context("table", table)
                    })?;
                inserted += 1;
            }
            Ok::<_, AppError>(inserted)
        }
        .boxed()
    })
    .await
}

fn bind_row<'q>(
    sql: &'q str,
    fields: &'q [Field],
) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    let mut query = sqlx::query(sql);
    for field in fields {
        query = match field {
            Field::Text(s) => query.bind(s.as_str()),
            Field::Integer(i) => query.bind(*i),
            Field::Null => query.bind(Option::<String>::None),
        };
    }
    query
}

fn csv_error(err: csv::Error, table: &str) -> AppError {
    AppError::new("IMPORT/CSV", err.to_string()).with_context("table", table.to_string())
}
