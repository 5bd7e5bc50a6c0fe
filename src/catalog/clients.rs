use sqlx::SqlitePool;

use super::{email_is_valid, optional_text, phone_is_valid, require_text};
use crate::id::new_uuid_v7;
use crate::model::Client;
use crate::time::now_ms;
use crate::{AppError, AppResult};

/// Payload for client create/update. Phone and email are optional but are
/// validated whenever they are present.
#[derive(Debug, Clone)]
pub struct ClientInput {
    pub name: String,
    pub region_id: String,
    pub address: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

struct ValidClient {
    name: String,
    region_id: String,
    address: String,
    phone: Option<String>,
    email: Option<String>,
}

const SELECT_CLIENT: &str = "SELECT c.id, c.name, c.region_id, r.name AS region_name, \
     c.address, c.phone, c.email, c.created_at, c.updated_at \
     FROM clients AS c JOIN regions AS r ON c.region_id = r.id";

pub async fn list_clients(pool: &SqlitePool) -> AppResult<Vec<Client>> {
    let sql = format!("{SELECT_CLIENT} ORDER BY c.name, c.id");
    let rows = sqlx::query(&sql)
        .fetch_all(pool)
        .await
        .map_err(|err| AppError::from(err).with_context("operation", "list_clients"))?;
    rows.iter().map(Client::try_from).collect()
}

pub async fn get_client(pool: &SqlitePool, id: &str) -> AppResult<Option<Client>> {
    let sql = format!("{SELECT_CLIENT} WHERE c.id = ?");
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|err| {
            AppError::from(err)
                .with_context("operation", "get_client")
                .with_context("id", id.to_string())
        })?;
    row.as_ref().map(Client::try_from).transpose()
}

pub async fn create_client(pool: &SqlitePool, input: ClientInput) -> AppResult<Client> {
    let valid = validate(pool, input).await?;

    let id = new_uuid_v7();
    let now = now_ms();
    sqlx::query(
        "INSERT INTO clients (id, name, region_id, address, phone, email, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(&valid.name)
    .bind(&valid.region_id)
    .bind(&valid.address)
    .bind(&valid.phone)
    .bind(&valid.email)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .map_err(|err| AppError::from(err).with_context("operation", "create_client"))?;

    get_client(pool, &id).await?.ok_or_else(|| not_found(&id))
}

pub async fn update_client(pool: &SqlitePool, id: &str, input: ClientInput) -> AppResult<Client> {
    let valid = validate(pool, input).await?;

    let res = sqlx::query(
        "UPDATE clients SET name = ?, region_id = ?, address = ?, phone = ?, email = ?, \
         updated_at = ? WHERE id = ?",
    )
    .bind(&valid.name)
    .bind(&valid.region_id)
    .bind(&valid.address)
    .bind(&valid.phone)
    .bind(&valid.email)
    .bind(now_ms())
    .bind(id)
    .execute(pool)
    .await
    .map_err(|err| AppError::from(err).with_context("operation", "update_client"))?;
    if res.rows_affected() == 0 {
        return Err(not_found(id));
    }

    get_client(pool, id).await?.ok_or_else(|| not_found(id))
}

pub async fn delete_client(pool: &SqlitePool, id: &str) -> AppResult<()> {
    let in_use: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM invoices WHERE client_id = ?")
        .bind(id)
        .fetch_one(pool)
        .await
        .map_err(|err| AppError::from(err).with_context("operation", "delete_client"))?;
    if in_use > 0 {
        return Err(
            AppError::new("CLIENT/IN_USE", "Client is referenced by invoices")
                .with_context("id", id.to_string())
                .with_context("invoices", in_use.to_string()),
        );
    }

    let res = sqlx::query("DELETE FROM clients WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .map_err(|err| AppError::from(err).with_context("operation", "delete_client"))?;
    if res.rows_affected() == 0 {
        return Err(not_found(id));
    }
    Ok(())
}

async fn validate(pool: &SqlitePool, input: ClientInput) -> AppResult<ValidClient> {
    let name = require_text(&input.name, "CLIENT/EMPTY_NAME", "name")?;
    let address = require_text(&input.address, "CLIENT/EMPTY_ADDRESS", "address")?;
    let region_id = require_text(&input.region_id, "CLIENT/UNKNOWN_REGION", "region_id")?;

    let region_exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM regions WHERE id = ?")
        .bind(&region_id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::from)?;
    if region_exists.is_none() {
        return Err(
            AppError::new("CLIENT/UNKNOWN_REGION", "Region does not exist")
                .with_context("region_id", region_id),
        );
    }

    let phone = optional_text(input.phone.as_deref());
    if let Some(ref p) = phone {
        if !phone_is_valid(p) {
            return Err(
                AppError::new("CLIENT/INVALID_PHONE", "Telephone number is not valid")
                    .with_context("phone", p.clone()),
            );
        }
    }

    let email = optional_text(input.email.as_deref());
    if let Some(ref e) = email {
        if !email_is_valid(e) {
            return Err(
                AppError::new("CLIENT/INVALID_EMAIL", "Email address is not valid")
                    .with_context("email", e.clone()),
            );
        }
    }

    Ok(ValidClient {
        name,
        region_id,
        address,
        phone,
        email,
    })
}

fn not_found(id: &str) -> AppError {
    AppError::new("CLIENT/NOT_FOUND", "Client not found").with_context("id", id.to_string())
}
