use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, Row};

use crate::AppError;

/// Product category ("rubro").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl TryFrom<&SqliteRow> for Category {
    type Error = AppError;

    fn try_from(row: &SqliteRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.try_get("id").map_err(AppError::from)?,
            name: row.try_get("name").map_err(AppError::from)?,
            created_at: row.try_get("created_at").map_err(AppError::from)?,
            updated_at: row.try_get("updated_at").map_err(AppError::from)?,
        })
    }
}

/// Client region ("provincia").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Region {
    pub id: String,
    pub name: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl TryFrom<&SqliteRow> for Region {
    type Error = AppError;

    fn try_from(row: &SqliteRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.try_get("id").map_err(AppError::from)?,
            name: row.try_get("name").map_err(AppError::from)?,
            created_at: row.try_get("created_at").map_err(AppError::from)?,
            updated_at: row.try_get("updated_at").map_err(AppError::from)?,
        })
    }
}

/// A client together with its region's display name (reads always join it).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Client {
    pub id: String,
    pub name: String,
    pub region_id: String,
    pub region_name: String,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl TryFrom<&SqliteRow> for Client {
    type Error = AppError;

    fn try_from(row: &SqliteRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.try_get("id").map_err(AppError::from)?,
            name: row.try_get("name").map_err(AppError::from)?,
            region_id: row.try_get("region_id").map_err(AppError::from)?,
            region_name: row.try_get("region_name").map_err(AppError::from)?,
            address: row.try_get("address").map_err(AppError::from)?,
            phone: row
                .try_get::<Option<String>, _>("phone")
                .map_err(AppError::from)?,
            email: row
                .try_get::<Option<String>, _>("email")
                .map_err(AppError::from)?,
            created_at: row.try_get("created_at").map_err(AppError::from)?,
            updated_at: row.try_get("updated_at").map_err(AppError::from)?,
        })
    }
}

/// A product together with its category's display name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Product {
    pub id: String,
    pub description: String,
    pub price_cents: i64,
    pub stock: i64,
    pub category_id: String,
    pub category_name: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl TryFrom<&SqliteRow> for Product {
    type Error = AppError;

    fn try_from(row: &SqliteRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.try_get("id").map_err(AppError::from)?,
            description: row.try_get("description").map_err(AppError::from)?,
            price_cents: row.try_get("price_cents").map_err(AppError::from)?,
            stock: row.try_get("stock").map_err(AppError::from)?,
            category_id: row.try_get("category_id").map_err(AppError::from)?,
            category_name: row.try_get("category_name").map_err(AppError::from)?,
            created_at: row.try_get("created_at").map_err(AppError::from)?,
            updated_at: row.try_get("updated_at").map_err(AppError::from)?,
        })
    }
}

/// Invoice list row: the total is always computed from the current lines,
/// never stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InvoiceSummary {
    pub id: String,
    pub client_id: String,
    pub client_name: String,
    pub date: String,
    pub total_cents: i64,
}

impl TryFrom<&SqliteRow> for InvoiceSummary {
    type Error = AppError;

    fn try_from(row: &SqliteRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.try_get("id").map_err(AppError::from)?,
            client_id: row.try_get("client_id").map_err(AppError::from)?,
            client_name: row.try_get("client_name").map_err(AppError::from)?,
            date: row.try_get("date").map_err(AppError::from)?,
            total_cents: row.try_get("total_cents").map_err(AppError::from)?,
        })
    }
}

/// One line of an invoice, with the product name and computed subtotal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InvoiceLine {
    pub product_id: String,
    pub product_description: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub subtotal_cents: i64,
}

impl TryFrom<&SqliteRow> for InvoiceLine {
    type Error = AppError;

    fn try_from(row: &SqliteRow) -> Result<Self, Self::Error> {
        Ok(Self {
            product_id: row.try_get("product_id").map_err(AppError::from)?,
            product_description: row
                .try_get("product_description")
                .map_err(AppError::from)?,
            quantity: row.try_get("quantity").map_err(AppError::from)?,
            unit_price_cents: row.try_get("unit_price_cents").map_err(AppError::from)?,
            subtotal_cents: row.try_get("subtotal_cents").map_err(AppError::from)?,
        })
    }
}

/// A full invoice: header, lines and the recomputed total.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Invoice {
    #[serde(flatten)]
    pub summary: InvoiceSummary,
    pub lines: Vec<InvoiceLine>,
}
