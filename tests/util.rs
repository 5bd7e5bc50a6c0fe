#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

use mostrador_lib::catalog::clients::ClientInput;
use mostrador_lib::catalog::products::ProductInput;
use mostrador_lib::catalog::{categories, clients, products, regions};
use mostrador_lib::migrate;

/// In-memory store with foreign keys on and the real migrations applied.
pub async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("connect sqlite::memory:");
    sqlx::query("PRAGMA foreign_keys=ON;")
        .execute(&pool)
        .await
        .unwrap();
    migrate::apply_migrations(&pool).await.unwrap();
    pool
}

pub async fn seed_region(pool: &SqlitePool, name: &str) -> String {
    regions::create_region(pool, name).await.unwrap().id
}

pub async fn seed_category(pool: &SqlitePool, name: &str) -> String {
    categories::create_category(pool, name).await.unwrap().id
}

pub async fn seed_client(pool: &SqlitePool, region_id: &str, name: &str) -> String {
    clients::create_client(
        pool,
        ClientInput {
            name: name.to_string(),
            region_id: region_id.to_string(),
            address: "Av. Siempreviva 742".to_string(),
            phone: None,
            email: None,
        },
    )
    .await
    .unwrap()
    .id
}

pub async fn seed_product(
    pool: &SqlitePool,
    category_id: &str,
    description: &str,
    price_cents: i64,
    stock: i64,
) -> String {
    products::create_product(
        pool,
        ProductInput {
            description: description.to_string(),
            price_cents,
            stock,
            category_id: category_id.to_string(),
        },
    )
    .await
    .unwrap()
    .id
}

pub async fn stock_of(pool: &SqlitePool, product_id: &str) -> i64 {
    sqlx::query_scalar("SELECT stock FROM products WHERE id = ?")
        .bind(product_id)
        .fetch_one(pool)
        .await
        .unwrap()
}
