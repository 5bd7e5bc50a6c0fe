//! Reference-data CRUD: boundary validation and referential-constraint
//! rejections for categories, regions, clients and products.

use anyhow::Result;
use mostrador_lib::catalog::clients::ClientInput;
use mostrador_lib::catalog::products::ProductInput;
use mostrador_lib::catalog::{categories, clients, products, regions};
use mostrador_lib::invoicing::{create_invoice, delete_invoice};
use mostrador_lib::{InvoiceInput, LineInput};

#[path = "util.rs"]
mod util;

#[tokio::test]
async fn referenced_category_cannot_be_deleted() -> Result<()> {
    let pool = util::memory_pool().await;
    let category = util::seed_category(&pool, "Monitores").await;
    let product = util::seed_product(&pool, &category, "Monitor", 10_000, 1).await;

    let err = categories::delete_category(&pool, &category)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "CATEGORY/IN_USE");

    products::delete_product(&pool, &product).await?;
    categories::delete_category(&pool, &category).await?;
    assert!(categories::get_category(&pool, &category).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn referenced_region_cannot_be_deleted() -> Result<()> {
    let pool = util::memory_pool().await;
    let region = util::seed_region(&pool, "Mendoza").await;
    let client = util::seed_client(&pool, &region, "Rosa Funes").await;

    let err = regions::delete_region(&pool, &region).await.unwrap_err();
    assert_eq!(err.code(), "REGION/IN_USE");

    clients::delete_client(&pool, &client).await?;
    regions::delete_region(&pool, &region).await?;
    Ok(())
}

#[tokio::test]
async fn client_with_open_invoices_cannot_be_deleted() -> Result<()> {
    let pool = util::memory_pool().await;
    let region = util::seed_region(&pool, "Santa Fe").await;
    let category = util::seed_category(&pool, "Periféricos").await;
    let client = util::seed_client(&pool, &region, "Jorge Brito").await;
    let product = util::seed_product(&pool, &category, "Parlantes", 7_500, 10).await;

    let invoice = create_invoice(
        &pool,
        InvoiceInput {
            client_id: client.clone(),
            date: "2026-03-01".to_string(),
            lines: vec![LineInput {
                product_id: product.clone(),
                quantity: 1,
            }],
        },
    )
    .await?;

    let err = clients::delete_client(&pool, &client).await.unwrap_err();
    assert_eq!(err.code(), "CLIENT/IN_USE");

    let err = products::delete_product(&pool, &product).await.unwrap_err();
    assert_eq!(err.code(), "PRODUCT/IN_USE");

    delete_invoice(&pool, &invoice).await?;
    clients::delete_client(&pool, &client).await?;
    products::delete_product(&pool, &product).await?;
    Ok(())
}

#[tokio::test]
async fn client_contact_fields_are_validated_when_present() -> Result<()> {
    let pool = util::memory_pool().await;
    let region = util::seed_region(&pool, "Buenos Aires").await;

    let base = |phone: Option<&str>, email: Option<&str>| ClientInput {
        name: "Valeria Ortiz".to_string(),
        region_id: region.clone(),
        address: "Calle Falsa 123".to_string(),
        phone: phone.map(str::to_string),
        email: email.map(str::to_string),
    };

    let err = clients::create_client(&pool, base(Some("12345"), None))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "CLIENT/INVALID_PHONE");

    let err = clients::create_client(&pool, base(None, Some("not-an-email")))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "CLIENT/INVALID_EMAIL");

    // Blank optional fields collapse to NULL instead of failing validation.
    let created = clients::create_client(&pool, base(Some("  "), Some("")))
        .await?;
    assert_eq!(created.phone, None);
    assert_eq!(created.email, None);

    let ok = clients::create_client(
        &pool,
        ClientInput {
            name: "Bruno Sala".to_string(),
            region_id: region.clone(),
            address: "Ruta 9 km 12".to_string(),
            phone: Some("+54 351 555-0101".to_string()),
            email: Some("bruno@sala.example.com".to_string()),
        },
    )
    .await?;
    assert_eq!(ok.phone.as_deref(), Some("+54 351 555-0101"));
    Ok(())
}

#[tokio::test]
async fn unknown_references_are_rejected_before_writing() -> Result<()> {
    let pool = util::memory_pool().await;

    let err = clients::create_client(
        &pool,
        ClientInput {
            name: "Sin Region".to_string(),
            region_id: "ghost".to_string(),
            address: "x".to_string(),
            phone: None,
            email: None,
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.code(), "CLIENT/UNKNOWN_REGION");

    let err = products::create_product(
        &pool,
        ProductInput {
            description: "Sin Rubro".to_string(),
            price_cents: 100,
            stock: 1,
            category_id: "ghost".to_string(),
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.code(), "PRODUCT/UNKNOWN_CATEGORY");

    let clients_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM clients")
        .fetch_one(&pool)
        .await?;
    let products_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
        .fetch_one(&pool)
        .await?;
    assert_eq!((clients_count, products_count), (0, 0));
    Ok(())
}

#[tokio::test]
async fn product_payload_validation() -> Result<()> {
    let pool = util::memory_pool().await;
    let category = util::seed_category(&pool, "Notebooks").await;

    let err = products::create_product(
        &pool,
        ProductInput {
            description: "  ".to_string(),
            price_cents: 100,
            stock: 1,
            category_id: category.clone(),
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.code(), "PRODUCT/EMPTY_DESCRIPTION");

    let err = products::create_product(
        &pool,
        ProductInput {
            description: "Netbook".to_string(),
            price_cents: -1,
            stock: 1,
            category_id: category.clone(),
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.code(), "PRODUCT/INVALID_PRICE");

    let err = products::create_product(
        &pool,
        ProductInput {
            description: "Netbook".to_string(),
            price_cents: 100,
            stock: -5,
            category_id: category.clone(),
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.code(), "PRODUCT/INVALID_STOCK");
    Ok(())
}

#[tokio::test]
async fn product_update_leaves_stock_to_the_ledger() -> Result<()> {
    let pool = util::memory_pool().await;
    let category = util::seed_category(&pool, "Memorias").await;
    let product = util::seed_product(&pool, &category, "DDR4 16GB", 9_000, 12).await;

    let updated = products::update_product(&pool, &product, "DDR4 16GB 3200", 9_500, &category)
        .await?;
    assert_eq!(updated.stock, 12);
    assert_eq!(updated.price_cents, 9_500);
    assert_eq!(updated.description, "DDR4 16GB 3200");

    let restocked = products::set_product_stock(&pool, &product, 40).await?;
    assert_eq!(restocked.stock, 40);

    let err = products::set_product_stock(&pool, &product, -1)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "PRODUCT/INVALID_STOCK");
    Ok(())
}

#[tokio::test]
async fn duplicate_reference_names_are_rejected() -> Result<()> {
    let pool = util::memory_pool().await;
    let first = util::seed_category(&pool, "Monitores").await;

    let err = categories::create_category(&pool, "Monitores")
        .await
        .unwrap_err();
    assert_eq!(err.code(), "CATEGORY/DUPLICATE_NAME");

    // Renaming a category onto itself is fine.
    let renamed = categories::update_category(&pool, &first, "Monitores").await?;
    assert_eq!(renamed.name, "Monitores");

    let second = categories::create_category(&pool, "Pantallas").await?;
    let err = categories::update_category(&pool, &second.id, "Monitores")
        .await
        .unwrap_err();
    assert_eq!(err.code(), "CATEGORY/DUPLICATE_NAME");
    Ok(())
}

#[tokio::test]
async fn missing_ids_surface_not_found() -> Result<()> {
    let pool = util::memory_pool().await;

    let err = categories::update_category(&pool, "nope", "X")
        .await
        .unwrap_err();
    assert_eq!(err.code(), "CATEGORY/NOT_FOUND");

    let err = regions::delete_region(&pool, "nope").await.unwrap_err();
    assert_eq!(err.code(), "REGION/NOT_FOUND");

    let err = products::delete_product(&pool, "nope").await.unwrap_err();
    assert_eq!(err.code(), "PRODUCT/NOT_FOUND");

    let err = clients::delete_client(&pool, "nope").await.unwrap_err();
    assert_eq!(err.code(), "CLIENT/NOT_FOUND");
    Ok(())
}
