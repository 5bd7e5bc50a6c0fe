//! The invoice reconciliation scenarios: stock follows the line items
//! through create, replace-on-edit and delete, and totals are always
//! recomputed from the current lines.

use anyhow::Result;
use mostrador_lib::catalog::products;
use mostrador_lib::invoicing::{
    self, create_invoice, delete_invoice, update_invoice, InvoiceError,
};
use mostrador_lib::{InvoiceInput, LineInput};

#[path = "util.rs"]
mod util;

fn input(client_id: &str, date: &str, lines: Vec<(String, i64)>) -> InvoiceInput {
    InvoiceInput {
        client_id: client_id.to_string(),
        date: date.to_string(),
        lines: lines
            .into_iter()
            .map(|(product_id, quantity)| LineInput {
                product_id,
                quantity,
            })
            .collect(),
    }
}

#[tokio::test]
async fn create_edit_delete_walks_stock_and_totals() -> Result<()> {
    let pool = util::memory_pool().await;
    let region = util::seed_region(&pool, "Santa Fe").await;
    let category = util::seed_category(&pool, "Monitores").await;
    let client = util::seed_client(&pool, &region, "Carla Ruiz").await;
    // Stock 10, price 100.00.
    let product = util::seed_product(&pool, &category, "Monitor 24\"", 10_000, 10).await;

    let id = create_invoice(
        &pool,
        input(&client, "2026-03-01", vec![(product.clone(), 3)]),
    )
    .await?;
    assert_eq!(util::stock_of(&pool, &product).await, 7);
    let invoice = invoicing::get_invoice(&pool, &id).await?.unwrap();
    assert_eq!(invoice.summary.total_cents, 30_000);
    assert_eq!(invoice.lines.len(), 1);
    assert_eq!(invoice.lines[0].subtotal_cents, 30_000);

    // Replace the line set: 3 released, 5 consumed.
    update_invoice(
        &pool,
        &id,
        input(&client, "2026-03-02", vec![(product.clone(), 5)]),
    )
    .await?;
    assert_eq!(util::stock_of(&pool, &product).await, 5);
    let invoice = invoicing::get_invoice(&pool, &id).await?.unwrap();
    assert_eq!(invoice.summary.total_cents, 50_000);
    assert_eq!(invoice.summary.date, "2026-03-02");

    delete_invoice(&pool, &id).await?;
    assert_eq!(util::stock_of(&pool, &product).await, 10);
    assert!(invoicing::get_invoice(&pool, &id).await?.is_none());
    assert!(invoicing::list_invoices(&pool).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn insufficient_stock_rejects_without_mutating() -> Result<()> {
    let pool = util::memory_pool().await;
    let region = util::seed_region(&pool, "Córdoba").await;
    let category = util::seed_category(&pool, "Memorias").await;
    let client = util::seed_client(&pool, &region, "Diego Paz").await;
    let product = util::seed_product(&pool, &category, "DDR5 16GB", 8_500, 2).await;

    let err = create_invoice(
        &pool,
        input(&client, "2026-03-01", vec![(product.clone(), 3)]),
    )
    .await
    .unwrap_err();

    match err {
        InvoiceError::InsufficientStock {
            requested,
            available,
            ..
        } => {
            assert_eq!(requested, 3);
            assert_eq!(available, 2);
        }
        other => panic!("expected insufficient stock, got {other:?}"),
    }

    assert_eq!(util::stock_of(&pool, &product).await, 2);
    assert!(invoicing::list_invoices(&pool).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn precondition_failures_leave_no_trace() -> Result<()> {
    let pool = util::memory_pool().await;
    let region = util::seed_region(&pool, "Mendoza").await;
    let category = util::seed_category(&pool, "Notebooks").await;
    let client = util::seed_client(&pool, &region, "Lucía Vega").await;
    let product = util::seed_product(&pool, &category, "Notebook 14\"", 250_000, 4).await;

    let err = create_invoice(&pool, input("missing-client", "2026-03-01", vec![(product.clone(), 1)]))
        .await
        .unwrap_err();
    assert!(matches!(err, InvoiceError::UnknownClient(_)));

    let err = create_invoice(&pool, input(&client, "01-03-2026", vec![(product.clone(), 1)]))
        .await
        .unwrap_err();
    assert!(matches!(err, InvoiceError::InvalidDate(_)));

    let err = create_invoice(&pool, input(&client, "2026-03-01", vec![]))
        .await
        .unwrap_err();
    assert!(matches!(err, InvoiceError::EmptyLines));

    let err = create_invoice(
        &pool,
        input(
            &client,
            "2026-03-01",
            vec![(product.clone(), 1), (product.clone(), 2)],
        ),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, InvoiceError::DuplicateProduct(_)));

    let err = create_invoice(&pool, input(&client, "2026-03-01", vec![(product.clone(), 0)]))
        .await
        .unwrap_err();
    assert!(matches!(err, InvoiceError::InvalidQuantity(_)));

    let err = create_invoice(
        &pool,
        input(&client, "2026-03-01", vec![("missing-product".to_string(), 1)]),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, InvoiceError::UnknownProduct(_)));

    assert_eq!(util::stock_of(&pool, &product).await, 4);
    assert!(invoicing::list_invoices(&pool).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn unit_price_is_a_snapshot() -> Result<()> {
    let pool = util::memory_pool().await;
    let region = util::seed_region(&pool, "Tucumán").await;
    let category = util::seed_category(&pool, "Periféricos").await;
    let client = util::seed_client(&pool, &region, "Mario Sosa").await;
    let product = util::seed_product(&pool, &category, "Teclado", 5_000, 20).await;

    let id = create_invoice(
        &pool,
        input(&client, "2026-04-01", vec![(product.clone(), 2)]),
    )
    .await?;

    // Raise the catalog price; the existing invoice must keep its snapshot.
    products::update_product(&pool, &product, "Teclado", 9_999, &category).await?;
    let invoice = invoicing::get_invoice(&pool, &id).await?.unwrap();
    assert_eq!(invoice.summary.total_cents, 10_000);
    assert_eq!(invoice.lines[0].unit_price_cents, 5_000);

    // An edit re-snapshots at the current price.
    update_invoice(
        &pool,
        &id,
        input(&client, "2026-04-01", vec![(product.clone(), 2)]),
    )
    .await?;
    let invoice = invoicing::get_invoice(&pool, &id).await?.unwrap();
    assert_eq!(invoice.lines[0].unit_price_cents, 9_999);
    assert_eq!(invoice.summary.total_cents, 19_998);

    Ok(())
}

#[tokio::test]
async fn delete_then_identical_recreate_round_trips_stock() -> Result<()> {
    let pool = util::memory_pool().await;
    let region = util::seed_region(&pool, "Buenos Aires").await;
    let category = util::seed_category(&pool, "Almacenamiento").await;
    let client = util::seed_client(&pool, &region, "Paula Núñez").await;
    let product = util::seed_product(&pool, &category, "SSD 1TB", 72_000, 9).await;

    let first = create_invoice(
        &pool,
        input(&client, "2026-05-05", vec![(product.clone(), 4)]),
    )
    .await?;
    assert_eq!(util::stock_of(&pool, &product).await, 5);

    delete_invoice(&pool, &first).await?;
    assert_eq!(util::stock_of(&pool, &product).await, 9);

    let second = create_invoice(
        &pool,
        input(&client, "2026-05-05", vec![(product.clone(), 4)]),
    )
    .await?;
    assert_ne!(first, second);
    assert_eq!(util::stock_of(&pool, &product).await, 5);

    Ok(())
}

#[tokio::test]
async fn multi_line_invoices_sum_their_subtotals() -> Result<()> {
    let pool = util::memory_pool().await;
    let region = util::seed_region(&pool, "Santa Fe").await;
    let category = util::seed_category(&pool, "Periféricos").await;
    let client = util::seed_client(&pool, &region, "Hugo Prat").await;
    let mouse = util::seed_product(&pool, &category, "Mouse", 3_000, 10).await;
    let headset = util::seed_product(&pool, &category, "Auriculares", 12_500, 6).await;

    let id = create_invoice(
        &pool,
        input(
            &client,
            "2026-06-10",
            vec![(mouse.clone(), 3), (headset.clone(), 2)],
        ),
    )
    .await?;

    let invoice = invoicing::get_invoice(&pool, &id).await?.unwrap();
    assert_eq!(invoice.summary.total_cents, 3 * 3_000 + 2 * 12_500);
    // Lines come back ordered by product description.
    assert_eq!(invoice.lines[0].product_description, "Auriculares");
    assert_eq!(invoice.lines[1].product_description, "Mouse");

    assert_eq!(util::stock_of(&pool, &mouse).await, 7);
    assert_eq!(util::stock_of(&pool, &headset).await, 4);
    Ok(())
}

#[tokio::test]
async fn missing_invoice_ids_are_reported() -> Result<()> {
    let pool = util::memory_pool().await;
    let region = util::seed_region(&pool, "Córdoba").await;
    let category = util::seed_category(&pool, "Memorias").await;
    let client = util::seed_client(&pool, &region, "Nora Gil").await;
    let product = util::seed_product(&pool, &category, "DDR4 8GB", 4_200, 5).await;

    let err = delete_invoice(&pool, "nope").await.unwrap_err();
    assert!(matches!(err, InvoiceError::NotFound(_)));

    let err = update_invoice(
        &pool,
        "nope",
        input(&client, "2026-03-01", vec![(product, 1)]),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, InvoiceError::NotFound(_)));

    assert!(invoicing::get_invoice(&pool, "nope").await?.is_none());
    Ok(())
}
