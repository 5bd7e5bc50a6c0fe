//! Property: for any sequence of invoice create/edit/delete operations, a
//! product's stock always equals its initial stock minus the quantities
//! held by the invoice lines that currently exist. Rejected operations
//! must not disturb the equation.

use proptest::prelude::*;
use sqlx::SqlitePool;

use mostrador_lib::invoicing::{create_invoice, delete_invoice, update_invoice};
use mostrador_lib::{InvoiceInput, LineInput};

#[path = "util.rs"]
mod util;

const INITIAL_STOCKS: [i64; 3] = [12, 9, 30];

#[derive(Debug, Clone)]
enum Op {
    Create { product: usize, quantity: i64 },
    Edit {
        invoice: usize,
        product: usize,
        quantity: i64,
    },
    Delete { invoice: usize },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..3usize, 1..8i64).prop_map(|(product, quantity)| Op::Create { product, quantity }),
        (0..8usize, 0..3usize, 1..8i64).prop_map(|(invoice, product, quantity)| Op::Edit {
            invoice,
            product,
            quantity,
        }),
        (0..8usize).prop_map(|invoice| Op::Delete { invoice }),
    ]
}

async fn held_by_lines(pool: &SqlitePool, product_id: &str) -> i64 {
    sqlx::query_scalar(
        "SELECT COALESCE(SUM(quantity), 0) FROM invoice_lines WHERE product_id = ?",
    )
    .bind(product_id)
    .fetch_one(pool)
    .await
    .unwrap()
}

async fn run_sequence(ops: Vec<Op>) {
    let pool = util::memory_pool().await;
    let region = util::seed_region(&pool, "Santa Fe").await;
    let category = util::seed_category(&pool, "Periféricos").await;
    let client = util::seed_client(&pool, &region, "Cliente Propiedad").await;

    let mut product_ids = Vec::new();
    for (idx, stock) in INITIAL_STOCKS.iter().enumerate() {
        let id = util::seed_product(
            &pool,
            &category,
            &format!("Producto {idx}"),
            1_000 + idx as i64,
            *stock,
        )
        .await;
        product_ids.push(id);
    }

    let mut invoices: Vec<String> = Vec::new();
    for op in ops {
        match op {
            Op::Create { product, quantity } => {
                let result = create_invoice(
                    &pool,
                    InvoiceInput {
                        client_id: client.clone(),
                        date: "2026-03-01".to_string(),
                        lines: vec![LineInput {
                            product_id: product_ids[product].clone(),
                            quantity,
                        }],
                    },
                )
                .await;
                if let Ok(id) = result {
                    invoices.push(id);
                }
            }
            Op::Edit {
                invoice,
                product,
                quantity,
            } => {
                if invoices.is_empty() {
                    continue;
                }
                let id = invoices[invoice % invoices.len()].clone();
                // Rejections (e.g. insufficient stock) are fine; they must
                // simply leave the ledger balanced.
                let _ = update_invoice(
                    &pool,
                    &id,
                    InvoiceInput {
                        client_id: client.clone(),
                        date: "2026-03-02".to_string(),
                        lines: vec![LineInput {
                            product_id: product_ids[product].clone(),
                            quantity,
                        }],
                    },
                )
                .await;
            }
            Op::Delete { invoice } => {
                if invoices.is_empty() {
                    continue;
                }
                let idx = invoice % invoices.len();
                let id = invoices.remove(idx);
                delete_invoice(&pool, &id).await.unwrap();
            }
        }

        for (idx, product_id) in product_ids.iter().enumerate() {
            let stock = util::stock_of(&pool, product_id).await;
            let held = held_by_lines(&pool, product_id).await;
            assert_eq!(
                stock,
                INITIAL_STOCKS[idx] - held,
                "ledger out of balance for product {idx}"
            );
            assert!(stock >= 0, "stock went negative for product {idx}");
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 16,
        .. ProptestConfig::default()
    })]

    #[test]
    fn stock_equals_initial_minus_open_lines(ops in proptest::collection::vec(op_strategy(), 1..20)) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(run_sequence(ops));
    }
}
