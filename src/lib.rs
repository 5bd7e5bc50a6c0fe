pub mod catalog;
pub mod db;
mod error;
pub mod export;
mod id;
pub mod import;
pub mod invoicing;
pub mod migrate;
pub mod model;
pub mod money;
pub mod reporting;
pub mod seed;
mod tables;
pub mod time;

pub use error::{AppError, AppResult};
pub use invoicing::{InvoiceError, InvoiceInput, LineInput};

use std::sync::Once;

static INIT_LOGGING: Once = Once::new();

/// Install the tracing subscriber. Filter with `RUST_LOG`; defaults to
/// `info` for this crate and `warn` for dependencies.
pub fn init_logging() {
    INIT_LOGGING.call_once(|| {
        use tracing_subscriber::EnvFilter;

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("warn,mostrador=info,mostrador_lib=info"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    });
}
