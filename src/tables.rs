//! The persisted tables, in foreign-key-safe order: parents before the
//! rows that reference them. Import walks this list forwards; both import
//! and export name columns explicitly so file layouts stay pinned to the
//! schema rather than to `SELECT *` column order.

pub(crate) struct TableSpec {
    pub name: &'static str,
    pub columns: &'static [&'static str],
    /// Columns validated as i64 before binding.
    pub integer_columns: &'static [&'static str],
    /// Columns where the empty string means NULL.
    pub nullable_columns: &'static [&'static str],
    pub order_by: &'static str,
}

pub(crate) const TABLES: &[TableSpec] = &[
    TableSpec {
        name: "regions",
        columns: &["id", "name", "created_at", "updated_at"],
        integer_columns: &["created_at", "updated_at"],
        nullable_columns: &[],
        order_by: "id",
    },
    TableSpec {
        name: "categories",
        columns: &["id", "name", "created_at", "updated_at"],
        integer_columns: &["created_at", "updated_at"],
        nullable_columns: &[],
        order_by: "id",
    },
    TableSpec {
        name: "clients",
        columns: &[
            "id",
            "name",
            "region_id",
            "address",
            "phone",
            "email",
            "created_at",
            "updated_at",
        ],
        integer_columns: &["created_at", "updated_at"],
        nullable_columns: &["phone", "email"],
        order_by: "id",
    },
    TableSpec {
        name: "products",
        columns: &[
            "id",
            "description",
            "price_cents",
            "stock",
            "category_id",
            "created_at",
            "updated_at",
        ],
        integer_columns: &["price_cents", "stock", "created_at", "updated_at"],
        nullable_columns: &[],
        order_by: "id",
    },
    TableSpec {
        name: "invoices",
        columns: &["id", "client_id", "date", "created_at", "updated_at"],
        integer_columns: &["created_at", "updated_at"],
        nullable_columns: &[],
        order_by: "id",
    },
    TableSpec {
        name: "invoice_lines",
        columns: &["invoice_id", "product_id", "quantity", "unit_price_cents"],
        integer_columns: &["quantity", "unit_price_cents"],
        nullable_columns: &[],
        order_by: "invoice_id, product_id",
    },
];
