//! Database schema definitions

/// SQL to create the prices table
///
/// `row_id` is the surrogate key; `id` is the externally supplied identifier
/// and may repeat.
pub const CREATE_PRICES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS prices (
    row_id INTEGER PRIMARY KEY AUTOINCREMENT,
    id INTEGER NOT NULL,
    create_date TEXT NOT NULL,
    name TEXT NOT NULL,
    category TEXT NOT NULL,
    price TEXT NOT NULL
)
"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_prices_export_order ON prices(id, create_date, name, category)",
    "CREATE INDEX IF NOT EXISTS idx_prices_category ON prices(category)",
];

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![CREATE_PRICES_TABLE];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}
