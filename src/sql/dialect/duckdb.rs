//! DuckDB SQL dialect.
//!
//! DuckDB follows PostgreSQL closely, including DISTINCT ON.

use super::SqlDialect;

/// DuckDB SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct DuckDb;

impl SqlDialect for DuckDb {
    fn name(&self) -> &'static str {
        "duckdb"
    }

    fn supports_distinct_on(&self) -> bool {
        true
    }
}
