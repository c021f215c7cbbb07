//! BigQuery SQL dialect.
//!
//! BigQuery requires `INTERSECT DISTINCT` / `EXCEPT DISTINCT`; the ALL
//! variants are rejected.

use super::SqlDialect;

/// BigQuery SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct BigQuery;

impl SqlDialect for BigQuery {
    fn name(&self) -> &'static str {
        "bigquery"
    }

    fn supports_intersect_except_all(&self) -> bool {
        false
    }
}
