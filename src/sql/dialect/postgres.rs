//! PostgreSQL SQL dialect.
//!
//! PostgreSQL features relevant to query composition:
//! - DISTINCT ON
//! - JOIN ... USING
//! - INTERSECT / EXCEPT, including ALL
//! - CTEs anywhere (subqueries, compounds, DML)

use super::SqlDialect;

/// PostgreSQL SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct Postgres;

impl SqlDialect for Postgres {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn supports_distinct_on(&self) -> bool {
        true
    }
}
