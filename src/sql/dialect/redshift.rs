//! Amazon Redshift SQL dialect.
//!
//! Redshift is PostgreSQL-derived but lags behind it:
//! - DISTINCT ON is accepted
//! - No INTERSECT ALL / EXCEPT ALL

use super::SqlDialect;

/// Amazon Redshift SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct Redshift;

impl SqlDialect for Redshift {
    fn name(&self) -> &'static str {
        "redshift"
    }

    fn supports_distinct_on(&self) -> bool {
        true
    }

    fn supports_intersect_except_all(&self) -> bool {
        false
    }
}
