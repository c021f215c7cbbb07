//! Databricks (Spark SQL) dialect.
//!
//! Spark 3 supports INTERSECT ALL and EXCEPT ALL; DISTINCT ON is absent.

use super::SqlDialect;

/// Databricks SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct Databricks;

impl SqlDialect for Databricks {
    fn name(&self) -> &'static str {
        "databricks"
    }
}
