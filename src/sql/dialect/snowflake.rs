//! Snowflake SQL dialect.
//!
//! Snowflake supports INTERSECT and EXCEPT (as MINUS too) but not their
//! ALL variants.

use super::SqlDialect;

/// Snowflake SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct Snowflake;

impl SqlDialect for Snowflake {
    fn name(&self) -> &'static str {
        "snowflake"
    }

    fn supports_intersect_except_all(&self) -> bool {
        false
    }
}
