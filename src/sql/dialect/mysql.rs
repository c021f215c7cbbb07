//! MySQL SQL dialect.
//!
//! MySQL differences from ANSI:
//! - No DISTINCT ON
//! - No INTERSECT / EXCEPT before 8.0.31 (assumed unavailable)
//! - CTEs from 8.0

use super::SqlDialect;

/// MySQL SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct MySql;

impl SqlDialect for MySql {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn supports_intersect_except(&self) -> bool {
        false
    }

    fn supports_intersect_except_all(&self) -> bool {
        false
    }
}
