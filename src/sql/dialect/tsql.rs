//! T-SQL (SQL Server) dialect.
//!
//! T-SQL differences from ANSI:
//! - No JOIN ... USING (emulated with ON equality)
//! - INTERSECT / EXCEPT but no ALL variants
//! - WITH only at statement level: not inside subqueries or compounds

use super::SqlDialect;

/// T-SQL (SQL Server) dialect.
#[derive(Debug, Clone, Copy)]
pub struct TSql;

impl SqlDialect for TSql {
    fn name(&self) -> &'static str {
        "tsql"
    }

    fn supports_join_using(&self) -> bool {
        false
    }

    fn supports_intersect_except_all(&self) -> bool {
        false
    }

    fn supports_cte_in_subqueries(&self) -> bool {
        false
    }

    fn supports_cte_in_compounds(&self) -> bool {
        false
    }
}
