//! SQL dialect capability flags.
//!
//! The query algebra never renders SQL text, but several transformations
//! depend on what the target database can express. Each dialect implements
//! [`SqlDialect`] and overrides only the predicates that differ from ANSI.
//!
//! # Usage
//!
//! ```ignore
//! use quarry::dialect::{Capabilities, Dialect, SqlDialect};
//!
//! assert!(!Dialect::TSql.supports_join_using());
//! let caps = Capabilities::from_dialect(&Dialect::Postgres);
//! ```
//!
//! # Capability Matrix
//!
//! | Feature | PostgreSQL | SQL Server | MySQL | DuckDB | Snowflake | BigQuery |
//! |---------|-----------|------------|-------|--------|-----------|----------|
//! | DISTINCT ON | ✓ | ❌ | ❌ | ✓ | ❌ | ❌ |
//! | JOIN ... USING | ✓ | ❌ | ✓ | ✓ | ✓ | ✓ |
//! | INTERSECT / EXCEPT | ✓ | ✓ | ❌ | ✓ | ✓ | ✓ |
//! | INTERSECT ALL / EXCEPT ALL | ✓ | ❌ | ❌ | ✓ | ❌ | ❌ |
//! | CTE (WITH) | ✓ | ✓ | ✓ | ✓ | ✓ | ✓ |
//! | CTE inside subqueries | ✓ | ❌ | ✓ | ✓ | ✓ | ✓ |
//! | CTE inside compounds | ✓ | ❌ | ✓ | ✓ | ✓ | ✓ |
//!
//! Legend: ✓ = supported, ❌ = not supported

mod ansi;
mod bigquery;
mod databricks;
mod duckdb;
mod mysql;
mod postgres;
mod redshift;
mod snowflake;
mod tsql;

// Ansi is a reference implementation; it is not part of the Dialect enum.
pub use ansi::Ansi;
pub use bigquery::BigQuery;
pub use databricks::Databricks;
pub use duckdb::DuckDb;
pub use mysql::MySql;
pub use postgres::Postgres;
pub use redshift::Redshift;
pub use snowflake::Snowflake;
pub use tsql::TSql;

use serde::{Deserialize, Serialize};

/// SQL dialect trait - answers capability questions for the query algebra.
///
/// The default implementations follow ANSI SQL.
pub trait SqlDialect: std::fmt::Debug {
    /// Dialect name for display/logging.
    fn name(&self) -> &'static str;

    /// Whether this dialect supports `SELECT DISTINCT ON (...)`.
    ///
    /// Only PostgreSQL and its derivatives plus DuckDB support this.
    fn supports_distinct_on(&self) -> bool {
        false
    }

    /// Whether this dialect supports `JOIN ... USING (cols)`.
    ///
    /// When false, USING joins are rewritten to ON joins with
    /// per-column equality.
    fn supports_join_using(&self) -> bool {
        true
    }

    /// Whether this dialect supports INTERSECT and EXCEPT.
    fn supports_intersect_except(&self) -> bool {
        true
    }

    /// Whether this dialect supports INTERSECT ALL and EXCEPT ALL.
    fn supports_intersect_except_all(&self) -> bool {
        true
    }

    /// Whether this dialect supports common table expressions.
    fn supports_cte(&self) -> bool {
        true
    }

    /// Whether a WITH clause may appear inside a subquery.
    ///
    /// T-SQL only allows WITH at the top level of a statement.
    fn supports_cte_in_subqueries(&self) -> bool {
        true
    }

    /// Whether a WITH clause may appear on one side of a compound.
    fn supports_cte_in_compounds(&self) -> bool {
        true
    }
}

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    DuckDb,
    TSql,
    MySql,
    Postgres,
    Snowflake,
    BigQuery,
    Redshift,
    Databricks,
}

impl Dialect {
    /// Get the dialect implementation.
    pub fn dialect(&self) -> &'static dyn SqlDialect {
        match self {
            Dialect::DuckDb => &DuckDb,
            Dialect::Postgres => &Postgres,
            Dialect::TSql => &TSql,
            Dialect::MySql => &MySql,
            Dialect::Snowflake => &Snowflake,
            Dialect::BigQuery => &BigQuery,
            Dialect::Redshift => &Redshift,
            Dialect::Databricks => &Databricks,
        }
    }

    /// Look up a dialect by its display name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        let dialect = match name.to_ascii_lowercase().as_str() {
            "duckdb" => Dialect::DuckDb,
            "tsql" | "mssql" => Dialect::TSql,
            "mysql" => Dialect::MySql,
            "postgres" | "postgresql" => Dialect::Postgres,
            "snowflake" => Dialect::Snowflake,
            "bigquery" => Dialect::BigQuery,
            "redshift" => Dialect::Redshift,
            "databricks" => Dialect::Databricks,
            _ => return None,
        };
        Some(dialect)
    }
}

// Implement SqlDialect for Dialect enum by delegating to concrete types
impl SqlDialect for Dialect {
    fn name(&self) -> &'static str {
        self.dialect().name()
    }

    fn supports_distinct_on(&self) -> bool {
        self.dialect().supports_distinct_on()
    }

    fn supports_join_using(&self) -> bool {
        self.dialect().supports_join_using()
    }

    fn supports_intersect_except(&self) -> bool {
        self.dialect().supports_intersect_except()
    }

    fn supports_intersect_except_all(&self) -> bool {
        self.dialect().supports_intersect_except_all()
    }

    fn supports_cte(&self) -> bool {
        self.dialect().supports_cte()
    }

    fn supports_cte_in_subqueries(&self) -> bool {
        self.dialect().supports_cte_in_subqueries()
    }

    fn supports_cte_in_compounds(&self) -> bool {
        self.dialect().supports_cte_in_compounds()
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.dialect().name())
    }
}

// =============================================================================
// Resolved capability set
// =============================================================================

/// A resolved, copyable set of capability flags.
///
/// This is what a [`Query`](crate::query::Query) carries. It is built once
/// from a [`SqlDialect`] (optionally with per-flag overrides) and only read
/// afterwards, so descriptors can be shared across threads freely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub name: &'static str,
    pub distinct_on: bool,
    pub join_using: bool,
    pub intersect_except: bool,
    pub intersect_except_all: bool,
    pub cte: bool,
    pub cte_in_subqueries: bool,
    pub cte_in_compounds: bool,
}

impl Capabilities {
    /// Snapshot the capability flags of a dialect.
    pub fn from_dialect(dialect: &dyn SqlDialect) -> Self {
        Self {
            name: dialect.name(),
            distinct_on: dialect.supports_distinct_on(),
            join_using: dialect.supports_join_using(),
            intersect_except: dialect.supports_intersect_except(),
            intersect_except_all: dialect.supports_intersect_except_all(),
            cte: dialect.supports_cte(),
            cte_in_subqueries: dialect.supports_cte_in_subqueries(),
            cte_in_compounds: dialect.supports_cte_in_compounds(),
        }
    }

    /// Apply explicit overrides on top of the dialect defaults.
    pub fn with_overrides(mut self, overrides: &CapabilityOverrides) -> Self {
        let apply = |slot: &mut bool, value: Option<bool>| {
            if let Some(v) = value {
                *slot = v;
            }
        };
        apply(&mut self.distinct_on, overrides.distinct_on);
        apply(&mut self.join_using, overrides.join_using);
        apply(&mut self.intersect_except, overrides.intersect_except);
        apply(&mut self.intersect_except_all, overrides.intersect_except_all);
        apply(&mut self.cte, overrides.cte);
        apply(&mut self.cte_in_subqueries, overrides.cte_in_subqueries);
        apply(&mut self.cte_in_compounds, overrides.cte_in_compounds);
        self
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::from_dialect(&Dialect::default())
    }
}

impl From<Dialect> for Capabilities {
    fn from(dialect: Dialect) -> Self {
        Self::from_dialect(&dialect)
    }
}

impl SqlDialect for Capabilities {
    fn name(&self) -> &'static str {
        self.name
    }

    fn supports_distinct_on(&self) -> bool {
        self.distinct_on
    }

    fn supports_join_using(&self) -> bool {
        self.join_using
    }

    fn supports_intersect_except(&self) -> bool {
        self.intersect_except
    }

    fn supports_intersect_except_all(&self) -> bool {
        self.intersect_except_all
    }

    fn supports_cte(&self) -> bool {
        self.cte
    }

    fn supports_cte_in_subqueries(&self) -> bool {
        self.cte_in_subqueries
    }

    fn supports_cte_in_compounds(&self) -> bool {
        self.cte_in_compounds
    }
}

/// Per-flag overrides, typically read from the `[dialect.overrides]` table
/// of the settings file. `None` keeps the dialect default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapabilityOverrides {
    pub distinct_on: Option<bool>,
    pub join_using: Option<bool>,
    pub intersect_except: Option<bool>,
    pub intersect_except_all: Option<bool>,
    pub cte: Option<bool>,
    pub cte_in_subqueries: Option<bool>,
    pub cte_in_compounds: Option<bool>,
}
