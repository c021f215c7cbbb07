//! # Quarry
//!
//! A compositional, dialect-aware query descriptor algebra.
//!
//! ## Architecture
//!
//! Callers build a query by chaining transformations over an immutable
//! descriptor. Every call returns a new descriptor; nothing is rendered to
//! SQL text here. A renderer consumes the finished descriptor and its
//! expression AST (both serialize via serde).
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │   Caller inputs (mappings, pairs, raw text, closures)    │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [condition]
//! ┌─────────────────────────────────────────────────────────┐
//! │                  Expression AST (expr)                   │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [query] + [dialect] capabilities
//! ┌─────────────────────────────────────────────────────────┐
//! │     Query descriptor (filters, joins, compounds, CTEs)   │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [association]
//! ┌─────────────────────────────────────────────────────────┐
//! │        Join chains for multi-hop eager loading           │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod association;
pub mod config;
pub mod error;
pub mod sql;

// Re-export SQL submodules at crate level
pub use sql::condition;
pub use sql::dialect;
pub use sql::expr;
pub use sql::query;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::association::{JoinChain, ThroughLink};
    pub use crate::condition::{filter_expr, Condition, VirtualRow};
    pub use crate::dialect::{Capabilities, CapabilityOverrides, Dialect, SqlDialect};
    pub use crate::error::{QueryError, QueryResult};
    pub use crate::expr::{
        // Constructors
        col,
        count_star,
        func,
        list,
        lit_bool,
        lit_float,
        lit_int,
        lit_null,
        lit_str,
        placeholder,
        raw_sql,
        star,
        table_col,
        table_star,
        // Types
        BooleanOp,
        Expr,
        ExprExt,
        Literal,
        NullsOrder,
    };
    pub use crate::query::{
        CompoundOptions, CteOptions, GrepOptions, JoinCondition, JoinOptions, JoinType, Qualify,
        Query, Selection, Source,
    };
}

// Also export at crate root for convenience
pub use dialect::Dialect;
pub use error::{QueryError, QueryResult};
pub use expr::{col, lit_int, lit_str, table_col, Expr, ExprExt};
pub use query::Query;
