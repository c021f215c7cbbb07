//! Query algebra.
//!
//! - [`expr`] - Expression AST and builder DSL
//! - [`condition`] - Filter inputs and their normalization
//! - [`query`] - Immutable query descriptors
//! - [`dialect`] - Capability flags per SQL dialect

pub mod condition;
pub mod dialect;
pub mod expr;
pub mod query;

// Re-export commonly used types at the sql module level
pub use condition::{filter_expr, Condition};
pub use dialect::{Capabilities, Dialect, SqlDialect};
pub use expr::{col, lit_int, lit_str, table_col, BooleanOp, Expr, ExprExt, Literal};
pub use query::{Query, QueryOptions};
