//! Filter conditions and their normalization into a boolean AST root.
//!
//! Callers describe a filter in whichever shape is convenient: a keyed
//! mapping of column to value, a list of pairs, a raw fragment with
//! positional arguments, a prebuilt expression, a boolean, or a closure
//! evaluated against a [`VirtualRow`]. [`filter_expr`] turns any of these
//! into exactly one boolean expression node.
//!
//! ```ignore
//! use quarry::condition::{filter_expr, Condition};
//! use quarry::expr::{col, ExprExt};
//!
//! let cond = Condition::hash([("age", 30)]);
//! let expr = filter_expr(&cond)?.unwrap();
//! assert_eq!(expr, col("age").eq(30));
//! ```

use std::fmt;
use std::sync::Arc;

use crate::error::{QueryError, QueryResult};

use super::expr::{col, func, table_col, BooleanOp, Expr, Literal};

/// Closure form of a condition, evaluated against a [`VirtualRow`].
pub type VirtualRowFn = dyn Fn(&VirtualRow) -> Condition + Send + Sync;

// =============================================================================
// Condition input
// =============================================================================

/// A filter argument before normalization.
#[derive(Clone)]
pub enum Condition {
    /// Keyed mapping: one comparison per column, ANDed. Keys are unique.
    Hash(Vec<(Expr, Expr)>),

    /// Like `Hash`, but the same column may be tested more than once.
    Pairs(Vec<(Expr, Expr)>),

    /// Raw fragment followed by positional `?` arguments.
    Placeholder { sql: String, args: Vec<Expr> },

    /// Heterogeneous list; every element is normalized and ANDed.
    List(Vec<Condition>),

    /// A prebuilt expression.
    Expr(Expr),

    /// Always-true / always-false marker.
    Bool(bool),

    /// Trusted raw SQL text.
    Raw(String),

    /// A closure, optionally alongside a positional condition.
    Block {
        cond: Option<Box<Condition>>,
        block: Arc<VirtualRowFn>,
    },
}

/// Anything usable as the column side of a hash condition.
pub trait IntoColumn {
    fn into_column(self) -> Expr;
}

impl IntoColumn for &str {
    fn into_column(self) -> Expr {
        col(self)
    }
}

impl IntoColumn for String {
    fn into_column(self) -> Expr {
        Expr::Identifier(self)
    }
}

impl IntoColumn for Expr {
    fn into_column(self) -> Expr {
        self
    }
}

impl Condition {
    /// Keyed mapping. A repeated key replaces the earlier value in place.
    pub fn hash<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: IntoColumn,
        V: Into<Expr>,
    {
        let mut pairs: Vec<(Expr, Expr)> = Vec::new();
        for (k, v) in entries {
            let key = k.into_column();
            let value = v.into();
            match pairs.iter_mut().find(|(existing, _)| *existing == key) {
                Some(slot) => slot.1 = value,
                None => pairs.push((key, value)),
            }
        }
        Condition::Hash(pairs)
    }

    /// Ordered pairs; duplicate columns are kept.
    pub fn pairs<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: IntoColumn,
        V: Into<Expr>,
    {
        Condition::Pairs(
            entries
                .into_iter()
                .map(|(k, v)| (k.into_column(), v.into()))
                .collect(),
        )
    }

    /// Raw fragment with positional arguments.
    pub fn placeholder(sql: &str, args: Vec<Expr>) -> Self {
        Condition::Placeholder {
            sql: sql.into(),
            args,
        }
    }

    /// Trusted raw SQL text.
    pub fn raw(sql: &str) -> Self {
        Condition::Raw(sql.into())
    }

    /// Closure-only condition.
    pub fn block<F>(f: F) -> Self
    where
        F: Fn(&VirtualRow) -> Condition + Send + Sync + 'static,
    {
        Condition::Block {
            cond: None,
            block: Arc::new(f),
        }
    }

    /// Attach a closure to this condition; both halves are ANDed.
    pub fn with_block<F>(self, f: F) -> Self
    where
        F: Fn(&VirtualRow) -> Condition + Send + Sync + 'static,
    {
        Condition::Block {
            cond: Some(Box::new(self)),
            block: Arc::new(f),
        }
    }

    /// Whether this condition carries nothing to filter on.
    pub fn is_empty(&self) -> bool {
        match self {
            Condition::Hash(pairs) | Condition::Pairs(pairs) => pairs.is_empty(),
            Condition::List(items) => items.is_empty(),
            _ => false,
        }
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Hash(pairs) => f.debug_tuple("Hash").field(pairs).finish(),
            Condition::Pairs(pairs) => f.debug_tuple("Pairs").field(pairs).finish(),
            Condition::Placeholder { sql, args } => f
                .debug_struct("Placeholder")
                .field("sql", sql)
                .field("args", args)
                .finish(),
            Condition::List(items) => f.debug_tuple("List").field(items).finish(),
            Condition::Expr(expr) => f.debug_tuple("Expr").field(expr).finish(),
            Condition::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Condition::Raw(sql) => f.debug_tuple("Raw").field(sql).finish(),
            Condition::Block { cond, .. } => f
                .debug_struct("Block")
                .field("cond", cond)
                .field("block", &"<closure>")
                .finish(),
        }
    }
}

impl From<Expr> for Condition {
    fn from(expr: Expr) -> Self {
        Condition::Expr(expr)
    }
}

impl From<bool> for Condition {
    fn from(b: bool) -> Self {
        Condition::Bool(b)
    }
}

impl From<Vec<Condition>> for Condition {
    fn from(items: Vec<Condition>) -> Self {
        Condition::List(items)
    }
}

// =============================================================================
// Virtual row
// =============================================================================

/// Context handed to condition closures.
///
/// Turns plain names into expression nodes so closures can be written
/// without importing constructors.
#[derive(Debug, Default, Clone, Copy)]
pub struct VirtualRow;

impl VirtualRow {
    /// Column reference.
    pub fn col(&self, name: &str) -> Expr {
        col(name)
    }

    /// Qualified column reference.
    pub fn table_col(&self, table: &str, column: &str) -> Expr {
        table_col(table, column)
    }

    /// Function call.
    pub fn func(&self, name: &str, args: Vec<Expr>) -> Expr {
        func(name, args)
    }
}

// =============================================================================
// Normalization
// =============================================================================

/// Normalize a condition into a single boolean expression.
///
/// Returns `Ok(None)` when the condition is empty and carries no closure.
pub fn filter_expr(cond: &Condition) -> QueryResult<Option<Expr>> {
    match cond {
        Condition::Block { cond, block } => {
            let produced = block(&VirtualRow);
            let from_block = filter_expr(&produced)?;
            let positional = match cond {
                Some(c) if !c.is_empty() => filter_expr(c)?,
                _ => None,
            };
            Ok(match (positional, from_block) {
                (Some(p), Some(b)) => Some(Expr::boolean(BooleanOp::And, vec![p, b])),
                (p, b) => p.or(b),
            })
        }
        Condition::Hash(pairs) | Condition::Pairs(pairs) => Ok(from_value_pairs(pairs)),
        Condition::Placeholder { sql, args } => placeholder_expr(sql, args).map(Some),
        Condition::List(items) => {
            let mut conds = Vec::with_capacity(items.len());
            for item in items {
                if let Some(expr) = filter_expr(item)? {
                    conds.push(expr);
                }
            }
            Ok((!conds.is_empty()).then(|| Expr::and_all(conds)))
        }
        Condition::Expr(expr) => typed_expr(expr).map(Some),
        Condition::Bool(b) => Ok(Some(noop_bool(*b))),
        Condition::Raw(sql) => Ok(Some(Expr::Raw(format!("({})", sql)))),
    }
}

/// Build one comparison per pair and AND them together.
///
/// NULL and booleans compare with IS; lists and subqueries with IN;
/// everything else with `=`.
pub fn from_value_pairs(pairs: &[(Expr, Expr)]) -> Option<Expr> {
    if pairs.is_empty() {
        return None;
    }
    let conds = pairs
        .iter()
        .map(|(k, v)| {
            let op = match v {
                Expr::Literal(Literal::Null) | Expr::Literal(Literal::Bool(_)) => BooleanOp::Is,
                Expr::List(_) | Expr::Subquery(_) => BooleanOp::In,
                _ => BooleanOp::Eq,
            };
            Expr::boolean(op, vec![k.clone(), v.clone()])
        })
        .collect();
    Some(Expr::and_all(conds))
}

fn placeholder_expr(sql: &str, args: &[Expr]) -> QueryResult<Expr> {
    if args.is_empty() {
        return Ok(Expr::Raw(format!("({})", sql)));
    }
    let slots = sql.matches('?').count();
    if slots != args.len() {
        return Err(QueryError::invalid(format!(
            "placeholder fragment {:?} has {} slots but {} arguments",
            sql,
            slots,
            args.len()
        )));
    }
    Ok(Expr::Placeholder {
        sql: sql.into(),
        args: args.to_vec(),
        parens: true,
    })
}

fn typed_expr(expr: &Expr) -> QueryResult<Expr> {
    match expr {
        Expr::Literal(Literal::Bool(b)) => Ok(noop_bool(*b)),
        Expr::Placeholder { sql, args, .. } => Ok(Expr::Placeholder {
            sql: sql.clone(),
            args: args.clone(),
            parens: true,
        }),
        e if e.is_boolean_shaped() => Ok(e.clone()),
        other => Err(QueryError::invalid(format!(
            "invalid filter expression: {:?}",
            other
        ))),
    }
}

fn noop_bool(b: bool) -> Expr {
    Expr::boolean(BooleanOp::Noop, vec![Expr::Literal(Literal::Bool(b))])
}

// =============================================================================
// Tests
// =============================================================================
