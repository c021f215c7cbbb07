//! Expression AST - the nodes every clause of a query is built from.
//!
//! This module provides a closed, strongly-typed AST. Renderers match on it
//! exhaustively; the compiler enforces that every variant is handled.

use serde::Serialize;

use crate::query::Query;

// =============================================================================
// Expression AST
// =============================================================================

/// A SQL expression node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expr {
    /// Boolean connective or binary comparison.
    ///
    /// `And`/`Or` take any number of children, `Not`/`Noop` exactly one,
    /// comparison operators exactly two (left, right).
    Boolean { op: BooleanOp, args: Vec<Expr> },

    /// LIKE-family match: expr [NOT] LIKE|ILIKE pattern
    Like {
        expr: Box<Expr>,
        pattern: Box<Expr>,
        case_insensitive: bool,
        negated: bool,
    },

    /// Bare column (or table) name.
    Identifier(String),

    /// Qualified reference: table.column (or schema.table for sources).
    Qualified { table: String, column: String },

    /// expr AS alias
    Aliased { expr: Box<Expr>, alias: String },

    /// Wildcard: * or table.*
    Star { table: Option<String> },

    /// ORDER BY term.
    Ordered {
        expr: Box<Expr>,
        descending: bool,
        nulls: Option<NullsOrder>,
    },

    /// Raw fragment with positional `?` substitution.
    Placeholder {
        sql: String,
        args: Vec<Expr>,
        parens: bool,
    },

    /// Trusted raw SQL passed to the renderer verbatim.
    ///
    /// # Security Warning
    ///
    /// **Never pass user input to this variant.** Use [`Expr::Literal`]
    /// or [`Expr::Placeholder`] arguments for values.
    Raw(String),

    /// Literal values
    Literal(Literal),

    /// Value list, as the right-hand side of IN.
    List(Vec<Expr>),

    /// Function call: name(args...)
    Function { name: String, args: Vec<Expr> },

    /// Nested query used as a value or a source.
    Subquery(Box<Query>),
}

/// Literal values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Literal {
    Int(i64),
    Float(f64),
    String(String),
    Bool(bool),
    Null,
}

/// Operators of [`Expr::Boolean`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BooleanOp {
    // Connectives
    And,
    Or,
    Not,
    /// Pass-through wrapper: renders its single argument unchanged.
    Noop,
    // Comparison
    Eq,
    Ne,
    Lt,
    Gt,
    Lte,
    Gte,
    Is,
    IsNot,
    In,
    NotIn,
}

impl BooleanOp {
    /// Whether this is a two-operand comparison.
    pub fn is_comparison(&self) -> bool {
        !matches!(
            self,
            BooleanOp::And | BooleanOp::Or | BooleanOp::Not | BooleanOp::Noop
        )
    }

    /// The operator producing the logical negation.
    ///
    /// For `And`/`Or` the caller must also invert every child (De Morgan).
    pub fn inverse(&self) -> BooleanOp {
        match self {
            BooleanOp::And => BooleanOp::Or,
            BooleanOp::Or => BooleanOp::And,
            BooleanOp::Not => BooleanOp::Noop,
            BooleanOp::Noop => BooleanOp::Not,
            BooleanOp::Eq => BooleanOp::Ne,
            BooleanOp::Ne => BooleanOp::Eq,
            BooleanOp::Lt => BooleanOp::Gte,
            BooleanOp::Gte => BooleanOp::Lt,
            BooleanOp::Gt => BooleanOp::Lte,
            BooleanOp::Lte => BooleanOp::Gt,
            BooleanOp::Is => BooleanOp::IsNot,
            BooleanOp::IsNot => BooleanOp::Is,
            BooleanOp::In => BooleanOp::NotIn,
            BooleanOp::NotIn => BooleanOp::In,
        }
    }
}

/// NULLS ordering for ORDER BY terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NullsOrder {
    First,
    Last,
}

impl NullsOrder {
    fn inverse(self) -> Self {
        match self {
            NullsOrder::First => NullsOrder::Last,
            NullsOrder::Last => NullsOrder::First,
        }
    }
}

// =============================================================================
// Structural helpers
// =============================================================================

impl Expr {
    /// Build a boolean node.
    pub fn boolean(op: BooleanOp, args: Vec<Expr>) -> Expr {
        Expr::Boolean { op, args }
    }

    /// AND the given conditions; a single condition is returned as-is.
    pub fn and_all(mut conds: Vec<Expr>) -> Expr {
        if conds.len() == 1 {
            conds.remove(0)
        } else {
            Expr::Boolean {
                op: BooleanOp::And,
                args: conds,
            }
        }
    }

    /// OR the given conditions; a single condition is returned as-is.
    pub fn or_all(mut conds: Vec<Expr>) -> Expr {
        if conds.len() == 1 {
            conds.remove(0)
        } else {
            Expr::Boolean {
                op: BooleanOp::Or,
                args: conds,
            }
        }
    }

    /// Logical negation, pushing NOT through AND/OR (De Morgan) and
    /// flipping comparison operators instead of wrapping them.
    pub fn invert(&self) -> Expr {
        match self {
            Expr::Boolean { op, args } => match op {
                BooleanOp::And | BooleanOp::Or => Expr::Boolean {
                    op: op.inverse(),
                    args: args.iter().map(Expr::invert).collect(),
                },
                _ => Expr::Boolean {
                    op: op.inverse(),
                    args: args.clone(),
                },
            },
            Expr::Like {
                expr,
                pattern,
                case_insensitive,
                negated,
            } => Expr::Like {
                expr: expr.clone(),
                pattern: pattern.clone(),
                case_insensitive: *case_insensitive,
                negated: !negated,
            },
            other => Expr::Boolean {
                op: BooleanOp::Not,
                args: vec![other.clone()],
            },
        }
    }

    /// Whether this node may stand as the root of a WHERE/HAVING clause.
    ///
    /// Bare values, lists and projection-only wrappers cannot.
    pub fn is_boolean_shaped(&self) -> bool {
        match self {
            Expr::Boolean { .. }
            | Expr::Like { .. }
            | Expr::Identifier(_)
            | Expr::Qualified { .. }
            | Expr::Placeholder { .. }
            | Expr::Raw(_)
            | Expr::Function { .. }
            | Expr::Subquery(_) => true,
            Expr::Literal(Literal::Bool(_)) => true,
            Expr::Literal(_)
            | Expr::List(_)
            | Expr::Aliased { .. }
            | Expr::Star { .. }
            | Expr::Ordered { .. } => false,
        }
    }

    /// Strip an alias wrapper (`x AS y` becomes `x`).
    pub fn unaliased(&self) -> &Expr {
        match self {
            Expr::Aliased { expr, .. } => expr,
            other => other,
        }
    }

    /// Qualify every bare identifier in this tree with `table`.
    ///
    /// Already-qualified references, literals and nested queries are left
    /// alone.
    pub fn qualify_deep(&self, table: &str) -> Expr {
        let q = |e: &Expr| e.qualify_deep(table);
        match self {
            Expr::Identifier(column) => table_col(table, column),
            Expr::Boolean { op, args } => Expr::Boolean {
                op: *op,
                args: args.iter().map(q).collect(),
            },
            Expr::Like {
                expr,
                pattern,
                case_insensitive,
                negated,
            } => Expr::Like {
                expr: Box::new(q(expr)),
                pattern: Box::new(q(pattern)),
                case_insensitive: *case_insensitive,
                negated: *negated,
            },
            Expr::Aliased { expr, alias } => Expr::Aliased {
                expr: Box::new(q(expr)),
                alias: alias.clone(),
            },
            Expr::Ordered {
                expr,
                descending,
                nulls,
            } => Expr::Ordered {
                expr: Box::new(q(expr)),
                descending: *descending,
                nulls: *nulls,
            },
            Expr::Placeholder { sql, args, parens } => Expr::Placeholder {
                sql: sql.clone(),
                args: args.iter().map(q).collect(),
                parens: *parens,
            },
            Expr::List(items) => Expr::List(items.iter().map(q).collect()),
            Expr::Function { name, args } => Expr::Function {
                name: name.clone(),
                args: args.iter().map(q).collect(),
            },
            Expr::Qualified { .. }
            | Expr::Star { .. }
            | Expr::Raw(_)
            | Expr::Literal(_)
            | Expr::Subquery(_) => self.clone(),
        }
    }

    /// Name a source expression answers to: its alias, or the table name.
    pub fn source_alias(&self) -> Option<&str> {
        match self {
            Expr::Aliased { alias, .. } => Some(alias),
            Expr::Identifier(name) => Some(name),
            Expr::Qualified { column, .. } => Some(column),
            _ => None,
        }
    }
}

// =============================================================================
// Expression Constructors
// =============================================================================

/// Create a column (or table) reference.
pub fn col(name: &str) -> Expr {
    Expr::Identifier(name.into())
}

/// Create a qualified column reference (table.column).
pub fn table_col(table: &str, column: &str) -> Expr {
    Expr::Qualified {
        table: table.into(),
        column: column.into(),
    }
}

/// Create an integer literal.
pub fn lit_int(n: i64) -> Expr {
    Expr::Literal(Literal::Int(n))
}

/// Create a float literal.
pub fn lit_float(f: f64) -> Expr {
    Expr::Literal(Literal::Float(f))
}

/// Create a string literal.
pub fn lit_str(s: &str) -> Expr {
    Expr::Literal(Literal::String(s.into()))
}

/// Create a boolean literal.
pub fn lit_bool(b: bool) -> Expr {
    Expr::Literal(Literal::Bool(b))
}

/// Create a NULL literal.
pub fn lit_null() -> Expr {
    Expr::Literal(Literal::Null)
}

/// Create a star (*) expression.
pub fn star() -> Expr {
    Expr::Star { table: None }
}

/// Create a qualified star (table.*) expression.
pub fn table_star(table: &str) -> Expr {
    Expr::Star {
        table: Some(table.into()),
    }
}

/// Create a value list (for IN).
pub fn list(values: Vec<Expr>) -> Expr {
    Expr::List(values)
}

/// Generic function call.
pub fn func(name: &str, args: Vec<Expr>) -> Expr {
    Expr::Function {
        name: name.into(),
        args,
    }
}

/// COUNT(*)
pub fn count_star() -> Expr {
    func("count", vec![star()])
}

/// Raw SQL fragment (pass-through, no parsing).
///
/// # Security Warning
///
/// **Never pass user input to this function.** The SQL is not sanitized.
pub fn raw_sql(sql: &str) -> Expr {
    Expr::Raw(sql.into())
}

/// Raw SQL fragment with positional `?` arguments.
pub fn placeholder(sql: &str, args: Vec<Expr>) -> Expr {
    Expr::Placeholder {
        sql: sql.into(),
        args,
        parens: false,
    }
}

// =============================================================================
// Expression Builder Trait
// =============================================================================

/// Extension trait for building expressions fluently.
pub trait ExprExt: Sized {
    fn into_expr(self) -> Expr;

    // Comparison operators
    fn eq(self, other: impl Into<Expr>) -> Expr {
        compare(BooleanOp::Eq, self.into_expr(), other.into())
    }

    fn ne(self, other: impl Into<Expr>) -> Expr {
        compare(BooleanOp::Ne, self.into_expr(), other.into())
    }

    fn gt(self, other: impl Into<Expr>) -> Expr {
        compare(BooleanOp::Gt, self.into_expr(), other.into())
    }

    fn gte(self, other: impl Into<Expr>) -> Expr {
        compare(BooleanOp::Gte, self.into_expr(), other.into())
    }

    fn lt(self, other: impl Into<Expr>) -> Expr {
        compare(BooleanOp::Lt, self.into_expr(), other.into())
    }

    fn lte(self, other: impl Into<Expr>) -> Expr {
        compare(BooleanOp::Lte, self.into_expr(), other.into())
    }

    // Logical operators
    fn and(self, other: impl Into<Expr>) -> Expr {
        Expr::boolean(BooleanOp::And, vec![self.into_expr(), other.into()])
    }

    fn or(self, other: impl Into<Expr>) -> Expr {
        Expr::boolean(BooleanOp::Or, vec![self.into_expr(), other.into()])
    }

    fn not(self) -> Expr {
        self.into_expr().invert()
    }

    // String matching
    fn like(self, pattern: impl Into<Expr>) -> Expr {
        Expr::Like {
            expr: Box::new(self.into_expr()),
            pattern: Box::new(pattern.into()),
            case_insensitive: false,
            negated: false,
        }
    }

    fn ilike(self, pattern: impl Into<Expr>) -> Expr {
        Expr::Like {
            expr: Box::new(self.into_expr()),
            pattern: Box::new(pattern.into()),
            case_insensitive: true,
            negated: false,
        }
    }

    // NULL checks
    #[allow(clippy::wrong_self_convention)]
    fn is_null(self) -> Expr {
        compare(BooleanOp::Is, self.into_expr(), lit_null())
    }

    #[allow(clippy::wrong_self_convention)]
    fn is_not_null(self) -> Expr {
        compare(BooleanOp::IsNot, self.into_expr(), lit_null())
    }

    // IN operator
    fn in_list(self, values: Vec<Expr>) -> Expr {
        compare(BooleanOp::In, self.into_expr(), Expr::List(values))
    }

    fn not_in_list(self, values: Vec<Expr>) -> Expr {
        compare(BooleanOp::NotIn, self.into_expr(), Expr::List(values))
    }

    /// Alias this expression (for SELECT lists and sources).
    fn alias(self, name: &str) -> Expr {
        Expr::Aliased {
            expr: Box::new(self.into_expr()),
            alias: name.into(),
        }
    }

    // Ordering
    fn asc(self) -> Expr {
        Expr::Ordered {
            expr: Box::new(self.into_expr()),
            descending: false,
            nulls: None,
        }
    }

    fn desc(self) -> Expr {
        Expr::Ordered {
            expr: Box::new(self.into_expr()),
            descending: true,
            nulls: None,
        }
    }
}

impl ExprExt for Expr {
    fn into_expr(self) -> Expr {
        self
    }
}

fn compare(op: BooleanOp, left: Expr, right: Expr) -> Expr {
    Expr::Boolean {
        op,
        args: vec![left, right],
    }
}

impl Expr {
    /// Set NULLS FIRST on an ordered term (wrapping ascending if needed).
    pub fn nulls_first(self) -> Expr {
        self.with_nulls(NullsOrder::First)
    }

    /// Set NULLS LAST on an ordered term (wrapping ascending if needed).
    pub fn nulls_last(self) -> Expr {
        self.with_nulls(NullsOrder::Last)
    }

    fn with_nulls(self, order: NullsOrder) -> Expr {
        match self {
            Expr::Ordered {
                expr, descending, ..
            } => Expr::Ordered {
                expr,
                descending,
                nulls: Some(order),
            },
            other => Expr::Ordered {
                expr: Box::new(other),
                descending: false,
                nulls: Some(order),
            },
        }
    }

    /// Reverse an ORDER BY term.
    ///
    /// Ordered terms flip direction and NULLS placement; anything else is
    /// treated as an implicit ascending term and becomes descending.
    pub fn invert_order(&self) -> Expr {
        match self {
            Expr::Ordered {
                expr,
                descending,
                nulls,
            } => Expr::Ordered {
                expr: expr.clone(),
                descending: !descending,
                nulls: nulls.map(NullsOrder::inverse),
            },
            other => Expr::Ordered {
                expr: Box::new(other.clone()),
                descending: true,
                nulls: None,
            },
        }
    }
}

// =============================================================================
// Conversions
// =============================================================================

impl From<i64> for Expr {
    fn from(n: i64) -> Self {
        lit_int(n)
    }
}

impl From<i32> for Expr {
    fn from(n: i32) -> Self {
        lit_int(n as i64)
    }
}

impl From<f64> for Expr {
    fn from(f: f64) -> Self {
        lit_float(f)
    }
}

impl From<&str> for Expr {
    fn from(s: &str) -> Self {
        lit_str(s)
    }
}

impl From<String> for Expr {
    fn from(s: String) -> Self {
        Expr::Literal(Literal::String(s))
    }
}

impl From<bool> for Expr {
    fn from(b: bool) -> Self {
        lit_bool(b)
    }
}

impl From<Query> for Expr {
    /// Convert a Query into a Subquery expression.
    fn from(query: Query) -> Self {
        Expr::Subquery(Box::new(query))
    }
}

// =============================================================================
// Tests
// =============================================================================
