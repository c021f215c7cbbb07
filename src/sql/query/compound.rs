//! UNION / INTERSECT / EXCEPT chaining and common table expressions.

use serde::Serialize;
use tracing::debug;

use super::{appended, Clause, Query};
use crate::dialect::SqlDialect;
use crate::error::{QueryError, QueryResult};

// =============================================================================
// Compounds
// =============================================================================

/// Set operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CompoundOp {
    Union,
    Intersect,
    Except,
}

impl CompoundOp {
    pub fn keyword(&self) -> &'static str {
        match self {
            CompoundOp::Union => "UNION",
            CompoundOp::Intersect => "INTERSECT",
            CompoundOp::Except => "EXCEPT",
        }
    }
}

/// One set operation applied to the receiver.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Compound {
    pub op: CompoundOp,
    pub query: Query,
    pub all: bool,
}

/// Options for compounds. A bare `bool` converts to `{ all: value }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompoundOptions {
    /// Keep duplicate rows.
    pub all: bool,
    /// Wrap the result as a derived source.
    pub from_self: bool,
    /// Alias for the derived source.
    pub alias: Option<String>,
}

impl Default for CompoundOptions {
    fn default() -> Self {
        Self {
            all: false,
            from_self: true,
            alias: None,
        }
    }
}

impl From<bool> for CompoundOptions {
    fn from(all: bool) -> Self {
        Self {
            all,
            ..Self::default()
        }
    }
}

impl CompoundOptions {
    /// Leave the compound on the receiver instead of wrapping it.
    pub fn unwrapped(mut self) -> Self {
        self.from_self = false;
        self
    }
}

// =============================================================================
// CTEs
// =============================================================================

/// A named WITH entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cte {
    pub name: String,
    pub query: Query,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<String>>,
    pub recursive: bool,
}

/// Options for [`Query::with`] and [`Query::with_recursive`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CteOptions {
    /// Column names declared after the CTE name.
    pub columns: Option<Vec<String>>,
    /// Join seed and step with UNION ALL (recursive only).
    pub union_all: bool,
}

impl Default for CteOptions {
    fn default() -> Self {
        Self {
            columns: None,
            union_all: true,
        }
    }
}

impl CteOptions {
    pub fn columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: Some(columns.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }
}

impl Query {
    pub fn union(&self, other: &Query, opts: impl Into<CompoundOptions>) -> QueryResult<Query> {
        self.compound(CompoundOp::Union, other, opts.into())
    }

    pub fn intersect(&self, other: &Query, opts: impl Into<CompoundOptions>) -> QueryResult<Query> {
        self.compound(CompoundOp::Intersect, other, opts.into())
    }

    pub fn except(&self, other: &Query, opts: impl Into<CompoundOptions>) -> QueryResult<Query> {
        self.compound(CompoundOp::Except, other, opts.into())
    }

    fn compound(&self, op: CompoundOp, other: &Query, opts: CompoundOptions) -> QueryResult<Query> {
        let caps = self.capabilities();
        if op != CompoundOp::Union {
            if !caps.supports_intersect_except() {
                return Err(QueryError::unsupported(op.keyword(), caps.name()));
            }
            if opts.all && !caps.supports_intersect_except_all() {
                return Err(QueryError::unsupported(
                    &format!("{} ALL", op.keyword()),
                    caps.name(),
                ));
            }
        }

        // CTEs cannot sit on one side of a compound: move them here first.
        if let Some(ctes) = &other.opts().with {
            if !caps.supports_cte_in_compounds() {
                debug!(count = ctes.len(), dialect = caps.name(), "hoisting CTEs out of compound");
                let receiver = self.clone_with([Clause::With(Some(appended(
                    &self.opts().with,
                    ctes.iter().cloned(),
                )))]);
                return receiver.compound(op, &other.clone_with([Clause::With(None)]), opts);
            }
        }

        let other = if other.opts().compounds.is_some() {
            other.from_self()
        } else {
            other.compound_operand()
        };
        let compound = Compound {
            op,
            query: other,
            all: opts.all,
        };
        let left = self.compound_operand();
        let combined = left.clone_with([Clause::Compounds(Some(appended(
            &left.opts().compounds,
            [compound],
        )))]);

        if !opts.from_self {
            return Ok(combined);
        }
        Ok(match &opts.alias {
            Some(alias) => combined.from_self_as(alias),
            None => combined.from_self(),
        })
    }

    /// Wrap this query if a compound would otherwise change its meaning.
    fn compound_operand(&self) -> Query {
        let o = self.opts();
        if o.sql.is_some() || o.limit.is_some() || o.offset.is_some() || o.order.is_some() {
            debug!("wrapping compound operand as derived source");
            self.from_self()
        } else {
            self.clone()
        }
    }

    /// Add a CTE.
    pub fn with(&self, name: &str, query: &Query, opts: CteOptions) -> QueryResult<Query> {
        self.add_cte(name, query.clone(), opts.columns, false)
    }

    /// Add a recursive CTE defined as `seed UNION [ALL] step`.
    pub fn with_recursive(
        &self,
        name: &str,
        seed: &Query,
        step: &Query,
        opts: CteOptions,
    ) -> QueryResult<Query> {
        let union = seed.union(
            step,
            CompoundOptions {
                all: opts.union_all,
                from_self: false,
                alias: None,
            },
        )?;
        self.add_cte(name, union, opts.columns, true)
    }

    fn add_cte(
        &self,
        name: &str,
        query: Query,
        columns: Option<Vec<String>>,
        recursive: bool,
    ) -> QueryResult<Query> {
        let caps = self.capabilities();
        if !caps.supports_cte() {
            return Err(QueryError::unsupported("common table expressions", caps.name()));
        }
        let mut hoisted = Vec::new();
        let query = self.hoist_ctes(query, &mut hoisted);
        let cte = Cte {
            name: name.into(),
            query,
            columns,
            recursive,
        };
        let ctes = appended(&self.opts().with, hoisted.into_iter().chain([cte]));
        Ok(self.clone_with([Clause::With(Some(ctes))]))
    }
}
