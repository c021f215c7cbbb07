//! WHERE / HAVING composition.

use tracing::trace;

use super::{Clause, Query};
use crate::condition::{filter_expr, Condition};
use crate::error::{QueryError, QueryResult};
use crate::expr::{BooleanOp, Expr, ExprExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Where,
    Having,
}

/// Flags for [`Query::grep`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GrepOptions {
    /// Every column must match (default: any column).
    pub all_columns: bool,
    /// Every pattern must match (default: any pattern).
    pub all_patterns: bool,
    /// Use ILIKE instead of LIKE.
    pub case_insensitive: bool,
}

impl Query {
    /// Add a condition to the active clause (HAVING if set, else WHERE).
    pub fn filter(&self, cond: impl Into<Condition>) -> QueryResult<Query> {
        self.add_filter(self.active_target(), &cond.into(), false, BooleanOp::And)
    }

    /// Add a condition to WHERE.
    pub fn where_(&self, cond: impl Into<Condition>) -> QueryResult<Query> {
        self.add_filter(Target::Where, &cond.into(), false, BooleanOp::And)
    }

    /// Add a condition to HAVING.
    pub fn having(&self, cond: impl Into<Condition>) -> QueryResult<Query> {
        self.add_filter(Target::Having, &cond.into(), false, BooleanOp::And)
    }

    /// AND onto the active clause, which must already exist.
    pub fn and(&self, cond: impl Into<Condition>) -> QueryResult<Query> {
        let target = self.require_active("and")?;
        self.add_filter(target, &cond.into(), false, BooleanOp::And)
    }

    /// OR onto the active clause, which must already exist.
    pub fn or(&self, cond: impl Into<Condition>) -> QueryResult<Query> {
        let target = self.require_active("or")?;
        self.add_filter(target, &cond.into(), false, BooleanOp::Or)
    }

    /// AND the negation of `cond` onto the active clause.
    ///
    /// Only the new condition is negated; see [`invert`](Self::invert) for
    /// negating the whole clause.
    pub fn exclude(&self, cond: impl Into<Condition>) -> QueryResult<Query> {
        self.add_filter(self.active_target(), &cond.into(), true, BooleanOp::And)
    }

    /// AND the negation of `cond` onto WHERE.
    pub fn exclude_where(&self, cond: impl Into<Condition>) -> QueryResult<Query> {
        self.add_filter(Target::Where, &cond.into(), true, BooleanOp::And)
    }

    /// AND the negation of `cond` onto HAVING.
    pub fn exclude_having(&self, cond: impl Into<Condition>) -> QueryResult<Query> {
        self.add_filter(Target::Having, &cond.into(), true, BooleanOp::And)
    }

    /// Negate the existing WHERE and HAVING roots.
    pub fn invert(&self) -> QueryResult<Query> {
        let o = self.opts();
        if o.where_clause.is_none() && o.having.is_none() {
            return Err(QueryError::invalid(
                "invert requires an existing WHERE or HAVING clause",
            ));
        }
        let mut patch = Vec::with_capacity(2);
        if let Some(expr) = &o.where_clause {
            patch.push(Clause::Where(Some(expr.invert())));
        }
        if let Some(expr) = &o.having {
            patch.push(Clause::Having(Some(expr.invert())));
        }
        Ok(self.clone_with(patch))
    }

    /// Remove WHERE and HAVING.
    pub fn unfiltered(&self) -> Query {
        self.clone_with([Clause::Where(None), Clause::Having(None)])
    }

    /// Filter by LIKE matches over every column/pattern pair.
    ///
    /// By default a row matches if any column matches any pattern.
    pub fn grep(
        &self,
        columns: &[Expr],
        patterns: &[Expr],
        opts: GrepOptions,
    ) -> QueryResult<Query> {
        if columns.is_empty() || patterns.is_empty() {
            return Err(QueryError::invalid("grep needs at least one column and one pattern"));
        }
        let like = |column: &Expr, pattern: &Expr| {
            if opts.case_insensitive {
                column.clone().ilike(pattern.clone())
            } else {
                column.clone().like(pattern.clone())
            }
        };
        let combine_columns = |conds: Vec<Expr>| {
            if opts.all_columns {
                Expr::and_all(conds)
            } else {
                Expr::or_all(conds)
            }
        };

        let cond = if opts.all_patterns {
            Expr::and_all(
                patterns
                    .iter()
                    .map(|p| combine_columns(columns.iter().map(|c| like(c, p)).collect()))
                    .collect(),
            )
        } else {
            combine_columns(
                columns
                    .iter()
                    .map(|c| Expr::or_all(patterns.iter().map(|p| like(c, p)).collect()))
                    .collect(),
            )
        };
        self.where_(cond)
    }

    fn active_target(&self) -> Target {
        if self.opts().having.is_some() {
            Target::Having
        } else {
            Target::Where
        }
    }

    fn require_active(&self, op: &str) -> QueryResult<Target> {
        let target = self.active_target();
        if target == Target::Where && self.opts().where_clause.is_none() {
            return Err(QueryError::invalid(format!(
                "{} requires an existing WHERE or HAVING clause",
                op
            )));
        }
        Ok(target)
    }

    fn add_filter(
        &self,
        target: Target,
        cond: &Condition,
        negate: bool,
        combine: BooleanOp,
    ) -> QueryResult<Query> {
        let Some(expr) = filter_expr(cond)? else {
            return Ok(self.clone());
        };
        let expr = if negate { expr.invert() } else { expr };

        let existing = match target {
            Target::Where => &self.opts().where_clause,
            Target::Having => &self.opts().having,
        };
        trace!(clause = ?target, op = ?combine, merged = existing.is_some(), "adding filter");
        let merged = match existing {
            Some(prev) => Expr::boolean(combine, vec![prev.clone(), expr]),
            None => expr,
        };

        Ok(self.clone_with([match target {
            Target::Where => Clause::Where(Some(merged)),
            Target::Having => Clause::Having(Some(merged)),
        }]))
    }
}
