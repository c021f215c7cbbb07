//! JOIN composition.
//!
//! A single entry point, [`Query::join_table`], handles every join type.
//! It resolves the target and its alias, qualifies condition columns
//! against the new table and the previously joined one, and records the
//! new alias so the next join qualifies against it.

use serde::Serialize;
use tracing::debug;

use super::{appended, check_alias, dataset_alias, split_alias, Clause, Query, Source};
use crate::condition::from_value_pairs;
use crate::dialect::SqlDialect;
use crate::error::{QueryError, QueryResult};
use crate::expr::{table_col, BooleanOp, Expr};

/// Closure computing a join condition from
/// (new table alias, previous alias, joins so far).
pub type JoinBlockFn = dyn Fn(&str, &str, &[JoinClause]) -> Expr + Send + Sync;

// =============================================================================
// Join types
// =============================================================================

/// Type of join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JoinType {
    Inner,
    LeftOuter,
    RightOuter,
    FullOuter,
    Left,
    Right,
    Full,
    Cross,
    Natural,
    NaturalLeft,
    NaturalRight,
    NaturalFull,
}

impl JoinType {
    /// SQL keyword(s) preceding JOIN.
    pub fn keyword(&self) -> &'static str {
        match self {
            JoinType::Inner => "INNER",
            JoinType::LeftOuter => "LEFT OUTER",
            JoinType::RightOuter => "RIGHT OUTER",
            JoinType::FullOuter => "FULL OUTER",
            JoinType::Left => "LEFT",
            JoinType::Right => "RIGHT",
            JoinType::Full => "FULL",
            JoinType::Cross => "CROSS",
            JoinType::Natural => "NATURAL",
            JoinType::NaturalLeft => "NATURAL LEFT",
            JoinType::NaturalRight => "NATURAL RIGHT",
            JoinType::NaturalFull => "NATURAL FULL",
        }
    }

    /// Whether this join type takes a condition. Cross and natural joins
    /// do not.
    pub fn is_conditioned(&self) -> bool {
        !matches!(
            self,
            JoinType::Cross
                | JoinType::Natural
                | JoinType::NaturalLeft
                | JoinType::NaturalRight
                | JoinType::NaturalFull
        )
    }
}

// =============================================================================
// Join clauses
// =============================================================================

/// A JOIN clause attached to a query.
///
/// `table` is the unaliased target; `alias` is set when the target was
/// aliased explicitly, implicitly or automatically.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum JoinClause {
    /// No condition (cross/natural joins).
    Plain {
        join_type: JoinType,
        table: Expr,
        alias: Option<String>,
    },
    /// JOIN ... USING (columns)
    Using {
        join_type: JoinType,
        table: Expr,
        alias: Option<String>,
        columns: Vec<String>,
    },
    /// JOIN ... ON condition
    On {
        join_type: JoinType,
        table: Expr,
        alias: Option<String>,
        on: Expr,
    },
}

impl JoinClause {
    pub fn join_type(&self) -> JoinType {
        match self {
            JoinClause::Plain { join_type, .. }
            | JoinClause::Using { join_type, .. }
            | JoinClause::On { join_type, .. } => *join_type,
        }
    }

    pub fn table(&self) -> &Expr {
        match self {
            JoinClause::Plain { table, .. }
            | JoinClause::Using { table, .. }
            | JoinClause::On { table, .. } => table,
        }
    }

    pub fn alias(&self) -> Option<&str> {
        match self {
            JoinClause::Plain { alias, .. }
            | JoinClause::Using { alias, .. }
            | JoinClause::On { alias, .. } => alias.as_deref(),
        }
    }

    /// Name the joined table answers to: its alias, else its table name.
    pub fn name(&self) -> Option<&str> {
        self.alias().or_else(|| self.table().source_alias())
    }

    /// The ON condition, if any.
    pub fn condition(&self) -> Option<&Expr> {
        match self {
            JoinClause::On { on, .. } => Some(on),
            _ => None,
        }
    }
}

/// Join condition argument.
#[derive(Debug, Clone, PartialEq)]
pub enum JoinCondition {
    /// No condition.
    None,
    /// Shared column names.
    Using(Vec<String>),
    /// (new table column, previous table column) pairs, ANDed.
    Pairs(Vec<(Expr, Expr)>),
    /// A complete condition, used as given.
    Expr(Expr),
}

impl JoinCondition {
    /// Pairs of column names.
    pub fn pairs<I, L, R>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (L, R)>,
        L: AsRef<str>,
        R: AsRef<str>,
    {
        JoinCondition::Pairs(
            pairs
                .into_iter()
                .map(|(l, r)| (Expr::Identifier(l.as_ref().into()), Expr::Identifier(r.as_ref().into())))
                .collect(),
        )
    }

    /// USING column list.
    pub fn using<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        JoinCondition::Using(columns.into_iter().map(Into::into).collect())
    }
}

impl From<Expr> for JoinCondition {
    fn from(expr: Expr) -> Self {
        JoinCondition::Expr(expr)
    }
}

impl From<Vec<(Expr, Expr)>> for JoinCondition {
    fn from(pairs: Vec<(Expr, Expr)>) -> Self {
        JoinCondition::Pairs(pairs)
    }
}

/// How bare names in a pairs condition are qualified.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Qualify {
    /// Qualify bare column names only.
    #[default]
    Symbol,
    /// Qualify every unqualified identifier inside each side.
    Deep,
    /// Leave names alone.
    None,
}

/// Options for [`Query::join_table`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinOptions {
    /// Alias for the joined table; wins over `name AS alias`.
    pub table_alias: Option<String>,
    /// Alias right-hand names are qualified with, instead of the last
    /// joined table.
    pub implicit_qualifier: Option<String>,
    pub qualify: Qualify,
    /// Keep the previous implicit qualifier for the next join.
    pub preserve_implicit_qualifier: bool,
}

impl JoinOptions {
    pub fn aliased(alias: &str) -> Self {
        Self {
            table_alias: Some(alias.into()),
            ..Self::default()
        }
    }
}

// =============================================================================
// Composition
// =============================================================================

impl Query {
    /// Add a join.
    ///
    /// `block` receives the new table's alias, the alias names are
    /// qualified against, and the joins so far; its result is ANDed with
    /// `cond`.
    pub fn join_table(
        &self,
        join_type: JoinType,
        target: impl Into<Source>,
        cond: impl Into<JoinCondition>,
        opts: &JoinOptions,
        block: Option<&JoinBlockFn>,
    ) -> QueryResult<Query> {
        let cond = cond.into();
        if !join_type.is_conditioned() && (block.is_some() || cond != JoinCondition::None) {
            return Err(QueryError::invalid(format!(
                "{} JOIN does not accept a join condition",
                join_type.keyword()
            )));
        }
        if let Some(alias) = &opts.table_alias {
            check_alias(alias)?;
        }
        if let Some(qualifier) = &opts.implicit_qualifier {
            check_alias(qualifier)?;
        }

        if let JoinCondition::Using(columns) = &cond {
            if block.is_some() {
                return Err(QueryError::invalid(
                    "a join closure cannot be combined with USING columns",
                ));
            }
            if !self.capabilities().supports_join_using() {
                debug!(
                    dialect = self.capabilities().name(),
                    columns = ?columns,
                    "rewriting JOIN USING as equality join"
                );
                let pairs = columns
                    .iter()
                    .map(|c| (Expr::Identifier(c.clone()), Expr::Identifier(c.clone())))
                    .collect::<Vec<_>>();
                return self.join_table(join_type, target, JoinCondition::Pairs(pairs), opts, None);
            }
        }

        let mut hoisted = Vec::new();
        let mut dataset_num = None;
        let (table, alias) = match target.into() {
            Source::Table(name) => {
                let (table, implicit) = split_alias(&name);
                (table, opts.table_alias.clone().or(implicit))
            }
            Source::Query(query) => {
                let alias = match &opts.table_alias {
                    Some(alias) => alias.clone(),
                    None => {
                        let n = self.opts().num_dataset_sources.unwrap_or(0) + 1;
                        dataset_num = Some(n);
                        dataset_alias(n)
                    }
                };
                (Expr::from(self.hoist_ctes(query, &mut hoisted)), Some(alias))
            }
            Source::AliasedQuery(query, alias) => (
                Expr::from(self.hoist_ctes(query, &mut hoisted)),
                Some(opts.table_alias.clone().unwrap_or(alias)),
            ),
            Source::Expr(Expr::Aliased { expr, alias }) => {
                (*expr, Some(opts.table_alias.clone().unwrap_or(alias)))
            }
            Source::Expr(expr) => (expr, opts.table_alias.clone()),
        };
        let table_name = match alias.as_deref().or_else(|| table.source_alias()) {
            Some(name) => name.to_string(),
            None => {
                return Err(QueryError::invalid(format!(
                    "join target needs an alias: {:?}",
                    table
                )))
            }
        };

        let join = match cond {
            JoinCondition::None if block.is_none() => JoinClause::Plain {
                join_type,
                table,
                alias,
            },
            JoinCondition::Using(columns) => JoinClause::Using {
                join_type,
                table,
                alias,
                columns,
            },
            cond => {
                let last_alias = match (&opts.implicit_qualifier, &self.opts().last_joined_table) {
                    (Some(q), _) => q.clone(),
                    (None, Some(last)) => last.clone(),
                    (None, None) => self.first_source_alias()?,
                };
                let positional = match cond {
                    JoinCondition::Pairs(pairs) => {
                        let pairs: Vec<(Expr, Expr)> = pairs
                            .into_iter()
                            .map(|(k, v)| {
                                (
                                    qualify(k, &table_name, opts.qualify),
                                    qualify(v, &last_alias, opts.qualify),
                                )
                            })
                            .collect();
                        from_value_pairs(&pairs)
                    }
                    JoinCondition::Expr(expr) => Some(expr),
                    JoinCondition::None | JoinCondition::Using(_) => None,
                };
                let from_block = block.map(|f| f(&table_name, &last_alias, self.joins()));
                let on = match (positional, from_block) {
                    (Some(p), Some(b)) => Expr::boolean(BooleanOp::And, vec![p, b]),
                    (Some(e), None) | (None, Some(e)) => e,
                    (None, None) => {
                        return Err(QueryError::invalid("join condition is empty"));
                    }
                };
                JoinClause::On {
                    join_type,
                    table,
                    alias,
                    on,
                }
            }
        };

        let mut patch = vec![Clause::Join(Some(appended(&self.opts().join, [join])))];
        if !opts.preserve_implicit_qualifier {
            patch.push(Clause::LastJoinedTable(Some(table_name)));
        }
        if let Some(n) = dataset_num {
            patch.push(Clause::NumDatasetSources(Some(n)));
        }
        if !hoisted.is_empty() {
            patch.push(Clause::With(Some(appended(&self.opts().with, hoisted))));
        }
        Ok(self.clone_with(patch))
    }

    /// INNER JOIN
    pub fn join(
        &self,
        target: impl Into<Source>,
        cond: impl Into<JoinCondition>,
    ) -> QueryResult<Query> {
        self.inner_join(target, cond)
    }

    pub fn inner_join(
        &self,
        target: impl Into<Source>,
        cond: impl Into<JoinCondition>,
    ) -> QueryResult<Query> {
        self.join_table(JoinType::Inner, target, cond, &JoinOptions::default(), None)
    }

    pub fn left_join(
        &self,
        target: impl Into<Source>,
        cond: impl Into<JoinCondition>,
    ) -> QueryResult<Query> {
        self.join_table(JoinType::Left, target, cond, &JoinOptions::default(), None)
    }

    pub fn right_join(
        &self,
        target: impl Into<Source>,
        cond: impl Into<JoinCondition>,
    ) -> QueryResult<Query> {
        self.join_table(JoinType::Right, target, cond, &JoinOptions::default(), None)
    }

    pub fn full_join(
        &self,
        target: impl Into<Source>,
        cond: impl Into<JoinCondition>,
    ) -> QueryResult<Query> {
        self.join_table(JoinType::Full, target, cond, &JoinOptions::default(), None)
    }

    pub fn cross_join(&self, target: impl Into<Source>) -> QueryResult<Query> {
        self.join_table(JoinType::Cross, target, JoinCondition::None, &JoinOptions::default(), None)
    }

    pub fn natural_join(&self, target: impl Into<Source>) -> QueryResult<Query> {
        self.join_table(JoinType::Natural, target, JoinCondition::None, &JoinOptions::default(), None)
    }
}

fn qualify(expr: Expr, table: &str, mode: Qualify) -> Expr {
    match (mode, expr) {
        (Qualify::None, expr) => expr,
        (Qualify::Deep, expr) => expr.qualify_deep(table),
        (Qualify::Symbol, Expr::Identifier(column)) => table_col(table, &column),
        (Qualify::Symbol, expr) => expr,
    }
}
