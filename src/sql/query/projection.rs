//! SELECT, GROUP BY, ORDER BY and DISTINCT composition.

use super::{split_alias, Clause, Distinct, Query};
use crate::dialect::SqlDialect;
use crate::error::{QueryError, QueryResult};
use crate::expr::{col, count_star, star, Expr, ExprExt};

/// One entry of a select list.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Expr(Expr),
    /// Output name to expression; expands to aliased expressions in order.
    Map(Vec<(String, Expr)>),
}

impl Selection {
    fn expand(self, out: &mut Vec<Expr>) {
        match self {
            Selection::Expr(expr) => out.push(expr),
            Selection::Map(entries) => {
                out.extend(entries.into_iter().map(|(name, expr)| expr.alias(&name)))
            }
        }
    }
}

impl From<Expr> for Selection {
    fn from(expr: Expr) -> Self {
        Selection::Expr(expr)
    }
}

impl From<&str> for Selection {
    fn from(name: &str) -> Self {
        Selection::Expr(col(name))
    }
}

impl<K: Into<String>> From<Vec<(K, Expr)>> for Selection {
    fn from(entries: Vec<(K, Expr)>) -> Self {
        Selection::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

fn expand_all<I, S>(columns: I) -> Vec<Expr>
where
    I: IntoIterator<Item = S>,
    S: Into<Selection>,
{
    let mut out = Vec::new();
    for column in columns {
        column.into().expand(&mut out);
    }
    out
}

impl Query {
    /// Replace the select list.
    pub fn select<I, S>(&self, columns: I) -> Query
    where
        I: IntoIterator<Item = S>,
        S: Into<Selection>,
    {
        self.clone_with([Clause::Select(Some(expand_all(columns)))])
    }

    /// Select `table.*` for each table (or alias); no tables selects `*`.
    pub fn select_all<I, S>(&self, tables: I) -> Query
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let stars: Vec<Expr> = tables
            .into_iter()
            .map(|t| {
                let (table, alias) = split_alias(t.as_ref());
                let name = alias
                    .or_else(|| table.source_alias().map(str::to_string))
                    .unwrap_or_else(|| t.as_ref().to_string());
                Expr::Star { table: Some(name) }
            })
            .collect();
        self.clone_with([Clause::Select((!stars.is_empty()).then_some(stars))])
    }

    /// Append to the select list, starting from `*` if nothing is selected.
    pub fn select_append<I, S>(&self, columns: I) -> Query
    where
        I: IntoIterator<Item = S>,
        S: Into<Selection>,
    {
        let mut list = match self.opts().select.as_deref() {
            None | Some([]) => vec![star()],
            Some(current) => current.to_vec(),
        };
        list.extend(expand_all(columns));
        self.clone_with([Clause::Select(Some(list))])
    }

    /// Append to the select list, starting from nothing if nothing is
    /// selected.
    pub fn select_more<I, S>(&self, columns: I) -> Query
    where
        I: IntoIterator<Item = S>,
        S: Into<Selection>,
    {
        let mut list = self.opts().select.clone().unwrap_or_default();
        list.extend(expand_all(columns));
        self.clone_with([Clause::Select(Some(list))])
    }

    /// Select the columns and group by them (aliases stripped).
    pub fn select_group<I, S>(&self, columns: I) -> Query
    where
        I: IntoIterator<Item = S>,
        S: Into<Selection>,
    {
        let selected = expand_all(columns);
        let grouped: Vec<Expr> = selected.iter().map(|e| e.unaliased().clone()).collect();
        self.clone_with([
            Clause::Select(Some(selected)),
            Clause::Group((!grouped.is_empty()).then_some(grouped)),
        ])
    }

    /// Replace GROUP BY; an empty list removes it.
    pub fn group<I>(&self, columns: I) -> Query
    where
        I: IntoIterator<Item = Expr>,
    {
        let columns: Vec<Expr> = columns.into_iter().collect();
        self.clone_with([Clause::Group((!columns.is_empty()).then_some(columns))])
    }

    /// Append to GROUP BY.
    pub fn group_append<I>(&self, columns: I) -> Query
    where
        I: IntoIterator<Item = Expr>,
    {
        let columns = super::appended(&self.opts().group, columns);
        self.group(columns)
    }

    /// Group by the columns and select them plus `count(*) AS count`.
    pub fn group_and_count<I, S>(&self, columns: I) -> Query
    where
        I: IntoIterator<Item = S>,
        S: Into<Selection>,
    {
        self.select_group(columns)
            .select_append([count_star().alias("count")])
    }

    /// Remove GROUP BY and HAVING.
    pub fn ungrouped(&self) -> Query {
        self.clone_with([Clause::Group(None), Clause::Having(None)])
    }

    /// Replace ORDER BY; an empty list removes it.
    pub fn order<I>(&self, terms: I) -> Query
    where
        I: IntoIterator<Item = Expr>,
    {
        let terms: Vec<Expr> = terms.into_iter().collect();
        self.clone_with([Clause::Order((!terms.is_empty()).then_some(terms))])
    }

    /// Add terms after the existing ORDER BY.
    pub fn order_append<I>(&self, terms: I) -> Query
    where
        I: IntoIterator<Item = Expr>,
    {
        let terms = super::appended(&self.opts().order, terms);
        self.order(terms)
    }

    /// Add terms before the existing ORDER BY.
    pub fn order_prepend<I>(&self, terms: I) -> Query
    where
        I: IntoIterator<Item = Expr>,
    {
        let terms: Vec<Expr> = terms
            .into_iter()
            .chain(self.opts().order.iter().flatten().cloned())
            .collect();
        self.order(terms)
    }

    /// Reverse the existing ORDER BY, or order by the reverse of `terms`
    /// when any are given.
    pub fn reverse<I>(&self, terms: I) -> Query
    where
        I: IntoIterator<Item = Expr>,
    {
        let terms: Vec<Expr> = terms.into_iter().collect();
        let source = if terms.is_empty() {
            self.opts().order.as_deref().unwrap_or(&[])
        } else {
            &terms
        };
        self.order(source.iter().map(Expr::invert_order).collect::<Vec<_>>())
    }

    /// Remove ORDER BY.
    pub fn unordered(&self) -> Query {
        self.clone_with([Clause::Order(None)])
    }

    /// SELECT DISTINCT, or DISTINCT ON the given columns.
    pub fn distinct<I>(&self, columns: I) -> QueryResult<Query>
    where
        I: IntoIterator<Item = Expr>,
    {
        let columns: Vec<Expr> = columns.into_iter().collect();
        if columns.is_empty() {
            return Ok(self.clone_with([Clause::Distinct(Some(Distinct::Rows))]));
        }
        if !self.capabilities().supports_distinct_on() {
            return Err(QueryError::unsupported(
                "DISTINCT ON",
                self.capabilities().name(),
            ));
        }
        Ok(self.clone_with([Clause::Distinct(Some(Distinct::On(columns)))]))
    }
}
