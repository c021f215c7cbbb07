//! Query descriptors - immutable clause records with copy-on-write chaining.
//!
//! A [`Query`] wraps an [`Arc`]-shared [`QueryOptions`] record. Every
//! transformation builds a fresh record and returns a new descriptor; the
//! receiver is never touched, so sibling descriptors cloned from the same
//! parent never observe each other's changes.
//!
//! # Example
//!
//! ```ignore
//! use quarry::prelude::*;
//!
//! let q = Query::new(Dialect::Postgres)
//!     .from(["items"])
//!     .filter(Condition::hash([("active", true)]))?
//!     .order([col("id")])
//!     .limit(10)?;
//! assert_eq!(q.opts().limit, Some(10));
//! ```

mod compound;
mod filter;
mod join;
mod projection;

pub use compound::{Compound, CompoundOp, CompoundOptions, Cte, CteOptions};
pub use filter::GrepOptions;
pub use join::{JoinBlockFn, JoinClause, JoinCondition, JoinOptions, JoinType, Qualify};
pub use projection::Selection;

use std::collections::BTreeMap;
use std::ops::{Bound, RangeBounds};
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::ser::SerializeStruct;
use serde::Serialize;
use tracing::debug;

use crate::dialect::{Capabilities, SqlDialect};
use crate::error::{QueryError, QueryResult};
use crate::expr::{table_col, Expr, ExprExt};

/// `name AS alias`, case-insensitive.
static ALIASED_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(\S+)\s+as\s+([A-Za-z_][A-Za-z0-9_]*)\s*$").unwrap()
});

/// A bare SQL identifier usable as an alias.
static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

// =============================================================================
// Clause values
// =============================================================================

/// DISTINCT clause.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Distinct {
    /// SELECT DISTINCT
    Rows,
    /// SELECT DISTINCT ON (exprs)
    On(Vec<Expr>),
}

/// Row locking style.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum LockStyle {
    Update,
    Share,
    /// Dialect-specific lock text, passed through.
    Raw(String),
}

/// The clause record behind a [`Query`].
///
/// Every field is optional; `None` means the clause is not specified.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub select: Option<Vec<Expr>>,
    /// Raw SQL override; replaces everything else when rendered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<Vec<Expr>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub join: Option<Vec<JoinClause>>,
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    pub where_clause: Option<Expr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub having: Option<Expr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<Vec<Expr>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<Vec<Expr>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distinct: Option<Distinct>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compounds: Option<Vec<Compound>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub with: Option<Vec<Cte>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock: Option<LockStyle>,
    /// Shard the query should run on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    /// Column values used when the caller supplies none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<BTreeMap<String, Expr>>,
    /// Column values that win over caller-supplied ones.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overrides: Option<BTreeMap<String, Expr>>,
    /// Graph metadata: table alias to the table it stands for.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graph_aliases: Option<BTreeMap<String, String>>,
    /// Alias the next join qualifies its right-hand names against.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_joined_table: Option<String>,
    /// Number of nested queries used as sources so far (for `tN` aliases).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_dataset_sources: Option<usize>,
}

/// One entry of a clone patch. `None` removes the clause.
#[derive(Debug, Clone)]
pub enum Clause {
    Select(Option<Vec<Expr>>),
    Sql(Option<String>),
    From(Option<Vec<Expr>>),
    Join(Option<Vec<JoinClause>>),
    Where(Option<Expr>),
    Having(Option<Expr>),
    Group(Option<Vec<Expr>>),
    Order(Option<Vec<Expr>>),
    Limit(Option<u64>),
    Offset(Option<u64>),
    Distinct(Option<Distinct>),
    Compounds(Option<Vec<Compound>>),
    With(Option<Vec<Cte>>),
    Lock(Option<LockStyle>),
    Server(Option<String>),
    Defaults(Option<BTreeMap<String, Expr>>),
    Overrides(Option<BTreeMap<String, Expr>>),
    GraphAliases(Option<BTreeMap<String, String>>),
    LastJoinedTable(Option<String>),
    NumDatasetSources(Option<usize>),
}

impl Clause {
    /// Whether changing this clause changes the shape of the result rows.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Clause::Select(_) | Clause::Sql(_) | Clause::From(_) | Clause::Join(_)
        )
    }

    fn apply(self, opts: &mut QueryOptions) {
        match self {
            Clause::Select(v) => opts.select = v,
            Clause::Sql(v) => opts.sql = v,
            Clause::From(v) => opts.from = v,
            Clause::Join(v) => opts.join = v,
            Clause::Where(v) => opts.where_clause = v,
            Clause::Having(v) => opts.having = v,
            Clause::Group(v) => opts.group = v,
            Clause::Order(v) => opts.order = v,
            Clause::Limit(v) => opts.limit = v,
            Clause::Offset(v) => opts.offset = v,
            Clause::Distinct(v) => opts.distinct = v,
            Clause::Compounds(v) => opts.compounds = v,
            Clause::With(v) => opts.with = v,
            Clause::Lock(v) => opts.lock = v,
            Clause::Server(v) => opts.server = v,
            Clause::Defaults(v) => opts.defaults = v,
            Clause::Overrides(v) => opts.overrides = v,
            Clause::GraphAliases(v) => opts.graph_aliases = v,
            Clause::LastJoinedTable(v) => opts.last_joined_table = v,
            Clause::NumDatasetSources(v) => opts.num_dataset_sources = v,
        }
    }
}

// =============================================================================
// Sources
// =============================================================================

/// Anything a query can read from.
#[derive(Debug, Clone)]
pub enum Source {
    /// Table name; accepts `schema.table` and `table AS alias`.
    Table(String),
    /// Nested query, aliased `tN` automatically.
    Query(Query),
    /// Nested query with an explicit alias.
    AliasedQuery(Query, String),
    /// Prebuilt source expression, used verbatim.
    Expr(Expr),
}

impl From<&str> for Source {
    fn from(name: &str) -> Self {
        Source::Table(name.into())
    }
}

impl From<String> for Source {
    fn from(name: String) -> Self {
        Source::Table(name)
    }
}

impl From<Query> for Source {
    fn from(query: Query) -> Self {
        Source::Query(query)
    }
}

impl From<Expr> for Source {
    fn from(expr: Expr) -> Self {
        Source::Expr(expr)
    }
}

// =============================================================================
// Query
// =============================================================================

/// An immutable query descriptor.
#[derive(Debug, Clone)]
#[must_use = "query transformations return a new descriptor"]
pub struct Query {
    opts: Arc<QueryOptions>,
    caps: Capabilities,
    columns: Option<Arc<Vec<String>>>,
}

impl Default for Query {
    fn default() -> Self {
        Self::new(Capabilities::default())
    }
}

impl PartialEq for Query {
    /// Descriptors are equal when their clauses and capabilities are; the
    /// column cache is derived state and does not take part.
    fn eq(&self, other: &Self) -> bool {
        self.caps == other.caps
            && (Arc::ptr_eq(&self.opts, &other.opts) || self.opts == other.opts)
    }
}

impl Serialize for Query {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Query", 2)?;
        state.serialize_field("dialect", self.caps.name)?;
        state.serialize_field("options", self.opts.as_ref())?;
        state.end()
    }
}

impl Query {
    /// Create an empty descriptor for the given capability set.
    pub fn new(caps: impl Into<Capabilities>) -> Self {
        Self {
            opts: Arc::new(QueryOptions::default()),
            caps: caps.into(),
            columns: None,
        }
    }

    /// The clause record.
    pub fn opts(&self) -> &QueryOptions {
        &self.opts
    }

    /// Capability flags this descriptor was built for.
    pub fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    /// Join clauses, in order.
    pub fn joins(&self) -> &[JoinClause] {
        self.opts.join.as_deref().unwrap_or(&[])
    }

    /// Whether any join has been added.
    pub fn is_joined(&self) -> bool {
        !self.joins().is_empty()
    }

    /// New descriptor with `patch` overlaid on this one's clauses.
    ///
    /// Touching a structural clause (select, sql, from, join) drops the
    /// cached column list in the result.
    pub fn clone_with(&self, patch: impl IntoIterator<Item = Clause>) -> Query {
        let mut opts = QueryOptions::clone(&self.opts);
        let mut structural = false;
        for clause in patch {
            structural |= clause.is_structural();
            clause.apply(&mut opts);
        }
        Query {
            opts: Arc::new(opts),
            caps: self.caps,
            columns: if structural {
                None
            } else {
                self.columns.clone()
            },
        }
    }

    /// Previously resolved column names, if any.
    pub fn cached_columns(&self) -> Option<&[String]> {
        self.columns.as_deref().map(Vec::as_slice)
    }

    /// Attach a resolved column list.
    pub fn with_cached_columns<I, S>(&self, columns: I) -> Query
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Query {
            opts: Arc::clone(&self.opts),
            caps: self.caps,
            columns: Some(Arc::new(columns.into_iter().map(Into::into).collect())),
        }
    }

    /// Structured form of the descriptor, for renderers.
    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }

    // -------------------------------------------------------------------------
    // Sources
    // -------------------------------------------------------------------------

    /// Replace the FROM list.
    ///
    /// Nested queries are aliased `t1`, `t2`, ... in order. If the dialect
    /// cannot nest CTEs, their WITH clauses move to this query.
    pub fn from<I, S>(&self, sources: I) -> Query
    where
        I: IntoIterator<Item = S>,
        S: Into<Source>,
    {
        let mut hoisted = Vec::new();
        let mut dataset_num = 0;
        let mut from = Vec::new();
        for source in sources {
            let expr = match source.into() {
                Source::Table(name) => table_source(&name),
                Source::Query(query) => {
                    dataset_num += 1;
                    let query = self.hoist_ctes(query, &mut hoisted);
                    Expr::from(query).alias(&dataset_alias(dataset_num))
                }
                Source::AliasedQuery(query, alias) => {
                    let query = self.hoist_ctes(query, &mut hoisted);
                    Expr::from(query).alias(&alias)
                }
                Source::Expr(expr) => expr,
            };
            from.push(expr);
        }

        let mut patch = vec![Clause::From((!from.is_empty()).then_some(from))];
        if !hoisted.is_empty() {
            patch.push(Clause::With(Some(appended(&self.opts.with, hoisted))));
        }
        if dataset_num > 0 {
            patch.push(Clause::NumDatasetSources(Some(dataset_num)));
        }
        self.clone_with(patch)
    }

    /// Strip `query`'s CTEs into `hoisted` when they cannot stay nested.
    pub(crate) fn hoist_ctes(&self, query: Query, hoisted: &mut Vec<Cte>) -> Query {
        match &query.opts.with {
            Some(ctes) if !self.caps.supports_cte_in_subqueries() => {
                debug!(
                    count = ctes.len(),
                    dialect = self.caps.name(),
                    "hoisting CTEs out of nested query"
                );
                hoisted.extend(ctes.iter().cloned());
                query.clone_with([Clause::With(None)])
            }
            _ => query,
        }
    }

    /// Name the first FROM source answers to.
    pub fn first_source_alias(&self) -> QueryResult<String> {
        let first = self
            .opts
            .from
            .as_ref()
            .and_then(|from| from.first())
            .ok_or_else(|| QueryError::invalid("no source specified for query"))?;
        first
            .source_alias()
            .map(str::to_string)
            .ok_or_else(|| QueryError::invalid(format!("source has no usable name: {:?}", first)))
    }

    /// Wrap this query as the sole source of a new one, aliased `t1`.
    ///
    /// Only shard selection, default/override values and graph metadata
    /// carry over to the outer query.
    pub fn from_self(&self) -> Query {
        self.wrap_self(None)
    }

    /// Like [`from_self`](Self::from_self) with an explicit alias.
    pub fn from_self_as(&self, alias: &str) -> Query {
        self.wrap_self(Some(alias))
    }

    fn wrap_self(&self, alias: Option<&str>) -> Query {
        debug!(alias = alias.unwrap_or("t1"), "wrapping query as derived source");
        let outer = Query {
            opts: Arc::new(QueryOptions {
                server: self.opts.server.clone(),
                defaults: self.opts.defaults.clone(),
                overrides: self.opts.overrides.clone(),
                graph_aliases: self.opts.graph_aliases.clone(),
                ..QueryOptions::default()
            }),
            caps: self.caps,
            columns: None,
        };
        let source = match alias {
            Some(alias) => Source::AliasedQuery(self.clone(), alias.into()),
            None => Source::Query(self.clone()),
        };
        let mut wrapped = outer.from([source]);
        wrapped.columns = self.columns.clone();
        wrapped
    }

    /// Replace the query with raw SQL text.
    pub fn with_sql(&self, sql: &str) -> Query {
        self.clone_with([Clause::Sql(Some(sql.into()))])
    }

    // -------------------------------------------------------------------------
    // LIMIT / OFFSET
    // -------------------------------------------------------------------------

    /// Set LIMIT, keeping any OFFSET.
    pub fn limit(&self, limit: i64) -> QueryResult<Query> {
        if self.opts.sql.is_some() {
            return self.from_self().limit(limit);
        }
        Ok(self.clone_with([Clause::Limit(Some(check_limit(limit)?))]))
    }

    /// Set LIMIT and OFFSET together; `None` clears either.
    pub fn limit_offset(&self, limit: Option<i64>, offset: Option<i64>) -> QueryResult<Query> {
        if self.opts.sql.is_some() {
            return self.from_self().limit_offset(limit, offset);
        }
        let limit = limit.map(check_limit).transpose()?;
        let offset = offset.map(check_offset).transpose()?;
        Ok(self.clone_with([Clause::Limit(limit), Clause::Offset(offset)]))
    }

    /// Row window as a range: `10..20` skips 10 rows and takes 10,
    /// `10..=20` takes 11.
    pub fn limit_range<R: RangeBounds<i64>>(&self, range: R) -> QueryResult<Query> {
        let start = match range.start_bound() {
            Bound::Included(&s) => s,
            Bound::Excluded(&s) => s.saturating_add(1),
            Bound::Unbounded => 0,
        };
        let len = match range.end_bound() {
            Bound::Included(&e) => e.saturating_sub(start).saturating_add(1),
            Bound::Excluded(&e) => e.saturating_sub(start),
            Bound::Unbounded => {
                return Err(QueryError::invalid("limit range needs an upper bound"));
            }
        };
        self.limit_offset(Some(len), Some(start))
    }

    /// Set OFFSET, keeping any LIMIT.
    pub fn offset(&self, offset: i64) -> QueryResult<Query> {
        Ok(self.clone_with([Clause::Offset(Some(check_offset(offset)?))]))
    }

    /// Remove LIMIT and OFFSET.
    pub fn unlimited(&self) -> Query {
        self.clone_with([Clause::Limit(None), Clause::Offset(None)])
    }

    // -------------------------------------------------------------------------
    // Non-SQL options
    // -------------------------------------------------------------------------

    pub fn lock_style(&self, style: LockStyle) -> Query {
        self.clone_with([Clause::Lock(Some(style))])
    }

    /// SELECT ... FOR UPDATE
    pub fn for_update(&self) -> Query {
        self.lock_style(LockStyle::Update)
    }

    /// Run on the named shard.
    pub fn server(&self, name: &str) -> Query {
        self.clone_with([Clause::Server(Some(name.into()))])
    }

    /// Merge values into the defaults map.
    pub fn set_defaults<I, K, V>(&self, values: I) -> Query
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Expr>,
    {
        let merged = merged(&self.opts.defaults, values);
        self.clone_with([Clause::Defaults(Some(merged))])
    }

    /// Merge values into the overrides map.
    pub fn set_overrides<I, K, V>(&self, values: I) -> Query
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Expr>,
    {
        let merged = merged(&self.opts.overrides, values);
        self.clone_with([Clause::Overrides(Some(merged))])
    }

    /// Record graph aliases (alias to table).
    pub fn with_graph_aliases<I, K, V>(&self, aliases: I) -> Query
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut map = self.opts.graph_aliases.clone().unwrap_or_default();
        map.extend(aliases.into_iter().map(|(k, v)| (k.into(), v.into())));
        self.clone_with([Clause::GraphAliases(Some(map))])
    }

    // -------------------------------------------------------------------------
    // Inspection
    // -------------------------------------------------------------------------

    /// First of `base`, `base_0`, `base_1`, ... not already naming a source
    /// or join of this query, nor listed in `also_used`.
    pub fn unused_table_alias(&self, base: &str, also_used: &[&str]) -> String {
        let mut used: Vec<&str> = also_used.to_vec();
        if let Some(from) = &self.opts.from {
            used.extend(from.iter().filter_map(Expr::source_alias));
        }
        used.extend(self.joins().iter().filter_map(JoinClause::name));

        if !used.contains(&base) {
            return base.to_string();
        }
        (0..)
            .map(|i| format!("{}_{}", base, i))
            .find(|candidate| !used.contains(&candidate.as_str()))
            .unwrap_or_else(|| base.to_string())
    }

    /// Whether this is `SELECT * FROM table` and nothing more.
    pub fn is_simple_select_all(&self) -> bool {
        let o = &*self.opts;
        let Some([source]) = o.from.as_deref() else {
            return false;
        };
        if !matches!(
            source.unaliased(),
            Expr::Identifier(_) | Expr::Qualified { .. }
        ) {
            return false;
        }
        let plain_select = matches!(o.select.as_deref(), None | Some([Expr::Star { .. }]));
        plain_select
            && o.sql.is_none()
            && o.join.is_none()
            && o.where_clause.is_none()
            && o.having.is_none()
            && o.group.is_none()
            && o.order.is_none()
            && o.limit.is_none()
            && o.offset.is_none()
            && o.distinct.is_none()
            && o.compounds.is_none()
            && o.with.is_none()
            && o.lock.is_none()
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn check_limit(limit: i64) -> QueryResult<u64> {
    u64::try_from(limit)
        .ok()
        .filter(|&l| l >= 1)
        .ok_or_else(|| QueryError::invalid("Limits must be greater than or equal to 1"))
}

fn check_offset(offset: i64) -> QueryResult<u64> {
    u64::try_from(offset)
        .map_err(|_| QueryError::invalid("Offsets must be greater than or equal to 0"))
}

/// Alias for the n-th nested query source.
pub(crate) fn dataset_alias(n: usize) -> String {
    format!("t{}", n)
}

/// Existing sequence (if any) followed by `more`, as a new vector.
pub(crate) fn appended<T: Clone>(existing: &Option<Vec<T>>, more: impl IntoIterator<Item = T>) -> Vec<T> {
    existing
        .iter()
        .flatten()
        .cloned()
        .chain(more)
        .collect()
}

fn merged<I, K, V>(existing: &Option<BTreeMap<String, Expr>>, values: I) -> BTreeMap<String, Expr>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Expr>,
{
    let mut map = existing.clone().unwrap_or_default();
    map.extend(values.into_iter().map(|(k, v)| (k.into(), v.into())));
    map
}

/// Split `name AS alias` and `schema.table` forms.
pub(crate) fn split_alias(name: &str) -> (Expr, Option<String>) {
    let (table, alias) = match ALIASED_NAME.captures(name) {
        Some(caps) => (caps[1].to_string(), Some(caps[2].to_string())),
        None => (name.trim().to_string(), None),
    };
    let expr = match table.split_once('.') {
        Some((schema, table)) => table_col(schema, table),
        None => Expr::Identifier(table),
    };
    (expr, alias)
}

fn table_source(name: &str) -> Expr {
    match split_alias(name) {
        (expr, Some(alias)) => expr.alias(&alias),
        (expr, None) => expr,
    }
}

pub(crate) fn check_alias(alias: &str) -> QueryResult<()> {
    if IDENTIFIER.is_match(alias) {
        Ok(())
    } else {
        Err(QueryError::invalid(format!("malformed table alias: {:?}", alias)))
    }
}
