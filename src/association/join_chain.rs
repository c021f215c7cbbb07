//! Join chains for many-through-many associations.
//!
//! A chain of N link tables compiles to N+1 edges. Forward edges run from
//! the root towards the associated table (for graph-style loading); reverse
//! edges run back from the associated table (for subquery-style loading)
//! and carry aliases that never collide, even when the chain passes through
//! the same table more than once.
//!
//! ```ignore
//! let chain = JoinChain::new(
//!     "artists", "id",
//!     vec![
//!         ThroughLink::new("albums_artists", "artist_id", "album_id"),
//!         ThroughLink::new("albums", "id", "id"),
//!         ThroughLink::new("albums_tags", "album_id", "tag_id"),
//!     ],
//!     "tags", "id",
//! )?;
//! let tags = chain.associated_query(&Query::default().from(["tags"]), vec![lit_int(1)])?;
//! ```

use std::fmt;
use std::sync::{Arc, OnceLock};

use tracing::debug;

use crate::condition::Condition;
use crate::error::{QueryError, QueryResult};
use crate::expr::{col, list, table_col, Expr};
use crate::query::{JoinBlockFn, JoinCondition, JoinOptions, JoinType, Qualify, Query};

/// Shared per-edge join closure.
pub type EdgeBlockFn = Arc<JoinBlockFn>;

// =============================================================================
// Links
// =============================================================================

/// One intermediate table of a chain.
#[derive(Clone)]
pub struct ThroughLink {
    pub table: String,
    /// Column joining this table to the previous one.
    pub left: String,
    /// Column joining this table to the next one.
    pub right: String,
    /// Join type for graph loading; the chain default when unset.
    pub join_type: Option<JoinType>,
    /// Extra (column, value) pairs ANDed onto the graph join.
    pub conditions: Vec<(Expr, Expr)>,
    /// Replaces the computed graph join condition entirely.
    pub only_conditions: Option<JoinCondition>,
    pub block: Option<EdgeBlockFn>,
}

impl ThroughLink {
    pub fn new(table: &str, left: &str, right: &str) -> Self {
        Self {
            table: table.into(),
            left: left.into(),
            right: right.into(),
            join_type: None,
            conditions: Vec::new(),
            only_conditions: None,
            block: None,
        }
    }

    /// Build a link from a `[table, left, right]` triple.
    pub fn from_parts(parts: &[&str]) -> QueryResult<Self> {
        match parts {
            [table, left, right] => {
                let link = Self::new(table, left, right);
                link.validate()?;
                Ok(link)
            }
            _ => Err(QueryError::invalid(format!(
                "join chain link must have 3 parts (table, left, right), got {}",
                parts.len()
            ))),
        }
    }

    pub fn with_join_type(mut self, join_type: JoinType) -> Self {
        self.join_type = Some(join_type);
        self
    }

    pub fn with_condition(mut self, column: &str, value: impl Into<Expr>) -> Self {
        self.conditions.push((col(column), value.into()));
        self
    }

    pub fn with_only_conditions(mut self, cond: impl Into<JoinCondition>) -> Self {
        self.only_conditions = Some(cond.into());
        self
    }

    pub fn with_block<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &str, &[crate::query::JoinClause]) -> Expr + Send + Sync + 'static,
    {
        self.block = Some(Arc::new(f));
        self
    }

    fn validate(&self) -> QueryResult<()> {
        if self.table.is_empty() || self.left.is_empty() || self.right.is_empty() {
            return Err(QueryError::invalid(format!(
                "join chain link has an empty part: ({:?}, {:?}, {:?})",
                self.table, self.left, self.right
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for ThroughLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThroughLink")
            .field("table", &self.table)
            .field("left", &self.left)
            .field("right", &self.right)
            .field("join_type", &self.join_type)
            .field("conditions", &self.conditions)
            .field("only_conditions", &self.only_conditions)
            .field("block", &self.block.as_ref().map(|_| "<closure>"))
            .finish()
    }
}

// =============================================================================
// Edges
// =============================================================================

/// A forward hop: join `table` on `table.right = previous.left`.
#[derive(Clone)]
pub struct JoinEdge {
    pub table: String,
    pub left: String,
    pub right: String,
    pub join_type: JoinType,
    pub conditions: Vec<(Expr, Expr)>,
    pub only_conditions: Option<JoinCondition>,
    pub block: Option<EdgeBlockFn>,
}

impl fmt::Debug for JoinEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoinEdge")
            .field("table", &self.table)
            .field("left", &self.left)
            .field("right", &self.right)
            .field("join_type", &self.join_type)
            .field("conditions", &self.conditions)
            .field("only_conditions", &self.only_conditions)
            .field("block", &self.block.as_ref().map(|_| "<closure>"))
            .finish()
    }
}

/// A reverse hop: join `table AS alias` on `alias.left = previous.right`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReverseEdge {
    pub table: String,
    pub left: String,
    pub right: String,
    pub alias: String,
}

#[derive(Debug)]
struct Edges {
    forward: Vec<JoinEdge>,
    final_edge: JoinEdge,
    reverse: Vec<ReverseEdge>,
    final_reverse: ReverseEdge,
    predicate_key: Expr,
}

// =============================================================================
// Chain
// =============================================================================

/// A compiled many-through-many association.
///
/// Edges are computed on first access and cached; the chain can be shared
/// across threads.
#[derive(Debug)]
pub struct JoinChain {
    root_table: String,
    root_key: String,
    links: Vec<ThroughLink>,
    associated_table: String,
    associated_key: String,
    join_type: JoinType,
    edges: OnceLock<Edges>,
}

impl JoinChain {
    pub fn new(
        root_table: &str,
        root_key: &str,
        links: Vec<ThroughLink>,
        associated_table: &str,
        associated_key: &str,
    ) -> QueryResult<Self> {
        if links.is_empty() {
            return Err(QueryError::invalid("join chain needs at least one link"));
        }
        for link in &links {
            link.validate()?;
        }
        Ok(Self {
            root_table: root_table.into(),
            root_key: root_key.into(),
            links,
            associated_table: associated_table.into(),
            associated_key: associated_key.into(),
            join_type: JoinType::LeftOuter,
            edges: OnceLock::new(),
        })
    }

    /// Default join type of graph joins for links that set none.
    pub fn with_join_type(mut self, join_type: JoinType) -> Self {
        self.join_type = join_type;
        self.edges = OnceLock::new();
        self
    }

    pub fn links(&self) -> &[ThroughLink] {
        &self.links
    }

    /// Edges from the root to each link table.
    pub fn forward_edges(&self) -> &[JoinEdge] {
        &self.edges().forward
    }

    /// Edge from the last link table to the associated table.
    pub fn final_edge(&self) -> &JoinEdge {
        &self.edges().final_edge
    }

    /// Aliased edges from the associated table back towards the root,
    /// excluding the link closest to the root.
    pub fn reverse_edges(&self) -> &[ReverseEdge] {
        &self.edges().reverse
    }

    /// Reverse edge of the link closest to the root.
    pub fn final_reverse_edge(&self) -> &ReverseEdge {
        &self.edges().final_reverse
    }

    /// Column the root keys are matched against in subquery loading.
    pub fn predicate_key(&self) -> &Expr {
        &self.edges().predicate_key
    }

    /// Alias of the table holding the predicate key.
    pub fn associated_key_table(&self) -> &str {
        &self.edges().final_reverse.alias
    }

    fn edges(&self) -> &Edges {
        self.edges.get_or_init(|| self.compute_edges())
    }

    fn compute_edges(&self) -> Edges {
        let n = self.links.len();
        let last = &self.links[n - 1];

        let forward = self
            .links
            .iter()
            .enumerate()
            .map(|(i, link)| JoinEdge {
                table: link.table.clone(),
                left: if i == 0 {
                    self.root_key.clone()
                } else {
                    self.links[i - 1].right.clone()
                },
                right: link.left.clone(),
                join_type: link.join_type.unwrap_or(self.join_type),
                conditions: link.conditions.clone(),
                only_conditions: link.only_conditions.clone(),
                block: link.block.clone(),
            })
            .collect();
        let final_edge = JoinEdge {
            table: self.associated_table.clone(),
            left: last.right.clone(),
            right: self.associated_key.clone(),
            join_type: self.join_type,
            conditions: Vec::new(),
            only_conditions: None,
            block: None,
        };

        let mut taken = vec![bare_name(&self.associated_table).to_string()];
        let reverse: Vec<ReverseEdge> = (1..n)
            .rev()
            .map(|i| self.reverse_edge(i, &mut taken))
            .collect();
        let final_reverse = self.reverse_edge(0, &mut taken);
        let predicate_key = table_col(&final_reverse.alias, &self.links[0].left);

        debug!(
            root = %self.root_table,
            associated = %self.associated_table,
            links = n,
            aliases = ?taken,
            "computed join chain edges"
        );
        Edges {
            forward,
            final_edge,
            reverse,
            final_reverse,
            predicate_key,
        }
    }

    fn reverse_edge(&self, i: usize, taken: &mut Vec<String>) -> ReverseEdge {
        let link = &self.links[i];
        let right = match self.links.get(i + 1) {
            Some(next) => next.left.clone(),
            None => self.associated_key.clone(),
        };
        let base = bare_name(&link.table);
        let alias = if taken.iter().any(|t| t == base) {
            (0..)
                .map(|n| format!("{}_{}", base, n))
                .find(|candidate| !taken.contains(candidate))
                .unwrap_or_else(|| base.to_string())
        } else {
            base.to_string()
        };
        taken.push(alias.clone());
        ReverseEdge {
            table: link.table.clone(),
            left: link.right.clone(),
            right,
            alias,
        }
    }

    // -------------------------------------------------------------------------
    // Consumers
    // -------------------------------------------------------------------------

    /// Subquery-style loading: join the reverse edges onto `base` (a query
    /// over the associated table) and keep rows whose predicate key is one
    /// of `root_keys`.
    pub fn associated_query(&self, base: &Query, root_keys: Vec<Expr>) -> QueryResult<Query> {
        let mut ds = base.clone();
        for edge in self.reverse_edges().iter().chain([self.final_reverse_edge()]) {
            let opts = JoinOptions {
                table_alias: Some(edge.alias.clone()),
                qualify: Qualify::Deep,
                ..JoinOptions::default()
            };
            ds = ds.join_table(
                JoinType::Inner,
                edge.table.as_str(),
                JoinCondition::pairs([(&edge.left, &edge.right)]),
                &opts,
                None,
            )?;
        }
        ds.where_(Condition::Pairs(vec![(
            self.predicate_key().clone(),
            list(root_keys),
        )]))
    }

    /// Graph-style loading: join every link table and then the associated
    /// table onto `root`, each under an alias unused so far.
    pub fn graph_query(&self, root: &Query) -> QueryResult<Query> {
        let mut ds = root.clone();
        let mut qualifier = Some(root.first_source_alias()?);
        for edge in self.forward_edges().iter().chain([self.final_edge()]) {
            let alias = ds.unused_table_alias(bare_name(&edge.table), &[]);
            let cond = match &edge.only_conditions {
                Some(cond) => cond.clone(),
                None => JoinCondition::Pairs(
                    [(col(&edge.right), col(&edge.left))]
                        .into_iter()
                        .chain(edge.conditions.iter().cloned())
                        .collect(),
                ),
            };
            let opts = JoinOptions {
                table_alias: Some(alias),
                implicit_qualifier: qualifier.take(),
                qualify: Qualify::Deep,
                preserve_implicit_qualifier: false,
            };
            ds = ds.join_table(
                edge.join_type,
                edge.table.as_str(),
                cond,
                &opts,
                edge.block.as_deref(),
            )?;
        }
        Ok(ds)
    }
}

/// Table name without its schema.
fn bare_name(table: &str) -> &str {
    table.rsplit('.').next().unwrap_or(table)
}
