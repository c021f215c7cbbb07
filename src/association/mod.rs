//! Association support built on the query algebra.
//!
//! [`JoinChain`] compiles a multi-hop association (root table, a list of
//! intermediate link tables, associated table) into join edges for both
//! graph-style and subquery-style eager loading.

mod join_chain;

pub use join_chain::{EdgeBlockFn, JoinChain, JoinEdge, ReverseEdge, ThroughLink};
