//! Copy-on-write behaviour, limits and descriptor serialization.

use std::ops::Bound;

use quarry::prelude::*;
use quarry::query::LockStyle;
use serde_json::json;
use test_case::test_case;

fn items() -> Query {
    Query::new(Dialect::Postgres).from(["items"])
}

#[test]
fn test_siblings_do_not_share_changes() {
    let base = items().filter(col("active")).unwrap();
    let cheap = base.filter(col("price").lt(10)).unwrap();
    let pricey = base.filter(col("price").gte(100)).unwrap();

    assert_eq!(base.opts().where_clause, Some(col("active")));
    assert_eq!(
        cheap.opts().where_clause,
        Some(col("active").and(col("price").lt(10)))
    );
    assert_eq!(
        pricey.opts().where_clause,
        Some(col("active").and(col("price").gte(100)))
    );
}

#[test]
fn test_clones_compare_by_value() {
    let a = items().order([col("id")]);
    let b = items().order([col("id")]);
    assert_eq!(a, b);
    assert_ne!(a, items());
    // Same clauses on a different dialect are a different descriptor
    assert_ne!(items(), Query::new(Dialect::MySql).from(["items"]));
}

#[test]
fn test_column_cache_survives_filtering_only() {
    let q = items().with_cached_columns(["id", "price"]);
    assert_eq!(
        q.filter(col("id").gt(1)).unwrap().cached_columns(),
        Some(&["id".to_string(), "price".to_string()][..])
    );
    assert_eq!(q.order([col("id")]).cached_columns().map(<[_]>::len), Some(2));
    assert_eq!(q.select(["id"]).cached_columns(), None);
    assert_eq!(q.from(["orders"]).cached_columns(), None);
    assert_eq!(q.with_sql("SELECT 1").cached_columns(), None);
    assert_eq!(
        q.cross_join("sizes").unwrap().cached_columns(),
        None
    );
    // Cache does not take part in equality
    assert_eq!(q, items());
}

#[test_case((Bound::Included(10), Bound::Excluded(20)), Some(10), Some(10) ; "half open")]
#[test_case((Bound::Included(10), Bound::Included(20)), Some(11), Some(10) ; "inclusive")]
#[test_case((Bound::Unbounded, Bound::Excluded(5)), Some(5), Some(0) ; "from start")]
fn test_limit_range(range: (Bound<i64>, Bound<i64>), limit: Option<u64>, offset: Option<u64>) {
    let q = items().limit_range(range).unwrap();
    assert_eq!(q.opts().limit, limit);
    assert_eq!(q.opts().offset, offset);
}

#[test]
fn test_limit_range_needs_upper_bound() {
    assert!(matches!(
        items().limit_range(5..),
        Err(QueryError::InvalidArgument(_))
    ));
}

#[test]
fn test_limit_offset_pairs() {
    let q = items().limit_offset(None, Some(20)).unwrap();
    assert_eq!(q.opts().limit, None);
    assert_eq!(q.opts().offset, Some(20));

    let q = items().limit(5).unwrap().offset(15).unwrap();
    assert_eq!((q.opts().limit, q.opts().offset), (Some(5), Some(15)));

    // limit() keeps an existing offset
    let q = q.limit(7).unwrap();
    assert_eq!((q.opts().limit, q.opts().offset), (Some(7), Some(15)));

    let q = q.unlimited();
    assert_eq!((q.opts().limit, q.opts().offset), (None, None));
}

#[test_case(0 ; "zero")]
#[test_case(-3 ; "negative")]
fn test_limit_below_one_rejected(limit: i64) {
    assert_eq!(
        items().limit(limit),
        Err(QueryError::InvalidArgument(
            "Limits must be greater than or equal to 1".into()
        ))
    );
}

#[test]
fn test_negative_offset_rejected() {
    assert_eq!(
        items().limit_offset(Some(5), Some(-1)),
        Err(QueryError::InvalidArgument(
            "Offsets must be greater than or equal to 0".into()
        ))
    );
    assert!(items().offset(0).is_ok());
}

#[test]
fn test_limit_on_raw_sql_wraps_first() {
    let q = items().with_sql("SELECT * FROM legacy").limit(10).unwrap();
    assert_eq!(q.opts().sql, None);
    assert_eq!(q.opts().limit, Some(10));
    assert_eq!(q.first_source_alias().unwrap(), "t1");
}

#[test]
fn test_from_self_carries_shard_and_values() {
    let q = items()
        .server("replica")
        .set_defaults([("status", lit_str("new"))])
        .set_overrides([("tenant", lit_int(7))])
        .filter(col("a").eq(1))
        .unwrap()
        .from_self_as("inner_items");

    assert_eq!(q.opts().server.as_deref(), Some("replica"));
    assert_eq!(
        q.opts().defaults.as_ref().and_then(|d| d.get("status")),
        Some(&lit_str("new"))
    );
    assert_eq!(
        q.opts().overrides.as_ref().and_then(|d| d.get("tenant")),
        Some(&lit_int(7))
    );
    assert_eq!(q.opts().where_clause, None);
    assert_eq!(q.first_source_alias().unwrap(), "inner_items");
}

#[test]
fn test_defaults_merge() {
    let q = items()
        .set_defaults([("a", 1)])
        .set_defaults([("b", 2), ("a", 3)]);
    let defaults = q.opts().defaults.as_ref().unwrap();
    assert_eq!(defaults.get("a"), Some(&lit_int(3)));
    assert_eq!(defaults.get("b"), Some(&lit_int(2)));
}

#[test]
fn test_lock_style() {
    assert_eq!(items().for_update().opts().lock, Some(LockStyle::Update));
    assert_eq!(
        items()
            .lock_style(LockStyle::Raw("FOR NO KEY UPDATE".into()))
            .opts()
            .lock,
        Some(LockStyle::Raw("FOR NO KEY UPDATE".into()))
    );
}

#[test]
fn test_shared_across_threads() {
    let base = items().filter(col("active")).unwrap();
    let derived: Vec<Query> = std::thread::scope(|s| {
        let handles: Vec<_> = (1..=4)
            .map(|n| {
                let base = &base;
                s.spawn(move || base.limit(n).unwrap())
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(base.opts().limit, None);
    for (n, q) in (1..=4u64).zip(&derived) {
        assert_eq!(q.opts().limit, Some(n));
        assert_eq!(q.opts().where_clause, base.opts().where_clause);
    }
}

#[test]
fn test_json_form() {
    let q = items()
        .filter(col("price").gt(10))
        .unwrap()
        .limit(5)
        .unwrap();
    let value = q.to_json().unwrap();

    assert_eq!(value["dialect"], json!("postgres"));
    assert_eq!(value["options"]["limit"], json!(5));
    assert!(value["options"].get("where").is_some());
    assert!(value["options"].get("order").is_none());
}

#[test]
fn test_simple_select_all_detection() {
    assert!(items().is_simple_select_all());
    assert!(items().select_all(["items"]).is_simple_select_all());
    assert!(!items().select(["id"]).is_simple_select_all());
    assert!(!items().limit(1).unwrap().is_simple_select_all());
    assert!(!Query::default().is_simple_select_all());
}
