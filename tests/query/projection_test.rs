//! Select list, grouping, ordering and DISTINCT.

use quarry::prelude::*;
use quarry::query::Distinct;

fn items() -> Query {
    Query::new(Dialect::Postgres).from(["items"])
}

#[test]
fn test_select_names_and_expressions() {
    let q = items().select([
        Selection::from("id"),
        Selection::from(func("upper", vec![col("name")]).alias("name")),
    ]);
    assert_eq!(
        q.opts().select,
        Some(vec![col("id"), func("upper", vec![col("name")]).alias("name")])
    );

    // Replacing, not appending
    let q = q.select(["price"]);
    assert_eq!(q.opts().select, Some(vec![col("price")]));
}

#[test]
fn test_select_append_starts_from_star() {
    let q = items().select_append(["price"]);
    assert_eq!(q.opts().select, Some(vec![star(), col("price")]));

    let q = items().select(["id"]).select_append(["price"]);
    assert_eq!(q.opts().select, Some(vec![col("id"), col("price")]));
}

#[test]
fn test_select_more_starts_from_nothing() {
    let q = items().select_more(["price"]);
    assert_eq!(q.opts().select, Some(vec![col("price")]));

    let q = q.select_more(["qty"]);
    assert_eq!(q.opts().select, Some(vec![col("price"), col("qty")]));
}

#[test]
fn test_select_all_tables() {
    let q = items()
        .join("orders AS o", JoinCondition::pairs([("item_id", "id")]))
        .unwrap()
        .select_all(["items", "orders AS o"]);
    assert_eq!(
        q.opts().select,
        Some(vec![table_star("items"), table_star("o")])
    );
}

#[test]
fn test_select_group_strips_aliases_from_group() {
    let year = func("year", vec![col("created_at")]);
    let q = items().select_group([
        Selection::from("kind"),
        Selection::from(vec![("year", year.clone())]),
    ]);
    assert_eq!(
        q.opts().select,
        Some(vec![col("kind"), year.clone().alias("year")])
    );
    assert_eq!(q.opts().group, Some(vec![col("kind"), year]));
}

#[test]
fn test_group_and_count() {
    let q = items().group_and_count(["kind"]);
    assert_eq!(
        q.opts().select,
        Some(vec![col("kind"), count_star().alias("count")])
    );
    assert_eq!(q.opts().group, Some(vec![col("kind")]));
}

#[test]
fn test_group_append_and_ungrouped() {
    let q = items()
        .group([col("kind")])
        .group_append([col("color")])
        .having(count_star().gt(1))
        .unwrap();
    assert_eq!(q.opts().group, Some(vec![col("kind"), col("color")]));

    let q = q.ungrouped();
    assert_eq!(q.opts().group, None);
    assert_eq!(q.opts().having, None);
}

#[test]
fn test_order_append_and_prepend() {
    let q = items()
        .order([col("a")])
        .order_append([col("b").desc()])
        .order_prepend([col("z")]);
    assert_eq!(
        q.opts().order,
        Some(vec![col("z"), col("a"), col("b").desc()])
    );

    // Appending to nothing is a plain order
    assert_eq!(items().order_append([col("a")]), items().order([col("a")]));
}

#[test]
fn test_reverse_existing_order() {
    let q = items()
        .order([col("a"), col("b").desc().nulls_first()])
        .reverse([]);
    assert_eq!(
        q.opts().order,
        Some(vec![col("a").desc(), col("b").asc().nulls_last()])
    );
}

#[test]
fn test_reverse_given_terms() {
    let q = items().order([col("a")]).reverse([col("price")]);
    assert_eq!(q.opts().order, Some(vec![col("price").desc()]));
}

#[test]
fn test_reverse_twice_restores_direction() {
    let q = items().order([col("a").asc()]);
    assert_eq!(q.reverse([]).reverse([]), q);
}

#[test]
fn test_unordered_is_idempotent() {
    let q = items().order([col("a")]).unordered();
    assert_eq!(q.opts().order, None);
    assert_eq!(q.unordered(), q);
    assert_eq!(q, items());
}

#[test]
fn test_distinct_rows_and_on() {
    let q = items().distinct([]).unwrap();
    assert_eq!(q.opts().distinct, Some(Distinct::Rows));

    let q = items().distinct([col("kind")]).unwrap();
    assert_eq!(q.opts().distinct, Some(Distinct::On(vec![col("kind")])));

    let tsql = Query::new(Dialect::TSql).from(["items"]);
    assert!(matches!(
        tsql.distinct([col("kind")]),
        Err(QueryError::Unsupported { .. })
    ));
}

#[test]
fn test_select_keeps_filters_and_order() {
    let q = items()
        .filter(col("price").gt(10))
        .unwrap()
        .order([col("price")])
        .select(["id"]);
    assert_eq!(q.opts().where_clause, Some(col("price").gt(10)));
    assert_eq!(q.opts().order, Some(vec![col("price")]));
}
