//! Join composition: aliasing, qualification, USING emulation.

use quarry::prelude::*;
use quarry::query::{JoinBlockFn, JoinClause};

fn items(dialect: Dialect) -> Query {
    Query::new(dialect).from(["items"])
}

#[test]
fn test_using_emulated_as_equality_pairs() {
    let base = items(Dialect::TSql);
    let using = base
        .join_table(
            JoinType::Inner,
            "t",
            JoinCondition::using(["a", "b"]),
            &JoinOptions::default(),
            None,
        )
        .unwrap();
    let pairs = base
        .join_table(
            JoinType::Inner,
            "t",
            JoinCondition::pairs([("a", "a"), ("b", "b")]),
            &JoinOptions::default(),
            None,
        )
        .unwrap();

    assert_eq!(using, pairs);
    assert_eq!(
        using.joins()[0].condition(),
        Some(
            &table_col("t", "a")
                .eq(table_col("items", "a"))
                .and(table_col("t", "b").eq(table_col("items", "b")))
        )
    );
}

#[test]
fn test_using_override_forces_emulation() {
    let caps = Capabilities::from(Dialect::Postgres).with_overrides(&CapabilityOverrides {
        join_using: Some(false),
        ..Default::default()
    });
    let q = Query::new(caps)
        .from(["items"])
        .join("orders", JoinCondition::using(["id"]))
        .unwrap();
    assert!(matches!(q.joins()[0], JoinClause::On { .. }));
}

#[test]
fn test_using_with_closure_rejected() {
    let block: &JoinBlockFn = &|t: &str, _: &str, _: &[JoinClause]| col(t);
    let result = items(Dialect::Postgres).join_table(
        JoinType::Inner,
        "orders",
        JoinCondition::using(["id"]),
        &JoinOptions::default(),
        Some(block),
    );
    assert!(matches!(result, Err(QueryError::InvalidArgument(_))));
}

#[test]
fn test_successive_joins_qualify_against_last_joined() {
    let q = items(Dialect::Postgres)
        .join("orders", JoinCondition::pairs([("item_id", "id")]))
        .unwrap()
        .join("lines", JoinCondition::pairs([("order_id", "id")]))
        .unwrap();

    assert_eq!(
        q.joins()[1].condition(),
        Some(&table_col("lines", "order_id").eq(table_col("orders", "id")))
    );
    assert_eq!(q.opts().last_joined_table.as_deref(), Some("lines"));
}

#[test]
fn test_implicit_qualifier_option() {
    let q = items(Dialect::Postgres)
        .join("orders", JoinCondition::pairs([("item_id", "id")]))
        .unwrap()
        .join_table(
            JoinType::Left,
            "prices AS p",
            JoinCondition::pairs([("item_id", "id")]),
            &JoinOptions {
                implicit_qualifier: Some("items".into()),
                ..Default::default()
            },
            None,
        )
        .unwrap();
    assert_eq!(
        q.joins()[1].condition(),
        Some(&table_col("p", "item_id").eq(table_col("items", "id")))
    );
    assert_eq!(q.joins()[1].name(), Some("p"));
}

#[test]
fn test_preserve_implicit_qualifier() {
    let q = items(Dialect::Postgres)
        .join_table(
            JoinType::Inner,
            "orders",
            JoinCondition::pairs([("item_id", "id")]),
            &JoinOptions {
                preserve_implicit_qualifier: true,
                ..Default::default()
            },
            None,
        )
        .unwrap();
    assert_eq!(q.opts().last_joined_table, None);

    let q = q
        .join("stock", JoinCondition::pairs([("item_id", "id")]))
        .unwrap();
    assert_eq!(
        q.joins()[1].condition(),
        Some(&table_col("stock", "item_id").eq(table_col("items", "id")))
    );
}

#[test]
fn test_deep_qualification() {
    let lower = |c: &str| func("lower", vec![col(c)]);
    let cond = JoinCondition::Pairs(vec![(lower("code"), lower("code"))]);

    let deep = items(Dialect::Postgres)
        .join_table(
            JoinType::Inner,
            "codes",
            cond.clone(),
            &JoinOptions {
                qualify: Qualify::Deep,
                ..Default::default()
            },
            None,
        )
        .unwrap();
    assert_eq!(
        deep.joins()[0].condition(),
        Some(
            &func("lower", vec![table_col("codes", "code")])
                .eq(func("lower", vec![table_col("items", "code")]))
        )
    );

    let symbol = items(Dialect::Postgres)
        .join_table(JoinType::Inner, "codes", cond, &JoinOptions::default(), None)
        .unwrap();
    assert_eq!(
        symbol.joins()[0].condition(),
        Some(&lower("code").eq(lower("code")))
    );
}

#[test]
fn test_no_qualification() {
    let q = items(Dialect::Postgres)
        .join_table(
            JoinType::Inner,
            "orders",
            JoinCondition::pairs([("item_id", "id")]),
            &JoinOptions {
                qualify: Qualify::None,
                ..Default::default()
            },
            None,
        )
        .unwrap();
    assert_eq!(q.joins()[0].condition(), Some(&col("item_id").eq(col("id"))));
}

#[test]
fn test_closure_receives_aliases_and_is_anded() {
    let block: &JoinBlockFn = &|table: &str, last: &str, joins: &[JoinClause]| {
        assert!(joins.is_empty());
        table_col(table, "active").eq(table_col(last, "active"))
    };
    let q = items(Dialect::Postgres)
        .join_table(
            JoinType::LeftOuter,
            "orders AS o",
            JoinCondition::pairs([("item_id", "id")]),
            &JoinOptions::default(),
            Some(block),
        )
        .unwrap();

    let join = &q.joins()[0];
    assert_eq!(join.join_type(), JoinType::LeftOuter);
    assert_eq!(join.table(), &col("orders"));
    assert_eq!(join.alias(), Some("o"));
    assert_eq!(
        join.condition(),
        Some(
            &table_col("o", "item_id")
                .eq(table_col("items", "id"))
                .and(table_col("o", "active").eq(table_col("items", "active")))
        )
    );
}

#[test]
fn test_closure_alone_on_conditioned_join() {
    let block: &JoinBlockFn =
        &|table: &str, last: &str, _: &[JoinClause]| table_col(table, "x").gt(table_col(last, "y"));
    let q = items(Dialect::Postgres)
        .join_table(
            JoinType::Inner,
            "ranges",
            JoinCondition::None,
            &JoinOptions::default(),
            Some(block),
        )
        .unwrap();
    assert_eq!(
        q.joins()[0].condition(),
        Some(&table_col("ranges", "x").gt(table_col("items", "y")))
    );
}

#[test]
fn test_unconditioned_joins() {
    let q = items(Dialect::Postgres).cross_join("sizes").unwrap();
    assert_eq!(
        q.joins()[0],
        JoinClause::Plain {
            join_type: JoinType::Cross,
            table: col("sizes"),
            alias: None,
        }
    );
    assert!(items(Dialect::Postgres).natural_join("sizes").is_ok());

    let block: &JoinBlockFn = &|t: &str, _: &str, _: &[JoinClause]| col(t);
    let result = items(Dialect::Postgres).join_table(
        JoinType::Natural,
        "sizes",
        JoinCondition::None,
        &JoinOptions::default(),
        Some(block),
    );
    assert!(matches!(result, Err(QueryError::InvalidArgument(_))));
}

#[test]
fn test_expression_condition_used_as_given() {
    let on = table_col("orders", "total").gt(100);
    let q = items(Dialect::Postgres).left_join("orders", on.clone()).unwrap();
    assert_eq!(q.joins()[0].condition(), Some(&on));
    assert_eq!(q.joins()[0].join_type(), JoinType::Left);
}

#[test]
fn test_nested_query_join_aliases_continue_counter() {
    let sub = Query::default().from(["orders"]);
    let q = Query::default()
        .from([sub.clone()])
        .join(sub.clone(), JoinCondition::pairs([("id", "id")]))
        .unwrap();
    assert_eq!(q.first_source_alias().unwrap(), "t1");
    assert_eq!(q.joins()[0].alias(), Some("t2"));
    assert_eq!(q.opts().num_dataset_sources, Some(2));
    assert_eq!(
        q.joins()[0].condition(),
        Some(&table_col("t2", "id").eq(table_col("t1", "id")))
    );
}

#[test]
fn test_nested_query_ctes_hoisted_when_unsupported() {
    let orders = Query::new(Dialect::TSql).from(["orders"]);
    let sub = Query::new(Dialect::TSql)
        .with("recent", &orders, CteOptions::default())
        .unwrap()
        .from(["recent"]);

    let q = items(Dialect::TSql)
        .join(sub.clone(), JoinCondition::pairs([("item_id", "id")]))
        .unwrap();
    assert_eq!(q.opts().with.as_ref().map(|w| w[0].name.as_str()), Some("recent"));
    match q.joins()[0].table() {
        Expr::Subquery(inner) => assert_eq!(inner.opts().with, None),
        other => panic!("expected subquery, got {:?}", other),
    }

    // Dialects that allow nested WITH leave it in place
    let pg_sub = Query::new(Dialect::Postgres)
        .with("recent", &orders, CteOptions::default())
        .unwrap()
        .from(["recent"]);
    let q = items(Dialect::Postgres)
        .join(pg_sub, JoinCondition::pairs([("item_id", "id")]))
        .unwrap();
    assert_eq!(q.opts().with, None);
}

#[test]
fn test_schema_qualified_target() {
    let q = items(Dialect::Postgres)
        .join("sales.orders", JoinCondition::pairs([("item_id", "id")]))
        .unwrap();
    assert_eq!(q.joins()[0].table(), &table_col("sales", "orders"));
    assert_eq!(
        q.joins()[0].condition(),
        Some(&table_col("orders", "item_id").eq(table_col("items", "id")))
    );
}

#[test]
fn test_join_without_source_fails() {
    let result = Query::default().join("orders", JoinCondition::pairs([("a", "b")]));
    assert!(matches!(result, Err(QueryError::InvalidArgument(_))));
}
