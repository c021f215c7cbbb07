//! UNION / INTERSECT / EXCEPT and WITH.

use quarry::prelude::*;
use quarry::query::{Compound, CompoundOp};

fn table(dialect: Dialect, name: &str) -> Query {
    Query::new(dialect).from([name])
}

/// The single derived source of a wrapped query.
fn derived_source(q: &Query) -> (&Query, &str) {
    let from = q.opts().from.as_ref().expect("wrapped query has a source");
    assert_eq!(from.len(), 1);
    match &from[0] {
        Expr::Aliased { expr, alias } => match expr.as_ref() {
            Expr::Subquery(inner) => (inner.as_ref(), alias.as_str()),
            other => panic!("expected subquery, got {:?}", other),
        },
        other => panic!("expected aliased source, got {:?}", other),
    }
}

#[test]
fn test_union_wraps_by_default() {
    let a = table(Dialect::Postgres, "a");
    let b = table(Dialect::Postgres, "b");
    let q = a.union(&b, CompoundOptions::default()).unwrap();

    let (inner, alias) = derived_source(&q);
    assert_eq!(alias, "t1");
    assert_eq!(inner.opts().from, a.opts().from);
    assert_eq!(
        inner.opts().compounds,
        Some(vec![Compound {
            op: CompoundOp::Union,
            query: b,
            all: false,
        }])
    );
    assert_eq!(q.opts().compounds, None);
}

#[test]
fn test_unwrapped_union_stays_on_receiver() {
    let a = table(Dialect::Postgres, "a");
    let b = table(Dialect::Postgres, "b");
    let q = a
        .union(
            &b,
            CompoundOptions {
                all: true,
                from_self: false,
                alias: None,
            },
        )
        .unwrap();
    assert_eq!(q.opts().from, a.opts().from);
    let compounds = q.opts().compounds.as_ref().unwrap();
    assert_eq!(compounds.len(), 1);
    assert!(compounds[0].all);
}

#[test]
fn test_bool_shorthand_sets_all() {
    let a = table(Dialect::Postgres, "a");
    let b = table(Dialect::Postgres, "b");
    assert_eq!(
        a.union(&b, true).unwrap(),
        a.union(
            &b,
            CompoundOptions {
                all: true,
                ..Default::default()
            }
        )
        .unwrap()
    );
}

#[test]
fn test_alias_option_names_derived_source() {
    let a = table(Dialect::Postgres, "a");
    let b = table(Dialect::Postgres, "b");
    let q = a
        .except(
            &b,
            CompoundOptions {
                alias: Some("diff".into()),
                ..Default::default()
            },
        )
        .unwrap();
    let (inner, alias) = derived_source(&q);
    assert_eq!(alias, "diff");
    assert_eq!(
        inner.opts().compounds.as_ref().unwrap()[0].op,
        CompoundOp::Except
    );
}

#[test]
fn test_chained_unwrapped_compounds_accumulate() {
    let a = table(Dialect::Postgres, "a");
    let b = table(Dialect::Postgres, "b");
    let c = table(Dialect::Postgres, "c");
    let q = a
        .union(&b, CompoundOptions::default().unwrapped())
        .unwrap()
        .intersect(&c, CompoundOptions::default().unwrapped())
        .unwrap();
    let ops: Vec<CompoundOp> = q
        .opts()
        .compounds
        .iter()
        .flatten()
        .map(|c| c.op)
        .collect();
    assert_eq!(ops, vec![CompoundOp::Union, CompoundOp::Intersect]);
}

#[test]
fn test_right_operand_with_compounds_is_wrapped() {
    let a = table(Dialect::Postgres, "a");
    let b = table(Dialect::Postgres, "b");
    let c = table(Dialect::Postgres, "c");
    let bc = b.union(&c, CompoundOptions::default().unwrapped()).unwrap();

    let q = a.union(&bc, CompoundOptions::default().unwrapped()).unwrap();
    let right = &q.opts().compounds.as_ref().unwrap()[0].query;
    let (inner, alias) = derived_source(right);
    assert_eq!(alias, "t1");
    assert_eq!(inner, &bc);
    assert_eq!(right.opts().compounds, None);
}

#[test]
fn test_limited_operands_are_wrapped() {
    let a = table(Dialect::Postgres, "a").limit(5).unwrap();
    let b = table(Dialect::Postgres, "b").order([col("id")]);
    let q = a.union(&b, CompoundOptions::default().unwrapped()).unwrap();

    assert_eq!(q.opts().limit, None);
    let (left_inner, _) = derived_source(&q);
    assert_eq!(left_inner.opts().limit, Some(5));

    let right = &q.opts().compounds.as_ref().unwrap()[0].query;
    assert_eq!(right.opts().order, None);
    let (right_inner, _) = derived_source(right);
    assert_eq!(right_inner.opts().order, Some(vec![col("id")]));
}

#[test]
fn test_except_all_gated_by_dialect() {
    let a = table(Dialect::Snowflake, "a");
    let b = table(Dialect::Snowflake, "b");
    assert!(a.except(&b, false).is_ok());
    assert!(matches!(
        a.except(&b, true),
        Err(QueryError::Unsupported { .. })
    ));
    let pg = table(Dialect::Postgres, "a");
    assert!(pg.intersect(&pg, true).is_ok());
}

#[test]
fn test_with_adds_named_cte() {
    let recent = table(Dialect::Postgres, "orders")
        .filter(col("placed_at").gt(raw_sql("now() - interval '1 day'")))
        .unwrap();
    let q = table(Dialect::Postgres, "recent")
        .with("recent", &recent, CteOptions::columns(["id", "total"]))
        .unwrap();
    let ctes = q.opts().with.as_ref().unwrap();
    assert_eq!(ctes.len(), 1);
    assert_eq!(ctes[0].name, "recent");
    assert_eq!(ctes[0].query, recent);
    assert_eq!(
        ctes[0].columns,
        Some(vec!["id".to_string(), "total".to_string()])
    );
    assert!(!ctes[0].recursive);
}

#[test]
fn test_with_recursive_unions_seed_and_step() {
    let seed = table(Dialect::Postgres, "nodes")
        .filter(col("parent_id").is_null())
        .unwrap();
    let step = table(Dialect::Postgres, "nodes")
        .join("tree", JoinCondition::pairs([("parent_id", "id")]))
        .unwrap();
    let q = table(Dialect::Postgres, "tree")
        .with_recursive("tree", &seed, &step, CteOptions::default())
        .unwrap();

    let cte = &q.opts().with.as_ref().unwrap()[0];
    assert!(cte.recursive);
    assert_eq!(cte.query.opts().where_clause, seed.opts().where_clause);
    assert_eq!(
        cte.query.opts().compounds,
        Some(vec![Compound {
            op: CompoundOp::Union,
            query: step.clone(),
            all: true,
        }])
    );

    let distinct = table(Dialect::Postgres, "tree")
        .with_recursive(
            "tree",
            &seed,
            &step,
            CteOptions {
                union_all: false,
                ..Default::default()
            },
        )
        .unwrap();
    let cte = &distinct.opts().with.as_ref().unwrap()[0];
    assert!(!cte.query.opts().compounds.as_ref().unwrap()[0].all);
}

#[test]
fn test_nested_ctes_hoisted_in_from() {
    let inner = table(Dialect::TSql, "x")
        .with("c", &table(Dialect::TSql, "y"), CteOptions::default())
        .unwrap();
    let q = Query::new(Dialect::TSql).from([inner]);
    assert_eq!(q.opts().with.as_ref().map(Vec::len), Some(1));
    let (nested, _) = derived_source(&q);
    assert_eq!(nested.opts().with, None);

    let inner = table(Dialect::Postgres, "x")
        .with("c", &table(Dialect::Postgres, "y"), CteOptions::default())
        .unwrap();
    let q = Query::new(Dialect::Postgres).from([inner]);
    assert_eq!(q.opts().with, None);
    let (nested, _) = derived_source(&q);
    assert!(nested.opts().with.is_some());
}

#[test]
fn test_ctes_of_cte_query_are_lifted() {
    let base = table(Dialect::TSql, "x")
        .with("inner_c", &table(Dialect::TSql, "y"), CteOptions::default())
        .unwrap();
    let q = table(Dialect::TSql, "outer_c")
        .with("outer_c", &base, CteOptions::default())
        .unwrap();
    let names: Vec<&str> = q
        .opts()
        .with
        .iter()
        .flatten()
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(names, vec!["inner_c", "outer_c"]);
}
