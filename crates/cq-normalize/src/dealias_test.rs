use super::*;
use cq_core::test_utils::*;
use cq_core::{JoinType, UnaryOperator, XRType};

#[test]
fn test_map_over_filter_shares_binder() {
    let x = person("x");
    let y = person("y");
    let q = Query::map(
        Query::filter(people(), x.clone(), gt(prop(&x, "age"), int(18))),
        y.clone(),
        prop(&y, "name"),
    );
    let expected = Query::map(
        Query::filter(people(), x.clone(), gt(prop(&x, "age"), int(18))),
        x.clone(),
        prop(&x, "name"),
    );
    assert_eq!(dealias(&q), expected);
}

#[test]
fn test_alias_is_retyped_to_consumer_binder() {
    let x = person("x");
    let v = ident("v", XRType::Value);
    let q = Query::filter(
        Query::map(people(), x.clone(), prop(&x, "age")),
        v.clone(),
        gt(Expr::ident(&v), int(3)),
    );
    match dealias(&q) {
        Query::Filter { id, body, .. } => {
            assert_eq!(id.name, "x");
            assert_eq!(id.ty, XRType::Value);
            assert_eq!(*body, gt(Expr::ident(&id), int(3)));
        }
        other => panic!("expected Filter, got {}", other),
    }
}

#[test]
fn test_alias_propagates_through_take() {
    let x = person("x");
    let y = person("y");
    let q = Query::sort_by(
        Query::take(
            Query::filter(people(), x.clone(), gt(prop(&x, "age"), int(1))),
            int(10),
        ),
        y.clone(),
        vec![asc(prop(&y, "name"))],
    );
    match dealias(&q) {
        Query::SortBy { id, criteria, .. } => {
            assert_eq!(id, x);
            assert_eq!(criteria, vec![asc(prop(&x, "name"))]);
        }
        other => panic!("expected SortBy, got {}", other),
    }
}

#[test]
fn test_union_and_distinct_reset_alias() {
    let x = person("x");
    let y = person("y");
    let filtered = Query::filter(people(), x.clone(), gt(prop(&x, "age"), int(1)));
    let over_union = Query::map(
        Query::union(filtered.clone(), people()),
        y.clone(),
        prop(&y, "name"),
    );
    assert_eq!(dealias(&over_union), over_union);
    let over_distinct = Query::map(Query::distinct(filtered), y.clone(), prop(&y, "name"));
    assert_eq!(dealias(&over_distinct), over_distinct);
}

#[test]
fn test_flat_join_exposes_its_binder() {
    let p = person("p");
    let a = address("a");
    let b = address("b");
    let join = Query::flat_join(
        JoinType::Inner,
        addresses(),
        a.clone(),
        Expr::eq(prop(&a, "ownerId"), prop(&p, "id")),
    );
    let q = Query::flat_map(
        people(),
        p.clone(),
        Query::map(join.clone(), b.clone(), prop(&b, "city")),
    );
    let expected = Query::flat_map(
        people(),
        p.clone(),
        Query::map(join, a.clone(), prop(&a, "city")),
    );
    assert_eq!(dealias(&q), expected);
}

#[test]
fn test_group_by_bodies_use_head_alias() {
    let x = person("x");
    let g = person("g");
    let m = person("m");
    let q = Query::group_by_map(
        Query::filter(people(), x.clone(), gt(prop(&x, "age"), int(1))),
        g.clone(),
        prop(&g, "name"),
        m.clone(),
        agg("max", prop(&m, "age")),
    );
    let expected = Query::group_by_map(
        Query::filter(people(), x.clone(), gt(prop(&x, "age"), int(1))),
        x.clone(),
        prop(&x, "name"),
        x.clone(),
        agg("max", prop(&x, "age")),
    );
    assert_eq!(dealias(&q), expected);
}

#[test]
fn test_nested_query_in_expression_is_dealiased() {
    let p = person("p");
    let x = address("x");
    let y = address("y");
    let sub = Query::map(
        Query::filter(
            addresses(),
            x.clone(),
            Expr::eq(prop(&x, "ownerId"), prop(&p, "id")),
        ),
        y.clone(),
        prop(&y, "city"),
    );
    let q = Query::filter(
        people(),
        p.clone(),
        Expr::unary(UnaryOperator::NonEmpty, Expr::query(sub)),
    );
    let expected_sub = Query::map(
        Query::filter(
            addresses(),
            x.clone(),
            Expr::eq(prop(&x, "ownerId"), prop(&p, "id")),
        ),
        x.clone(),
        prop(&x, "city"),
    );
    let expected = Query::filter(
        people(),
        p.clone(),
        Expr::unary(UnaryOperator::NonEmpty, Expr::query(expected_sub)),
    );
    assert_eq!(dealias(&q), expected);
}

#[test]
fn test_dealias_is_idempotent() {
    let x = person("x");
    let y = person("y");
    let z = person("z");
    let q = Query::map(
        Query::sort_by(
            Query::filter(people(), x.clone(), gt(prop(&x, "age"), int(18))),
            y.clone(),
            vec![asc(prop(&y, "age"))],
        ),
        z.clone(),
        prop(&z, "name"),
    );
    let once = dealias(&q);
    assert_eq!(dealias(&once), once);
}
