use super::*;
use cq_core::test_utils::*;

#[test]
fn test_identity_map_removed() {
    let p = person("p");
    let q = Query::map(people(), p.clone(), Expr::ident(&p));
    assert_eq!(ApplyMap::apply(&q), Some(people()));
}

#[test]
fn test_identity_map_over_group_by_is_kept() {
    let p = person("p");
    let g = Query::group_by_map(
        people(),
        p.clone(),
        prop(&p, "age"),
        p.clone(),
        agg("max", prop(&p, "age")),
    );
    let x = ident("x", cq_core::XRType::Value);
    let q = Query::map(g, x.clone(), Expr::ident(&x));
    assert_eq!(ApplyMap::apply(&q), None);
}

#[test]
fn test_map_of_map_fuses() {
    let p = person("p");
    let n = ident("n", cq_core::XRType::Value);
    let q = Query::map(
        Query::map(people(), p.clone(), prop(&p, "name")),
        n.clone(),
        call("upper", Expr::ident(&n)),
    );
    assert_eq!(
        ApplyMap::apply(&q),
        Some(Query::map(people(), p.clone(), call("upper", prop(&p, "name"))))
    );
}

#[test]
fn test_impure_map_is_not_detached() {
    let p = person("p");
    let n = ident("n", cq_core::XRType::Value);
    let q = Query::filter(
        Query::map(people(), p.clone(), agg("max", prop(&p, "age"))),
        n.clone(),
        gt(Expr::ident(&n), int(3)),
    );
    assert_eq!(ApplyMap::apply(&q), None);
}

#[test]
fn test_filter_moves_before_map() {
    let p = person("p");
    let n = ident("n", cq_core::XRType::Value);
    let q = Query::filter(
        Query::map(people(), p.clone(), prop(&p, "age")),
        n.clone(),
        gt(Expr::ident(&n), int(18)),
    );
    let expected = Query::map(
        Query::filter(people(), p.clone(), gt(prop(&p, "age"), int(18))),
        p.clone(),
        prop(&p, "age"),
    );
    assert_eq!(ApplyMap::apply(&q), Some(expected));
}

#[test]
fn test_sort_through_distinct() {
    let p = person("p");
    let n = ident("n", cq_core::XRType::Value);
    let q = Query::sort_by(
        Query::distinct(Query::map(people(), p.clone(), prop(&p, "name"))),
        n.clone(),
        vec![asc(Expr::ident(&n))],
    );
    let expected = Query::distinct(Query::map(
        Query::sort_by(people(), p.clone(), vec![asc(prop(&p, "name"))]),
        p.clone(),
        prop(&p, "name"),
    ));
    assert_eq!(ApplyMap::apply(&q), Some(expected));
}

#[test]
fn test_distinct_reprojection_dropped() {
    let p = person("p");
    let n = ident("n", cq_core::XRType::Value);
    let inner = Query::map(people(), p.clone(), prop(&p, "name"));
    let q = Query::map(Query::distinct(inner.clone()), n.clone(), Expr::ident(&n));
    assert_eq!(ApplyMap::apply(&q), Some(Query::distinct(inner)));
}

#[test]
fn test_distinct_reprojection_of_tuple_fields_dropped() {
    let p = person("p");
    let t = ident("t", cq_core::XRType::Generic);
    let inner = Query::map(
        people(),
        p.clone(),
        tuple(vec![prop(&p, "name"), prop(&p, "age")]),
    );
    let q = Query::map(
        Query::distinct(inner.clone()),
        t.clone(),
        tuple(vec![prop(&t, "_1"), prop(&t, "_2")]),
    );
    assert_eq!(ApplyMap::apply(&q), Some(Query::distinct(inner)));
}

#[test]
fn test_narrowing_map_over_distinct_is_kept() {
    let p = person("p");
    let t = ident("t", cq_core::XRType::Generic);
    let inner = Query::map(
        people(),
        p.clone(),
        tuple(vec![prop(&p, "name"), prop(&p, "age")]),
    );
    let q = Query::map(Query::distinct(inner), t.clone(), prop(&t, "_1"));
    assert_eq!(ApplyMap::apply(&q), None);
}

#[test]
fn test_group_by_substitutes_both_bodies() {
    let p = person("p");
    let t = ident("t", cq_core::XRType::Generic);
    let q = Query::group_by_map(
        Query::map(
            people(),
            p.clone(),
            tuple(vec![prop(&p, "name"), prop(&p, "age")]),
        ),
        t.clone(),
        Expr::property(Expr::ident(&t), "_1"),
        t.clone(),
        agg("max", Expr::property(Expr::ident(&t), "_2")),
    );
    let expected = Query::group_by_map(
        people(),
        p.clone(),
        prop(&p, "name"),
        p.clone(),
        agg("max", prop(&p, "age")),
    );
    assert_eq!(ApplyMap::apply(&q), Some(expected));
}

#[test]
fn test_take_moves_before_map() {
    let p = person("p");
    let q = Query::take(Query::map(people(), p.clone(), prop(&p, "name")), int(5));
    let expected = Query::map(Query::take(people(), int(5)), p.clone(), prop(&p, "name"));
    assert_eq!(ApplyMap::apply(&q), Some(expected));
}

#[test]
fn test_map_over_flat_join_is_not_detachable() {
    let a = address("a");
    let p = person("p");
    let join = Query::flat_join(
        cq_core::JoinType::Inner,
        addresses(),
        a.clone(),
        Expr::eq(prop(&a, "ownerId"), prop(&p, "id")),
    );
    let m = Query::map(join, a.clone(), prop(&a, "city"));
    assert!(detachable_map(&m).is_none());
}

#[test]
fn test_take_stays_above_map_of_flat_map() {
    let p = person("p");
    let a = address("a");
    let fm = Query::flat_map(people(), p.clone(), addresses());
    let q = Query::take(Query::map(fm, a.clone(), prop(&a, "city")), int(5));
    assert_eq!(ApplyMap::apply(&q), None);
}
