use super::*;
use cq_core::test_utils::*;
use cq_core::JoinType;

fn reduce(q: &Query) -> Option<Query> {
    SymbolicReduction::apply(q, &FreshNames::default()).unwrap()
}

#[test]
fn test_flat_map_reassociates() {
    let b = person("b");
    let d = address("d");
    let e = Query::map(people(), person("x"), prop(&d, "city"));
    let q = Query::flat_map(Query::flat_map(people(), b.clone(), addresses()), d.clone(), e.clone());
    let expected = Query::flat_map(people(), b, Query::flat_map(addresses(), d, e));
    assert_eq!(reduce(&q), Some(expected));
}

#[test]
fn test_outer_filter_moves_into_body_source() {
    let b = person("b");
    let d = person("d");
    let a = address("a");
    let q = Query::flat_map(
        Query::filter(people(), b.clone(), gt(prop(&b, "age"), int(18))),
        d.clone(),
        Query::map(addresses(), a.clone(), prop(&a, "city")),
    );
    let expected = Query::flat_map(
        people(),
        d.clone(),
        Query::map(
            Query::filter(addresses(), a.clone(), gt(prop(&d, "age"), int(18))),
            a.clone(),
            prop(&a, "city"),
        ),
    );
    assert_eq!(reduce(&q), Some(expected));
}

#[test]
fn test_filter_stays_when_body_ends_in_join() {
    let b = person("b");
    let a = address("a");
    let q = Query::flat_map(
        Query::filter(people(), b.clone(), gt(prop(&b, "age"), int(18))),
        b.clone(),
        Query::flat_join(
            JoinType::Left,
            addresses(),
            a.clone(),
            Expr::eq(prop(&a, "ownerId"), prop(&b, "id")),
        ),
    );
    assert_eq!(reduce(&q), None);
}

#[test]
fn test_filter_stays_when_body_has_no_source() {
    let b = person("b");
    let q = Query::flat_map(
        Query::filter(people(), b.clone(), gt(prop(&b, "age"), int(18))),
        b.clone(),
        Query::flat_filter(boolean(true)),
    );
    assert_eq!(reduce(&q), None);
}

#[test]
fn test_distributes_over_union() {
    let d = person("d");
    let e = Query::map(addresses(), address("a"), prop(&d, "name"));
    let q = Query::flat_map(Query::union_all(people(), people()), d.clone(), e.clone());
    let expected = Query::union_all(
        Query::flat_map(people(), d.clone(), e.clone()),
        Query::flat_map(people(), d, e),
    );
    assert_eq!(reduce(&q), Some(expected));
}

#[test]
fn test_two_tail_joins_are_not_reassociated() {
    let p = person("p");
    let r = address("r");
    let b = address("b");
    let s = address("s");
    let joined = Query::flat_map(
        people(),
        p.clone(),
        Query::flat_join(
            JoinType::Inner,
            addresses(),
            r.clone(),
            Expr::eq(prop(&r, "ownerId"), prop(&p, "id")),
        ),
    );
    let q = Query::flat_map(
        Query::flat_map(joined, b.clone(), addresses()),
        s.clone(),
        Query::flat_join(
            JoinType::Inner,
            addresses(),
            s.clone(),
            Expr::eq(prop(&s, "city"), prop(&b, "city")),
        ),
    );
    assert_eq!(reduce(&q), None);
}

#[test]
fn test_other_shapes_are_ignored() {
    let p = person("p");
    assert_eq!(
        reduce(&Query::map(people(), p.clone(), prop(&p, "name"))),
        None
    );
}

#[test]
fn test_filter_over_bare_limit_gets_temporary_binder() {
    let b = person("b");
    let d = person("d");
    let q = Query::flat_map(
        Query::filter(people(), b.clone(), gt(prop(&b, "age"), int(18))),
        d.clone(),
        Query::take(addresses(), int(1)),
    );
    let fresh = FreshNames::default();
    fresh.next();
    let tmp = ident("[tmp_attachtoentity1]", address_type());
    let expected = Query::flat_map(
        people(),
        d.clone(),
        Query::take(
            Query::filter(addresses(), tmp, gt(prop(&d, "age"), int(18))),
            int(1),
        ),
    );
    assert_eq!(SymbolicReduction::apply(&q, &fresh).unwrap(), Some(expected));
}

#[test]
fn test_unreachable_table_declines_through_rewrite() {
    let b = person("b");
    let q = Query::flat_map(
        Query::filter(people(), b.clone(), gt(prop(&b, "age"), int(18))),
        b.clone(),
        Query::flat_filter(boolean(true)),
    );
    let rewritten = SymbolicReduction.rewrite(&q, &FreshNames::default()).unwrap();
    assert_eq!(rewritten, None);
}
