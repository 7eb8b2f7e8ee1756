//! End-to-end normalization scenarios: rewrite fixtures, idempotence,
//! termination, alpha-renaming safety and dealias canonicality

use cq_core::test_utils::*;
use cq_core::{CompileConfig, Expr, JoinType, Query, UnaryOperator, XRType};
use cq_normalize::{
    attach_to_entity, dealias, AvoidAliasConflict, FreshNames, NormalizeError, Normalizer,
};

fn normalizer() -> Normalizer {
    Normalizer::new(&CompileConfig::default())
}

fn battery() -> Vec<Query> {
    let p = person("p");
    let q = person("q");
    let a = address("a");
    let a2 = address("a2");
    let n = ident("n", XRType::Value);
    let t = ident("t", XRType::Generic);
    let u = person("u");
    vec![
        Query::map(
            Query::filter(people(), p.clone(), gt(prop(&p, "age"), int(18))),
            q.clone(),
            prop(&q, "name"),
        ),
        Query::flat_map(
            people(),
            p.clone(),
            Query::map(
                Query::filter(
                    addresses(),
                    a.clone(),
                    Expr::eq(prop(&a, "ownerId"), prop(&p, "id")),
                ),
                a2.clone(),
                tuple(vec![prop(&p, "name"), prop(&a2, "city")]),
            ),
        ),
        Query::sort_by(
            Query::map(people(), p.clone(), prop(&p, "name")),
            n.clone(),
            vec![asc(Expr::ident(&n))],
        ),
        Query::take(
            Query::map(
                Query::flat_map(people(), p.clone(), addresses()),
                a.clone(),
                prop(&a, "city"),
            ),
            int(3),
        ),
        Query::flat_map(
            Query::filter(people(), p.clone(), gt(prop(&p, "age"), int(1))),
            p.clone(),
            Query::map(
                addresses(),
                a.clone(),
                tuple(vec![prop(&p, "name"), prop(&a, "city")]),
            ),
        ),
        Query::map(
            Query::union(
                Query::filter(people(), p.clone(), gt(prop(&p, "age"), int(1))),
                Query::filter(people(), q.clone(), gt(prop(&q, "age"), int(60))),
            ),
            u.clone(),
            prop(&u, "name"),
        ),
        Query::group_by_map(
            Query::map(
                people(),
                p.clone(),
                tuple(vec![prop(&p, "name"), prop(&p, "age")]),
            ),
            t.clone(),
            Expr::property(Expr::ident(&t), "_1"),
            t.clone(),
            tuple(vec![
                Expr::property(Expr::ident(&t), "_1"),
                agg("max", Expr::property(Expr::ident(&t), "_2")),
            ]),
        ),
        Query::flat_map(
            people(),
            p.clone(),
            Query::map(
                Query::flat_join(
                    JoinType::Left,
                    addresses(),
                    a.clone(),
                    Expr::eq(prop(&a, "ownerId"), prop(&p, "id")),
                ),
                a2.clone(),
                tuple(vec![prop(&p, "name"), prop(&a2, "city")]),
            ),
        ),
        Query::filter(
            people(),
            p.clone(),
            Expr::unary(
                UnaryOperator::NonEmpty,
                Expr::query(Query::filter(
                    addresses(),
                    a.clone(),
                    Expr::eq(prop(&a, "ownerId"), prop(&p, "id")),
                )),
            ),
        ),
        Query::flat_map(
            Query::union(people(), people()),
            p.clone(),
            Query::map(addresses(), a.clone(), prop(&a, "city")),
        ),
    ]
}

#[test]
fn test_apply_map_fixture() {
    let y = person("y");
    let s = ident("s", XRType::Value);
    let z = person("z");
    let q = Query::flat_map(
        Query::map(people(), y.clone(), prop(&y, "name")),
        s.clone(),
        Query::filter(
            people(),
            z.clone(),
            Expr::eq(prop(&z, "name"), Expr::ident(&s)),
        ),
    );
    let expected = Query::flat_map(
        people(),
        y.clone(),
        Query::filter(
            people(),
            z.clone(),
            Expr::eq(prop(&z, "name"), prop(&y, "name")),
        ),
    );
    assert_eq!(normalizer().normalize(&q).unwrap(), expected);
}

#[test]
fn test_symbolic_reduction_fixture() {
    let b = person("b");
    let d = address("d");
    let x = person("x");
    let e = Query::filter(
        people(),
        x.clone(),
        Expr::eq(prop(&x, "id"), prop(&d, "ownerId")),
    );
    let q = Query::flat_map(
        Query::flat_map(people(), b.clone(), addresses()),
        d.clone(),
        e.clone(),
    );
    let expected = Query::flat_map(people(), b, Query::flat_map(addresses(), d, e));
    assert_eq!(normalizer().normalize(&q).unwrap(), expected);
}

#[test]
fn test_order_terms_fixture() {
    let b = person("b");
    let d = person("d");
    let q = Query::filter(
        Query::sort_by(people(), b.clone(), vec![asc(prop(&b, "name"))]),
        d.clone(),
        Expr::eq(prop(&d, "name"), string("s1")),
    );
    let expected = Query::sort_by(
        Query::filter(people(), b.clone(), Expr::eq(prop(&b, "name"), string("s1"))),
        b.clone(),
        vec![asc(prop(&b, "name"))],
    );
    assert_eq!(normalizer().normalize(&q).unwrap(), expected);
}

#[test]
fn test_attach_to_entity_fixture() {
    let t = person("t");
    let q = Query::map(
        Query::filter(people(), t.clone(), Expr::eq(prop(&t, "id"), int(1))),
        t.clone(),
        prop(&t, "name"),
    );
    let splice = |source: Query, id: cq_core::Ident| Query::sort_by(source, id, vec![asc(int(1))]);
    let expected = Query::map(
        Query::filter(
            Query::sort_by(people(), t.clone(), vec![asc(int(1))]),
            t.clone(),
            Expr::eq(prop(&t, "id"), int(1)),
        ),
        t.clone(),
        prop(&t, "name"),
    );
    assert_eq!(attach_to_entity(&splice, None, &q, &FreshNames::default()).unwrap(), expected);
}

#[test]
fn test_normalize_is_idempotent() {
    let normalizer = normalizer();
    for q in battery() {
        let once = normalizer.normalize(&q).unwrap();
        let twice = normalizer.normalize(&once).unwrap();
        assert_eq!(twice, once, "normalizing {} twice changed it", q);
    }
}

#[test]
fn test_normalize_terminates_well_below_cap() {
    let config = CompileConfig {
        max_normalize_iterations: 50,
        ..CompileConfig::default()
    };
    let normalizer = Normalizer::new(&config);
    for q in battery() {
        if let Err(NormalizeError::FixpointDiverged { .. }) = normalizer.normalize(&q) {
            panic!("normalization of {} did not converge", q);
        }
    }
}

#[test]
fn test_alias_conflicts_are_removed() {
    for q in battery() {
        let renamed = AvoidAliasConflict::apply(&q, false);
        assert_unique_binders_on_paths(&renamed);
    }
}

#[test]
fn test_alias_conflicts_removed_in_nested_reuse() {
    let x = person("x");
    let q = Query::flat_map(
        Query::filter(people(), x.clone(), gt(prop(&x, "age"), int(1))),
        x.clone(),
        Query::flat_map(
            people(),
            x.clone(),
            Query::map(people(), x.clone(), prop(&x, "name")),
        ),
    );
    assert_unique_binders_on_paths(&AvoidAliasConflict::apply(&q, false));
}

#[test]
fn test_dealias_makes_chain_binders_identical() {
    let x = person("x");
    let y = person("y");
    let q = Query::map(
        Query::filter(people(), x.clone(), gt(prop(&x, "age"), int(18))),
        y.clone(),
        prop(&y, "name"),
    );
    match dealias(&q) {
        Query::Map { head, id: outer, .. } => match *head {
            Query::Filter { id: inner, .. } => assert_eq!(outer, inner),
            other => panic!("expected Filter, got {}", other),
        },
        other => panic!("expected Map, got {}", other),
    }
}
