use super::*;
use cq_core::test_utils::*;
use cq_core::{UnaryOperator, XRType};

#[test]
fn test_union_branches_keep_their_names() {
    let x = person("x");
    let q = Query::union(
        Query::map(people(), x.clone(), prop(&x, "name")),
        Query::map(people(), x.clone(), prop(&x, "name")),
    );
    assert_eq!(AvoidAliasConflict::apply(&q, false), q);
}

#[test]
fn test_consumer_of_union_avoids_branch_names() {
    let x = person("x");
    let u = Query::union(
        Query::filter(people(), x.clone(), gt(prop(&x, "age"), int(1))),
        people(),
    );
    let q = Query::map(u.clone(), x.clone(), prop(&x, "name"));
    let x1 = person("x1");
    assert_eq!(
        AvoidAliasConflict::apply(&q, false),
        Query::map(u, x1.clone(), prop(&x1, "name"))
    );
}

#[test]
fn test_group_by_bodies_share_a_renamed_alias() {
    let p = person("p");
    let q = Query::flat_map(
        people(),
        p.clone(),
        Query::group_by_map(
            people(),
            p.clone(),
            prop(&p, "age"),
            p.clone(),
            agg("max", prop(&p, "age")),
        ),
    );
    let p1 = person("p1");
    assert_eq!(
        AvoidAliasConflict::apply(&q, false),
        Query::flat_map(
            people(),
            p.clone(),
            Query::group_by_map(
                people(),
                p1.clone(),
                prop(&p1, "age"),
                p1.clone(),
                agg("max", prop(&p1, "age")),
            ),
        )
    );
}

#[test]
fn test_nested_binder_renamed_and_substituted() {
    let x = person("x");
    let inner = Query::map(people(), x.clone(), prop(&x, "name"));
    let q = Query::flat_map(people(), x.clone(), inner);
    let renamed = AvoidAliasConflict::apply(&q, false);
    let x1 = person("x1");
    assert_eq!(
        renamed,
        Query::flat_map(
            people(),
            x.clone(),
            Query::map(people(), x1.clone(), prop(&x1, "name"))
        )
    );
    assert_unique_binders_on_paths(&renamed);
}

#[test]
fn test_subquery_in_filter_is_renamed() {
    let p = person("p");
    let sub = Query::filter(
        people(),
        p.clone(),
        gt(prop(&p, "age"), int(3)),
    );
    let q = Query::filter(
        people(),
        p.clone(),
        Expr::unary(UnaryOperator::NonEmpty, Expr::query(sub)),
    );
    let renamed = AvoidAliasConflict::apply(&q, false);
    assert_unique_binders_on_paths(&renamed);
    let p1 = person("p1");
    let expected = Query::filter(
        people(),
        p.clone(),
        Expr::unary(
            UnaryOperator::NonEmpty,
            Expr::query(Query::filter(people(), p1.clone(), gt(prop(&p1, "age"), int(3)))),
        ),
    );
    assert_eq!(renamed, expected);
}

#[test]
fn test_free_identifiers_are_not_captured() {
    let p = person("p");
    let o = person("o");
    let inner = Query::filter(people(), p.clone(), Expr::eq(prop(&p, "id"), prop(&o, "id")));
    let q = Query::filter(
        people(),
        o.clone(),
        Expr::and(
            Expr::eq(prop(&o, "id"), prop(&p, "id")),
            Expr::unary(UnaryOperator::NonEmpty, Expr::query(inner)),
        ),
    );
    let p1 = person("p1");
    let expected = Query::filter(
        people(),
        o.clone(),
        Expr::and(
            Expr::eq(prop(&o, "id"), prop(&p, "id")),
            Expr::unary(
                UnaryOperator::NonEmpty,
                Expr::query(Query::filter(
                    people(),
                    p1.clone(),
                    Expr::eq(prop(&p1, "id"), prop(&o, "id")),
                )),
            ),
        ),
    );
    assert_eq!(AvoidAliasConflict::apply(&q, false), expected);
}

#[test]
fn test_detemp_renames_temporaries() {
    let tmp = ident("[tmp_attachtoentity0]", XRType::Generic);
    let q = Query::sort_by(people(), tmp.clone(), vec![asc(Expr::ident(&tmp))]);
    let x = ident("x", XRType::Generic);
    assert_eq!(
        AvoidAliasConflict::apply(&q, true),
        Query::sort_by(people(), x.clone(), vec![asc(Expr::ident(&x))])
    );
    assert_eq!(AvoidAliasConflict::apply(&q, false), q);
}

#[test]
fn test_detemp_avoids_existing_x() {
    let tmp = ident("[tmp_attachtoentity0]", XRType::Generic);
    let x = ident("x", XRType::Generic);
    let q = Query::flat_map(
        people(),
        x.clone(),
        Query::filter(people(), tmp.clone(), Expr::eq(Expr::ident(&tmp), Expr::ident(&x))),
    );
    let x1 = ident("x1", XRType::Generic);
    assert_eq!(
        AvoidAliasConflict::apply(&q, true),
        Query::flat_map(
            people(),
            x.clone(),
            Query::filter(people(), x1.clone(), Expr::eq(Expr::ident(&x1), Expr::ident(&x))),
        )
    );
}

#[test]
fn test_select_clause_aliases_renamed() {
    let p = person("p");
    let select = cq_core::SelectClause {
        sources: vec![SelectSource::From {
            query: Query::map(people(), p.clone(), Expr::ident(&p)),
            alias: p.clone(),
        }],
        where_clause: Some(gt(prop(&p, "age"), int(1))),
        group_by: None,
        sort_by: Vec::new(),
        select: prop(&p, "name"),
    };
    let renamed = AvoidAliasConflict::apply(&Query::CustomQueryRef(Box::new(select)), false);
    assert_unique_binders_on_paths(&renamed);
    match renamed {
        Query::CustomQueryRef(select) => {
            let p1 = person("p1");
            assert_eq!(select.sources[0].alias(), &p1);
            assert_eq!(select.select, prop(&p1, "name"));
        }
        other => panic!("expected CustomQueryRef, got {}", other),
    }
}

#[test]
fn test_unaliased_detection() {
    assert!(is_unaliased(&people()));
    assert!(is_unaliased(&Query::take(Query::nested(people()), int(1))));
    let p = person("p");
    assert!(!is_unaliased(&Query::map(people(), p.clone(), Expr::ident(&p))));
}
