//! End-to-end compilation scenarios: chain flattening, join rendering,
//! dialect round-trips through sqlparser and file-based configuration

use cq_core::test_utils::*;
use cq_core::{CompileConfig, Dialect, Expr, JoinType, Ordering, OrderField, Query, UnaryOperator};
use cq_sql::{FromContext, QueryCompiler, SqlQuery};
use tempfile::TempDir;

fn compiler(dialect: Dialect) -> QueryCompiler {
    QueryCompiler::new(CompileConfig {
        dialect,
        verify_sql: true,
        ..CompileConfig::default()
    })
}

fn two_table_chain() -> Query {
    let p = person("p");
    let a = address("a");
    let a2 = address("a2");
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
    )
}

fn left_join_chain() -> Query {
    let p = person("p");
    let a = address("a");
    let a2 = address("a2");
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
    )
}

fn battery() -> Vec<Query> {
    let p = person("p");
    let q = person("q");
    let a = address("a");
    vec![
        Query::filter(people(), p.clone(), gt(prop(&p, "age"), int(18))),
        Query::map(
            Query::filter(people(), p.clone(), gt(prop(&p, "age"), int(18))),
            q.clone(),
            prop(&q, "name"),
        ),
        two_table_chain(),
        left_join_chain(),
        Query::take(Query::drop(people(), int(5)), int(10)),
        Query::drop(people(), int(5)),
        Query::sort_by(
            people(),
            p.clone(),
            vec![
                asc(prop(&p, "name")),
                OrderField::new(prop(&p, "age"), Ordering::Desc),
            ],
        ),
        Query::group_by_map(
            people(),
            p.clone(),
            prop(&p, "name"),
            p.clone(),
            tuple(vec![prop(&p, "name"), agg("max", prop(&p, "age"))]),
        ),
        Query::distinct(Query::map(people(), p.clone(), prop(&p, "name"))),
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
        Query::union(
            Query::filter(people(), p.clone(), gt(prop(&p, "age"), int(60))),
            Query::filter(people(), q.clone(), Expr::eq(prop(&q, "name"), param("name"))),
        ),
    ]
}

#[test]
fn test_two_table_flat_map_is_one_select() {
    let compiler = compiler(Dialect::Postgres);
    match compiler.to_sql_query(&two_table_chain()).unwrap() {
        SqlQuery::Flatten(select) => {
            assert_eq!(select.from.len(), 2);
            assert!(select
                .from
                .iter()
                .all(|f| matches!(f, FromContext::Table { .. })));
            assert!(select.where_clause.is_some());
        }
        other => panic!("expected a single select, got {:?}", other),
    }
    assert_eq!(
        compiler.compile(&two_table_chain()).unwrap().sql,
        "SELECT p.name AS _1, a.city AS _2 FROM Person p, Address a WHERE a.ownerId = p.id"
    );
}

#[test]
fn test_left_join_is_rendered_as_join() {
    assert_eq!(
        compiler(Dialect::Postgres)
            .compile(&left_join_chain())
            .unwrap()
            .sql,
        "SELECT p.name AS _1, a.city AS _2 FROM Person p LEFT JOIN Address a ON a.ownerId = p.id"
    );
}

#[test]
fn test_projection_after_filter_uses_filter_alias() {
    let p = person("p");
    let q = person("q");
    let query = Query::map(
        Query::filter(people(), p.clone(), gt(prop(&p, "age"), int(18))),
        q.clone(),
        prop(&q, "name"),
    );
    assert_eq!(
        compiler(Dialect::Postgres).compile(&query).unwrap().sql,
        "SELECT p.name FROM Person p WHERE p.age > 18"
    );
}

#[test]
fn test_every_dialect_parses_generated_sql() {
    for dialect in [Dialect::Postgres, Dialect::H2, Dialect::Sqlite, Dialect::MySql] {
        let compiler = compiler(dialect);
        for q in battery() {
            if let Err(e) = compiler.compile(&q) {
                panic!("{} failed to compile {}: {}", dialect, q, e);
            }
        }
    }
}

#[test]
fn test_compilation_is_deterministic() {
    let compiler = compiler(Dialect::Postgres);
    for q in battery() {
        let first = compiler.compile(&q).unwrap();
        let second = compiler.compile(&q).unwrap();
        assert_eq!(first.sql, second.sql);
        assert_eq!(first.params, second.params);
    }
}

#[test]
fn test_config_file_selects_dialect() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("compile.yml");
    std::fs::write(&path, "dialect: mysql\nverify_sql: true\n").unwrap();

    let config = CompileConfig::load(&path).unwrap();
    assert_eq!(config.dialect, Dialect::MySql);

    let p = person("p");
    let q = Query::filter(people(), p.clone(), Expr::eq(prop(&p, "name"), param("name")));
    let compiled = QueryCompiler::new(config).compile(&q).unwrap();
    assert_eq!(compiled.sql, "SELECT p.* FROM Person p WHERE p.name = ?");
    assert_eq!(compiled.params.len(), 1);
}
