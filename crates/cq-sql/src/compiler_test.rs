use super::*;
use crate::error::SqlError;
use crate::token::ParamKind;
use cq_core::test_utils::*;
use cq_core::{CallType, Dialect, UnaryOperator, XRType, BID};
use sqlparser::dialect::{Dialect as ParserDialect, GenericDialect};

fn compiler(dialect: Dialect) -> QueryCompiler {
    QueryCompiler::new(CompileConfig {
        dialect,
        ..CompileConfig::default()
    })
}

fn size_of(q: Query) -> Expr {
    Expr::MethodCall {
        head: Box::new(Expr::query(q)),
        name: "size".to_string(),
        args: Vec::new(),
        call_type: CallType::QueryAggregator,
        ty: XRType::Value,
    }
}

#[test]
fn test_compile_filter() {
    let p = person("p");
    let q = Query::filter(people(), p.clone(), gt(prop(&p, "age"), int(18)));
    let compiled = compiler(Dialect::Postgres).compile(&q).unwrap();
    assert_eq!(compiled.sql, "SELECT p.* FROM Person p WHERE p.age > 18");
    assert!(compiled.params.is_empty());
}

#[test]
fn test_nested_filters_merge_into_one_where() {
    let b = person("b");
    let d = person("d");
    let q = Query::filter(
        Query::filter(people(), b.clone(), Expr::eq(prop(&b, "name"), string("s1"))),
        d.clone(),
        Expr::eq(prop(&d, "name"), string("s2")),
    );
    let compiled = compiler(Dialect::Postgres).compile(&q).unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT b.* FROM Person b WHERE b.name = 's1' AND b.name = 's2'"
    );
}

#[test]
fn test_params_listed_in_output_order() {
    let p = person("p");
    let q = Query::filter(
        people(),
        p.clone(),
        Expr::and(
            Expr::eq(prop(&p, "name"), param("name")),
            gt(prop(&p, "age"), param("age")),
        ),
    );
    let compiled = compiler(Dialect::MySql).compile(&q).unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT p.* FROM Person p WHERE p.name = ? AND p.age > ?"
    );
    let ids: Vec<&str> = compiled.params.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["name", "age"]);
    assert!(compiled.params.iter().all(|s| s.kind == ParamKind::Value));
}

#[test]
fn test_compile_size_expression() {
    let compiled = compiler(Dialect::Postgres)
        .compile_expr(&size_of(people()))
        .unwrap();
    assert_eq!(compiled.sql, "SELECT COUNT(*) FROM Person x");
}

#[test]
fn test_compile_non_empty_expression() {
    let e = Expr::unary(UnaryOperator::NonEmpty, Expr::query(people()));
    let compiled = compiler(Dialect::Postgres)
        .compile_xr(&XR::Expr(e))
        .unwrap();
    assert_eq!(compiled.sql, "SELECT EXISTS (SELECT x.* FROM Person x)");
}

#[test]
fn test_shadowed_binder_in_expression_keeps_outer_filter() {
    let x = person("x");
    let xa = address("x");
    let q = Query::flat_map(
        Query::filter(people(), x.clone(), gt(prop(&x, "age"), int(18))),
        x.clone(),
        Query::map(addresses(), xa.clone(), prop(&xa, "city")),
    );
    let compiler = compiler(Dialect::Postgres);
    let query_sql = compiler.compile(&q).unwrap().sql;
    let e = Expr::unary(UnaryOperator::NonEmpty, Expr::query(q));
    let compiled = compiler.compile_expr(&e).unwrap();
    assert_eq!(compiled.sql, format!("SELECT EXISTS ({})", query_sql));
    assert!(compiled.sql.contains("FROM Person x, "), "{}", compiled.sql);
    assert!(compiled.sql.ends_with("WHERE x.age > 18)"), "{}", compiled.sql);
}

#[test]
fn test_default_alias_from_config() {
    let compiler = QueryCompiler::new(CompileConfig {
        default_alias: "t".to_string(),
        ..CompileConfig::default()
    });
    let compiled = compiler.compile(&people()).unwrap();
    assert_eq!(compiled.sql, "SELECT t.* FROM Person t");
}

#[test]
fn test_runtime_bind_is_rejected() {
    let q = Query::RuntimeQueryBind {
        id: BID::from("dynamic"),
        ty: person_type(),
    };
    assert!(matches!(
        compiler(Dialect::Postgres).compile(&q),
        Err(SqlError::NotNormalized { .. })
    ));
}

#[test]
fn test_verify_sql_accepts_generated_sql() {
    let p = person("p");
    let q = Query::filter(people(), p.clone(), Expr::eq(prop(&p, "name"), param("n")));
    for dialect in [Dialect::Postgres, Dialect::H2, Dialect::Sqlite, Dialect::MySql] {
        let compiler = QueryCompiler::new(CompileConfig {
            dialect,
            verify_sql: true,
            ..CompileConfig::default()
        });
        assert!(compiler.compile(&q).is_ok(), "{} rejected its own SQL", dialect);
    }
}

#[test]
fn test_verify_sql_skips_runtime_fragments() {
    let p = person("p");
    let q = Query::filter(
        people(),
        p.clone(),
        Expr::TagForSqlExpression {
            id: BID::from("extra"),
            ty: XRType::BooleanExpression,
        },
    );
    let compiler = QueryCompiler::new(CompileConfig {
        verify_sql: true,
        ..CompileConfig::default()
    });
    let compiled = compiler.compile(&q).unwrap();
    assert_eq!(compiled.sql, "SELECT p.* FROM Person p WHERE {{extra}}");
    assert_eq!(compiled.params[0].kind, ParamKind::SqlExpression);
}

/// Idiom whose boolean literals cannot parse
struct Unbalanced {
    dialect: GenericDialect,
}

impl SqlIdiom for Unbalanced {
    fn name(&self) -> &'static str {
        "unbalanced"
    }

    fn parser_dialect(&self) -> &dyn ParserDialect {
        &self.dialect
    }

    fn boolean_literal(&self, _value: bool) -> &'static str {
        ")"
    }
}

#[test]
fn test_verify_sql_reports_invalid_sql() {
    let p = person("p");
    let q = Query::map(people(), p.clone(), boolean(true));
    let compiler = QueryCompiler::with_idiom(
        CompileConfig {
            verify_sql: true,
            ..CompileConfig::default()
        },
        Box::new(Unbalanced {
            dialect: GenericDialect {},
        }),
    );
    match compiler.compile(&q) {
        Err(SqlError::InvalidSql { sql, .. }) => assert_eq!(sql, "SELECT ) FROM Person p"),
        other => panic!("expected InvalidSql, got {:?}", other.map(|c| c.sql)),
    }
}

#[test]
fn test_with_idiom_ignores_configured_dialect() {
    let compiler = QueryCompiler::with_idiom(
        CompileConfig {
            dialect: Dialect::MySql,
            ..CompileConfig::default()
        },
        Box::new(crate::dialect::H2Dialect::new()),
    );
    assert_eq!(compiler.idiom().name(), "h2");
    assert_eq!(compiler.config().dialect, Dialect::MySql);
}
