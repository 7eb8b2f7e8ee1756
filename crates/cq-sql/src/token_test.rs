use super::*;
use crate::dialect::{MySqlDialect, PostgresDialect};

#[test]
fn test_render_concatenates_text() {
    let token = Token::stmt(vec![Token::str("SELECT "), Token::str("1")]);
    assert_eq!(token.render(&PostgresDialect::new()).sql, "SELECT 1");
}

#[test]
fn test_join_separates_tokens() {
    let token = Token::join(vec![Token::str("a"), Token::str("b"), Token::str("c")], ", ");
    assert_eq!(token.render(&PostgresDialect::new()).sql, "a, b, c");
}

#[test]
fn test_postgres_placeholders_are_numbered() {
    let token = Token::stmt(vec![
        Token::Param(BID::from("first")),
        Token::str(" AND "),
        Token::Param(BID::from("second")),
    ]);
    let rendered = token.render(&PostgresDialect::new());
    assert_eq!(rendered.sql, "$1 AND $2");
    let ids: Vec<_> = rendered.params.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["first", "second"]);
}

#[test]
fn test_question_mark_placeholders() {
    let token = Token::ValuesClause(vec![
        Token::Param(BID::from("a")),
        Token::Param(BID::from("b")),
    ]);
    assert_eq!(token.render(&MySqlDialect::new()).sql, "(?, ?)");
}

#[test]
fn test_sql_expression_marker_does_not_consume_placeholder() {
    let token = Token::stmt(vec![
        Token::SqlExpression(BID::from("frag")),
        Token::str(" = "),
        Token::Param(BID::from("v")),
    ]);
    let rendered = token.render(&PostgresDialect::new());
    assert_eq!(rendered.sql, "{{frag}} = $1");
    assert!(rendered.has_sql_expressions());
    assert_eq!(rendered.params[0].kind, ParamKind::SqlExpression);
    assert_eq!(rendered.params[1].kind, ParamKind::Value);
}

#[test]
fn test_set_contains() {
    let token = Token::SetContains {
        a: Box::new(Token::str("p.id")),
        op: "IN".to_string(),
        b: Box::new(Token::str("SELECT a.ownerId FROM Address a")),
    };
    assert_eq!(
        token.render(&PostgresDialect::new()).sql,
        "p.id IN (SELECT a.ownerId FROM Address a)"
    );
}
