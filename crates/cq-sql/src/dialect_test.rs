use super::*;
use crate::error::SqlError;

#[test]
fn test_idiom_for_each_dialect() {
    assert_eq!(idiom_for(cq_core::Dialect::Postgres).name(), "postgres");
    assert_eq!(idiom_for(cq_core::Dialect::H2).name(), "h2");
    assert_eq!(idiom_for(cq_core::Dialect::Sqlite).name(), "sqlite");
    assert_eq!(idiom_for(cq_core::Dialect::MySql).name(), "mysql");
}

#[test]
fn test_placeholders() {
    assert_eq!(PostgresDialect::new().placeholder(3), "$3");
    assert_eq!(MySqlDialect::new().placeholder(3), "?");
    assert_eq!(SqliteDialect::new().placeholder(1), "?");
}

#[test]
fn test_alias_behavior() {
    assert_eq!(
        H2Dialect::new().table_alias_behavior(),
        TableAliasBehavior::UseAs
    );
    assert_eq!(
        PostgresDialect::new().table_alias_behavior(),
        TableAliasBehavior::SkipAs
    );
}

#[test]
fn test_offset_without_limit() {
    let render = |idiom: &dyn SqlIdiom| {
        idiom
            .limit_offset_token(None, Some(Token::str("5")))
            .map(|t| t.render(idiom).sql)
    };
    assert_eq!(render(&PostgresDialect::new()).as_deref(), Some(" OFFSET 5"));
    assert_eq!(
        render(&SqliteDialect::new()).as_deref(),
        Some(" LIMIT -1 OFFSET 5")
    );
    assert_eq!(
        render(&MySqlDialect::new()).as_deref(),
        Some(" LIMIT 18446744073709551615 OFFSET 5")
    );
}

#[test]
fn test_check_syntax_accepts_placeholders() {
    PostgresDialect::new()
        .check_syntax("SELECT p.name FROM Person p WHERE p.id = $1")
        .unwrap();
    MySqlDialect::new()
        .check_syntax("SELECT p.name FROM Person p WHERE p.id = ?")
        .unwrap();
}

#[test]
fn test_check_syntax_error_location() {
    let dialect = PostgresDialect::new();
    let result = dialect.check_syntax("SELECT p.name\nFROM Person p WHERE )");
    match result {
        Err(SqlError::InvalidSql {
            line, message, sql, ..
        }) => {
            assert_eq!(
                line, 2,
                "Expected line 2, got line {} (message: {})",
                line, message
            );
            assert_eq!(sql, "SELECT p.name\nFROM Person p WHERE )");
        }
        other => panic!("expected InvalidSql, got {:?}", other),
    }
}

#[test]
fn test_parse_location_extraction() {
    let (line, col) =
        crate::idiom::parse_location_from_error("Expected: something at Line: 5, Column: 10");
    assert_eq!(line, 5);
    assert_eq!(col, 10);

    let (line, col) = crate::idiom::parse_location_from_error("Some error without location");
    assert_eq!(line, 0);
    assert_eq!(col, 0);

    let (line, col) = crate::idiom::parse_location_from_error("at Line: 2 without a column");
    assert_eq!((line, col), (0, 0));
}
