//! Concrete SQL idioms

use sqlparser::dialect::{
    Dialect, GenericDialect, MySqlDialect as SqlParserMySql, PostgreSqlDialect,
    SQLiteDialect as SqlParserSqlite,
};

use crate::idiom::{standard_limit_offset, SqlIdiom, TableAliasBehavior};
use crate::token::Token;

/// Largest row count MySQL accepts, used for `OFFSET` without `LIMIT`
const MYSQL_MAX_ROWS: &str = "18446744073709551615";

/// Idiom for a configured dialect
pub fn idiom_for(dialect: cq_core::Dialect) -> Box<dyn SqlIdiom> {
    match dialect {
        cq_core::Dialect::Postgres => Box::new(PostgresDialect::new()),
        cq_core::Dialect::H2 => Box::new(H2Dialect::new()),
        cq_core::Dialect::Sqlite => Box::new(SqliteDialect::new()),
        cq_core::Dialect::MySql => Box::new(MySqlDialect::new()),
    }
}

/// PostgreSQL idiom
pub struct PostgresDialect {
    dialect: PostgreSqlDialect,
}

impl PostgresDialect {
    /// Create a new PostgreSQL idiom
    pub fn new() -> Self {
        Self {
            dialect: PostgreSqlDialect {},
        }
    }
}

impl Default for PostgresDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlIdiom for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn parser_dialect(&self) -> &dyn Dialect {
        &self.dialect
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${}", index)
    }
}

/// H2 idiom
pub struct H2Dialect {
    dialect: GenericDialect,
}

impl H2Dialect {
    /// Create a new H2 idiom
    pub fn new() -> Self {
        Self {
            dialect: GenericDialect {},
        }
    }
}

impl Default for H2Dialect {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlIdiom for H2Dialect {
    fn name(&self) -> &'static str {
        "h2"
    }

    fn parser_dialect(&self) -> &dyn Dialect {
        &self.dialect
    }

    fn table_alias_behavior(&self) -> TableAliasBehavior {
        TableAliasBehavior::UseAs
    }
}

/// SQLite idiom
pub struct SqliteDialect {
    dialect: SqlParserSqlite,
}

impl SqliteDialect {
    /// Create a new SQLite idiom
    pub fn new() -> Self {
        Self {
            dialect: SqlParserSqlite {},
        }
    }
}

impl Default for SqliteDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlIdiom for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn parser_dialect(&self) -> &dyn Dialect {
        &self.dialect
    }

    fn boolean_literal(&self, value: bool) -> &'static str {
        if value {
            "1"
        } else {
            "0"
        }
    }

    fn limit_offset_token(&self, limit: Option<Token>, offset: Option<Token>) -> Option<Token> {
        match (limit, offset) {
            (None, Some(offset)) => Some(Token::stmt(vec![
                Token::str(" LIMIT -1 OFFSET "),
                offset,
            ])),
            (limit, offset) => standard_limit_offset(limit, offset),
        }
    }

    /// SQLite rejects parenthesized compound operands
    fn set_operand_token(&self, operand: Token) -> Token {
        Token::stmt(vec![Token::str("SELECT * FROM "), Token::parens(operand)])
    }
}

/// MySQL idiom
pub struct MySqlDialect {
    dialect: SqlParserMySql,
}

impl MySqlDialect {
    /// Create a new MySQL idiom
    pub fn new() -> Self {
        Self {
            dialect: SqlParserMySql {},
        }
    }
}

impl Default for MySqlDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlIdiom for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn parser_dialect(&self) -> &dyn Dialect {
        &self.dialect
    }

    fn string_concat_token(&self, a: Token, b: Token) -> Token {
        Token::stmt(vec![
            Token::str("CONCAT("),
            a,
            Token::str(", "),
            b,
            Token::str(")"),
        ])
    }

    fn limit_offset_token(&self, limit: Option<Token>, offset: Option<Token>) -> Option<Token> {
        match (limit, offset) {
            (None, Some(offset)) => Some(Token::stmt(vec![
                Token::str(format!(" LIMIT {} OFFSET ", MYSQL_MAX_ROWS)),
                offset,
            ])),
            (limit, offset) => standard_limit_offset(limit, offset),
        }
    }
}

#[cfg(test)]
#[path = "dialect_test.rs"]
mod tests;
