//! Dialect-parameterized SQL rendering
//!
//! [`SqlIdiom`] bundles what differs between databases (placeholders,
//! literals, `LIMIT`/`OFFSET` spelling) with one overridable rendering
//! method per SQL model shape. The defaults live in [`crate::render`].

use sqlparser::dialect::Dialect;
use sqlparser::parser::Parser;

use crate::error::{SqlError, SqlResult};
use crate::flatten::SqlQueryApply;
use crate::model::{FlattenSqlQuery, FromContext, OrderByCriteria, SelectValue, SqlQuery};
use crate::render;
use crate::token::Token;
use cq_core::Expr;

/// Whether source aliases are written with `AS`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableAliasBehavior {
    /// `Person p`
    SkipAs,
    /// `Person AS p`
    UseAs,
}

/// Trait for SQL dialect renderers
pub trait SqlIdiom: Send + Sync {
    /// Get the dialect name
    fn name(&self) -> &'static str;

    /// Get the underlying sqlparser dialect
    fn parser_dialect(&self) -> &dyn Dialect;

    /// Placeholder text for the `index`-th (1-based) parameter
    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    /// Function that unnests a collection into rows
    fn concat_function(&self) -> &'static str {
        "UNNEST"
    }

    /// How source aliases are written
    fn table_alias_behavior(&self) -> TableAliasBehavior {
        TableAliasBehavior::SkipAs
    }

    /// Boolean literal text
    fn boolean_literal(&self, value: bool) -> &'static str {
        if value {
            "TRUE"
        } else {
            "FALSE"
        }
    }

    /// String concatenation of two operands
    fn string_concat_token(&self, a: Token, b: Token) -> Token {
        Token::stmt(vec![a, Token::str(" || "), b])
    }

    /// Trailing `LIMIT`/`OFFSET` clause, with its leading space
    fn limit_offset_token(&self, limit: Option<Token>, offset: Option<Token>) -> Option<Token> {
        standard_limit_offset(limit, offset)
    }

    /// One operand of `UNION`
    fn set_operand_token(&self, operand: Token) -> Token {
        Token::parens(operand)
    }

    /// Parse `sql` back with this dialect's parser
    fn check_syntax(&self, sql: &str) -> SqlResult<()> {
        Parser::parse_sql(self.parser_dialect(), sql)
            .map(|_| ())
            .map_err(|e| {
                let message = e.to_string();
                let (line, column) = parse_location_from_error(&message);
                SqlError::InvalidSql {
                    message,
                    line,
                    column,
                    sql: sql.to_string(),
                }
            })
    }

    /// Render a whole query
    fn token_query(&self, q: &SqlQuery, apply: &SqlQueryApply) -> SqlResult<Token> {
        render::query(self, q, apply)
    }

    /// Render one select
    fn token_flatten(&self, q: &FlattenSqlQuery, apply: &SqlQueryApply) -> SqlResult<Token> {
        render::flatten(self, q, apply)
    }

    /// Render one row source
    fn token_from(&self, from: &FromContext, apply: &SqlQueryApply) -> SqlResult<Token> {
        render::from(self, from, apply)
    }

    /// Render one selected value
    fn token_select_value(&self, value: &SelectValue, apply: &SqlQueryApply) -> SqlResult<Token> {
        render::select_value(self, value, apply)
    }

    /// Render one sort key
    fn token_order_by(&self, c: &OrderByCriteria, apply: &SqlQueryApply) -> SqlResult<Token> {
        render::order_by(self, c, apply)
    }

    /// Render a scalar expression
    fn token_expr(&self, e: &Expr, apply: &SqlQueryApply) -> SqlResult<Token> {
        render::expr(self, e, apply)
    }
}

/// `LIMIT n`, `OFFSET m` or `LIMIT n OFFSET m`, with a leading space
pub fn standard_limit_offset(limit: Option<Token>, offset: Option<Token>) -> Option<Token> {
    match (limit, offset) {
        (None, None) => None,
        (Some(limit), None) => Some(Token::stmt(vec![Token::str(" LIMIT "), limit])),
        (None, Some(offset)) => Some(Token::stmt(vec![Token::str(" OFFSET "), offset])),
        (Some(limit), Some(offset)) => Some(Token::stmt(vec![
            Token::str(" LIMIT "),
            limit,
            Token::str(" OFFSET "),
            offset,
        ])),
    }
}

/// Line and column named by a sqlparser error, or `(0, 0)` when the
/// message has none
pub(crate) fn parse_location_from_error(msg: &str) -> (usize, usize) {
    match (number_after(msg, "Line: "), number_after(msg, "Column: ")) {
        (Some(line), Some(column)) => (line, column),
        _ => (0, 0),
    }
}

fn number_after(msg: &str, label: &str) -> Option<usize> {
    let rest = &msg[msg.find(label)? + label.len()..];
    let digits = rest
        .find(|c: char| !c.is_ascii_digit())
        .map_or(rest, |end| &rest[..end]);
    digits.parse().ok()
}
