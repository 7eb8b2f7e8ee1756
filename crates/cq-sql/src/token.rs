//! Rendered SQL fragments
//!
//! Idioms turn a [`SqlQuery`](crate::SqlQuery) into a [`Token`] tree.
//! Rendering the tree concatenates the text and replaces parameter tags with
//! the idiom's placeholders, recording each tag in output order.

use crate::idiom::SqlIdiom;
use cq_core::BID;

/// A piece of SQL text
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Literal text
    String(String),
    /// Tokens concatenated without separators
    Statement(Vec<Token>),
    /// `a op (b)`, used for `IN (subquery)`
    SetContains {
        /// Tested value
        a: Box<Token>,
        /// Operator text
        op: String,
        /// Set
        b: Box<Token>,
    },
    /// `(t1, t2, ...)`
    ValuesClause(Vec<Token>),
    /// A runtime parameter value
    Param(BID),
    /// A SQL fragment spliced in at runtime
    SqlExpression(BID),
}

/// How a recorded tag is bound at runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Bound to a placeholder
    Value,
    /// Replaces a `{{id}}` marker in the text
    SqlExpression,
}

/// One runtime binding in output order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSlot {
    /// Binding id
    pub id: BID,
    /// Binding kind
    pub kind: ParamKind,
}

/// SQL text with its bindings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedSql {
    /// SQL text
    pub sql: String,
    /// Bindings in output order
    pub params: Vec<ParamSlot>,
}

impl RenderedSql {
    /// True if the text still contains runtime SQL markers
    pub fn has_sql_expressions(&self) -> bool {
        self.params
            .iter()
            .any(|p| p.kind == ParamKind::SqlExpression)
    }
}

impl Token {
    /// Literal text
    pub fn str(text: impl Into<String>) -> Self {
        Token::String(text.into())
    }

    /// Concatenation
    pub fn stmt(tokens: Vec<Token>) -> Self {
        Token::Statement(tokens)
    }

    /// `tokens` separated by `separator`
    pub fn join(tokens: Vec<Token>, separator: &str) -> Self {
        let mut joined = Vec::with_capacity(tokens.len() * 2);
        for (i, token) in tokens.into_iter().enumerate() {
            if i > 0 {
                joined.push(Token::str(separator));
            }
            joined.push(token);
        }
        Token::Statement(joined)
    }

    /// `(token)`
    pub fn parens(token: Token) -> Self {
        Token::stmt(vec![Token::str("("), token, Token::str(")")])
    }

    /// Render with the placeholders of `idiom`
    pub fn render(&self, idiom: &dyn SqlIdiom) -> RenderedSql {
        let mut rendered = RenderedSql {
            sql: String::new(),
            params: Vec::new(),
        };
        self.render_into(idiom, &mut rendered);
        rendered
    }

    fn render_into(&self, idiom: &dyn SqlIdiom, out: &mut RenderedSql) {
        match self {
            Token::String(text) => out.sql.push_str(text),
            Token::Statement(tokens) => {
                for token in tokens {
                    token.render_into(idiom, out);
                }
            }
            Token::SetContains { a, op, b } => {
                a.render_into(idiom, out);
                out.sql.push(' ');
                out.sql.push_str(op);
                out.sql.push_str(" (");
                b.render_into(idiom, out);
                out.sql.push(')');
            }
            Token::ValuesClause(values) => {
                out.sql.push('(');
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        out.sql.push_str(", ");
                    }
                    value.render_into(idiom, out);
                }
                out.sql.push(')');
            }
            Token::Param(id) => {
                let index = out
                    .params
                    .iter()
                    .filter(|p| p.kind == ParamKind::Value)
                    .count()
                    + 1;
                out.sql.push_str(&idiom.placeholder(index));
                out.params.push(ParamSlot {
                    id: id.clone(),
                    kind: ParamKind::Value,
                });
            }
            Token::SqlExpression(id) => {
                out.sql.push_str(&format!("{{{{{}}}}}", id));
                out.params.push(ParamSlot {
                    id: id.clone(),
                    kind: ParamKind::SqlExpression,
                });
            }
        }
    }
}

#[cfg(test)]
#[path = "token_test.rs"]
mod tests;
