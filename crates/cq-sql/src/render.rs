//! Default rendering of the SQL model
//!
//! Every function takes the idiom it renders for and calls back through it,
//! so a dialect that overrides one shape changes it everywhere it nests.

use crate::error::{SqlError, SqlResult};
use crate::flatten::SqlQueryApply;
use crate::idiom::{SqlIdiom, TableAliasBehavior};
use crate::model::{
    DistinctKind, FlattenSqlQuery, FromContext, OrderByCriteria, SelectValue, SetOperation,
    SqlQuery, SqlUnaryOperator,
};
use crate::token::Token;
use cq_core::{
    BinaryOperator, CallType, Const, Expr, Infix, JoinType, Ordering, UnaryOperator, XrError, XR,
};

pub(crate) fn query<I: SqlIdiom + ?Sized>(
    idiom: &I,
    q: &SqlQuery,
    apply: &SqlQueryApply,
) -> SqlResult<Token> {
    match q {
        SqlQuery::Flatten(f) => idiom.token_flatten(f, apply),
        SqlQuery::SetOperation { a, op, b } => Ok(Token::stmt(vec![
            idiom.set_operand_token(idiom.token_query(a, apply)?),
            Token::str(match op {
                SetOperation::Union => " UNION ",
                SetOperation::UnionAll => " UNION ALL ",
            }),
            idiom.set_operand_token(idiom.token_query(b, apply)?),
        ])),
        SqlQuery::UnaryOperation { op, query } => Ok(Token::stmt(vec![
            Token::str(match op {
                SqlUnaryOperator::Exists => "SELECT EXISTS ",
                SqlUnaryOperator::NotExists => "SELECT NOT EXISTS ",
            }),
            Token::parens(idiom.token_query(query, apply)?),
        ])),
    }
}

pub(crate) fn flatten<I: SqlIdiom + ?Sized>(
    idiom: &I,
    q: &FlattenSqlQuery,
    apply: &SqlQueryApply,
) -> SqlResult<Token> {
    let mut parts = vec![Token::str("SELECT ")];

    match &q.distinct {
        DistinctKind::None => {}
        DistinctKind::Distinct => parts.push(Token::str("DISTINCT ")),
        DistinctKind::DistinctOn(keys) => {
            let keys = keys
                .iter()
                .map(|k| idiom.token_expr(k, apply))
                .collect::<SqlResult<Vec<_>>>()?;
            parts.push(Token::str("DISTINCT ON "));
            parts.push(Token::ValuesClause(keys));
            parts.push(Token::str(" "));
        }
    }

    if q.select.is_empty() {
        parts.push(Token::str("*"));
    } else {
        let values = q
            .select
            .iter()
            .map(|v| idiom.token_select_value(v, apply))
            .collect::<SqlResult<Vec<_>>>()?;
        parts.push(Token::join(values, ", "));
    }

    for (i, source) in q.from.iter().enumerate() {
        let separator = match (i, source) {
            (0, _) => " FROM ",
            (_, FromContext::FlatJoin { .. }) => " ",
            _ => ", ",
        };
        parts.push(Token::str(separator));
        parts.push(idiom.token_from(source, apply)?);
    }

    if let Some(predicate) = &q.where_clause {
        parts.push(Token::str(" WHERE "));
        parts.push(idiom.token_expr(predicate, apply)?);
    }

    if let Some(key) = &q.group_by {
        let keys: Vec<&Expr> = match key {
            Expr::Product { fields, .. } => fields.iter().map(|(_, e)| e).collect(),
            key => vec![key],
        };
        let keys = keys
            .into_iter()
            .map(|k| idiom.token_expr(k, apply))
            .collect::<SqlResult<Vec<_>>>()?;
        parts.push(Token::str(" GROUP BY "));
        parts.push(Token::join(keys, ", "));
    }

    if !q.order_by.is_empty() {
        let criteria = q
            .order_by
            .iter()
            .map(|c| idiom.token_order_by(c, apply))
            .collect::<SqlResult<Vec<_>>>()?;
        parts.push(Token::str(" ORDER BY "));
        parts.push(Token::join(criteria, ", "));
    }

    let limit = q
        .limit
        .as_ref()
        .map(|e| idiom.token_expr(e, apply))
        .transpose()?;
    let offset = q
        .offset
        .as_ref()
        .map(|e| idiom.token_expr(e, apply))
        .transpose()?;
    parts.extend(idiom.limit_offset_token(limit, offset));

    Ok(Token::stmt(parts))
}

fn aliased<I: SqlIdiom + ?Sized>(idiom: &I, source: Token, alias: &str) -> Token {
    let separator = match idiom.table_alias_behavior() {
        TableAliasBehavior::SkipAs => " ",
        TableAliasBehavior::UseAs => " AS ",
    };
    Token::stmt(vec![source, Token::str(separator), Token::str(alias)])
}

pub(crate) fn from<I: SqlIdiom + ?Sized>(
    idiom: &I,
    source: &FromContext,
    apply: &SqlQueryApply,
) -> SqlResult<Token> {
    Ok(match source {
        FromContext::Table { entity, alias } => aliased(idiom, Token::str(entity), alias),
        FromContext::Query { query, alias } => {
            aliased(idiom, Token::parens(idiom.token_query(query, apply)?), alias)
        }
        FromContext::Infix { infix, alias } => {
            aliased(idiom, Token::parens(infix_token(idiom, infix, apply)?), alias)
        }
        FromContext::FlatJoin {
            join_type,
            from,
            on,
        } => Token::stmt(vec![
            Token::str(match join_type {
                JoinType::Inner => "INNER JOIN ",
                JoinType::Left => "LEFT JOIN ",
            }),
            idiom.token_from(from, apply)?,
            Token::str(" ON "),
            idiom.token_expr(on, apply)?,
        ]),
    })
}

pub(crate) fn select_value<I: SqlIdiom + ?Sized>(
    idiom: &I,
    value: &SelectValue,
    apply: &SqlQueryApply,
) -> SqlResult<Token> {
    let token = if value.is_row() {
        match &value.expr {
            Expr::Ident(id) => Token::str(format!("{}.*", id.name)),
            other => idiom.token_expr(other, apply)?,
        }
    } else {
        idiom.token_expr(&value.expr, apply)?
    };
    let token = if value.concat {
        Token::stmt(vec![
            Token::str(idiom.concat_function()),
            Token::parens(token),
        ])
    } else {
        token
    };
    Ok(match &value.alias {
        Some(alias) => Token::stmt(vec![token, Token::str(" AS "), Token::str(alias)]),
        None => token,
    })
}

pub(crate) fn order_by<I: SqlIdiom + ?Sized>(
    idiom: &I,
    c: &OrderByCriteria,
    apply: &SqlQueryApply,
) -> SqlResult<Token> {
    let direction = match c.ordering {
        Ordering::Asc => " ASC",
        Ordering::Desc => " DESC",
        Ordering::AscNullsFirst => " ASC NULLS FIRST",
        Ordering::DescNullsFirst => " DESC NULLS FIRST",
        Ordering::AscNullsLast => " ASC NULLS LAST",
        Ordering::DescNullsLast => " DESC NULLS LAST",
    };
    Ok(Token::stmt(vec![
        idiom.token_expr(&c.expr, apply)?,
        Token::str(direction),
    ]))
}

pub(crate) fn expr<I: SqlIdiom + ?Sized>(
    idiom: &I,
    e: &Expr,
    apply: &SqlQueryApply,
) -> SqlResult<Token> {
    match e {
        Expr::Ident(id) if id.ty.is_scalar() => Ok(Token::str(format!(
            "{}.{}",
            id.name,
            crate::flatten::VALUE_COLUMN
        ))),
        Expr::Ident(id) => Ok(Token::str(&id.name)),
        Expr::Property { .. } => property(idiom, e, apply),
        Expr::Const(c) => Ok(constant(idiom, c)),
        Expr::BinaryOp { a, op, b } => binary(idiom, a, *op, b, apply),
        Expr::UnaryOp { op, expr: operand } => unary(idiom, *op, operand, e, apply),
        Expr::MethodCall {
            head,
            name,
            args,
            call_type,
            ..
        } => method_call(idiom, head, name, args, *call_type, e, apply),
        Expr::GlobalCall {
            name,
            args,
            call_type,
            ..
        } => {
            let name = if call_type.is_aggregator() {
                name.to_ascii_uppercase()
            } else {
                name.clone()
            };
            call(idiom, &name, args.iter(), apply)
        }
        Expr::When { branches, or_else } => {
            let mut parts = vec![Token::str("CASE")];
            for branch in branches {
                parts.push(Token::str(" WHEN "));
                parts.push(idiom.token_expr(&branch.cond, apply)?);
                parts.push(Token::str(" THEN "));
                parts.push(idiom.token_expr(&branch.then, apply)?);
            }
            parts.push(Token::str(" ELSE "));
            parts.push(idiom.token_expr(or_else, apply)?);
            parts.push(Token::str(" END"));
            Ok(Token::stmt(parts))
        }
        Expr::Product { fields, .. } => Ok(Token::ValuesClause(
            fields
                .iter()
                .map(|(_, value)| idiom.token_expr(value, apply))
                .collect::<SqlResult<Vec<_>>>()?,
        )),
        Expr::TagForParam { id, .. } => Ok(Token::Param(id.clone())),
        Expr::TagForSqlExpression { id, .. } => Ok(Token::SqlExpression(id.clone())),
        Expr::Infix(infix) => infix_token(idiom, infix, apply),
        Expr::QueryToExpr(q) => Ok(Token::parens(idiom.token_query(&apply.query(q)?, apply)?)),
        Expr::FunctionN { .. } | Expr::FunctionApply { .. } | Expr::Block { .. } => {
            Err(SqlError::not_normalized(e))
        }
    }
}

/// `alias.field` for a property path rooted at an identifier, with nested
/// field names joined by `_`
fn property<I: SqlIdiom + ?Sized>(
    idiom: &I,
    e: &Expr,
    apply: &SqlQueryApply,
) -> SqlResult<Token> {
    let mut path = Vec::new();
    let mut current = e;
    while let Expr::Property { of, name } = current {
        path.push(name.as_str());
        current = of;
    }
    path.reverse();
    let column = path.join("_");
    match current {
        Expr::Ident(id) => Ok(Token::str(format!("{}.{}", id.name, column))),
        other => Ok(Token::stmt(vec![
            Token::parens(idiom.token_expr(other, apply)?),
            Token::str(format!(".{}", column)),
        ])),
    }
}

fn constant<I: SqlIdiom + ?Sized>(idiom: &I, value: &Const) -> Token {
    match value {
        Const::Boolean(b) => Token::str(idiom.boolean_literal(*b)),
        Const::Int(i) => Token::str(i.to_string()),
        Const::Double(d) => Token::str(d.to_string()),
        Const::Char(c) => Token::str(quote(&c.to_string())),
        Const::String(s) => Token::str(quote(s)),
        Const::Null => Token::str("NULL"),
    }
}

fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

fn operator(op: BinaryOperator) -> &'static str {
    match op {
        BinaryOperator::EqEq => "=",
        BinaryOperator::NotEq => "<>",
        BinaryOperator::And => "AND",
        BinaryOperator::Or => "OR",
        BinaryOperator::Gt => ">",
        BinaryOperator::GtEq => ">=",
        BinaryOperator::Lt => "<",
        BinaryOperator::LtEq => "<=",
        BinaryOperator::Plus => "+",
        BinaryOperator::Minus => "-",
        BinaryOperator::Mult => "*",
        BinaryOperator::Div => "/",
        BinaryOperator::Mod => "%",
        BinaryOperator::StrPlus => "||",
    }
}

fn is_null(e: &Expr) -> bool {
    matches!(e, Expr::Const(Const::Null))
}

fn binary<I: SqlIdiom + ?Sized>(
    idiom: &I,
    a: &Expr,
    op: BinaryOperator,
    b: &Expr,
    apply: &SqlQueryApply,
) -> SqlResult<Token> {
    if matches!(op, BinaryOperator::EqEq | BinaryOperator::NotEq) && (is_null(a) || is_null(b)) {
        let operand = if is_null(a) { b } else { a };
        let test = if op == BinaryOperator::EqEq {
            " IS NULL"
        } else {
            " IS NOT NULL"
        };
        return Ok(Token::stmt(vec![
            operand_token(idiom, operand, BinaryOperator::EqEq, false, apply)?,
            Token::str(test),
        ]));
    }
    let left = operand_token(idiom, a, op, false, apply)?;
    let right = operand_token(idiom, b, op, true, apply)?;
    if op == BinaryOperator::StrPlus {
        return Ok(idiom.string_concat_token(left, right));
    }
    Ok(Token::stmt(vec![
        left,
        Token::str(format!(" {} ", operator(op))),
        right,
    ]))
}

/// Operand of `parent`, parenthesized when it binds more loosely
fn operand_token<I: SqlIdiom + ?Sized>(
    idiom: &I,
    operand: &Expr,
    parent: BinaryOperator,
    right: bool,
    apply: &SqlQueryApply,
) -> SqlResult<Token> {
    let token = idiom.token_expr(operand, apply)?;
    let needs_parens = match operand {
        Expr::BinaryOp { op, .. } => {
            let (inner, outer) = (op.precedence(), parent.precedence());
            inner < outer
                || (inner == outer && right && !(parent.is_associative() && *op == parent))
                || (inner == outer && !right && outer == BinaryOperator::EqEq.precedence())
        }
        _ => false,
    };
    Ok(if needs_parens {
        Token::parens(token)
    } else {
        token
    })
}

fn unary<I: SqlIdiom + ?Sized>(
    idiom: &I,
    op: UnaryOperator,
    operand: &Expr,
    whole: &Expr,
    apply: &SqlQueryApply,
) -> SqlResult<Token> {
    match op {
        UnaryOperator::IsEmpty | UnaryOperator::NonEmpty => {
            let Expr::QueryToExpr(q) = operand else {
                return Err(XrError::parse_shape(format!("{} applies to queries only", op), whole).into());
            };
            let keyword = if op == UnaryOperator::IsEmpty {
                "NOT EXISTS "
            } else {
                "EXISTS "
            };
            Ok(Token::stmt(vec![
                Token::str(keyword),
                Token::parens(idiom.token_query(&apply.query(q)?, apply)?),
            ]))
        }
        UnaryOperator::Not | UnaryOperator::Minus => {
            let token = idiom.token_expr(operand, apply)?;
            let token = if matches!(operand, Expr::BinaryOp { .. }) {
                Token::parens(token)
            } else {
                token
            };
            let prefix = if op == UnaryOperator::Not { "NOT " } else { "-" };
            Ok(Token::stmt(vec![Token::str(prefix), token]))
        }
    }
}

fn call<'a, I: SqlIdiom + ?Sized>(
    idiom: &I,
    name: &str,
    args: impl Iterator<Item = &'a Expr>,
    apply: &SqlQueryApply,
) -> SqlResult<Token> {
    let args = args
        .map(|arg| idiom.token_expr(arg, apply))
        .collect::<SqlResult<Vec<_>>>()?;
    Ok(Token::stmt(vec![
        Token::str(name),
        Token::parens(Token::join(args, ", ")),
    ]))
}

/// SQL function for a method of a scalar receiver
fn method_function(name: &str) -> String {
    match name {
        "toUpperCase" | "uppercase" => "UPPER".to_string(),
        "toLowerCase" | "lowercase" => "LOWER".to_string(),
        "length" => "LENGTH".to_string(),
        "trim" => "TRIM".to_string(),
        other => other.to_string(),
    }
}

fn method_call<I: SqlIdiom + ?Sized>(
    idiom: &I,
    head: &Expr,
    name: &str,
    args: &[Expr],
    call_type: CallType,
    whole: &Expr,
    apply: &SqlQueryApply,
) -> SqlResult<Token> {
    if let Expr::QueryToExpr(q) = head {
        return match (name, args) {
            ("contains", [value]) => Ok(Token::SetContains {
                a: Box::new(idiom.token_expr(value, apply)?),
                op: "IN".to_string(),
                b: Box::new(idiom.token_query(&apply.query(q)?, apply)?),
            }),
            _ if call_type == CallType::QueryAggregator => Ok(Token::parens(
                idiom.token_query(&apply.query_aggregation(q, name)?, apply)?,
            )),
            _ => Err(XrError::parse_shape(
                format!("method {} cannot be applied to a query", name),
                whole,
            )
            .into()),
        };
    }
    let function = if call_type.is_aggregator() {
        name.to_ascii_uppercase()
    } else {
        method_function(name)
    };
    call(idiom, &function, std::iter::once(head).chain(args.iter()), apply)
}

fn infix_token<I: SqlIdiom + ?Sized>(
    idiom: &I,
    infix: &Infix,
    apply: &SqlQueryApply,
) -> SqlResult<Token> {
    let mut parts = Vec::with_capacity(infix.parts.len() + infix.params.len());
    for (i, part) in infix.parts.iter().enumerate() {
        parts.push(Token::str(part));
        if let Some(param) = infix.params.get(i) {
            parts.push(match param {
                XR::Expr(e) => idiom.token_expr(e, apply)?,
                XR::Query(q) => idiom.token_query(&apply.query(q)?, apply)?,
            });
        }
    }
    Ok(Token::stmt(parts))
}

#[cfg(test)]
#[path = "render_test.rs"]
mod tests;
