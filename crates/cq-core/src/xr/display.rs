//! Human-readable rendering of XR trees for diagnostics and traces

use super::expr::{Const, Expr, Infix, UnaryOperator};
use super::query::{OrderField, Query, SelectClause, SelectSource};
use super::XR;
use std::fmt::{self, Display, Formatter};

fn write_list<T: Display>(f: &mut Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl Display for OrderField {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.ordering)
    }
}

impl Display for Infix {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "infix\"")?;
        for (i, part) in self.parts.iter().enumerate() {
            write!(f, "{}", part)?;
            if let Some(param) = self.params.get(i) {
                write!(f, "${{{}}}", param)?;
            }
        }
        write!(f, "\"")
    }
}

impl Display for XR {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            XR::Query(q) => write!(f, "{}", q),
            XR::Expr(e) => write!(f, "{}", e),
        }
    }
}

impl Display for SelectClause {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "select {{ ")?;
        for source in &self.sources {
            match source {
                SelectSource::From { query, alias } => write!(f, "from({}) as {}; ", query, alias)?,
                SelectSource::Join {
                    join_type,
                    query,
                    alias,
                    on,
                } => write!(f, "join{}({}) as {} on {}; ", join_type, query, alias, on)?,
            }
        }
        if let Some(w) = &self.where_clause {
            write!(f, "where({}); ", w)?;
        }
        if let Some(g) = &self.group_by {
            write!(f, "groupBy({}); ", g)?;
        }
        if !self.sort_by.is_empty() {
            write!(f, "sortBy(")?;
            write_list(f, &self.sort_by)?;
            write!(f, "); ")?;
        }
        write!(f, "{} }}", self.select)
    }
}

impl Display for Query {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Query::Entity { name, .. } => write!(f, "{}", name),
            Query::Map { head, id, body } => write!(f, "{}.map {{ {} -> {} }}", head, id, body),
            Query::FlatMap { head, id, body } => {
                write!(f, "{}.flatMap {{ {} -> {} }}", head, id, body)
            }
            Query::ConcatMap { head, id, body } => {
                write!(f, "{}.concatMap {{ {} -> {} }}", head, id, body)
            }
            Query::Filter { head, id, body } => {
                write!(f, "{}.filter {{ {} -> {} }}", head, id, body)
            }
            Query::SortBy { head, id, criteria } => {
                write!(f, "{}.sortBy {{ {} -> ", head, id)?;
                write_list(f, criteria)?;
                write!(f, " }}")
            }
            Query::GroupByMap {
                head,
                by_alias,
                by_body,
                map_alias,
                map_body,
            } => write!(
                f,
                "{}.groupByMap {{ {} -> {} }} {{ {} -> {} }}",
                head, by_alias, by_body, map_alias, map_body
            ),
            Query::Take { head, num } => write!(f, "{}.take({})", head, num),
            Query::Drop { head, num } => write!(f, "{}.drop({})", head, num),
            Query::Union { a, b } => write!(f, "{}.union({})", a, b),
            Query::UnionAll { a, b } => write!(f, "{}.unionAll({})", a, b),
            Query::Distinct { head } => write!(f, "{}.distinct", head),
            Query::DistinctOn { head, id, by } => {
                write!(f, "{}.distinctOn {{ {} -> {} }}", head, id, by)
            }
            Query::Nested { head } => write!(f, "{}.nested", head),
            Query::FlatJoin {
                join_type,
                head,
                id,
                on,
            } => write!(f, "join{}({}) {{ {} -> {} }}", join_type, head, id, on),
            Query::FlatFilter { by } => write!(f, "where({})", by),
            Query::FlatGroupBy { by } => write!(f, "groupBy({})", by),
            Query::FlatSortBy { criteria } => {
                write!(f, "sortBy(")?;
                write_list(f, criteria)?;
                write!(f, ")")
            }
            Query::Infix(infix) => write!(f, "{}", infix),
            Query::CustomQueryRef(select) => write!(f, "{}", select),
            Query::RuntimeQueryBind { id, .. } => write!(f, "runtime({})", id),
        }
    }
}

fn write_operand(f: &mut Formatter<'_>, e: &Expr) -> fmt::Result {
    match e {
        Expr::BinaryOp { .. } | Expr::FunctionN { .. } => write!(f, "({})", e),
        _ => write!(f, "{}", e),
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Ident(id) => write!(f, "{}", id),
            Expr::Const(c) => match c {
                Const::Boolean(b) => write!(f, "{}", b),
                Const::Int(i) => write!(f, "{}", i),
                Const::Double(d) => write!(f, "{:?}", d),
                Const::Char(c) => write!(f, "'{}'", c),
                Const::String(s) => write!(f, "\"{}\"", s),
                Const::Null => write!(f, "null"),
            },
            Expr::Property { of, name } => {
                write_operand(f, of)?;
                write!(f, ".{}", name)
            }
            Expr::BinaryOp { a, op, b } => {
                write_operand(f, a)?;
                write!(f, " {} ", op)?;
                write_operand(f, b)
            }
            Expr::UnaryOp { op, expr } => match op {
                UnaryOperator::Not | UnaryOperator::Minus => {
                    write!(f, "{}", op)?;
                    write_operand(f, expr)
                }
                UnaryOperator::IsEmpty | UnaryOperator::NonEmpty => {
                    write_operand(f, expr)?;
                    write!(f, ".{}", op)
                }
            },
            Expr::FunctionN { params, body } => {
                write!(f, "{{ ")?;
                write_list(f, params)?;
                write!(f, " -> {} }}", body)
            }
            Expr::FunctionApply { function, args } => {
                write_operand(f, function)?;
                write!(f, "(")?;
                write_list(f, args)?;
                write!(f, ")")
            }
            Expr::MethodCall {
                head, name, args, ..
            } => {
                write_operand(f, head)?;
                write!(f, ".{}(", name)?;
                write_list(f, args)?;
                write!(f, ")")
            }
            Expr::GlobalCall { name, args, .. } => {
                write!(f, "{}(", name)?;
                write_list(f, args)?;
                write!(f, ")")
            }
            Expr::Block { variables, output } => {
                write!(f, "{{ ")?;
                for v in variables {
                    write!(f, "val {} = {}; ", v.name, v.rhs)?;
                }
                write!(f, "{} }}", output)
            }
            Expr::When { branches, or_else } => {
                write!(f, "when {{ ")?;
                for branch in branches {
                    write!(f, "{} -> {}; ", branch.cond, branch.then)?;
                }
                write!(f, "else -> {} }}", or_else)
            }
            Expr::Product { name, fields } => {
                write!(f, "{}(", name)?;
                for (i, (field, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} = {}", field, value)?;
                }
                write!(f, ")")
            }
            Expr::TagForParam { id, .. } => write!(f, "param({})", id),
            Expr::TagForSqlExpression { id, .. } => write!(f, "sqlExpr({})", id),
            Expr::Infix(infix) => write!(f, "{}", infix),
            Expr::QueryToExpr(q) => write!(f, "{{{}}}", q),
        }
    }
}

#[cfg(test)]
#[path = "display_test.rs"]
mod tests;
