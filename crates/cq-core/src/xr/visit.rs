//! Generic child traversal for XR nodes
//!
//! Rewrites that only care about a few node kinds implement [`XrFold`] and
//! delegate everything else to `map_children`, which rebuilds a node from its
//! folded direct children. Binders are copied unchanged; folds that track
//! scopes must handle binder-bearing nodes themselves.

use super::expr::{Branch, Expr, Infix, Variable};
use super::query::{OrderField, Query, SelectClause, SelectSource};
use super::XR;
use std::convert::Infallible;

/// A fallible bottom-up rewrite over queries and expressions
pub trait XrFold {
    /// Error produced by the rewrite
    type Error;

    /// Rewrite one query
    fn fold_query(&mut self, q: &Query) -> Result<Query, Self::Error>;

    /// Rewrite one expression
    fn fold_expr(&mut self, e: &Expr) -> Result<Expr, Self::Error>;

    /// Rewrite either kind of node
    fn fold_xr(&mut self, xr: &XR) -> Result<XR, Self::Error> {
        Ok(match xr {
            XR::Query(q) => XR::Query(self.fold_query(q)?),
            XR::Expr(e) => XR::Expr(self.fold_expr(e)?),
        })
    }
}

/// Borrowed view of either kind of node
#[derive(Debug, Clone, Copy)]
pub enum XrRef<'a> {
    /// A query node
    Query(&'a Query),
    /// An expression node
    Expr(&'a Expr),
}

impl<'a> From<&'a XR> for XrRef<'a> {
    fn from(xr: &'a XR) -> Self {
        match xr {
            XR::Query(q) => XrRef::Query(q),
            XR::Expr(e) => XrRef::Expr(e),
        }
    }
}

impl<'a> XrRef<'a> {
    /// Visit direct children in source order
    pub fn for_each_child(&self, f: &mut dyn FnMut(XrRef<'a>)) {
        match *self {
            XrRef::Query(q) => q.for_each_child(f),
            XrRef::Expr(e) => e.for_each_child(f),
        }
    }
}

fn never<T>(result: Result<T, Infallible>) -> T {
    match result {
        Ok(value) => value,
        Err(never) => match never {},
    }
}

fn fold_boxed_query<F: XrFold + ?Sized>(f: &mut F, q: &Query) -> Result<Box<Query>, F::Error> {
    Ok(Box::new(f.fold_query(q)?))
}

fn fold_boxed_expr<F: XrFold + ?Sized>(f: &mut F, e: &Expr) -> Result<Box<Expr>, F::Error> {
    Ok(Box::new(f.fold_expr(e)?))
}

fn fold_exprs<F: XrFold + ?Sized>(f: &mut F, exprs: &[Expr]) -> Result<Vec<Expr>, F::Error> {
    exprs.iter().map(|e| f.fold_expr(e)).collect()
}

/// Fold every key of a sort specification
pub fn fold_criteria<F: XrFold + ?Sized>(
    f: &mut F,
    criteria: &[OrderField],
) -> Result<Vec<OrderField>, F::Error> {
    criteria
        .iter()
        .map(|c| -> Result<OrderField, F::Error> {
            Ok(OrderField::new(f.fold_expr(&c.field)?, c.ordering))
        })
        .collect()
}

impl Query {
    /// Rebuild this node from its folded direct children
    pub fn try_map_children<F: XrFold + ?Sized>(&self, f: &mut F) -> Result<Query, F::Error> {
        Ok(match self {
            Query::Entity { .. } | Query::RuntimeQueryBind { .. } => self.clone(),
            Query::Map { head, id, body } => Query::Map {
                head: fold_boxed_query(f, head)?,
                id: id.clone(),
                body: fold_boxed_expr(f, body)?,
            },
            Query::FlatMap { head, id, body } => Query::FlatMap {
                head: fold_boxed_query(f, head)?,
                id: id.clone(),
                body: fold_boxed_query(f, body)?,
            },
            Query::ConcatMap { head, id, body } => Query::ConcatMap {
                head: fold_boxed_query(f, head)?,
                id: id.clone(),
                body: fold_boxed_expr(f, body)?,
            },
            Query::Filter { head, id, body } => Query::Filter {
                head: fold_boxed_query(f, head)?,
                id: id.clone(),
                body: fold_boxed_expr(f, body)?,
            },
            Query::SortBy { head, id, criteria } => Query::SortBy {
                head: fold_boxed_query(f, head)?,
                id: id.clone(),
                criteria: fold_criteria(f, criteria)?,
            },
            Query::GroupByMap {
                head,
                by_alias,
                by_body,
                map_alias,
                map_body,
            } => Query::GroupByMap {
                head: fold_boxed_query(f, head)?,
                by_alias: by_alias.clone(),
                by_body: fold_boxed_expr(f, by_body)?,
                map_alias: map_alias.clone(),
                map_body: fold_boxed_expr(f, map_body)?,
            },
            Query::Take { head, num } => Query::Take {
                head: fold_boxed_query(f, head)?,
                num: fold_boxed_expr(f, num)?,
            },
            Query::Drop { head, num } => Query::Drop {
                head: fold_boxed_query(f, head)?,
                num: fold_boxed_expr(f, num)?,
            },
            Query::Union { a, b } => Query::Union {
                a: fold_boxed_query(f, a)?,
                b: fold_boxed_query(f, b)?,
            },
            Query::UnionAll { a, b } => Query::UnionAll {
                a: fold_boxed_query(f, a)?,
                b: fold_boxed_query(f, b)?,
            },
            Query::Distinct { head } => Query::Distinct {
                head: fold_boxed_query(f, head)?,
            },
            Query::DistinctOn { head, id, by } => Query::DistinctOn {
                head: fold_boxed_query(f, head)?,
                id: id.clone(),
                by: fold_boxed_expr(f, by)?,
            },
            Query::Nested { head } => Query::Nested {
                head: fold_boxed_query(f, head)?,
            },
            Query::FlatJoin {
                join_type,
                head,
                id,
                on,
            } => Query::FlatJoin {
                join_type: *join_type,
                head: fold_boxed_query(f, head)?,
                id: id.clone(),
                on: fold_boxed_expr(f, on)?,
            },
            Query::FlatFilter { by } => Query::FlatFilter {
                by: fold_boxed_expr(f, by)?,
            },
            Query::FlatGroupBy { by } => Query::FlatGroupBy {
                by: fold_boxed_expr(f, by)?,
            },
            Query::FlatSortBy { criteria } => Query::FlatSortBy {
                criteria: fold_criteria(f, criteria)?,
            },
            Query::Infix(infix) => Query::Infix(infix.try_map_children(f)?),
            Query::CustomQueryRef(select) => {
                Query::CustomQueryRef(Box::new(select.try_map_children(f)?))
            }
        })
    }

    /// Infallible form of [`Query::try_map_children`]
    pub fn map_children<F: XrFold<Error = Infallible> + ?Sized>(&self, f: &mut F) -> Query {
        never(self.try_map_children(f))
    }

    /// Visit direct children in source order
    pub fn for_each_child<'a>(&'a self, f: &mut dyn FnMut(XrRef<'a>)) {
        match self {
            Query::Entity { .. } | Query::RuntimeQueryBind { .. } => {}
            Query::Map { head, body, .. }
            | Query::ConcatMap { head, body, .. }
            | Query::Filter { head, body, .. } => {
                f(XrRef::Query(head));
                f(XrRef::Expr(body));
            }
            Query::FlatMap { head, body, .. } => {
                f(XrRef::Query(head));
                f(XrRef::Query(body));
            }
            Query::SortBy { head, criteria, .. } => {
                f(XrRef::Query(head));
                criteria.iter().for_each(|c| f(XrRef::Expr(&c.field)));
            }
            Query::GroupByMap {
                head,
                by_body,
                map_body,
                ..
            } => {
                f(XrRef::Query(head));
                f(XrRef::Expr(by_body));
                f(XrRef::Expr(map_body));
            }
            Query::Take { head, num } | Query::Drop { head, num } => {
                f(XrRef::Query(head));
                f(XrRef::Expr(num));
            }
            Query::Union { a, b } | Query::UnionAll { a, b } => {
                f(XrRef::Query(a));
                f(XrRef::Query(b));
            }
            Query::Distinct { head } | Query::Nested { head } => f(XrRef::Query(head)),
            Query::DistinctOn { head, by, .. } => {
                f(XrRef::Query(head));
                f(XrRef::Expr(by));
            }
            Query::FlatJoin { head, on, .. } => {
                f(XrRef::Query(head));
                f(XrRef::Expr(on));
            }
            Query::FlatFilter { by } | Query::FlatGroupBy { by } => f(XrRef::Expr(by)),
            Query::FlatSortBy { criteria } => {
                criteria.iter().for_each(|c| f(XrRef::Expr(&c.field)));
            }
            Query::Infix(infix) => infix.for_each_child(f),
            Query::CustomQueryRef(select) => select.for_each_child(f),
        }
    }
}

impl Expr {
    /// Rebuild this node from its folded direct children
    pub fn try_map_children<F: XrFold + ?Sized>(&self, f: &mut F) -> Result<Expr, F::Error> {
        Ok(match self {
            Expr::Ident(_)
            | Expr::Const(_)
            | Expr::TagForParam { .. }
            | Expr::TagForSqlExpression { .. } => self.clone(),
            Expr::Property { of, name } => Expr::Property {
                of: fold_boxed_expr(f, of)?,
                name: name.clone(),
            },
            Expr::BinaryOp { a, op, b } => Expr::BinaryOp {
                a: fold_boxed_expr(f, a)?,
                op: *op,
                b: fold_boxed_expr(f, b)?,
            },
            Expr::UnaryOp { op, expr } => Expr::UnaryOp {
                op: *op,
                expr: fold_boxed_expr(f, expr)?,
            },
            Expr::FunctionN { params, body } => Expr::FunctionN {
                params: params.clone(),
                body: fold_boxed_expr(f, body)?,
            },
            Expr::FunctionApply { function, args } => Expr::FunctionApply {
                function: fold_boxed_expr(f, function)?,
                args: fold_exprs(f, args)?,
            },
            Expr::MethodCall {
                head,
                name,
                args,
                call_type,
                ty,
            } => Expr::MethodCall {
                head: fold_boxed_expr(f, head)?,
                name: name.clone(),
                args: fold_exprs(f, args)?,
                call_type: *call_type,
                ty: ty.clone(),
            },
            Expr::GlobalCall {
                name,
                args,
                call_type,
                ty,
            } => Expr::GlobalCall {
                name: name.clone(),
                args: fold_exprs(f, args)?,
                call_type: *call_type,
                ty: ty.clone(),
            },
            Expr::Block { variables, output } => Expr::Block {
                variables: variables
                    .iter()
                    .map(|v| -> Result<Variable, F::Error> {
                        Ok(Variable {
                            name: v.name.clone(),
                            rhs: f.fold_expr(&v.rhs)?,
                        })
                    })
                    .collect::<Result<_, F::Error>>()?,
                output: fold_boxed_expr(f, output)?,
            },
            Expr::When { branches, or_else } => Expr::When {
                branches: branches
                    .iter()
                    .map(|b| -> Result<Branch, F::Error> {
                        Ok(Branch {
                            cond: f.fold_expr(&b.cond)?,
                            then: f.fold_expr(&b.then)?,
                        })
                    })
                    .collect::<Result<_, F::Error>>()?,
                or_else: fold_boxed_expr(f, or_else)?,
            },
            Expr::Product { name, fields } => Expr::Product {
                name: name.clone(),
                fields: fields
                    .iter()
                    .map(|(field, value)| -> Result<(String, Expr), F::Error> {
                        Ok((field.clone(), f.fold_expr(value)?))
                    })
                    .collect::<Result<_, F::Error>>()?,
            },
            Expr::Infix(infix) => Expr::Infix(infix.try_map_children(f)?),
            Expr::QueryToExpr(q) => Expr::QueryToExpr(fold_boxed_query(f, q)?),
        })
    }

    /// Infallible form of [`Expr::try_map_children`]
    pub fn map_children<F: XrFold<Error = Infallible> + ?Sized>(&self, f: &mut F) -> Expr {
        never(self.try_map_children(f))
    }

    /// Visit direct children in source order
    pub fn for_each_child<'a>(&'a self, f: &mut dyn FnMut(XrRef<'a>)) {
        match self {
            Expr::Ident(_)
            | Expr::Const(_)
            | Expr::TagForParam { .. }
            | Expr::TagForSqlExpression { .. } => {}
            Expr::Property { of, .. } => f(XrRef::Expr(of)),
            Expr::BinaryOp { a, b, .. } => {
                f(XrRef::Expr(a));
                f(XrRef::Expr(b));
            }
            Expr::UnaryOp { expr, .. } => f(XrRef::Expr(expr)),
            Expr::FunctionN { body, .. } => f(XrRef::Expr(body)),
            Expr::FunctionApply { function, args } => {
                f(XrRef::Expr(function));
                args.iter().for_each(|a| f(XrRef::Expr(a)));
            }
            Expr::MethodCall { head, args, .. } => {
                f(XrRef::Expr(head));
                args.iter().for_each(|a| f(XrRef::Expr(a)));
            }
            Expr::GlobalCall { args, .. } => args.iter().for_each(|a| f(XrRef::Expr(a))),
            Expr::Block { variables, output } => {
                variables.iter().for_each(|v| f(XrRef::Expr(&v.rhs)));
                f(XrRef::Expr(output));
            }
            Expr::When { branches, or_else } => {
                for branch in branches {
                    f(XrRef::Expr(&branch.cond));
                    f(XrRef::Expr(&branch.then));
                }
                f(XrRef::Expr(or_else));
            }
            Expr::Product { fields, .. } => fields.iter().for_each(|(_, v)| f(XrRef::Expr(v))),
            Expr::Infix(infix) => infix.for_each_child(f),
            Expr::QueryToExpr(q) => f(XrRef::Query(q)),
        }
    }
}

impl Infix {
    /// Rebuild with folded parameters
    pub fn try_map_children<F: XrFold + ?Sized>(&self, f: &mut F) -> Result<Infix, F::Error> {
        Ok(Infix {
            parts: self.parts.clone(),
            params: self
                .params
                .iter()
                .map(|p| f.fold_xr(p))
                .collect::<Result<_, F::Error>>()?,
            pure: self.pure,
            ty: self.ty.clone(),
        })
    }

    /// Visit parameters in order
    pub fn for_each_child<'a>(&'a self, f: &mut dyn FnMut(XrRef<'a>)) {
        self.params.iter().for_each(|p| f(XrRef::from(p)));
    }
}

impl SelectClause {
    /// Rebuild with folded source queries, conditions and clauses
    pub fn try_map_children<F: XrFold + ?Sized>(
        &self,
        f: &mut F,
    ) -> Result<SelectClause, F::Error> {
        let sources = self
            .sources
            .iter()
            .map(|source| -> Result<SelectSource, F::Error> {
                Ok(match source {
                    SelectSource::From { query, alias } => SelectSource::From {
                        query: f.fold_query(query)?,
                        alias: alias.clone(),
                    },
                    SelectSource::Join {
                        join_type,
                        query,
                        alias,
                        on,
                    } => SelectSource::Join {
                        join_type: *join_type,
                        query: f.fold_query(query)?,
                        alias: alias.clone(),
                        on: f.fold_expr(on)?,
                    },
                })
            })
            .collect::<Result<_, F::Error>>()?;
        Ok(SelectClause {
            sources,
            where_clause: self
                .where_clause
                .as_ref()
                .map(|e| f.fold_expr(e))
                .transpose()?,
            group_by: self.group_by.as_ref().map(|e| f.fold_expr(e)).transpose()?,
            sort_by: fold_criteria(f, &self.sort_by)?,
            select: f.fold_expr(&self.select)?,
        })
    }

    /// Visit sources, conditions and clauses in order
    pub fn for_each_child<'a>(&'a self, f: &mut dyn FnMut(XrRef<'a>)) {
        for source in &self.sources {
            f(XrRef::Query(source.query()));
            if let SelectSource::Join { on, .. } = source {
                f(XrRef::Expr(on));
            }
        }
        if let Some(w) = &self.where_clause {
            f(XrRef::Expr(w));
        }
        if let Some(g) = &self.group_by {
            f(XrRef::Expr(g));
        }
        self.sort_by.iter().for_each(|c| f(XrRef::Expr(&c.field)));
        f(XrRef::Expr(&self.select));
    }
}
