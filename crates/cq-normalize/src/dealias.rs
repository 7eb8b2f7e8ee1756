//! Dealias: make each operator in a chain refer to its row with one name
//!
//! `Map(Filter(a, x, p), y, b)` becomes `Map(Filter(a, x, p), x, b[y := x])`.
//! The alias exposed by a head is threaded upward and substituted for the
//! binder of every consumer above it. Set operations, `Distinct` and
//! `Nested` expose no alias. Queries nested inside expressions are dealiased
//! on their own.

use cq_core::beta::{beta_reduce_query, rename_ident};
use cq_core::{Expr, Ident, OrderField, Query, XrFold};
use std::convert::Infallible;

/// Dealias `q` and every query nested inside it
pub fn dealias(q: &Query) -> Query {
    apply(q).0
}

/// The binder a consumer of `head` should use, and the head itself
fn consumer_binder(head: &Query, id: &Ident) -> (Query, Ident) {
    match apply(head) {
        (head, Some(alias)) => (head, alias.with_type(id.ty.clone())),
        (head, None) => (head, id.clone()),
    }
}

fn rebind_expr(body: &Expr, from: &Ident, to: &Ident) -> Expr {
    let body = if from.name == to.name {
        body.clone()
    } else {
        rename_ident(body, from, to)
    };
    nested(&body)
}

fn apply(q: &Query) -> (Query, Option<Ident>) {
    match q {
        Query::Map { head, id, body } => {
            let (head, alias) = consumer_binder(head, id);
            let body = rebind_expr(body, id, &alias);
            (Query::map(head, alias.clone(), body), Some(alias))
        }
        Query::ConcatMap { head, id, body } => {
            let (head, alias) = consumer_binder(head, id);
            let body = rebind_expr(body, id, &alias);
            (Query::concat_map(head, alias.clone(), body), Some(alias))
        }
        Query::Filter { head, id, body } => {
            let (head, alias) = consumer_binder(head, id);
            let body = rebind_expr(body, id, &alias);
            (Query::filter(head, alias.clone(), body), Some(alias))
        }
        Query::DistinctOn { head, id, by } => {
            let (head, alias) = consumer_binder(head, id);
            let by = rebind_expr(by, id, &alias);
            (Query::distinct_on(head, alias.clone(), by), Some(alias))
        }
        Query::SortBy { head, id, criteria } => {
            let (head, alias) = consumer_binder(head, id);
            let criteria = criteria
                .iter()
                .map(|c| OrderField::new(rebind_expr(&c.field, id, &alias), c.ordering))
                .collect();
            (Query::sort_by(head, alias.clone(), criteria), Some(alias))
        }
        Query::FlatMap { head, id, body } => {
            let (head, alias) = consumer_binder(head, id);
            let body = if alias.name == id.name {
                body.as_ref().clone()
            } else {
                beta_reduce_query(body, id, &Expr::ident(&alias))
            };
            let (body, state) = apply(&body);
            (Query::flat_map(head, alias, body), state)
        }
        Query::GroupByMap {
            head,
            by_alias,
            by_body,
            map_alias,
            map_body,
        } => {
            let (head, state) = apply(head);
            let (by_to, map_to) = match &state {
                Some(alias) => (
                    alias.with_type(by_alias.ty.clone()),
                    alias.with_type(map_alias.ty.clone()),
                ),
                None => (by_alias.clone(), map_alias.clone()),
            };
            let by_body = rebind_expr(by_body, by_alias, &by_to);
            let map_body = rebind_expr(map_body, map_alias, &map_to);
            (
                Query::group_by_map(head, by_to, by_body, map_to, map_body),
                None,
            )
        }
        Query::Take { head, num } => {
            let (head, state) = apply(head);
            (Query::take(head, nested(num)), state)
        }
        Query::Drop { head, num } => {
            let (head, state) = apply(head);
            (Query::drop(head, nested(num)), state)
        }
        Query::Union { a, b } => (Query::union(dealias(a), dealias(b)), None),
        Query::UnionAll { a, b } => (Query::union_all(dealias(a), dealias(b)), None),
        Query::Distinct { head } => (Query::distinct(dealias(head)), None),
        Query::Nested { head } => (Query::nested(dealias(head)), None),
        Query::FlatJoin {
            join_type,
            head,
            id,
            on,
        } => (
            Query::flat_join(*join_type, dealias(head), id.clone(), nested(on)),
            Some(id.clone()),
        ),
        Query::Entity { .. }
        | Query::FlatFilter { .. }
        | Query::FlatGroupBy { .. }
        | Query::FlatSortBy { .. }
        | Query::Infix(_)
        | Query::CustomQueryRef(_)
        | Query::RuntimeQueryBind { .. } => (q.map_children(&mut Independent), None),
    }
}

/// Dealias the queries nested inside `e`
fn nested(e: &Expr) -> Expr {
    e.map_children(&mut Independent)
}

/// Dealiases every query it reaches as a fresh root
struct Independent;

impl XrFold for Independent {
    type Error = Infallible;

    fn fold_query(&mut self, q: &Query) -> Result<Query, Infallible> {
        Ok(dealias(q))
    }

    fn fold_expr(&mut self, e: &Expr) -> Result<Expr, Infallible> {
        Ok(nested(e))
    }
}

#[cfg(test)]
#[path = "dealias_test.rs"]
mod tests;
