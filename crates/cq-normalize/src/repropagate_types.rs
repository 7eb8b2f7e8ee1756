//! Refresh binder types from the queries they range over
//!
//! Rewrites move binders onto new heads. Each binder is retyped from its
//! head's current row type and the retyped identifier is substituted into
//! the body, so properties and nested queries see the fresh type.

use cq_core::beta::{beta_reduce, beta_reduce_query, BetaReduction};
use cq_core::{Expr, Ident, OrderField, Query, XrFold};
use std::convert::Infallible;

/// Retypes binders bottom-up
#[derive(Debug, Clone, Copy, Default)]
pub struct RepropagateTypes;

fn retype(id: &Ident, head: &Query) -> Ident {
    id.with_type(id.ty.retype_from(&head.ty()))
}

fn rebind(body: &Expr, from: &Ident, to: &Ident) -> Expr {
    let body = beta_reduce(body, from, &Expr::ident(to));
    RepropagateTypes::expr(&body)
}

impl RepropagateTypes {
    /// Retype every binder in `q`
    pub fn apply(q: &Query) -> Query {
        match q {
            Query::Map { head, id, body } => {
                let head = Self::apply(head);
                let id = retype(id, &head);
                let body = rebind(body, &id, &id);
                Query::map(head, id, body)
            }
            Query::ConcatMap { head, id, body } => {
                let head = Self::apply(head);
                let id = retype(id, &head);
                let body = rebind(body, &id, &id);
                Query::concat_map(head, id, body)
            }
            Query::Filter { head, id, body } => {
                let head = Self::apply(head);
                let id = retype(id, &head);
                let body = rebind(body, &id, &id);
                Query::filter(head, id, body)
            }
            Query::DistinctOn { head, id, by } => {
                let head = Self::apply(head);
                let id = retype(id, &head);
                let by = rebind(by, &id, &id);
                Query::distinct_on(head, id, by)
            }
            Query::SortBy { head, id, criteria } => {
                let head = Self::apply(head);
                let id = retype(id, &head);
                let criteria = criteria
                    .iter()
                    .map(|c| OrderField::new(rebind(&c.field, &id, &id), c.ordering))
                    .collect();
                Query::sort_by(head, id, criteria)
            }
            Query::FlatMap { head, id, body } => {
                let head = Self::apply(head);
                let id = retype(id, &head);
                let body = beta_reduce_query(body, &id, &Expr::ident(&id));
                Query::flat_map(head, id, Self::apply(&body))
            }
            Query::FlatJoin {
                join_type,
                head,
                id,
                on,
            } => {
                let head = Self::apply(head);
                let id = retype(id, &head);
                let on = rebind(on, &id, &id);
                Query::flat_join(*join_type, head, id, on)
            }
            Query::GroupByMap {
                head,
                by_alias,
                by_body,
                map_alias,
                map_body,
            } => {
                let head = Self::apply(head);
                let by_alias = retype(by_alias, &head);
                let map_alias = retype(map_alias, &head);
                let by_body = rebind(by_body, &by_alias, &by_alias);
                let map_body = rebind(map_body, &map_alias, &map_alias);
                Query::group_by_map(head, by_alias, by_body, map_alias, map_body)
            }
            Query::CustomQueryRef(select) => {
                let mut select = select.as_ref().clone();
                for i in 0..select.sources.len() {
                    let query = Self::apply(select.sources[i].query());
                    let alias = retype(select.sources[i].alias(), &query);
                    select = BetaReduction::rename_select_source(&select, i, &alias);
                    match &mut select.sources[i] {
                        cq_core::SelectSource::From { query: q, .. }
                        | cq_core::SelectSource::Join { query: q, .. } => *q = query,
                    }
                }
                Query::CustomQueryRef(Box::new(select)).map_children(&mut NestedOnly)
            }
            _ => q.map_children(&mut Retype),
        }
    }

    /// Retype binders of the queries nested inside `e`
    pub fn expr(e: &Expr) -> Expr {
        e.map_children(&mut Retype)
    }
}

struct Retype;

impl XrFold for Retype {
    type Error = Infallible;

    fn fold_query(&mut self, q: &Query) -> Result<Query, Infallible> {
        Ok(RepropagateTypes::apply(q))
    }

    fn fold_expr(&mut self, e: &Expr) -> Result<Expr, Infallible> {
        Ok(RepropagateTypes::expr(e))
    }
}

/// Leaves queries alone and only descends into expressions
struct NestedOnly;

impl XrFold for NestedOnly {
    type Error = Infallible;

    fn fold_query(&mut self, q: &Query) -> Result<Query, Infallible> {
        Ok(q.clone())
    }

    fn fold_expr(&mut self, e: &Expr) -> Result<Expr, Infallible> {
        Ok(RepropagateTypes::expr(e))
    }
}

#[cfg(test)]
#[path = "repropagate_types_test.rs"]
mod tests;
