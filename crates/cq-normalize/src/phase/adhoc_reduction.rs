//! AdHocReduction: local algebraic simplifications

use super::{Phase, RewriteRule};
use crate::attach_to_entity::FreshNames;
use crate::error::NormalizeResult;
use cq_core::{beta_reduce, Expr, Query};

/// Merges filters and pushes consumers into flat-map bodies
pub struct AdHocReduction;

impl AdHocReduction {
    /// Apply the first matching rule at the root of `q`
    pub fn apply(q: &Query) -> Option<Query> {
        match q {
            // a.filter(b => c).filter(d => e) => a.filter(b => c && e[d := b])
            Query::Filter { head, id: d, body: e } => match head.as_ref() {
                Query::Filter { head: a, id: b, body: c } => Some(Query::filter(
                    a.as_ref().clone(),
                    b.clone(),
                    Expr::and(c.as_ref().clone(), beta_reduce(e, d, &Expr::ident(b))),
                )),
                Query::FlatMap { head: a, id: b, body: c } => Some(Query::flat_map(
                    a.as_ref().clone(),
                    b.clone(),
                    Query::filter(c.as_ref().clone(), d.clone(), e.as_ref().clone()),
                )),
                _ => None,
            },
            // a.flatMap(b => c).map(d => e) => a.flatMap(b => c.map(d => e))
            Query::Map { head, id: d, body: e } => match head.as_ref() {
                Query::FlatMap { head: a, id: b, body: c } => Some(Query::flat_map(
                    a.as_ref().clone(),
                    b.clone(),
                    Query::map(c.as_ref().clone(), d.clone(), e.as_ref().clone()),
                )),
                _ => None,
            },
            // a.flatMap(b => c.union(d)) => a.flatMap(b => c).union(a.flatMap(b => d))
            Query::FlatMap { head: a, id: b, body } => match body.as_ref() {
                Query::Union { a: c, b: d } => Some(Query::union(
                    Query::flat_map(a.as_ref().clone(), b.clone(), c.as_ref().clone()),
                    Query::flat_map(a.as_ref().clone(), b.clone(), d.as_ref().clone()),
                )),
                Query::UnionAll { a: c, b: d } => Some(Query::union_all(
                    Query::flat_map(a.as_ref().clone(), b.clone(), c.as_ref().clone()),
                    Query::flat_map(a.as_ref().clone(), b.clone(), d.as_ref().clone()),
                )),
                _ => None,
            },
            _ => None,
        }
    }
}

impl RewriteRule for AdHocReduction {
    fn phase(&self) -> Phase {
        Phase::AdHocReduction
    }

    fn description(&self) -> &'static str {
        "Merges adjacent filters and pushes maps, filters and unions through flat-maps"
    }

    fn rewrite(&self, q: &Query, _fresh: &FreshNames) -> NormalizeResult<Option<Query>> {
        Ok(Self::apply(q))
    }
}

#[cfg(test)]
#[path = "adhoc_reduction_test.rs"]
mod tests;
