//! OrderTerms: reorder commuting operators
//!
//! Filters are moved below sorts, and a limit or offset over a flat-map is
//! moved above the projection so the chain can be flattened with the limit
//! attached to the same select.

use super::{Phase, RewriteRule};
use crate::attach_to_entity::FreshNames;
use crate::error::NormalizeResult;
use cq_core::{beta_reduce, Expr, Query};

/// Reorders commuting operators
pub struct OrderTerms;

impl OrderTerms {
    /// Apply the first matching rule at the root of `q`
    pub fn apply(q: &Query) -> Option<Query> {
        match q {
            // a.sortBy(b => c).filter(d => e) => a.filter(b => e[d := b]).sortBy(b => c)
            Query::Filter { head, id: d, body: e } => match head.as_ref() {
                Query::SortBy { head: a, id: b, criteria } => Some(Query::sort_by(
                    Query::filter(a.as_ref().clone(), b.clone(), beta_reduce(e, d, &Expr::ident(b))),
                    b.clone(),
                    criteria.clone(),
                )),
                _ => None,
            },
            // a.flatMap(b => c).take(n).map(d => e) => a.flatMap(b => c).map(d => e).take(n)
            Query::Map { head, id, body } => match head.as_ref() {
                Query::Take { head: fm, num } if matches!(fm.as_ref(), Query::FlatMap { .. }) => {
                    Some(Query::take(
                        Query::map(fm.as_ref().clone(), id.clone(), body.as_ref().clone()),
                        num.as_ref().clone(),
                    ))
                }
                Query::Drop { head: fm, num } if matches!(fm.as_ref(), Query::FlatMap { .. }) => {
                    Some(Query::drop(
                        Query::map(fm.as_ref().clone(), id.clone(), body.as_ref().clone()),
                        num.as_ref().clone(),
                    ))
                }
                _ => None,
            },
            _ => None,
        }
    }
}

impl RewriteRule for OrderTerms {
    fn phase(&self) -> Phase {
        Phase::OrderTerms
    }

    fn description(&self) -> &'static str {
        "Moves filters below sorts and limits above projections of flat-maps"
    }

    fn rewrite(&self, q: &Query, _fresh: &FreshNames) -> NormalizeResult<Option<Query>> {
        Ok(Self::apply(q))
    }
}

#[cfg(test)]
#[path = "order_terms_test.rs"]
mod tests;
