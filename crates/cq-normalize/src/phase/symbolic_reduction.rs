//! SymbolicReduction: flatten nested comprehensions
//!
//! Only fires on `FlatMap`. A filter on the outer source is moved into the
//! innermost source of the body, nested flat-maps are re-associated to the
//! right and a flat-map over a union is distributed over its branches.

use super::{Phase, RewriteRule};
use crate::attach_to_entity::{attach_to_entity, FreshNames};
use crate::error::NormalizeResult;
use cq_core::{beta_reduce, Expr, Ident, Query, XrError};

/// Flattens nested comprehensions
pub struct SymbolicReduction;

/// True when the rows of `q` come from a join clause at the end of a chain
pub(crate) fn tail_is_flat_join(q: &Query) -> bool {
    match q {
        Query::FlatJoin { .. } => true,
        Query::FlatMap { body, .. } => tail_is_flat_join(body),
        Query::Map { head, .. } => tail_is_flat_join(head),
        _ => false,
    }
}

/// `FlatMap(Filter(a, b, c), d, e)` becomes
/// `FlatMap(a, d, e')` where `e'` filters its innermost source by `c[b := d]`.
///
/// Declines when `e` ends in a join or has no table to filter; any other
/// failure is returned.
fn filter_into_body(
    a: &Query,
    b: &Ident,
    c: &Expr,
    d: &Ident,
    e: &Query,
    fresh: &FreshNames,
) -> NormalizeResult<Option<Query>> {
    if tail_is_flat_join(e) {
        return Ok(None);
    }
    let cond = beta_reduce(c, b, &Expr::ident(d));
    let splice = |source: Query, id: Ident| Query::filter(source, id, cond.clone());
    match attach_to_entity(&splice, None, e, fresh) {
        Ok(body) => Ok(Some(Query::flat_map(a.clone(), d.clone(), body))),
        Err(XrError::Structural { message, .. }) => {
            log::debug!("SymbolicReduction skipped filter migration: {}", message);
            Ok(None)
        }
        Err(err) => Err(err.into()),
    }
}

impl SymbolicReduction {
    /// Apply the first matching rule at the root of `q`
    pub fn apply(q: &Query, fresh: &FreshNames) -> NormalizeResult<Option<Query>> {
        let Query::FlatMap { head, id: d, body: e } = q else {
            return Ok(None);
        };
        let rewritten = match head.as_ref() {
            Query::Filter { head: a, id: b, body: c } => {
                return filter_into_body(a, b, c, d, e, fresh);
            }
            Query::FlatMap { head: a, id: b, body: c } => {
                let body = Query::flat_map(c.as_ref().clone(), d.clone(), e.as_ref().clone());
                if tail_is_flat_join(a) && tail_is_flat_join(&body) {
                    return Ok(None);
                }
                Some(Query::flat_map(a.as_ref().clone(), b.clone(), body))
            }
            Query::Union { a, b } => Some(Query::union(
                Query::flat_map(a.as_ref().clone(), d.clone(), e.as_ref().clone()),
                Query::flat_map(b.as_ref().clone(), d.clone(), e.as_ref().clone()),
            )),
            Query::UnionAll { a, b } => Some(Query::union_all(
                Query::flat_map(a.as_ref().clone(), d.clone(), e.as_ref().clone()),
                Query::flat_map(b.as_ref().clone(), d.clone(), e.as_ref().clone()),
            )),
            _ => None,
        };
        Ok(rewritten)
    }
}

impl RewriteRule for SymbolicReduction {
    fn phase(&self) -> Phase {
        Phase::SymbolicReduction
    }

    fn description(&self) -> &'static str {
        "Re-associates flat-maps, distributes them over unions and sinks outer filters"
    }

    fn rewrite(&self, q: &Query, fresh: &FreshNames) -> NormalizeResult<Option<Query>> {
        Self::apply(q, fresh)
    }
}

#[cfg(test)]
#[path = "symbolic_reduction_test.rs"]
mod tests;
