//! ApplyMap: push pure projections outward past the operator that consumes them
//!
//! A consumer of `Map(a, b, c)` that refers to the mapped row through `d` can
//! instead consume `a` directly with `d := c` substituted, re-applying the
//! projection afterwards. This is only valid for maps whose body may be
//! duplicated (see [`detachable_map`]).

use super::{Phase, RewriteRule};
use crate::attach_to_entity::FreshNames;
use crate::error::NormalizeResult;
use cq_core::collect::{contains_impure_infix, contains_impurities};
use cq_core::{beta_reduce, beta_reduce_query, Expr, Ident, OrderField, Query};

/// Pushes projections outward
pub struct ApplyMap;

/// The parts of a map that may be moved past its consumer
#[derive(Debug, Clone, Copy)]
pub struct DetachableMap<'a> {
    /// Source of the map
    pub head: &'a Query,
    /// Row binder
    pub id: &'a Ident,
    /// Projected value
    pub body: &'a Expr,
}

/// Match a map that may be detached from its consumer.
///
/// A map over a `DistinctOn` or `FlatJoin` has to stay where it is, and a
/// body containing aggregations or impure calls cannot be duplicated.
pub fn detachable_map(q: &Query) -> Option<DetachableMap<'_>> {
    match q {
        Query::Map { head, id, body }
            if !matches!(
                head.as_ref(),
                Query::DistinctOn { .. } | Query::FlatJoin { .. }
            ) && !contains_impurities(body) =>
        {
            Some(DetachableMap { head, id, body })
        }
        _ => None,
    }
}

/// Maps that must never be removed or fused at the root
fn is_excluded(q: &Query) -> bool {
    match q {
        Query::Map { head, .. } => matches!(
            head.as_ref(),
            Query::GroupByMap { .. } | Query::Nested { .. } | Query::FlatJoin { .. }
        ),
        _ => false,
    }
}

fn substitute_criteria(criteria: &[OrderField], id: &Ident, value: &Expr) -> Vec<OrderField> {
    criteria
        .iter()
        .map(|c| OrderField::new(beta_reduce(&c.field, id, value), c.ordering))
        .collect()
}

/// `Map(Distinct(Map(a, b, c)), d, e)` where `e` re-projects `c` unchanged,
/// i.e. `e[d := c] == c`, becomes `Distinct(Map(a, b, c))`
fn distinct_reprojection(q: &Query) -> Option<Query> {
    let Query::Map { head, id: d, body: e } = q else {
        return None;
    };
    let Query::Distinct { head: inner } = head.as_ref() else {
        return None;
    };
    let m = detachable_map(inner)?;
    (beta_reduce(e, d, m.body) == *m.body).then(|| {
        Query::distinct(Query::map(m.head.clone(), m.id.clone(), m.body.clone()))
    })
}

/// `Map(Map(a, b, c), d, e)` becomes `Map(a, b, e[d := c])`
fn map_of_map(q: &Query) -> Option<Query> {
    let Query::Map { head, id: d, body: e } = q else {
        return None;
    };
    let m = detachable_map(head)?;
    if contains_impure_infix(e) {
        return None;
    }
    Some(Query::map(
        m.head.clone(),
        m.id.clone(),
        beta_reduce(e, d, m.body),
    ))
}

/// `Map(a, b, b)` becomes `a`
fn identity_map(q: &Query) -> Option<Query> {
    match q {
        Query::Map { head, id, body } if body.is_ident_of(id) => Some(head.as_ref().clone()),
        _ => None,
    }
}

/// `Nested(Map(a, b, c))` becomes `Map(Nested(a), b, c)`
fn nested_map(q: &Query) -> Option<Query> {
    let Query::Nested { head } = q else {
        return None;
    };
    let m = detachable_map(head)?;
    Some(Query::map(
        Query::nested(m.head.clone()),
        m.id.clone(),
        m.body.clone(),
    ))
}

/// Group the unprojected rows, substituting the projection into both bodies
fn group_by_map(q: &Query) -> Option<Query> {
    let Query::GroupByMap {
        head,
        by_alias,
        by_body,
        map_alias,
        map_body,
    } = q
    else {
        return None;
    };
    let m = detachable_map(head)?;
    Some(Query::group_by_map(
        m.head.clone(),
        m.id.clone(),
        beta_reduce(by_body, by_alias, m.body),
        m.id.clone(),
        beta_reduce(map_body, map_alias, m.body),
    ))
}

/// Filter before projecting
fn filter_map(q: &Query) -> Option<Query> {
    let Query::Filter { head, id: d, body: e } = q else {
        return None;
    };
    let m = detachable_map(head)?;
    Some(Query::map(
        Query::filter(m.head.clone(), m.id.clone(), beta_reduce(e, d, m.body)),
        m.id.clone(),
        m.body.clone(),
    ))
}

/// Sort before projecting, also through a `Distinct`
fn sort_by_map(q: &Query) -> Option<Query> {
    let Query::SortBy {
        head,
        id: d,
        criteria,
    } = q
    else {
        return None;
    };
    let (inner, distinct) = match head.as_ref() {
        Query::Distinct { head: inner } => (inner.as_ref(), true),
        other => (other, false),
    };
    let m = detachable_map(inner)?;
    let sorted = Query::map(
        Query::sort_by(
            m.head.clone(),
            m.id.clone(),
            substitute_criteria(criteria, d, m.body),
        ),
        m.id.clone(),
        m.body.clone(),
    );
    Some(if distinct {
        Query::distinct(sorted)
    } else {
        sorted
    })
}

/// Limit or offset before projecting.
///
/// A projection of a flat-map stays below the limit; [`super::order_terms`]
/// moves it there.
fn take_drop_map(q: &Query) -> Option<Query> {
    fn over_rows(head: &Query) -> Option<DetachableMap<'_>> {
        detachable_map(head).filter(|m| !matches!(m.head, Query::FlatMap { .. }))
    }
    match q {
        Query::Take { head, num } => {
            let m = over_rows(head)?;
            Some(Query::map(
                Query::take(m.head.clone(), num.as_ref().clone()),
                m.id.clone(),
                m.body.clone(),
            ))
        }
        Query::Drop { head, num } => {
            let m = over_rows(head)?;
            Some(Query::map(
                Query::drop(m.head.clone(), num.as_ref().clone()),
                m.id.clone(),
                m.body.clone(),
            ))
        }
        _ => None,
    }
}

/// `FlatMap(Map(a, b, c), d, e)` becomes `FlatMap(a, b, e[d := c])`
fn flat_map_map(q: &Query) -> Option<Query> {
    let Query::FlatMap { head, id: d, body: e } = q else {
        return None;
    };
    let m = detachable_map(head)?;
    Some(Query::flat_map(
        m.head.clone(),
        m.id.clone(),
        beta_reduce_query(e, d, m.body),
    ))
}

const RULES: &[fn(&Query) -> Option<Query>] = &[
    distinct_reprojection,
    map_of_map,
    identity_map,
    nested_map,
    group_by_map,
    filter_map,
    sort_by_map,
    take_drop_map,
    flat_map_map,
];

impl ApplyMap {
    /// Apply the first matching rule at the root of `q`
    pub fn apply(q: &Query) -> Option<Query> {
        if is_excluded(q) {
            return None;
        }
        RULES.iter().find_map(|rule| rule(q))
    }
}

impl RewriteRule for ApplyMap {
    fn phase(&self) -> Phase {
        Phase::ApplyMap
    }

    fn description(&self) -> &'static str {
        "Moves pure projections past filters, sorts, groupings and limits"
    }

    fn rewrite(&self, q: &Query, _fresh: &FreshNames) -> NormalizeResult<Option<Query>> {
        Ok(Self::apply(q))
    }
}

#[cfg(test)]
#[path = "apply_map_test.rs"]
mod tests;
