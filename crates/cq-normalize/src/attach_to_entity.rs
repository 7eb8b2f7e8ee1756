//! Splice an operator directly above the innermost table of a query
//!
//! Used by symbolic reduction to move a filter from an outer comprehension
//! into the source it actually constrains.

use cq_core::{Ident, Query, XrError, XrResult};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counter for `[tmp_attachtoentity<N>]` binders, scoped to one
/// [`Normalizer::normalize`](crate::Normalizer::normalize) call
#[derive(Debug, Default)]
pub struct FreshNames {
    next: AtomicUsize,
}

impl FreshNames {
    /// The next unused number
    pub fn next(&self) -> usize {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// Start numbering from zero again
    pub fn reset(&self) {
        self.next.store(0, Ordering::Relaxed);
    }
}

fn is_entity(q: &Query) -> bool {
    matches!(q, Query::Entity { .. } | Query::Infix(_))
}

fn fallback_alias(alias: Option<&Ident>, q: &Query, fresh: &FreshNames) -> Ident {
    alias.cloned().unwrap_or_else(|| {
        Ident::new(format!("[tmp_attachtoentity{}]", fresh.next()), q.ty())
    })
}

/// Insert `splice(source, alias)` directly above the innermost source of `q`.
///
/// `alias` is the binder the caller wants the spliced operator to use when
/// the source has none of its own; otherwise a temporary binder numbered
/// from `fresh` is used. Fails with a structural error when no table or
/// infix can be reached.
pub fn attach_to_entity<F>(
    splice: &F,
    alias: Option<&Ident>,
    q: &Query,
    fresh: &FreshNames,
) -> XrResult<Query>
where
    F: Fn(Query, Ident) -> Query,
{
    let head_for = |head: &Query, id: &Ident| -> XrResult<Box<Query>> {
        Ok(Box::new(if is_entity(head) {
            splice(head.clone(), id.clone())
        } else {
            attach_to_entity(splice, Some(id), head, fresh)?
        }))
    };
    match q {
        Query::Map { head, id, body } => Ok(Query::Map {
            head: head_for(head, id)?,
            id: id.clone(),
            body: body.clone(),
        }),
        Query::FlatMap { head, id, body } => Ok(Query::FlatMap {
            head: head_for(head, id)?,
            id: id.clone(),
            body: body.clone(),
        }),
        Query::ConcatMap { head, id, body } => Ok(Query::ConcatMap {
            head: head_for(head, id)?,
            id: id.clone(),
            body: body.clone(),
        }),
        Query::Filter { head, id, body } => Ok(Query::Filter {
            head: head_for(head, id)?,
            id: id.clone(),
            body: body.clone(),
        }),
        Query::SortBy { head, id, criteria } => Ok(Query::SortBy {
            head: head_for(head, id)?,
            id: id.clone(),
            criteria: criteria.clone(),
        }),
        Query::DistinctOn { head, id, by } => Ok(Query::DistinctOn {
            head: head_for(head, id)?,
            id: id.clone(),
            by: by.clone(),
        }),
        Query::Take { head, num } => Ok(Query::Take {
            head: Box::new(attach_to_entity(splice, alias, head, fresh)?),
            num: num.clone(),
        }),
        Query::Drop { head, num } => Ok(Query::Drop {
            head: Box::new(attach_to_entity(splice, alias, head, fresh)?),
            num: num.clone(),
        }),
        Query::Distinct { head } => Ok(Query::Distinct {
            head: Box::new(attach_to_entity(splice, alias, head, fresh)?),
        }),
        Query::GroupByMap { .. }
        | Query::Union { .. }
        | Query::UnionAll { .. }
        | Query::FlatJoin { .. }
        | Query::Entity { .. }
        | Query::Infix(_) => Ok(splice(q.clone(), fallback_alias(alias, q, fresh))),
        other => Err(XrError::structural(
            format!("Can't find an Entity to attach to below {}", other.kind()),
            other,
        )),
    }
}

#[cfg(test)]
#[path = "attach_to_entity_test.rs"]
mod tests;
