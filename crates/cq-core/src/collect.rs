//! Read-only scans over XR trees

use crate::xr::{CallType, Expr, Ident, Query, SelectSource, XrRef, BID, XR};

/// True if `pred` holds for `node` or any node below it
pub fn exists<'a>(node: XrRef<'a>, pred: &mut dyn FnMut(XrRef<'a>) -> bool) -> bool {
    if pred(node) {
        return true;
    }
    let mut found = false;
    node.for_each_child(&mut |child| {
        if !found {
            found = exists(child, pred);
        }
    });
    found
}

/// True if substituting `e` into several places could change the result:
/// aggregations, impure calls and impure infix fragments anywhere below `e`
pub fn contains_impurities(e: &Expr) -> bool {
    exists(XrRef::Expr(e), &mut |node| match node {
        XrRef::Expr(Expr::MethodCall { call_type, .. })
        | XrRef::Expr(Expr::GlobalCall { call_type, .. }) => {
            call_type.is_aggregator() || *call_type == CallType::ImpureFunction
        }
        XrRef::Expr(Expr::Infix(infix)) => !infix.pure,
        XrRef::Query(Query::Infix(infix)) => !infix.pure,
        _ => false,
    })
}

/// True if an impure infix fragment appears anywhere below `e`
pub fn contains_impure_infix(e: &Expr) -> bool {
    exists(XrRef::Expr(e), &mut |node| match node {
        XrRef::Expr(Expr::Infix(infix)) => !infix.pure,
        XrRef::Query(Query::Infix(infix)) => !infix.pure,
        _ => false,
    })
}

/// True if `e` aggregates rows of the query it is evaluated in.
///
/// Subqueries are not entered: an aggregation inside a subquery belongs to
/// that subquery.
pub fn is_aggregation(e: &Expr) -> bool {
    match e {
        Expr::MethodCall { call_type, .. } | Expr::GlobalCall { call_type, .. }
            if *call_type == CallType::Aggregator =>
        {
            true
        }
        Expr::QueryToExpr(_) => false,
        _ => {
            let mut found = false;
            e.for_each_child(&mut |child| {
                if let XrRef::Expr(child) = child {
                    found = found || is_aggregation(child);
                }
            });
            found
        }
    }
}

/// Runtime parameter ids in traversal order
pub fn collect_params(xr: &XR) -> Vec<BID> {
    let mut params = Vec::new();
    exists(XrRef::from(xr), &mut |node| {
        if let XrRef::Expr(Expr::TagForParam { id, .. }) = node {
            params.push(id.clone());
        }
        false
    });
    params
}

/// Identifiers referenced but not bound inside `q`, in first-use order
pub fn free_idents(q: &Query) -> Vec<Ident> {
    let mut bound = Vec::new();
    let mut free = Vec::new();
    free_in_query(q, &mut bound, &mut free);
    free
}

/// Identifiers referenced but not bound inside `e`, in first-use order
pub fn free_idents_expr(e: &Expr) -> Vec<Ident> {
    let mut bound = Vec::new();
    let mut free = Vec::new();
    free_in_expr(e, &mut bound, &mut free);
    free
}

fn under<F: FnOnce(&mut Vec<Ident>)>(bound: &mut Vec<Ident>, ids: &[&Ident], f: F) {
    let depth = bound.len();
    bound.extend(ids.iter().map(|id| (*id).clone()));
    f(bound);
    bound.truncate(depth);
}

fn free_in_children(node: XrRef<'_>, bound: &mut Vec<Ident>, free: &mut Vec<Ident>) {
    node.for_each_child(&mut |child| match child {
        XrRef::Query(q) => free_in_query(q, bound, free),
        XrRef::Expr(e) => free_in_expr(e, bound, free),
    });
}

fn free_in_query(q: &Query, bound: &mut Vec<Ident>, free: &mut Vec<Ident>) {
    match q {
        Query::Map { head, id, body }
        | Query::ConcatMap { head, id, body }
        | Query::Filter { head, id, body } => {
            free_in_query(head, bound, free);
            under(bound, &[id], |b| free_in_expr(body, b, free));
        }
        Query::FlatMap { head, id, body } => {
            free_in_query(head, bound, free);
            under(bound, &[id], |b| free_in_query(body, b, free));
        }
        Query::SortBy { head, id, criteria } => {
            free_in_query(head, bound, free);
            under(bound, &[id], |b| {
                criteria.iter().for_each(|c| free_in_expr(&c.field, b, free))
            });
        }
        Query::GroupByMap {
            head,
            by_alias,
            by_body,
            map_alias,
            map_body,
        } => {
            free_in_query(head, bound, free);
            under(bound, &[by_alias], |b| free_in_expr(by_body, b, free));
            under(bound, &[map_alias], |b| free_in_expr(map_body, b, free));
        }
        Query::DistinctOn { head, id, by } => {
            free_in_query(head, bound, free);
            under(bound, &[id], |b| free_in_expr(by, b, free));
        }
        Query::FlatJoin { head, id, on, .. } => {
            free_in_query(head, bound, free);
            under(bound, &[id], |b| free_in_expr(on, b, free));
        }
        Query::CustomQueryRef(select) => {
            let depth = bound.len();
            for source in &select.sources {
                free_in_query(source.query(), bound, free);
                bound.push(source.alias().clone());
                if let SelectSource::Join { on, .. } = source {
                    free_in_expr(on, bound, free);
                }
            }
            for e in select
                .where_clause
                .iter()
                .chain(select.group_by.iter())
                .chain(select.sort_by.iter().map(|c| &c.field))
                .chain(std::iter::once(&select.select))
            {
                free_in_expr(e, bound, free);
            }
            bound.truncate(depth);
        }
        _ => free_in_children(XrRef::Query(q), bound, free),
    }
}

fn free_in_expr(e: &Expr, bound: &mut Vec<Ident>, free: &mut Vec<Ident>) {
    match e {
        Expr::Ident(id) => {
            if !bound.contains(id) && !free.contains(id) {
                free.push(id.clone());
            }
        }
        Expr::FunctionN { params, body } => {
            let params: Vec<&Ident> = params.iter().collect();
            under(bound, &params, |b| free_in_expr(body, b, free));
        }
        Expr::Block { variables, output } => {
            let depth = bound.len();
            for variable in variables {
                free_in_expr(&variable.rhs, bound, free);
                bound.push(variable.name.clone());
            }
            free_in_expr(output, bound, free);
            bound.truncate(depth);
        }
        _ => free_in_children(XrRef::Expr(e), bound, free),
    }
}

#[cfg(test)]
#[path = "collect_test.rs"]
mod tests;
