//! Alpha-renaming so that no name is bound twice along any path
//!
//! Later phases substitute freely and assume there is no capture. This pass
//! walks the tree threading the set of names already bound, renaming each
//! binder that collides to `name1`, `name2`, ... and substituting the new name
//! into the binder's body. The branches of a union and the two bodies of a
//! group-by start from the same scope, so duplicated subtrees keep their names.

use cq_core::beta::{beta_reduce_query, rename_ident, BetaReduction};
use cq_core::collect::free_idents;
use cq_core::{Expr, Ident, OrderField, Query, SelectSource, XrFold};
use std::collections::HashSet;
use std::convert::Infallible;

/// Names already bound in the part of the tree visited so far
pub type Scope = HashSet<String>;

/// Renames colliding binders
#[derive(Debug, Clone, Copy, Default)]
pub struct AvoidAliasConflict {
    detemp: bool,
}

/// Sources that introduce no binder of their own
pub fn is_unaliased(q: &Query) -> bool {
    match q {
        Query::Entity { .. } | Query::Infix(_) => true,
        Query::Nested { head }
        | Query::Take { head, .. }
        | Query::Drop { head, .. }
        | Query::Distinct { head } => is_unaliased(head),
        _ => false,
    }
}

impl AvoidAliasConflict {
    /// `detemp` also renames compiler-generated `[tmp_...]` binders to `x`
    pub fn new(detemp: bool) -> Self {
        Self { detemp }
    }

    /// Rename binders of `q`. Free identifiers of `q` count as already bound.
    pub fn apply(q: &Query, detemp: bool) -> Query {
        let scope = free_idents(q).into_iter().map(|id| id.name).collect();
        Self::new(detemp).apply_in(q, scope).0
    }

    /// Rename binders of `q` given the names already bound, returning the
    /// extended scope
    pub fn apply_in(&self, q: &Query, scope: Scope) -> (Query, Scope) {
        let mut scope = scope;
        let renamed = self.query(q, &mut scope);
        (renamed, scope)
    }

    fn fresh(&self, id: &Ident, scope: &Scope) -> Ident {
        let base = if self.detemp && id.is_temporary() {
            "x"
        } else {
            id.name.as_str()
        };
        if !scope.contains(base) {
            return id.with_name(base);
        }
        let mut n = 1usize;
        loop {
            let candidate = format!("{}{}", base, n);
            if !scope.contains(&candidate) {
                return id.with_name(candidate);
            }
            n += 1;
        }
    }

    fn bind(&self, id: &Ident, scope: &mut Scope) -> Ident {
        let fresh = self.fresh(id, scope);
        scope.insert(fresh.name.clone());
        fresh
    }

    fn bind_expr(&self, id: &Ident, body: &Expr, scope: &mut Scope) -> (Ident, Expr) {
        let fresh = self.bind(id, scope);
        let body = if fresh.name == id.name {
            body.clone()
        } else {
            rename_ident(body, id, &fresh)
        };
        let body = self.expr(&body, scope);
        (fresh, body)
    }

    fn head(&self, head: &Query, scope: &mut Scope) -> Box<Query> {
        Box::new(if is_unaliased(head) {
            head.clone()
        } else {
            self.query(head, scope)
        })
    }

    /// Set-operation branches never exchange rows by substitution, so each
    /// starts from the same scope. Later siblings see the names of both.
    fn branches(&self, a: &Query, b: &Query, scope: &mut Scope) -> (Box<Query>, Box<Query>) {
        let mut left = scope.clone();
        let mut right = scope.clone();
        let a = self.query(a, &mut left);
        let b = self.query(b, &mut right);
        scope.extend(left);
        scope.extend(right);
        (Box::new(a), Box::new(b))
    }

    fn expr(&self, e: &Expr, scope: &mut Scope) -> Expr {
        e.map_children(&mut ScopedFold { pass: self, scope })
    }

    fn query(&self, q: &Query, scope: &mut Scope) -> Query {
        match q {
            Query::Map { head, id, body } => {
                let head = self.head(head, scope);
                let (id, body) = self.bind_expr(id, body, scope);
                Query::Map {
                    head,
                    id,
                    body: Box::new(body),
                }
            }
            Query::ConcatMap { head, id, body } => {
                let head = self.head(head, scope);
                let (id, body) = self.bind_expr(id, body, scope);
                Query::ConcatMap {
                    head,
                    id,
                    body: Box::new(body),
                }
            }
            Query::Filter { head, id, body } => {
                let head = self.head(head, scope);
                let (id, body) = self.bind_expr(id, body, scope);
                Query::Filter {
                    head,
                    id,
                    body: Box::new(body),
                }
            }
            Query::DistinctOn { head, id, by } => {
                let head = self.head(head, scope);
                let (id, by) = self.bind_expr(id, by, scope);
                Query::DistinctOn {
                    head,
                    id,
                    by: Box::new(by),
                }
            }
            Query::FlatJoin {
                join_type,
                head,
                id,
                on,
            } => {
                let head = self.head(head, scope);
                let (id, on) = self.bind_expr(id, on, scope);
                Query::FlatJoin {
                    join_type: *join_type,
                    head,
                    id,
                    on: Box::new(on),
                }
            }
            Query::FlatMap { head, id, body } => {
                let head = self.head(head, scope);
                let fresh = self.bind(id, scope);
                let body = if fresh.name == id.name {
                    body.as_ref().clone()
                } else {
                    beta_reduce_query(body, id, &Expr::ident(&fresh))
                };
                let body = self.query(&body, scope);
                Query::FlatMap {
                    head,
                    id: fresh,
                    body: Box::new(body),
                }
            }
            Query::SortBy { head, id, criteria } => {
                let head = self.head(head, scope);
                let fresh = self.bind(id, scope);
                let criteria = criteria
                    .iter()
                    .map(|c| {
                        let field = rename_ident(&c.field, id, &fresh);
                        OrderField::new(self.expr(&field, scope), c.ordering)
                    })
                    .collect();
                Query::SortBy {
                    head,
                    id: fresh,
                    criteria,
                }
            }
            Query::GroupByMap {
                head,
                by_alias,
                by_body,
                map_alias,
                map_body,
            } => {
                let head = self.head(head, scope);
                let mut by_scope = scope.clone();
                let mut map_scope = scope.clone();
                let (by_alias, by_body) = self.bind_expr(by_alias, by_body, &mut by_scope);
                let (map_alias, map_body) = self.bind_expr(map_alias, map_body, &mut map_scope);
                scope.extend(by_scope);
                scope.extend(map_scope);
                Query::GroupByMap {
                    head,
                    by_alias,
                    by_body: Box::new(by_body),
                    map_alias,
                    map_body: Box::new(map_body),
                }
            }
            Query::Union { a, b } => {
                let (a, b) = self.branches(a, b, scope);
                Query::Union { a, b }
            }
            Query::UnionAll { a, b } => {
                let (a, b) = self.branches(a, b, scope);
                Query::UnionAll { a, b }
            }
            Query::CustomQueryRef(select) => {
                let mut select = select.as_ref().clone();
                for i in 0..select.sources.len() {
                    let query = self.query(select.sources[i].query(), scope);
                    let alias = select.sources[i].alias().clone();
                    match &mut select.sources[i] {
                        SelectSource::From { query: q, .. } | SelectSource::Join { query: q, .. } => {
                            *q = query
                        }
                    }
                    let fresh = self.bind(&alias, scope);
                    if fresh.name != alias.name {
                        select = BetaReduction::rename_select_source(&select, i, &fresh);
                    }
                    if let SelectSource::Join { on, .. } = &mut select.sources[i] {
                        *on = self.expr(on, scope);
                    }
                }
                select.where_clause = select.where_clause.map(|e| self.expr(&e, scope));
                select.group_by = select.group_by.map(|e| self.expr(&e, scope));
                select.sort_by = select
                    .sort_by
                    .iter()
                    .map(|c| OrderField::new(self.expr(&c.field, scope), c.ordering))
                    .collect();
                select.select = self.expr(&select.select, scope);
                Query::CustomQueryRef(Box::new(select))
            }
            _ => q.map_children(&mut ScopedFold { pass: self, scope }),
        }
    }
}

struct ScopedFold<'a> {
    pass: &'a AvoidAliasConflict,
    scope: &'a mut Scope,
}

impl XrFold for ScopedFold<'_> {
    type Error = Infallible;

    fn fold_query(&mut self, q: &Query) -> Result<Query, Infallible> {
        Ok(self.pass.query(q, self.scope))
    }

    fn fold_expr(&mut self, e: &Expr) -> Result<Expr, Infallible> {
        Ok(self.pass.expr(e, self.scope))
    }
}

#[cfg(test)]
#[path = "avoid_alias_conflict_test.rs"]
mod tests;
