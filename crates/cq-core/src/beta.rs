//! Substitution with beta reduction
//!
//! [`BetaReduction`] replaces identifiers by expressions and, while doing so,
//! simplifies the redexes the substitution exposes: field access on a row
//! constructor, application of a lambda and inlining of block variables.
//! Substitution stops at binders that shadow a replaced name.

use crate::xr::{Expr, Ident, OrderField, Query, SelectClause, SelectSource, XrFold};
use std::borrow::Cow;
use std::convert::Infallible;

/// Identifier-to-expression substitution with standard reductions
#[derive(Debug, Clone, Default)]
pub struct BetaReduction {
    replacements: Vec<(Ident, Expr)>,
}

/// Substitute `replacement` for `id` in `e`
pub fn beta_reduce(e: &Expr, id: &Ident, replacement: &Expr) -> Expr {
    BetaReduction::single(id, replacement.clone()).reduce_expr(e)
}

/// Substitute `replacement` for `id` in `q`
pub fn beta_reduce_query(q: &Query, id: &Ident, replacement: &Expr) -> Query {
    BetaReduction::single(id, replacement.clone()).reduce_query(q)
}

/// Rename `from` to `to` inside `e`, keeping the type carried by `to`
pub fn rename_ident(e: &Expr, from: &Ident, to: &Ident) -> Expr {
    beta_reduce(e, from, &Expr::ident(to))
}

impl BetaReduction {
    /// Substitution from an ordered list of replacements
    pub fn new(replacements: Vec<(Ident, Expr)>) -> Self {
        Self { replacements }
    }

    /// Substitution of a single identifier
    pub fn single(id: &Ident, replacement: Expr) -> Self {
        Self::new(vec![(id.clone(), replacement)])
    }

    /// No substitution, reductions only
    pub fn empty() -> Self {
        Self::default()
    }

    fn lookup(&self, id: &Ident) -> Option<&Expr> {
        self.replacements
            .iter()
            .rev()
            .find(|(key, _)| key == id)
            .map(|(_, value)| value)
    }

    fn with(&self, id: Ident, replacement: Expr) -> BetaReduction {
        let mut replacements: Vec<(Ident, Expr)> = self
            .replacements
            .iter()
            .filter(|(key, _)| *key != id)
            .cloned()
            .collect();
        replacements.push((id, replacement));
        BetaReduction { replacements }
    }

    /// The substitution that applies under binders `ids`
    fn shadowed(&self, ids: &[&Ident]) -> Cow<'_, BetaReduction> {
        if self
            .replacements
            .iter()
            .any(|(key, _)| ids.iter().any(|id| *id == key))
        {
            Cow::Owned(BetaReduction {
                replacements: self
                    .replacements
                    .iter()
                    .filter(|(key, _)| !ids.iter().any(|id| *id == key))
                    .cloned()
                    .collect(),
            })
        } else {
            Cow::Borrowed(self)
        }
    }

    /// Substitute and reduce inside an expression
    pub fn reduce_expr(&self, e: &Expr) -> Expr {
        match e {
            Expr::Ident(id) => self.lookup(id).cloned().unwrap_or_else(|| e.clone()),
            Expr::Property { of, name } => {
                let of = self.reduce_expr(of);
                if let Expr::Product { fields, .. } = &of {
                    if let Some((_, value)) = fields.iter().find(|(field, _)| field == name) {
                        return value.clone();
                    }
                }
                Expr::Property {
                    of: Box::new(of),
                    name: name.clone(),
                }
            }
            Expr::FunctionN { params, body } => {
                let bound: Vec<&Ident> = params.iter().collect();
                Expr::FunctionN {
                    params: params.clone(),
                    body: Box::new(self.shadowed(&bound).reduce_expr(body)),
                }
            }
            Expr::FunctionApply { function, args } => {
                let function = self.reduce_expr(function);
                let args: Vec<Expr> = args.iter().map(|a| self.reduce_expr(a)).collect();
                match function {
                    Expr::FunctionN { params, body } if params.len() == args.len() => {
                        BetaReduction::new(params.into_iter().zip(args).collect())
                            .reduce_expr(&body)
                    }
                    function => Expr::FunctionApply {
                        function: Box::new(function),
                        args,
                    },
                }
            }
            Expr::Block { variables, output } => {
                let mut scope = self.clone();
                for variable in variables {
                    let rhs = scope.reduce_expr(&variable.rhs);
                    scope = scope.with(variable.name.clone(), rhs);
                }
                scope.reduce_expr(output)
            }
            _ => {
                let mut folder = self;
                e.map_children(&mut folder)
            }
        }
    }

    /// Substitute and reduce inside a query
    pub fn reduce_query(&self, q: &Query) -> Query {
        match q {
            Query::Map { head, id, body } => Query::Map {
                head: Box::new(self.reduce_query(head)),
                id: id.clone(),
                body: Box::new(self.shadowed(&[id]).reduce_expr(body)),
            },
            Query::FlatMap { head, id, body } => Query::FlatMap {
                head: Box::new(self.reduce_query(head)),
                id: id.clone(),
                body: Box::new(self.shadowed(&[id]).reduce_query(body)),
            },
            Query::ConcatMap { head, id, body } => Query::ConcatMap {
                head: Box::new(self.reduce_query(head)),
                id: id.clone(),
                body: Box::new(self.shadowed(&[id]).reduce_expr(body)),
            },
            Query::Filter { head, id, body } => Query::Filter {
                head: Box::new(self.reduce_query(head)),
                id: id.clone(),
                body: Box::new(self.shadowed(&[id]).reduce_expr(body)),
            },
            Query::SortBy { head, id, criteria } => {
                let inner = self.shadowed(&[id]);
                Query::SortBy {
                    head: Box::new(self.reduce_query(head)),
                    id: id.clone(),
                    criteria: criteria
                        .iter()
                        .map(|c| OrderField::new(inner.reduce_expr(&c.field), c.ordering))
                        .collect(),
                }
            }
            Query::GroupByMap {
                head,
                by_alias,
                by_body,
                map_alias,
                map_body,
            } => Query::GroupByMap {
                head: Box::new(self.reduce_query(head)),
                by_alias: by_alias.clone(),
                by_body: Box::new(self.shadowed(&[by_alias]).reduce_expr(by_body)),
                map_alias: map_alias.clone(),
                map_body: Box::new(self.shadowed(&[map_alias]).reduce_expr(map_body)),
            },
            Query::DistinctOn { head, id, by } => Query::DistinctOn {
                head: Box::new(self.reduce_query(head)),
                id: id.clone(),
                by: Box::new(self.shadowed(&[id]).reduce_expr(by)),
            },
            Query::FlatJoin {
                join_type,
                head,
                id,
                on,
            } => Query::FlatJoin {
                join_type: *join_type,
                head: Box::new(self.reduce_query(head)),
                id: id.clone(),
                on: Box::new(self.shadowed(&[id]).reduce_expr(on)),
            },
            Query::CustomQueryRef(select) => {
                Query::CustomQueryRef(Box::new(self.reduce_select_clause(select)))
            }
            _ => {
                let mut folder = self;
                q.map_children(&mut folder)
            }
        }
    }

    /// Substitute and reduce inside a select clause, honouring source scopes
    pub fn reduce_select_clause(&self, select: &SelectClause) -> SelectClause {
        let mut scope = Cow::Borrowed(self);
        let mut sources = Vec::with_capacity(select.sources.len());
        for source in &select.sources {
            match source {
                SelectSource::From { query, alias } => {
                    let query = scope.reduce_query(query);
                    scope = Cow::Owned(scope.shadowed(&[alias]).into_owned());
                    sources.push(SelectSource::From {
                        query,
                        alias: alias.clone(),
                    });
                }
                SelectSource::Join {
                    join_type,
                    query,
                    alias,
                    on,
                } => {
                    let query = scope.reduce_query(query);
                    scope = Cow::Owned(scope.shadowed(&[alias]).into_owned());
                    sources.push(SelectSource::Join {
                        join_type: *join_type,
                        query,
                        alias: alias.clone(),
                        on: scope.reduce_expr(on),
                    });
                }
            }
        }
        SelectClause {
            sources,
            where_clause: select.where_clause.as_ref().map(|e| scope.reduce_expr(e)),
            group_by: select.group_by.as_ref().map(|e| scope.reduce_expr(e)),
            sort_by: select
                .sort_by
                .iter()
                .map(|c| OrderField::new(scope.reduce_expr(&c.field), c.ordering))
                .collect(),
            select: scope.reduce_expr(&select.select),
        }
    }

    /// Rename the alias of source `index` to `to`, substituting it in its own
    /// join condition and in everything that follows
    pub fn rename_select_source(select: &SelectClause, index: usize, to: &Ident) -> SelectClause {
        let Some(from) = select.sources.get(index).map(|s| s.alias().clone()) else {
            return select.clone();
        };
        let rename = BetaReduction::single(&from, Expr::ident(to));
        let mut sources = Vec::with_capacity(select.sources.len());
        let mut active = true;
        for (i, source) in select.sources.iter().enumerate() {
            if i < index || !active {
                sources.push(source.clone());
                continue;
            }
            let rebinds = i > index && source.alias() == &from;
            let (query, on) = match source {
                SelectSource::From { query, .. } => (query, None),
                SelectSource::Join { query, on, .. } => (query, Some(on)),
            };
            let query = if i == index {
                query.clone()
            } else {
                rename.reduce_query(query)
            };
            let on = on.map(|on| {
                if rebinds {
                    on.clone()
                } else {
                    rename.reduce_expr(on)
                }
            });
            let alias = if i == index {
                to.clone()
            } else {
                source.alias().clone()
            };
            sources.push(match (source, on) {
                (SelectSource::Join { join_type, .. }, Some(on)) => SelectSource::Join {
                    join_type: *join_type,
                    query,
                    alias,
                    on,
                },
                _ => SelectSource::From { query, alias },
            });
            if rebinds {
                active = false;
            }
        }
        let apply = |e: &Expr| {
            if active {
                rename.reduce_expr(e)
            } else {
                e.clone()
            }
        };
        SelectClause {
            sources,
            where_clause: select.where_clause.as_ref().map(apply),
            group_by: select.group_by.as_ref().map(apply),
            sort_by: select
                .sort_by
                .iter()
                .map(|c| OrderField::new(apply(&c.field), c.ordering))
                .collect(),
            select: apply(&select.select),
        }
    }
}

impl XrFold for &BetaReduction {
    type Error = Infallible;

    fn fold_query(&mut self, q: &Query) -> Result<Query, Infallible> {
        Ok(self.reduce_query(q))
    }

    fn fold_expr(&mut self, e: &Expr) -> Result<Expr, Infallible> {
        Ok(self.reduce_expr(e))
    }
}

#[cfg(test)]
#[path = "beta_test.rs"]
mod tests;
