//! Flattening of normalized queries into [`SqlQuery`]
//!
//! A `FlatMap` chain becomes the `FROM` list of one select: every head is a
//! row source or a `WHERE`/`GROUP BY`/`ORDER BY` unit, and the innermost
//! body decides the projection. An operator over a select fills one of its
//! clause slots while that slot is free and the select can absorb it;
//! otherwise the operand is nested as a subquery. Aliases that would clash
//! with an earlier source get a numeric suffix.

use crate::error::{SqlError, SqlResult};
use crate::model::{
    DistinctKind, FlattenSqlQuery, FromContext, OrderByCriteria, SelectValue, SetOperation,
    SqlQuery, SqlUnaryOperator,
};
use cq_core::collect::{contains_impurities, is_aggregation};
use cq_core::{
    beta_reduce_query, rename_ident, CallType, Expr, Ident, Infix, OrderField, Query,
    SelectClause, SelectSource, UnaryOperator, XRType, XrError, XR,
};

/// Column name given to the single unnamed value of a nested select
pub const VALUE_COLUMN: &str = "value";

/// Clauses collected from the heads of a `FlatMap` chain
#[derive(Debug, Clone, Default)]
struct Contexts {
    from: Vec<FromContext>,
    where_clause: Option<Expr>,
    group_by: Option<Expr>,
    order_by: Vec<OrderByCriteria>,
}

impl Contexts {
    fn is_empty(&self) -> bool {
        self.from.is_empty()
            && self.where_clause.is_none()
            && self.group_by.is_none()
            && self.order_by.is_empty()
    }

    fn has_alias(&self, alias: &str) -> bool {
        self.from.iter().any(|f| f.alias() == alias)
    }

    /// `wanted`, or `wanted` with the first numeric suffix not yet in use
    fn fresh_alias(&self, wanted: &str) -> String {
        if !self.has_alias(wanted) {
            return wanted.to_string();
        }
        let mut suffix = 1;
        loop {
            let candidate = format!("{}{}", wanted, suffix);
            if !self.has_alias(&candidate) {
                return candidate;
            }
            suffix += 1;
        }
    }

    fn and_where(&mut self, predicate: Expr) {
        self.where_clause = Some(and(self.where_clause.take(), predicate));
    }

    /// A select over these sources (plus `source`) with the collected clauses
    fn select(&self, source: Option<FromContext>, select: Vec<SelectValue>) -> FlattenSqlQuery {
        let mut from = self.from.clone();
        from.extend(source);
        FlattenSqlQuery {
            where_clause: self.where_clause.clone(),
            group_by: self.group_by.clone(),
            order_by: self.order_by.clone(),
            ..FlattenSqlQuery::new(from, select)
        }
    }
}

fn and(existing: Option<Expr>, predicate: Expr) -> Expr {
    match existing {
        Some(existing) => Expr::and(existing, predicate),
        None => predicate,
    }
}

/// Turns normalized XR into [`SqlQuery`] trees
#[derive(Debug, Clone)]
pub struct SqlQueryApply {
    default_alias: String,
}

impl Default for SqlQueryApply {
    fn default() -> Self {
        Self::new("x")
    }
}

impl SqlQueryApply {
    /// `default_alias` names sources that have no binder of their own
    pub fn new(default_alias: impl Into<String>) -> Self {
        Self {
            default_alias: default_alias.into(),
        }
    }

    /// Flatten a query or a top-level expression
    pub fn apply(&self, xr: &XR) -> SqlResult<SqlQuery> {
        match xr {
            XR::Query(q) => self.query(q),
            XR::Expr(e) => self.expr(e),
        }
    }

    /// Flatten a query
    pub fn query(&self, q: &Query) -> SqlResult<SqlQuery> {
        match q {
            Query::Union { a, b } => self.set_operation(a, SetOperation::Union, b),
            Query::UnionAll { a, b } => self.set_operation(a, SetOperation::UnionAll, b),
            Query::Map { head, id, body }
                if body.is_ident_of(id) && !matches!(head.as_ref(), Query::FlatJoin { .. }) =>
            {
                self.query(head)
            }
            Query::RuntimeQueryBind { .. } => Err(SqlError::not_normalized(q)),
            _ => Ok(SqlQuery::Flatten(self.flatten(q, &self.default_alias)?)),
        }
    }

    /// Flatten a top-level expression: `EXISTS` checks, query aggregations
    /// and plain values selected without a `FROM`
    pub fn expr(&self, e: &Expr) -> SqlResult<SqlQuery> {
        match e {
            Expr::UnaryOp {
                op: op @ (UnaryOperator::IsEmpty | UnaryOperator::NonEmpty),
                expr,
            } => match expr.as_ref() {
                Expr::QueryToExpr(q) => Ok(SqlQuery::UnaryOperation {
                    op: if *op == UnaryOperator::IsEmpty {
                        SqlUnaryOperator::NotExists
                    } else {
                        SqlUnaryOperator::Exists
                    },
                    query: Box::new(self.query(q)?),
                }),
                _ => Err(XrError::parse_shape(format!("{} applies to queries only", op), e).into()),
            },
            Expr::MethodCall {
                head,
                name,
                call_type: CallType::QueryAggregator,
                ..
            } => match head.as_ref() {
                Expr::QueryToExpr(q) => self.query_aggregation(q, name),
                _ => Ok(select_without_from(e)),
            },
            Expr::QueryToExpr(q) => self.query(q),
            other => Ok(select_without_from(other)),
        }
    }

    /// `SELECT op(column) FROM ...` when `q` selects one plain column,
    /// otherwise `SELECT op(...) FROM (q) AS alias`
    pub fn query_aggregation(&self, q: &Query, name: &str) -> SqlResult<SqlQuery> {
        let function = aggregate_function(name);
        let inner = match self.query(q)? {
            SqlQuery::Flatten(mut f) if aggregates_in_place(&f, &function) => {
                if let Some(column) = f.select.pop() {
                    f.select = vec![SelectValue::new(aggregate(&function, column.expr))];
                }
                return Ok(SqlQuery::Flatten(f));
            }
            other => other,
        };
        let alias = self.default_alias.clone();
        let value = Expr::Ident(Ident::new(alias.clone(), q.ty()));
        Ok(SqlQuery::Flatten(FlattenSqlQuery::new(
            vec![FromContext::Query {
                query: nested(inner),
                alias,
            }],
            vec![SelectValue::new(aggregate(&function, value))],
        )))
    }

    fn set_operation(&self, a: &Query, op: SetOperation, b: &Query) -> SqlResult<SqlQuery> {
        Ok(SqlQuery::SetOperation {
            a: Box::new(self.query(a)?),
            op,
            b: Box::new(self.query(b)?),
        })
    }

    fn flatten(&self, q: &Query, alias: &str) -> SqlResult<FlattenSqlQuery> {
        let mut ctx = Contexts::default();
        let tail = self.collect_contexts(q, &mut ctx)?;
        self.flatten_with(&ctx, &tail, alias)
    }

    /// Walk a `FlatMap` chain, recording sources and units, and return the
    /// innermost body
    fn collect_contexts(&self, q: &Query, ctx: &mut Contexts) -> SqlResult<Query> {
        let Query::FlatMap { head, id, body } = q else {
            return Ok(q.clone());
        };
        let alias = match head.as_ref() {
            Query::FlatJoin { id: join_id, .. } => ctx.fresh_alias(&join_id.name),
            _ => ctx.fresh_alias(&id.name),
        };
        match head.as_ref() {
            Query::FlatFilter { by } => ctx.and_where(by.as_ref().clone()),
            Query::FlatGroupBy { by } => {
                if ctx.group_by.is_some() {
                    return Err(XrError::parse_shape("a chain may only group once", q).into());
                }
                ctx.group_by = Some(by.as_ref().clone());
            }
            Query::FlatSortBy { criteria } => {
                if !ctx.order_by.is_empty() {
                    return Err(XrError::parse_shape("a chain may only sort once", q).into());
                }
                ctx.order_by = order_by_criteria(criteria);
            }
            Query::Filter {
                head: source,
                id: filter_id,
                body: predicate,
            } if matches!(source.as_ref(), Query::Entity { .. } | Query::Infix(_)) => {
                ctx.from.push(self.source(source, &alias)?);
                ctx.and_where(rename_ident(predicate, filter_id, &filter_id.with_name(&alias)));
            }
            Query::FlatJoin { .. } => {
                if ctx.from.is_empty() {
                    return Err(XrError::parse_shape("a join needs a preceding source", q).into());
                }
                let source = self.join_source(head, &alias)?;
                ctx.from.push(source);
            }
            other => {
                let source = self.source(other, &alias)?;
                ctx.from.push(source);
            }
        }

        let mut body = if alias == id.name {
            body.as_ref().clone()
        } else {
            beta_reduce_query(body, id, &Expr::Ident(id.with_name(&alias)))
        };
        if matches!(
            body,
            Query::FlatFilter { .. } | Query::FlatGroupBy { .. } | Query::FlatSortBy { .. }
        ) {
            return Err(XrError::parse_shape("a chain cannot end in a clause", q).into());
        }
        if matches!(body, Query::Infix(_)) {
            return Err(XrError::structural("an infix cannot be the body of a flatMap", q).into());
        }
        if let Query::FlatJoin { id: join_id, .. } = &body {
            let join_id = join_id.clone();
            body = Query::map(body, join_id.clone(), Expr::Ident(join_id));
        }
        self.collect_contexts(&body, ctx)
    }

    /// The select that `q` contributes, given the sources collected so far
    fn flatten_with(&self, ctx: &Contexts, q: &Query, alias: &str) -> SqlResult<FlattenSqlQuery> {
        if !ctx.from.is_empty() && reshapes_rows(q) {
            return self.nest(ctx, q, alias);
        }
        match q {
            Query::Map { head, id, body } => {
                let aggregates = is_aggregation(body);
                let b = self.base(ctx, head, &id.name, false)?;
                let mut b = self.or_nest(ctx, head, &id.name, b, |b| {
                    whole_rows(b)
                        && !b.distinct.is_distinct()
                        && !b.has_aggregation()
                        && (!aggregates || bounds_free(b))
                })?;
                b.select = select_values(&rename_ident(body, id, &row_ident(&b, id)));
                Ok(b)
            }

            Query::ConcatMap { head, id, body } => {
                let b = self.base(ctx, head, &id.name, false)?;
                let mut b = self.or_nest(ctx, head, &id.name, b, |b| {
                    whole_rows(b)
                        && !b.distinct.is_distinct()
                        && !b.has_aggregation()
                        && b.limit.is_none()
                        && b.offset.is_none()
                })?;
                b.select = select_values(&rename_ident(body, id, &row_ident(&b, id)))
                    .into_iter()
                    .map(|value| SelectValue {
                        concat: true,
                        ..value
                    })
                    .collect();
                Ok(b)
            }

            Query::GroupByMap {
                head,
                by_alias,
                by_body,
                map_alias,
                map_body,
            } => {
                let b = self.base(ctx, head, &by_alias.name, false)?;
                let mut b = self.or_nest(ctx, head, &by_alias.name, b, |b| {
                    whole_rows(b)
                        && b.group_by.is_none()
                        && b.limit.is_none()
                        && b.offset.is_none()
                        && b.order_by.is_empty()
                        && !b.distinct.is_distinct()
                })?;
                let row = row_ident(&b, by_alias);
                b.group_by = Some(rename_ident(by_body, by_alias, &row));
                let map_row = map_alias.with_name(row.name.clone());
                b.select = select_values(&rename_ident(map_body, map_alias, &map_row));
                Ok(b)
            }

            Query::Filter { head, id, body } => {
                let b = self.base(ctx, head, &id.name, true)?;
                let mut b = self.or_nest(ctx, head, &id.name, b, |b| {
                    whole_rows(b)
                        && b.limit.is_none()
                        && b.offset.is_none()
                        && b.group_by.is_none()
                        && !matches!(b.distinct, DistinctKind::DistinctOn(_))
                })?;
                let predicate = rename_ident(body, id, &row_ident(&b, id));
                b.where_clause = Some(and(b.where_clause.take(), predicate));
                Ok(b)
            }

            Query::SortBy { head, id, criteria } => {
                let b = self.base(ctx, head, &id.name, false)?;
                let mut b = self.or_nest(ctx, head, &id.name, b, |b| {
                    whole_rows(b)
                        && b.order_by.is_empty()
                        && b.limit.is_none()
                        && b.offset.is_none()
                        && b.group_by.is_none()
                        && !b.distinct.is_distinct()
                })?;
                let row = row_ident(&b, id);
                let criteria: Vec<OrderField> = criteria
                    .iter()
                    .map(|c| OrderField::new(rename_ident(&c.field, id, &row), c.ordering))
                    .collect();
                b.order_by.extend(order_by_criteria(&criteria));
                Ok(b)
            }

            Query::Take { head, num } => {
                let b = self.base(ctx, head, alias, false)?;
                let mut b = self.or_nest(ctx, head, alias, b, |b| b.limit.is_none())?;
                b.limit = Some(num.as_ref().clone());
                Ok(b)
            }

            Query::Drop { head, num } => {
                let b = self.base(ctx, head, alias, false)?;
                let mut b = self.or_nest(ctx, head, alias, b, |b| {
                    b.offset.is_none() && b.limit.is_none()
                })?;
                b.offset = Some(num.as_ref().clone());
                Ok(b)
            }

            Query::Distinct { head } => {
                let b = self.base(ctx, head, alias, false)?;
                let mut b = self.or_nest(ctx, head, alias, b, |b| {
                    b.limit.is_none()
                        && b.offset.is_none()
                        && b.order_by.is_empty()
                        && !b.distinct.is_distinct()
                })?;
                b.distinct = DistinctKind::Distinct;
                Ok(b)
            }

            Query::DistinctOn { head, id, by } => {
                let b = self.base(ctx, head, &id.name, false)?;
                let mut b = self.or_nest(ctx, head, &id.name, b, |b| {
                    whole_rows(b)
                        && b.limit.is_none()
                        && b.offset.is_none()
                        && b.group_by.is_none()
                        && b.order_by.is_empty()
                        && !b.distinct.is_distinct()
                })?;
                let keys = match rename_ident(by, id, &row_ident(&b, id)) {
                    Expr::Product { fields, .. } => fields.into_iter().map(|(_, e)| e).collect(),
                    key => vec![key],
                };
                b.distinct = DistinctKind::DistinctOn(keys);
                Ok(b)
            }

            Query::CustomQueryRef(select) if ctx.from.is_empty() => self.select_clause(select),
            Query::CustomQueryRef(_) => self.nest(ctx, q, alias),

            Query::RuntimeQueryBind { .. }
            | Query::FlatFilter { .. }
            | Query::FlatGroupBy { .. }
            | Query::FlatSortBy { .. } => Err(SqlError::not_normalized(q)),

            Query::FlatJoin { id, .. } => {
                if ctx.from.is_empty() {
                    return Err(XrError::parse_shape("a join needs a preceding source", q).into());
                }
                let alias = ctx.fresh_alias(&id.name);
                let source = self.join_source(q, &alias)?;
                Ok(ctx.select(Some(source), vec![SelectValue::row(&alias, q.ty())]))
            }

            other => {
                let alias = ctx.fresh_alias(alias);
                let source = self.source(other, &alias)?;
                Ok(ctx.select(Some(source), vec![SelectValue::row(&alias, other.ty())]))
            }
        }
    }

    /// The select a consumer with binder `alias` builds on
    fn base(
        &self,
        ctx: &Contexts,
        q: &Query,
        alias: &str,
        nest_next_map: bool,
    ) -> SqlResult<FlattenSqlQuery> {
        match q {
            Query::GroupByMap { .. } | Query::ConcatMap { .. } => self.nest(ctx, q, alias),
            Query::Nested { head } => self.nest(ctx, head, alias),
            Query::Map { body, .. } if contains_impurities(body) => self.nest(ctx, q, alias),
            Query::Map { .. } if !nest_next_map => self.flatten_with(ctx, q, alias),
            Query::Filter { .. } | Query::Entity { .. } | Query::Infix(_) | Query::FlatJoin { .. } => {
                self.flatten_with(ctx, q, alias)
            }
            Query::FlatMap { .. } if ctx.is_empty() => self.flatten(q, alias),
            _ if ctx.is_empty() => self.flatten_with(ctx, q, alias),
            _ => self.nest(ctx, q, alias),
        }
    }

    /// Keep `b` when `fits` accepts it, otherwise select from `head` as a subquery
    fn or_nest(
        &self,
        ctx: &Contexts,
        head: &Query,
        alias: &str,
        b: FlattenSqlQuery,
        fits: impl Fn(&FlattenSqlQuery) -> bool,
    ) -> SqlResult<FlattenSqlQuery> {
        if fits(&b) {
            Ok(b)
        } else {
            log::trace!("nesting {} under alias {}", head.kind(), alias);
            self.nest(ctx, head, alias)
        }
    }

    /// Whole rows of `q` selected from a subquery
    fn nest(&self, ctx: &Contexts, q: &Query, alias: &str) -> SqlResult<FlattenSqlQuery> {
        let alias = ctx.fresh_alias(alias);
        let source = FromContext::Query {
            query: nested(self.query(q)?),
            alias: alias.clone(),
        };
        Ok(ctx.select(Some(source), vec![SelectValue::row(&alias, q.ty())]))
    }

    fn source(&self, q: &Query, alias: &str) -> SqlResult<FromContext> {
        match q {
            Query::Entity { name, .. } => Ok(FromContext::Table {
                entity: name.clone(),
                alias: alias.to_string(),
            }),
            Query::Infix(infix) => Ok(FromContext::Infix {
                infix: infix.clone(),
                alias: alias.to_string(),
            }),
            Query::Nested { head } => Ok(FromContext::Query {
                query: nested(self.query(head)?),
                alias: alias.to_string(),
            }),
            Query::FlatJoin { .. } => self.join_source(q, alias),
            Query::RuntimeQueryBind { .. }
            | Query::FlatFilter { .. }
            | Query::FlatGroupBy { .. }
            | Query::FlatSortBy { .. } => Err(SqlError::not_normalized(q)),
            other => Ok(FromContext::Query {
                query: nested(self.query(other)?),
                alias: alias.to_string(),
            }),
        }
    }

    fn join_source(&self, q: &Query, alias: &str) -> SqlResult<FromContext> {
        let Query::FlatJoin {
            join_type,
            head,
            id,
            on,
        } = q
        else {
            return Err(XrError::parse_shape("expected a join", q).into());
        };
        Ok(FromContext::FlatJoin {
            join_type: *join_type,
            from: Box::new(self.source(head, alias)?),
            on: rename_ident(on, id, &id.with_name(alias)),
        })
    }

    fn select_clause(&self, select: &SelectClause) -> SqlResult<FlattenSqlQuery> {
        if !matches!(select.sources.first(), Some(SelectSource::From { .. })) {
            return Err(XrError::parse_shape(
                "a select must start with a from source",
                &Query::CustomQueryRef(Box::new(select.clone())),
            )
            .into());
        }
        let mut from = Vec::with_capacity(select.sources.len());
        for source in &select.sources {
            from.push(match source {
                SelectSource::From { query, alias } => self.source(query, &alias.name)?,
                SelectSource::Join {
                    join_type,
                    query,
                    alias,
                    on,
                } => FromContext::FlatJoin {
                    join_type: *join_type,
                    from: Box::new(self.source(query, &alias.name)?),
                    on: on.clone(),
                },
            });
        }
        Ok(FlattenSqlQuery {
            where_clause: select.where_clause.clone(),
            group_by: select.group_by.clone(),
            order_by: order_by_criteria(&select.sort_by),
            ..FlattenSqlQuery::new(from, select_values(&select.select))
        })
    }
}

/// Operators whose result depends on the whole row set of their operand,
/// so they cannot share a select with the sources of an enclosing chain
fn reshapes_rows(q: &Query) -> bool {
    match q {
        Query::Take { .. }
        | Query::Drop { .. }
        | Query::Distinct { .. }
        | Query::DistinctOn { .. }
        | Query::GroupByMap { .. }
        | Query::Union { .. }
        | Query::UnionAll { .. } => true,
        Query::Map { body, .. } => is_aggregation(body),
        _ => false,
    }
}

fn select_without_from(e: &Expr) -> SqlQuery {
    SqlQuery::Flatten(FlattenSqlQuery::new(Vec::new(), select_values(e)))
}

fn whole_rows(b: &FlattenSqlQuery) -> bool {
    b.row_alias().is_some()
}

/// No `LIMIT`, `OFFSET` or `ORDER BY` that an aggregate would run ahead of
fn bounds_free(b: &FlattenSqlQuery) -> bool {
    b.limit.is_none() && b.offset.is_none() && b.order_by.is_empty()
}

/// `id` renamed to the row alias of `b`
fn row_ident(b: &FlattenSqlQuery, id: &Ident) -> Ident {
    match b.row_alias() {
        Some(row) => id.with_name(row),
        None => id.clone(),
    }
}

/// Box a query for use as a subquery, naming a lone unnamed column
fn nested(mut q: SqlQuery) -> Box<SqlQuery> {
    name_scalar_column(&mut q);
    Box::new(q)
}

fn name_scalar_column(q: &mut SqlQuery) {
    match q {
        SqlQuery::Flatten(f) => {
            if let [single] = f.select.as_mut_slice() {
                if single.alias.is_none() && !single.is_row() {
                    single.alias = Some(VALUE_COLUMN.to_string());
                }
            }
        }
        SqlQuery::SetOperation { a, b, .. } => {
            name_scalar_column(a);
            name_scalar_column(b);
        }
        SqlQuery::UnaryOperation { .. } => {}
    }
}

fn aggregate_function(name: &str) -> String {
    match name.to_ascii_lowercase().as_str() {
        "size" | "count" => "COUNT".to_string(),
        other => other.to_ascii_uppercase(),
    }
}

fn aggregates_in_place(f: &FlattenSqlQuery, function: &str) -> bool {
    match f.select.as_slice() {
        [single] => {
            !single.concat
                && (function == "COUNT" || !single.is_row())
                && !f.distinct.is_distinct()
                && f.limit.is_none()
                && f.offset.is_none()
                && f.group_by.is_none()
                && !f.has_aggregation()
        }
        _ => false,
    }
}

fn aggregate(function: &str, arg: Expr) -> Expr {
    if function == "COUNT" {
        return Expr::Infix(Infix::raw("COUNT(*)", true, XRType::Value));
    }
    Expr::GlobalCall {
        name: function.to_string(),
        args: vec![arg],
        call_type: CallType::Aggregator,
        ty: XRType::Value,
    }
}

/// Sort keys, with a row-valued key expanded into one key per field
pub fn order_by_criteria(criteria: &[OrderField]) -> Vec<OrderByCriteria> {
    criteria
        .iter()
        .flat_map(|c| match &c.field {
            Expr::Product { fields, .. } => fields
                .iter()
                .map(|(_, e)| OrderByCriteria {
                    expr: e.clone(),
                    ordering: c.ordering,
                })
                .collect::<Vec<_>>(),
            field => vec![OrderByCriteria {
                expr: field.clone(),
                ordering: c.ordering,
            }],
        })
        .collect()
}

/// Selected columns for a projected value.
///
/// Row constructors are expanded into one column per field, named by the
/// field path joined with `_`. A bare row reference stays a single
/// whole-row value unless it sits inside a row constructor.
pub fn select_values(e: &Expr) -> Vec<SelectValue> {
    let mut values = Vec::new();
    expand_select(e, None, &mut values);
    values
}

fn column_name(prefix: Option<&str>, field: &str) -> String {
    match prefix {
        Some(prefix) => format!("{}_{}", prefix, field),
        None => field.to_string(),
    }
}

fn expand_select(e: &Expr, prefix: Option<&str>, values: &mut Vec<SelectValue>) {
    match e {
        Expr::Product { fields, .. } => {
            for (field, value) in fields {
                expand_select(value, Some(&column_name(prefix, field)), values);
            }
        }
        Expr::Ident(_) | Expr::Property { .. } => match e.ty() {
            XRType::Product { fields, .. }
                if !fields.is_empty() && (prefix.is_some() || !matches!(e, Expr::Ident(_))) =>
            {
                for (field, _) in &fields {
                    expand_select(
                        &Expr::property(e.clone(), field.clone()),
                        Some(&column_name(prefix, field)),
                        values,
                    );
                }
            }
            _ => values.push(SelectValue {
                expr: e.clone(),
                alias: prefix.map(str::to_string),
                concat: false,
            }),
        },
        _ => values.push(SelectValue {
            expr: e.clone(),
            alias: prefix.map(str::to_string),
            concat: false,
        }),
    }
}

#[cfg(test)]
#[path = "flatten_test.rs"]
mod tests;
