//! Flat SQL query model
//!
//! [`SqlQuery`] is what flattening produces and what the idioms render. A
//! [`FlattenSqlQuery`] is one `SELECT` with every clause optional; set
//! operations and `EXISTS` wrappers combine them.

use cq_core::{Expr, Infix, JoinType, Ordering, XRType};

/// A SQL query ready for rendering
#[derive(Debug, Clone, PartialEq)]
pub enum SqlQuery {
    /// A single select
    Flatten(FlattenSqlQuery),
    /// `a UNION b` or `a UNION ALL b`
    SetOperation {
        /// Left operand
        a: Box<SqlQuery>,
        /// Operator
        op: SetOperation,
        /// Right operand
        b: Box<SqlQuery>,
    },
    /// `EXISTS (query)` or `NOT EXISTS (query)` selected as a value
    UnaryOperation {
        /// Operator
        op: SqlUnaryOperator,
        /// Operand
        query: Box<SqlQuery>,
    },
}

/// Set operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOperation {
    /// `UNION`
    Union,
    /// `UNION ALL`
    UnionAll,
}

/// Operators applied to a whole query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlUnaryOperator {
    /// `EXISTS`
    Exists,
    /// `NOT EXISTS`
    NotExists,
}

/// One `SELECT ... FROM ... WHERE ... GROUP BY ... ORDER BY ... LIMIT ... OFFSET ...`
#[derive(Debug, Clone, PartialEq)]
pub struct FlattenSqlQuery {
    /// Row sources in order
    pub from: Vec<FromContext>,
    /// Filter
    pub where_clause: Option<Expr>,
    /// Grouping key (a product key groups by each field)
    pub group_by: Option<Expr>,
    /// Sort keys
    pub order_by: Vec<OrderByCriteria>,
    /// Row limit
    pub limit: Option<Expr>,
    /// Rows skipped
    pub offset: Option<Expr>,
    /// Selected values
    pub select: Vec<SelectValue>,
    /// Duplicate elimination
    pub distinct: DistinctKind,
}

impl FlattenSqlQuery {
    /// A select with no clauses
    pub fn new(from: Vec<FromContext>, select: Vec<SelectValue>) -> Self {
        Self {
            from,
            where_clause: None,
            group_by: None,
            order_by: Vec::new(),
            limit: None,
            offset: None,
            select,
            distinct: DistinctKind::None,
        }
    }

    /// Name of the source whose whole row is selected, if the select is
    /// exactly one such row
    pub fn row_alias(&self) -> Option<&str> {
        match self.select.as_slice() {
            [SelectValue {
                expr: Expr::Ident(id),
                alias: None,
                concat: false,
            }] if self.from.iter().any(|f| f.alias() == id.name) => Some(&id.name),
            _ => None,
        }
    }

    /// True if any selected value aggregates rows
    pub fn has_aggregation(&self) -> bool {
        self.select
            .iter()
            .any(|s| cq_core::collect::is_aggregation(&s.expr))
    }
}

/// A row source in the `FROM` clause
#[derive(Debug, Clone, PartialEq)]
pub enum FromContext {
    /// A table
    Table {
        /// Table name
        entity: String,
        /// Row alias
        alias: String,
    },
    /// A subquery
    Query {
        /// Subquery
        query: Box<SqlQuery>,
        /// Row alias
        alias: String,
    },
    /// A raw SQL fragment used as a source
    Infix {
        /// Fragment
        infix: Infix,
        /// Row alias
        alias: String,
    },
    /// A joined source
    FlatJoin {
        /// Join kind
        join_type: JoinType,
        /// Joined source
        from: Box<FromContext>,
        /// Join condition
        on: Expr,
    },
}

impl FromContext {
    /// Alias under which the rows of this source are visible
    pub fn alias(&self) -> &str {
        match self {
            FromContext::Table { alias, .. }
            | FromContext::Query { alias, .. }
            | FromContext::Infix { alias, .. } => alias,
            FromContext::FlatJoin { from, .. } => from.alias(),
        }
    }
}

/// One selected value
#[derive(Debug, Clone, PartialEq)]
pub struct SelectValue {
    /// Value
    pub expr: Expr,
    /// Column alias
    pub alias: Option<String>,
    /// Unnest a collection-valued expression into rows
    pub concat: bool,
}

impl SelectValue {
    /// Unaliased value
    pub fn new(expr: Expr) -> Self {
        Self {
            expr,
            alias: None,
            concat: false,
        }
    }

    /// Value with a column alias
    pub fn aliased(expr: Expr, alias: impl Into<String>) -> Self {
        Self {
            expr,
            alias: Some(alias.into()),
            concat: false,
        }
    }

    /// The whole row bound to `alias`
    pub fn row(alias: &str, ty: XRType) -> Self {
        Self::new(Expr::Ident(cq_core::Ident::new(alias, ty)))
    }

    /// True if this selects a whole row rather than a column
    pub fn is_row(&self) -> bool {
        matches!(&self.expr, Expr::Ident(id) if !id.ty.is_scalar())
    }
}

/// One `ORDER BY` key
#[derive(Debug, Clone, PartialEq)]
pub struct OrderByCriteria {
    /// Key expression
    pub expr: Expr,
    /// Direction
    pub ordering: Ordering,
}

/// Duplicate elimination mode
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DistinctKind {
    /// Keep duplicates
    #[default]
    None,
    /// `SELECT DISTINCT`
    Distinct,
    /// `SELECT DISTINCT ON (keys)`
    DistinctOn(Vec<Expr>),
}

impl DistinctKind {
    /// True for both distinct forms
    pub fn is_distinct(&self) -> bool {
        !matches!(self, DistinctKind::None)
    }
}

#[cfg(test)]
#[path = "model_test.rs"]
mod tests;
