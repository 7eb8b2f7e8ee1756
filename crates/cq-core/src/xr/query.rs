//! Query nodes of the XR tree

use super::expr::{Expr, Infix};
use super::ident::{Ident, BID};
use super::types::XRType;
use std::fmt;

/// Relational query expressed as a comprehension.
///
/// Nodes with a binder (`id`) bind one row of `head` while evaluating their
/// body. The `Flat*` variants only appear inside `FlatMap` chains, where they
/// contribute a clause to the enclosing select rather than a row source.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// A table
    Entity {
        /// Table name
        name: String,
        /// Row type
        ty: XRType,
    },

    /// Projection `head.map { id -> body }`
    Map {
        /// Source
        head: Box<Query>,
        /// Row binder
        id: Ident,
        /// Projected value
        body: Box<Expr>,
    },

    /// Dependent join `head.flatMap { id -> body }`
    FlatMap {
        /// Outer source
        head: Box<Query>,
        /// Row binder
        id: Ident,
        /// Inner query evaluated per outer row
        body: Box<Query>,
    },

    /// Unnesting projection of a collection-valued expression
    ConcatMap {
        /// Source
        head: Box<Query>,
        /// Row binder
        id: Ident,
        /// Collection-valued expression
        body: Box<Expr>,
    },

    /// Row filter `head.filter { id -> body }`
    Filter {
        /// Source
        head: Box<Query>,
        /// Row binder
        id: Ident,
        /// Predicate
        body: Box<Expr>,
    },

    /// Ordering `head.sortBy { id -> criteria }`
    SortBy {
        /// Source
        head: Box<Query>,
        /// Row binder
        id: Ident,
        /// Sort keys in priority order
        criteria: Vec<OrderField>,
    },

    /// Grouping with a per-group projection
    GroupByMap {
        /// Source
        head: Box<Query>,
        /// Binder of the grouping expression
        by_alias: Ident,
        /// Grouping key
        by_body: Box<Expr>,
        /// Binder of the projection
        map_alias: Ident,
        /// Per-group projection (may contain aggregations)
        map_body: Box<Expr>,
    },

    /// First `num` rows
    Take {
        /// Source
        head: Box<Query>,
        /// Row count
        num: Box<Expr>,
    },

    /// All rows after the first `num`
    Drop {
        /// Source
        head: Box<Query>,
        /// Row count
        num: Box<Expr>,
    },

    /// Set union without duplicates
    Union {
        /// Left operand
        a: Box<Query>,
        /// Right operand
        b: Box<Query>,
    },

    /// Set union keeping duplicates
    UnionAll {
        /// Left operand
        a: Box<Query>,
        /// Right operand
        b: Box<Query>,
    },

    /// Duplicate elimination
    Distinct {
        /// Source
        head: Box<Query>,
    },

    /// Keep the first row per distinct key
    DistinctOn {
        /// Source
        head: Box<Query>,
        /// Row binder
        id: Ident,
        /// Key
        by: Box<Expr>,
    },

    /// Forces `head` to be rendered as its own subquery
    Nested {
        /// Source
        head: Box<Query>,
    },

    /// Join clause inside a `FlatMap` chain
    FlatJoin {
        /// Join kind
        join_type: JoinType,
        /// Joined source
        head: Box<Query>,
        /// Row binder of the joined source
        id: Ident,
        /// Join condition
        on: Box<Expr>,
    },

    /// `WHERE` clause inside a `FlatMap` chain
    FlatFilter {
        /// Predicate
        by: Box<Expr>,
    },

    /// `GROUP BY` clause inside a `FlatMap` chain
    FlatGroupBy {
        /// Grouping key
        by: Box<Expr>,
    },

    /// `ORDER BY` clause inside a `FlatMap` chain
    FlatSortBy {
        /// Sort keys in priority order
        criteria: Vec<OrderField>,
    },

    /// Raw SQL query template
    Infix(Infix),

    /// A select written with explicit clauses
    CustomQueryRef(Box<SelectClause>),

    /// Query supplied at runtime; cannot be compiled statically
    RuntimeQueryBind {
        /// Binding id
        id: BID,
        /// Row type
        ty: XRType,
    },
}

/// Join kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinType {
    /// Inner join
    Inner,
    /// Left outer join
    Left,
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinType::Inner => write!(f, "Inner"),
            JoinType::Left => write!(f, "Left"),
        }
    }
}

/// Sort directions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Ordering {
    /// Ascending
    #[default]
    Asc,
    /// Descending
    Desc,
    /// Ascending, nulls first
    AscNullsFirst,
    /// Descending, nulls first
    DescNullsFirst,
    /// Ascending, nulls last
    AscNullsLast,
    /// Descending, nulls last
    DescNullsLast,
}

impl fmt::Display for Ordering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ordering::Asc => write!(f, "Asc"),
            Ordering::Desc => write!(f, "Desc"),
            Ordering::AscNullsFirst => write!(f, "AscNullsFirst"),
            Ordering::DescNullsFirst => write!(f, "DescNullsFirst"),
            Ordering::AscNullsLast => write!(f, "AscNullsLast"),
            Ordering::DescNullsLast => write!(f, "DescNullsLast"),
        }
    }
}

/// One sort key
#[derive(Debug, Clone, PartialEq)]
pub struct OrderField {
    /// Key expression
    pub field: Expr,
    /// Direction
    pub ordering: Ordering,
}

impl OrderField {
    /// Create a sort key
    pub fn new(field: Expr, ordering: Ordering) -> Self {
        Self { field, ordering }
    }
}

/// A select with explicit `from`/`join` sources followed by clauses.
///
/// Each source alias is in scope for its own join condition and for every
/// later source and clause.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectClause {
    /// Row sources, the first must be a [`SelectSource::From`]
    pub sources: Vec<SelectSource>,
    /// Optional filter
    pub where_clause: Option<Expr>,
    /// Optional grouping key
    pub group_by: Option<Expr>,
    /// Sort keys
    pub sort_by: Vec<OrderField>,
    /// Projected value
    pub select: Expr,
}

/// One row source of a [`SelectClause`]
#[derive(Debug, Clone, PartialEq)]
pub enum SelectSource {
    /// `from(query) as alias`
    From {
        /// Source query
        query: Query,
        /// Row binder
        alias: Ident,
    },
    /// `join(query) as alias on condition`
    Join {
        /// Join kind
        join_type: JoinType,
        /// Joined query
        query: Query,
        /// Row binder
        alias: Ident,
        /// Join condition
        on: Expr,
    },
}

impl SelectSource {
    /// The source query
    pub fn query(&self) -> &Query {
        match self {
            SelectSource::From { query, .. } | SelectSource::Join { query, .. } => query,
        }
    }

    /// The row binder
    pub fn alias(&self) -> &Ident {
        match self {
            SelectSource::From { alias, .. } | SelectSource::Join { alias, .. } => alias,
        }
    }
}

impl Query {
    /// A table
    pub fn entity(name: impl Into<String>, ty: XRType) -> Self {
        Query::Entity {
            name: name.into(),
            ty,
        }
    }

    /// `head.map { id -> body }`
    pub fn map(head: Query, id: Ident, body: Expr) -> Self {
        Query::Map {
            head: Box::new(head),
            id,
            body: Box::new(body),
        }
    }

    /// `head.flatMap { id -> body }`
    pub fn flat_map(head: Query, id: Ident, body: Query) -> Self {
        Query::FlatMap {
            head: Box::new(head),
            id,
            body: Box::new(body),
        }
    }

    /// `head.concatMap { id -> body }`
    pub fn concat_map(head: Query, id: Ident, body: Expr) -> Self {
        Query::ConcatMap {
            head: Box::new(head),
            id,
            body: Box::new(body),
        }
    }

    /// `head.filter { id -> body }`
    pub fn filter(head: Query, id: Ident, body: Expr) -> Self {
        Query::Filter {
            head: Box::new(head),
            id,
            body: Box::new(body),
        }
    }

    /// `head.sortBy { id -> criteria }`
    pub fn sort_by(head: Query, id: Ident, criteria: Vec<OrderField>) -> Self {
        Query::SortBy {
            head: Box::new(head),
            id,
            criteria,
        }
    }

    /// `head.groupByMap { by_alias -> by_body } { map_alias -> map_body }`
    pub fn group_by_map(
        head: Query,
        by_alias: Ident,
        by_body: Expr,
        map_alias: Ident,
        map_body: Expr,
    ) -> Self {
        Query::GroupByMap {
            head: Box::new(head),
            by_alias,
            by_body: Box::new(by_body),
            map_alias,
            map_body: Box::new(map_body),
        }
    }

    /// `head.take(num)`
    pub fn take(head: Query, num: Expr) -> Self {
        Query::Take {
            head: Box::new(head),
            num: Box::new(num),
        }
    }

    /// `head.drop(num)`
    pub fn drop(head: Query, num: Expr) -> Self {
        Query::Drop {
            head: Box::new(head),
            num: Box::new(num),
        }
    }

    /// `a.union(b)`
    pub fn union(a: Query, b: Query) -> Self {
        Query::Union {
            a: Box::new(a),
            b: Box::new(b),
        }
    }

    /// `a.unionAll(b)`
    pub fn union_all(a: Query, b: Query) -> Self {
        Query::UnionAll {
            a: Box::new(a),
            b: Box::new(b),
        }
    }

    /// `head.distinct`
    pub fn distinct(head: Query) -> Self {
        Query::Distinct {
            head: Box::new(head),
        }
    }

    /// `head.distinctOn { id -> by }`
    pub fn distinct_on(head: Query, id: Ident, by: Expr) -> Self {
        Query::DistinctOn {
            head: Box::new(head),
            id,
            by: Box::new(by),
        }
    }

    /// `head.nested`
    pub fn nested(head: Query) -> Self {
        Query::Nested {
            head: Box::new(head),
        }
    }

    /// `join(head) { id -> on }`
    pub fn flat_join(join_type: JoinType, head: Query, id: Ident, on: Expr) -> Self {
        Query::FlatJoin {
            join_type,
            head: Box::new(head),
            id,
            on: Box::new(on),
        }
    }

    /// `where(by)` inside a chain
    pub fn flat_filter(by: Expr) -> Self {
        Query::FlatFilter { by: Box::new(by) }
    }

    /// `groupBy(by)` inside a chain
    pub fn flat_group_by(by: Expr) -> Self {
        Query::FlatGroupBy { by: Box::new(by) }
    }

    /// Light type of one row of this query
    pub fn ty(&self) -> XRType {
        match self {
            Query::Entity { ty, .. } | Query::RuntimeQueryBind { ty, .. } => ty.clone(),
            Query::Map { body, .. } | Query::ConcatMap { body, .. } => body.ty(),
            Query::FlatMap { body, .. } => body.ty(),
            Query::GroupByMap { map_body, .. } => map_body.ty(),
            Query::Filter { head, .. }
            | Query::SortBy { head, .. }
            | Query::Take { head, .. }
            | Query::Drop { head, .. }
            | Query::Distinct { head }
            | Query::DistinctOn { head, .. }
            | Query::Nested { head }
            | Query::FlatJoin { head, .. } => head.ty(),
            Query::Union { a, .. } | Query::UnionAll { a, .. } => a.ty(),
            Query::FlatFilter { .. } | Query::FlatGroupBy { .. } | Query::FlatSortBy { .. } => {
                XRType::Generic
            }
            Query::Infix(infix) => infix.ty.clone(),
            Query::CustomQueryRef(select) => select.select.ty(),
        }
    }

    /// Short node name used in diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Query::Entity { .. } => "Entity",
            Query::Map { .. } => "Map",
            Query::FlatMap { .. } => "FlatMap",
            Query::ConcatMap { .. } => "ConcatMap",
            Query::Filter { .. } => "Filter",
            Query::SortBy { .. } => "SortBy",
            Query::GroupByMap { .. } => "GroupByMap",
            Query::Take { .. } => "Take",
            Query::Drop { .. } => "Drop",
            Query::Union { .. } => "Union",
            Query::UnionAll { .. } => "UnionAll",
            Query::Distinct { .. } => "Distinct",
            Query::DistinctOn { .. } => "DistinctOn",
            Query::Nested { .. } => "Nested",
            Query::FlatJoin { .. } => "FlatJoin",
            Query::FlatFilter { .. } => "FlatFilter",
            Query::FlatGroupBy { .. } => "FlatGroupBy",
            Query::FlatSortBy { .. } => "FlatSortBy",
            Query::Infix(_) => "Infix",
            Query::CustomQueryRef(_) => "CustomQueryRef",
            Query::RuntimeQueryBind { .. } => "RuntimeQueryBind",
        }
    }
}
