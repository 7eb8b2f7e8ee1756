//! Shared test utilities: a small builder DSL for XR trees

use crate::xr::{
    BinaryOperator, CallType, Const, Expr, Ident, OrderField, Ordering, Query, XRType, XrRef, BID,
};

fn fields(names: &[&str]) -> Vec<(String, XRType)> {
    names
        .iter()
        .map(|name| (name.to_string(), XRType::Value))
        .collect()
}

/// Row type of the `Person` table
pub fn person_type() -> XRType {
    XRType::product("Person", fields(&["id", "name", "age"]))
}

/// Row type of the `Address` table
pub fn address_type() -> XRType {
    XRType::product("Address", fields(&["ownerId", "street", "city"]))
}

/// The `Person` table
pub fn people() -> Query {
    Query::entity("Person", person_type())
}

/// The `Address` table
pub fn addresses() -> Query {
    Query::entity("Address", address_type())
}

/// A binder named `name` with the given type
pub fn ident(name: &str, ty: XRType) -> Ident {
    Ident::new(name, ty)
}

/// A binder over `Person` rows
pub fn person(name: &str) -> Ident {
    ident(name, person_type())
}

/// A binder over `Address` rows
pub fn address(name: &str) -> Ident {
    ident(name, address_type())
}

/// `id.field`
pub fn prop(id: &Ident, field: &str) -> Expr {
    Expr::property(Expr::ident(id), field)
}

/// Integer literal
pub fn int(i: i64) -> Expr {
    Expr::Const(Const::Int(i))
}

/// String literal
pub fn string(s: &str) -> Expr {
    Expr::Const(Const::String(s.to_string()))
}

/// Boolean literal
pub fn boolean(b: bool) -> Expr {
    Expr::Const(Const::Boolean(b))
}

/// Runtime parameter with a fixed id
pub fn param(id: &str) -> Expr {
    Expr::TagForParam {
        id: BID::from(id),
        ty: XRType::Value,
    }
}

/// `a > b`
pub fn gt(a: Expr, b: Expr) -> Expr {
    Expr::binary(a, BinaryOperator::Gt, b)
}

/// Aggregation call such as `max(arg)`
pub fn agg(name: &str, arg: Expr) -> Expr {
    Expr::GlobalCall {
        name: name.to_string(),
        args: vec![arg],
        call_type: CallType::Aggregator,
        ty: XRType::Value,
    }
}

/// Pure scalar call such as `upper(arg)`
pub fn call(name: &str, arg: Expr) -> Expr {
    Expr::GlobalCall {
        name: name.to_string(),
        args: vec![arg],
        call_type: CallType::PureFunction,
        ty: XRType::Value,
    }
}

/// Tuple-like row `(_1 = a, _2 = b, ...)`
pub fn tuple(values: Vec<Expr>) -> Expr {
    Expr::product(
        "Tuple",
        values
            .into_iter()
            .enumerate()
            .map(|(i, v)| (format!("_{}", i + 1), v))
            .collect(),
    )
}

/// Ascending sort key
pub fn asc(field: Expr) -> OrderField {
    OrderField::new(field, Ordering::Asc)
}

/// Binder names on every root-to-leaf path of `q`
pub fn binder_paths(q: &Query) -> Vec<Vec<String>> {
    let mut paths = Vec::new();
    walk_paths(XrRef::Query(q), &mut Vec::new(), &mut paths);
    paths
}

fn binders_of(node: XrRef<'_>) -> Vec<String> {
    match node {
        XrRef::Query(q) => match q {
            Query::Map { id, .. }
            | Query::FlatMap { id, .. }
            | Query::ConcatMap { id, .. }
            | Query::Filter { id, .. }
            | Query::SortBy { id, .. }
            | Query::DistinctOn { id, .. }
            | Query::FlatJoin { id, .. } => vec![id.name.clone()],
            Query::GroupByMap {
                by_alias,
                map_alias,
                ..
            } => vec![by_alias.name.clone(), map_alias.name.clone()],
            Query::CustomQueryRef(select) => select
                .sources
                .iter()
                .map(|s| s.alias().name.clone())
                .collect(),
            _ => Vec::new(),
        },
        XrRef::Expr(_) => Vec::new(),
    }
}

fn walk_paths(node: XrRef<'_>, current: &mut Vec<String>, paths: &mut Vec<Vec<String>>) {
    let depth = current.len();
    current.extend(binders_of(node));
    let mut children = Vec::new();
    node.for_each_child(&mut |child| children.push(child));
    if children.is_empty() {
        paths.push(current.clone());
    }
    for child in children {
        walk_paths(child, current, paths);
    }
    current.truncate(depth);
}

/// Panic if any root-to-leaf path binds the same name twice
pub fn assert_unique_binders_on_paths(q: &Query) {
    for path in binder_paths(q) {
        let mut seen = std::collections::HashSet::new();
        for name in &path {
            assert!(
                seen.insert(name.clone()),
                "binder {} bound twice on path {:?} in {}",
                name,
                path,
                q
            );
        }
    }
}
