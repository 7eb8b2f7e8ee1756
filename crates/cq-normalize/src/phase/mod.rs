//! Rewrite phases applied by the normalization loop
//!
//! Each phase inspects only the root of the query it is given and either
//! rewrites it or declines. Recursion into children is the job of
//! [`nested_structures`], which runs first on every iteration.

pub mod adhoc_reduction;
pub mod apply_map;
pub mod nested_structures;
pub mod order_terms;
pub mod symbolic_reduction;

use crate::attach_to_entity::FreshNames;
use crate::error::NormalizeResult;
use cq_core::Query;

/// Identifies a phase in traces and diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Recursive normalization of children
    NestedStructures,
    /// Pushing projections outward
    ApplyMap,
    /// Flattening nested comprehensions
    SymbolicReduction,
    /// Local algebraic simplifications
    AdHocReduction,
    /// Reordering of commuting operators
    OrderTerms,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::NestedStructures => write!(f, "NormalizeNestedStructures"),
            Phase::ApplyMap => write!(f, "ApplyMap"),
            Phase::SymbolicReduction => write!(f, "SymbolicReduction"),
            Phase::AdHocReduction => write!(f, "AdHocReduction"),
            Phase::OrderTerms => write!(f, "OrderTerms"),
        }
    }
}

/// A root-level rewrite
pub trait RewriteRule: Send + Sync {
    /// Phase reported in traces
    fn phase(&self) -> Phase;

    /// Human-readable description
    fn description(&self) -> &'static str;

    /// Rewrite the root of `q`, or return `None` when no rule applies.
    /// Temporary binders a rule introduces are numbered from `fresh`.
    fn rewrite(&self, q: &Query, fresh: &FreshNames) -> NormalizeResult<Option<Query>>;
}

/// The built-in phases in priority order
pub fn default_rules() -> Vec<Box<dyn RewriteRule>> {
    vec![
        Box::new(apply_map::ApplyMap),
        Box::new(symbolic_reduction::SymbolicReduction),
        Box::new(adhoc_reduction::AdHocReduction),
        Box::new(order_terms::OrderTerms),
    ]
}
