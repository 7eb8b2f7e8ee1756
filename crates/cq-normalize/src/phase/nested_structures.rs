//! NormalizeNestedStructures: normalize every child before the root
//!
//! Query children go back through the full normalization loop, expression
//! children through beta reduction with their nested queries normalized.

use super::Phase;
use crate::error::{NormalizeError, NormalizeResult};
use cq_core::{Expr, Query, XrFold};

/// Normalizes the direct children of a node
pub trait ChildNormalizer {
    /// Normalize a query child to its fixpoint
    fn normalize_query(&self, q: &Query) -> NormalizeResult<Query>;

    /// Normalize an expression child
    fn normalize_expr(&self, e: &Expr) -> NormalizeResult<Expr>;
}

/// Recursive normalization of children
pub struct NormalizeNestedStructures;

impl NormalizeNestedStructures {
    /// Phase reported in traces
    pub const PHASE: Phase = Phase::NestedStructures;

    /// Normalize the children of `q`, returning `None` when none changed
    pub fn apply(q: &Query, normalizer: &dyn ChildNormalizer) -> NormalizeResult<Option<Query>> {
        if matches!(q, Query::Entity { .. } | Query::RuntimeQueryBind { .. }) {
            return Ok(None);
        }
        let normalized = q.try_map_children(&mut Children { normalizer })?;
        Ok((normalized != *q).then_some(normalized))
    }
}

struct Children<'a> {
    normalizer: &'a dyn ChildNormalizer,
}

impl XrFold for Children<'_> {
    type Error = NormalizeError;

    fn fold_query(&mut self, q: &Query) -> Result<Query, NormalizeError> {
        self.normalizer.normalize_query(q)
    }

    fn fold_expr(&mut self, e: &Expr) -> Result<Expr, NormalizeError> {
        self.normalizer.normalize_expr(e)
    }
}
