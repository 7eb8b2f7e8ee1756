//! Normalization orchestrator
//!
//! [`Normalizer::normalize`] renames binders apart, dealiases, then runs the
//! rewrite loop: children first, then every rule in priority order. The first
//! rule that produces a different tree wins and the loop restarts from the
//! top. The loop stops when nothing fires, or fails with
//! [`NormalizeError::FixpointDiverged`] once the iteration cap is reached.
//!
//! [`Normalizer::normalize_top_expr`] is the entry point for expressions
//! such as `people.size`: every query inside is normalized from scratch.

use crate::attach_to_entity::FreshNames;
use crate::avoid_alias_conflict::AvoidAliasConflict;
use crate::dealias::dealias;
use crate::error::{NormalizeError, NormalizeResult};
use crate::phase::nested_structures::{ChildNormalizer, NormalizeNestedStructures};
use crate::phase::{default_rules, Phase, RewriteRule};
use crate::repropagate_types::RepropagateTypes;
use crate::tracer::{LogTracer, NoopTracer, Tracer};
use cq_core::{BetaReduction, CompileConfig, Expr, Query, XrFold};

/// Rewrites queries to normal form
pub struct Normalizer {
    rules: Vec<Box<dyn RewriteRule>>,
    max_iterations: usize,
    tracer: Box<dyn Tracer>,
    fresh: FreshNames,
}

impl Normalizer {
    /// Built-in rules, iteration cap and tracer taken from `config`
    pub fn new(config: &CompileConfig) -> Self {
        let tracer: Box<dyn Tracer> = if config.trace_rewrites {
            Box::new(LogTracer)
        } else {
            Box::new(NoopTracer)
        };
        Self {
            rules: default_rules(),
            max_iterations: config.max_normalize_iterations,
            tracer,
            fresh: FreshNames::default(),
        }
    }

    /// Custom rule list; children are always normalized first
    pub fn with_rules(rules: Vec<Box<dyn RewriteRule>>, max_iterations: usize) -> Self {
        Self {
            rules,
            max_iterations,
            tracer: Box::new(NoopTracer),
            fresh: FreshNames::default(),
        }
    }

    /// Replace the tracer
    pub fn with_tracer(mut self, tracer: Box<dyn Tracer>) -> Self {
        self.tracer = tracer;
        self
    }

    /// The rewrite rules in priority order
    pub fn rules(&self) -> &[Box<dyn RewriteRule>] {
        &self.rules
    }

    /// Normalize a query from scratch; temporary binders are numbered from zero
    pub fn normalize(&self, q: &Query) -> NormalizeResult<Query> {
        self.fresh.reset();
        let renamed = AvoidAliasConflict::apply(q, false);
        let normalized = self.norm(&dealias(&renamed))?;
        Ok(dealias(&normalized))
    }

    /// Normalize and detemporize every query inside a top-level expression
    pub fn normalize_top_expr(&self, e: &Expr) -> NormalizeResult<Expr> {
        let reduced = BetaReduction::empty().reduce_expr(e);
        reduced.try_map_children(&mut NestedQueries {
            normalizer: self,
            from_scratch: true,
        })
    }

    /// Run the rewrite loop on an already dealiased query
    pub fn norm(&self, q: &Query) -> NormalizeResult<Query> {
        let mut current = q.clone();
        let mut last_phase = Phase::NestedStructures;
        for _ in 0..self.max_iterations {
            let Some((phase, next)) = self.step(&current)? else {
                return Ok(current);
            };
            log::debug!("{} rewrote {}", phase, current.kind());
            self.tracer.rewrite(phase, &current, &next);
            current = RepropagateTypes::apply(&next);
            last_phase = phase;
        }
        Err(NormalizeError::FixpointDiverged {
            iterations: self.max_iterations,
            last_phase,
            subtree: current.to_string(),
        })
    }

    fn step(&self, q: &Query) -> NormalizeResult<Option<(Phase, Query)>> {
        if let Some(next) = NormalizeNestedStructures::apply(q, self)? {
            return Ok(Some((NormalizeNestedStructures::PHASE, next)));
        }
        for rule in &self.rules {
            if let Some(next) = rule.rewrite(q, &self.fresh)? {
                if next != *q {
                    return Ok(Some((rule.phase(), next)));
                }
            }
        }
        Ok(None)
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(&CompileConfig::default())
    }
}

impl ChildNormalizer for Normalizer {
    fn normalize_query(&self, q: &Query) -> NormalizeResult<Query> {
        self.norm(q)
    }

    fn normalize_expr(&self, e: &Expr) -> NormalizeResult<Expr> {
        let reduced = BetaReduction::empty().reduce_expr(e);
        reduced.try_map_children(&mut NestedQueries {
            normalizer: self,
            from_scratch: false,
        })
    }
}

/// Normalizes the queries nested anywhere inside an expression, either
/// within the rewrite loop or from scratch
struct NestedQueries<'a> {
    normalizer: &'a Normalizer,
    from_scratch: bool,
}

impl XrFold for NestedQueries<'_> {
    type Error = NormalizeError;

    fn fold_query(&mut self, q: &Query) -> Result<Query, NormalizeError> {
        if self.from_scratch {
            Ok(detemporize(&self.normalizer.normalize(q)?))
        } else {
            self.normalizer.norm(q)
        }
    }

    fn fold_expr(&mut self, e: &Expr) -> Result<Expr, NormalizeError> {
        e.try_map_children(self)
    }
}

/// Rename compiler-generated binders to readable names before rendering,
/// keeping the binders of one operator chain shared
pub fn detemporize(q: &Query) -> Query {
    dealias(&AvoidAliasConflict::apply(q, true))
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
