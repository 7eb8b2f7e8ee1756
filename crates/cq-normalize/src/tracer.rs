//! Rewrite tracing hook

use crate::phase::Phase;
use cq_core::Query;

/// Observer of individual rewrite steps
pub trait Tracer: Send + Sync {
    /// Called after `phase` turned `before` into `after`
    fn rewrite(&self, phase: Phase, before: &Query, after: &Query);
}

/// Tracer that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracer;

impl Tracer for NoopTracer {
    fn rewrite(&self, _phase: Phase, _before: &Query, _after: &Query) {}
}

/// Tracer that logs every step at trace level
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTracer;

impl Tracer for LogTracer {
    fn rewrite(&self, phase: Phase, before: &Query, after: &Query) {
        log::trace!("[{}]\n  before: {}\n  after:  {}", phase, before, after);
    }
}
