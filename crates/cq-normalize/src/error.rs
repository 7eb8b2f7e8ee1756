//! Error types for cq-normalize

use crate::phase::Phase;
use thiserror::Error;

/// Normalization error type
#[derive(Error, Debug)]
pub enum NormalizeError {
    /// N001: Core error propagation
    #[error("[N001] {0}")]
    Xr(#[from] cq_core::XrError),

    /// N002: The rewrite loop did not reach a fixpoint within the configured bound
    #[error(
        "[N002] Normalization did not converge after {iterations} iterations (last phase: {last_phase})\n  in: {subtree}"
    )]
    FixpointDiverged {
        iterations: usize,
        last_phase: Phase,
        subtree: String,
    },
}

/// Result type alias for NormalizeError
pub type NormalizeResult<T> = Result<T, NormalizeError>;
