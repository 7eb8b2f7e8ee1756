//! cq-core: shared foundation for comprehension-query compilation
//!
//! This crate defines the XR tree (queries and expressions with light type
//! annotations), substitution with beta reduction, read-only scans used by
//! the rewrite phases, errors and compiler configuration.

pub mod beta;
pub mod collect;
pub mod config;
pub mod error;
pub mod xr;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;

pub use beta::{beta_reduce, beta_reduce_query, rename_ident, BetaReduction};
pub use config::{CompileConfig, Dialect};
pub use error::{XrError, XrResult};
pub use xr::{
    BinaryOperator, Branch, CallType, Const, Expr, Ident, Infix, JoinType, OrderField, Ordering,
    Query, SelectClause, SelectSource, UnaryOperator, Variable, XRType, XrFold, XrRef, BID, XR,
};
