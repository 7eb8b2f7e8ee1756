//! cq-normalize: rewrite XR queries to a flattenable normal form
//!
//! This crate provides alpha-renaming, dealiasing, type repropagation and
//! the prioritized rewrite phases driven to a fixpoint by [`Normalizer`].

pub mod attach_to_entity;
pub mod avoid_alias_conflict;
pub mod dealias;
pub(crate) mod error;
pub mod normalize;
pub mod phase;
pub mod repropagate_types;
pub mod tracer;

pub use attach_to_entity::{attach_to_entity, FreshNames};
pub use avoid_alias_conflict::AvoidAliasConflict;
pub use dealias::dealias;
pub use error::{NormalizeError, NormalizeResult};
pub use normalize::{detemporize, Normalizer};
pub use phase::adhoc_reduction::AdHocReduction;
pub use phase::apply_map::ApplyMap;
pub use phase::nested_structures::{ChildNormalizer, NormalizeNestedStructures};
pub use phase::order_terms::OrderTerms;
pub use phase::symbolic_reduction::SymbolicReduction;
pub use phase::{default_rules, Phase, RewriteRule};
pub use repropagate_types::RepropagateTypes;
pub use tracer::{LogTracer, NoopTracer, Tracer};
