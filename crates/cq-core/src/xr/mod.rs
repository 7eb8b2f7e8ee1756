//! XR: the comprehension-query tree
//!
//! Queries ([`Query`]) and expressions ([`Expr`]) are separate enums so that
//! node kinds cannot be confused. [`XR`] is the top-level union handed to the
//! SQL flattener.

mod display;
mod expr;
mod ident;
mod query;
mod types;
mod visit;

pub use expr::{BinaryOperator, Branch, CallType, Const, Expr, Infix, UnaryOperator, Variable};
pub use ident::{Ident, BID};
pub use query::{JoinType, OrderField, Ordering, Query, SelectClause, SelectSource};
pub use types::XRType;
pub use visit::{fold_criteria, XrFold, XrRef};

/// Either kind of XR node
#[derive(Debug, Clone, PartialEq)]
pub enum XR {
    /// A query
    Query(Query),
    /// An expression
    Expr(Expr),
}

impl XR {
    /// Light type of the node
    pub fn ty(&self) -> XRType {
        match self {
            XR::Query(q) => q.ty(),
            XR::Expr(e) => e.ty(),
        }
    }
}

impl From<Query> for XR {
    fn from(q: Query) -> Self {
        XR::Query(q)
    }
}

impl From<Expr> for XR {
    fn from(e: Expr) -> Self {
        XR::Expr(e)
    }
}
