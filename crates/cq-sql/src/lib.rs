//! cq-sql: SQL generation for normalized XR queries
//!
//! [`SqlQueryApply`] flattens a normalized query into the [`SqlQuery`]
//! model, an [`SqlIdiom`] turns the model into a [`Token`] tree for one
//! database, and [`QueryCompiler`] runs the whole pipeline.

pub mod compiler;
pub mod dialect;
pub mod error;
pub mod flatten;
pub mod idiom;
pub mod model;
pub(crate) mod render;
pub mod token;

pub use compiler::{CompiledQuery, QueryCompiler};
pub use dialect::{idiom_for, H2Dialect, MySqlDialect, PostgresDialect, SqliteDialect};
pub use error::{SqlError, SqlResult};
pub use flatten::SqlQueryApply;
pub use idiom::{SqlIdiom, TableAliasBehavior};
pub use model::{
    DistinctKind, FlattenSqlQuery, FromContext, OrderByCriteria, SelectValue, SetOperation,
    SqlQuery, SqlUnaryOperator,
};
pub use token::{ParamKind, ParamSlot, RenderedSql, Token};
