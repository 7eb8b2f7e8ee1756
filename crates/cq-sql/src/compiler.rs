//! End-to-end compilation from XR to SQL text
//!
//! [`QueryCompiler`] runs type repropagation, normalization and
//! detemporization, flattens the result and renders it for the configured
//! dialect.

use crate::dialect::idiom_for;
use crate::error::SqlResult;
use crate::flatten::SqlQueryApply;
use crate::idiom::SqlIdiom;
use crate::model::SqlQuery;
use crate::token::{ParamSlot, Token};
use cq_core::{CompileConfig, Expr, Query, XR};
use cq_normalize::{detemporize, Normalizer, RepropagateTypes};

/// SQL text with its bindings and the token tree it was rendered from
#[derive(Debug, Clone)]
pub struct CompiledQuery {
    /// Rendered SQL
    pub sql: String,
    /// Parameter and SQL-expression bindings in output order
    pub params: Vec<ParamSlot>,
    /// Token tree before rendering
    pub token: Token,
}

/// Compiles XR queries for one dialect
pub struct QueryCompiler {
    config: CompileConfig,
    idiom: Box<dyn SqlIdiom>,
    normalizer: Normalizer,
    apply: SqlQueryApply,
}

impl QueryCompiler {
    /// Compiler for the dialect named in `config`
    pub fn new(config: CompileConfig) -> Self {
        let idiom = idiom_for(config.dialect);
        Self::with_idiom(config, idiom)
    }

    /// Compiler with a custom idiom; `config.dialect` is ignored
    pub fn with_idiom(config: CompileConfig, idiom: Box<dyn SqlIdiom>) -> Self {
        let normalizer = Normalizer::new(&config);
        let apply = SqlQueryApply::new(config.default_alias.clone());
        Self {
            config,
            idiom,
            normalizer,
            apply,
        }
    }

    /// The configuration this compiler was built with
    pub fn config(&self) -> &CompileConfig {
        &self.config
    }

    /// The idiom SQL is rendered for
    pub fn idiom(&self) -> &dyn SqlIdiom {
        self.idiom.as_ref()
    }

    /// Normalized and detemporized form of `q`
    pub fn normalize(&self, q: &Query) -> SqlResult<Query> {
        let typed = RepropagateTypes::apply(q);
        let normalized = self.normalizer.normalize(&typed)?;
        Ok(detemporize(&normalized))
    }

    /// SQL model of `q`, before rendering
    pub fn to_sql_query(&self, q: &Query) -> SqlResult<SqlQuery> {
        self.apply.query(&self.normalize(q)?)
    }

    /// Compile a query
    pub fn compile(&self, q: &Query) -> SqlResult<CompiledQuery> {
        let sql = self.to_sql_query(q)?;
        self.render(&sql)
    }

    /// Compile a top-level expression such as `people.size` or
    /// `people.nonEmpty`
    pub fn compile_expr(&self, e: &Expr) -> SqlResult<CompiledQuery> {
        let typed = RepropagateTypes::expr(e);
        let normalized = self.normalizer.normalize_top_expr(&typed)?;
        let sql = self.apply.expr(&normalized)?;
        self.render(&sql)
    }

    /// Compile either syntactic category
    pub fn compile_xr(&self, xr: &XR) -> SqlResult<CompiledQuery> {
        match xr {
            XR::Query(q) => self.compile(q),
            XR::Expr(e) => self.compile_expr(e),
        }
    }

    fn render(&self, sql: &SqlQuery) -> SqlResult<CompiledQuery> {
        let token = self.idiom.token_query(sql, &self.apply)?;
        let rendered = token.render(self.idiom.as_ref());
        log::debug!("compiled for {}: {}", self.idiom.name(), rendered.sql);

        if self.config.verify_sql {
            if rendered.has_sql_expressions() {
                log::debug!("skipping syntax check of SQL with runtime fragments");
            } else {
                self.idiom.check_syntax(&rendered.sql)?;
            }
        }

        Ok(CompiledQuery {
            sql: rendered.sql,
            params: rendered.params,
            token,
        })
    }
}

#[cfg(test)]
#[path = "compiler_test.rs"]
mod tests;
