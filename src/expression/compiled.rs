//! Compilation front door: text in, validated reusable expression out.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::expression::ast::Expr;
use crate::expression::error::ExprResult;
use crate::expression::eval;
use crate::expression::functions::FunctionRegistry;
use crate::expression::parser;
use crate::expression::validator;
use crate::table::{Mask, Table};

/// A validated expression and the column names it references.
///
/// Immutable once built; evaluate it against any number of tables.
#[derive(Debug, Clone)]
pub struct CompiledExpression {
    source: String,
    root: Expr,
    names: BTreeSet<String>,
    functions: Arc<FunctionRegistry>,
}

impl CompiledExpression {
    /// Text the expression was compiled from
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> &Expr {
        &self.root
    }

    /// Referenced column names, sorted, without function names
    pub fn names(&self) -> &BTreeSet<String> {
        &self.names
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    pub fn evaluate(&self, table: &Table) -> ExprResult<Mask> {
        eval::evaluate(self, table)
    }
}

impl fmt::Display for CompiledExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Compiles expressions against one function registry
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    registry: Arc<FunctionRegistry>,
}

impl Compiler {
    /// Compiler with the default registry (`abs` only)
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registry(registry: FunctionRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    /// Parse, validate and collect names
    pub fn compile(&self, text: &str) -> ExprResult<CompiledExpression> {
        let syntax = parser::parse(text)?;
        let root = validator::lower(&syntax, &self.registry)?;
        self.finish(text.to_string(), root)
    }

    /// Validate a programmatically built tree
    pub fn from_ast(&self, root: Expr) -> ExprResult<CompiledExpression> {
        let source = root.to_string();
        self.finish(source, root)
    }

    fn finish(&self, source: String, root: Expr) -> ExprResult<CompiledExpression> {
        validator::check(&root, &self.registry)?;
        let names = root.column_names();

        log::debug!("compiled '{}' as {} (columns: {:?})", source, root, names);

        Ok(CompiledExpression {
            source,
            root,
            names,
            functions: Arc::clone(&self.registry),
        })
    }
}

/// Compile with the default registry
pub fn compile(text: &str) -> ExprResult<CompiledExpression> {
    Compiler::new().compile(text)
}
