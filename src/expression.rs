//! Filter expression language.
//!
//! Text is tokenized and parsed into a raw [`syntax::Syntax`] tree, lowered
//! into the closed [`ast::Expr`] by the default-deny [`validator`], checked a
//! second time, and packaged with its referenced column names as a
//! [`CompiledExpression`]. Evaluation binds those names to table columns and
//! produces a row [`crate::table::Mask`].

pub mod ast;
pub mod compiled;
pub mod error;
pub mod eval;
pub mod functions;
pub mod lexer;
pub mod operator;
pub mod parser;
pub mod syntax;
pub mod token;
pub mod validator;

pub use ast::{Expr, Literal};
pub use compiled::{compile, CompiledExpression, Compiler};
pub use error::{ExprError, ExprResult};
pub use eval::{evaluate, into_mask, Evaluator, Scalar, Value, Vector};
pub use functions::{ElementwiseFn, Function, FunctionRegistry};
pub use operator::{BinaryOperator, BoolOperator, CompareOperator, UnaryOperator};
