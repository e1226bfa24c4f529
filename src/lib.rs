pub mod batch;
pub mod expression;
pub mod filter;
pub mod table;

pub use expression::{compile, CompiledExpression, Compiler, ExprError, FunctionRegistry};
pub use filter::{filter_rows, FilterError, FilterStage, Pipeline, Stats};
pub use table::{Mask, Table};
