//! Error types for expression compilation and evaluation.

use thiserror::Error;

/// Errors that can occur while compiling or evaluating a filter expression
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExprError {
    /// The text does not parse
    #[error("Invalid expression syntax at position {position}: {message}")]
    Syntax { message: String, position: usize },

    /// The text nests deeper than the parser accepts
    #[error("Expression too deeply nested at position {position}: limit is {limit} levels")]
    TooDeep { limit: usize, position: usize },

    /// The text parses but uses a construct outside the allow-list
    #[error("Unsupported syntax: {message}")]
    UnsupportedSyntax { message: String },

    /// One or more referenced columns are absent from the table
    #[error("Expression references missing columns: {columns:?}")]
    UnknownColumn { columns: Vec<String> },

    /// The top-level result is not a boolean mask
    #[error("Expression must evaluate to a boolean mask (use comparisons like <, ==, etc.), got {found}")]
    NonBooleanResult { found: String },

    /// An operator was applied to operands of the wrong kind
    #[error(
        "Invalid operand types for operator {operator}: left={left}, right={}",
        .right.as_deref().unwrap_or("-")
    )]
    InvalidOperandTypes {
        operator: String,
        left: String,
        right: Option<String>,
    },

    /// A referenced column holds values the expression language cannot use
    #[error("Column '{column}' has type {data_type} and cannot be used in an expression")]
    UnsupportedColumnType { column: String, data_type: String },
}

impl ExprError {
    pub(crate) fn syntax(message: impl Into<String>, position: usize) -> Self {
        ExprError::Syntax {
            message: message.into(),
            position,
        }
    }

    pub(crate) fn unsupported(message: impl Into<String>) -> Self {
        ExprError::UnsupportedSyntax {
            message: message.into(),
        }
    }

    /// True for failures raised while compiling the text, before any data is touched
    pub fn is_compile_error(&self) -> bool {
        matches!(
            self,
            ExprError::Syntax { .. }
                | ExprError::TooDeep { .. }
                | ExprError::UnsupportedSyntax { .. }
        )
    }
}

/// Result type for expression operations
pub type ExprResult<T> = Result<T, ExprError>;
