//! Operator definitions for the closed expression AST.
//!
//! Each enum lists exactly the operators a compiled expression may contain.
//! There is no catch-all variant: anything else is rejected while lowering
//! the parse tree.

use std::fmt;

/// Arithmetic operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl BinaryOperator {
    /// Apply the operator to two numbers with IEEE-754 semantics
    pub fn apply(&self, left: f64, right: f64) -> f64 {
        match self {
            BinaryOperator::Add => left + right,
            BinaryOperator::Sub => left - right,
            BinaryOperator::Mul => left * right,
            BinaryOperator::Div => left / right,
            BinaryOperator::Pow => left.powf(right),
        }
    }

    /// Get the display string for this operator
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::Pow => "**",
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    Plus,
    Minus,
    Not,
}

impl UnaryOperator {
    /// Get the display string for this operator
    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOperator::Plus => "+",
            UnaryOperator::Minus => "-",
            UnaryOperator::Not => "not",
        }
    }
}

/// Boolean connectives, folded over two or more operands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoolOperator {
    And,
    Or,
}

impl BoolOperator {
    pub fn apply(&self, left: bool, right: bool) -> bool {
        match self {
            BoolOperator::And => left && right,
            BoolOperator::Or => left || right,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BoolOperator::And => "and",
            BoolOperator::Or => "or",
        }
    }
}

/// Comparison operators, chainable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOperator {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl CompareOperator {
    /// Compare two values. NaN compares unequal to everything.
    pub fn compare<T: PartialOrd>(&self, left: T, right: T) -> bool {
        match self {
            CompareOperator::Lt => left < right,
            CompareOperator::Le => left <= right,
            CompareOperator::Gt => left > right,
            CompareOperator::Ge => left >= right,
            CompareOperator::Eq => left == right,
            CompareOperator::Ne => left != right,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CompareOperator::Lt => "<",
            CompareOperator::Le => "<=",
            CompareOperator::Gt => ">",
            CompareOperator::Ge => ">=",
            CompareOperator::Eq => "==",
            CompareOperator::Ne => "!=",
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

display_as_str!(BinaryOperator, UnaryOperator, BoolOperator, CompareOperator);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arithmetic() {
        assert_eq!(BinaryOperator::Add.apply(2.0, 3.0), 5.0);
        assert_eq!(BinaryOperator::Sub.apply(2.0, 3.0), -1.0);
        assert_eq!(BinaryOperator::Mul.apply(2.0, 3.0), 6.0);
        assert_eq!(BinaryOperator::Div.apply(3.0, 2.0), 1.5);
        assert_eq!(BinaryOperator::Pow.apply(2.0, 10.0), 1024.0);
    }

    #[test]
    fn test_division_follows_ieee() {
        assert_eq!(BinaryOperator::Div.apply(1.0, 0.0), f64::INFINITY);
        assert_eq!(BinaryOperator::Div.apply(-1.0, 0.0), f64::NEG_INFINITY);
        assert!(BinaryOperator::Div.apply(0.0, 0.0).is_nan());
        assert!(BinaryOperator::Pow.apply(-8.0, 0.5).is_nan());
    }

    #[test]
    fn test_comparisons() {
        assert!(CompareOperator::Lt.compare(1.0, 2.0));
        assert!(CompareOperator::Le.compare(2.0, 2.0));
        assert!(!CompareOperator::Gt.compare(1.0, 2.0));
        assert!(CompareOperator::Ge.compare(2.0, 2.0));
        assert!(CompareOperator::Eq.compare(true, true));
        assert!(CompareOperator::Lt.compare(false, true));

        assert!(!CompareOperator::Eq.compare(f64::NAN, f64::NAN));
        assert!(CompareOperator::Ne.compare(f64::NAN, f64::NAN));
        assert!(!CompareOperator::Lt.compare(f64::NAN, 1.0));
    }

    #[test]
    fn test_display() {
        assert_eq!(BinaryOperator::Pow.to_string(), "**");
        assert_eq!(UnaryOperator::Not.to_string(), "not");
        assert_eq!(BoolOperator::Or.to_string(), "or");
        assert_eq!(CompareOperator::Ne.to_string(), "!=");
    }
}
