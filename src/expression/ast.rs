//! Closed expression AST.
//!
//! Every node kind and operator that a compiled expression may contain is a
//! variant here; there is no open or extensible node type. Trees are built by
//! the validator from the raw parse tree, or programmatically through the
//! builder helpers and then checked by [`crate::expression::validator::check`].

use std::collections::BTreeSet;
use std::fmt;

use crate::expression::operator::{BinaryOperator, BoolOperator, CompareOperator, UnaryOperator};

/// Literal constant value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Literal {
    Number(f64),
    Boolean(bool),
}

/// Expression tree node
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Literal constant value
    Literal(Literal),

    /// Column reference by name
    ColumnRef(String),

    /// Unary operation
    UnaryOp {
        op: UnaryOperator,
        operand: Box<Expr>,
    },

    /// Arithmetic operation
    BinaryOp {
        op: BinaryOperator,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// `and`/`or` over two or more operands
    BoolOp { op: BoolOperator, operands: Vec<Expr> },

    /// Chained comparison: `first op1 e1 op2 e2 ...`
    Compare {
        first: Box<Expr>,
        rest: Vec<(CompareOperator, Expr)>,
    },

    /// Call of a registered function
    Call { name: String, args: Vec<Expr> },
}

impl Expr {
    pub fn number(value: f64) -> Self {
        Expr::Literal(Literal::Number(value))
    }

    pub fn boolean(value: bool) -> Self {
        Expr::Literal(Literal::Boolean(value))
    }

    pub fn column(name: impl Into<String>) -> Self {
        Expr::ColumnRef(name.into())
    }

    pub fn unary_op(op: UnaryOperator, operand: Expr) -> Self {
        Expr::UnaryOp {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn binary_op(op: BinaryOperator, left: Expr, right: Expr) -> Self {
        Expr::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn bool_op(op: BoolOperator, operands: Vec<Expr>) -> Self {
        Expr::BoolOp { op, operands }
    }

    /// Create a single-step comparison
    pub fn compare(left: Expr, op: CompareOperator, right: Expr) -> Self {
        Expr::Compare {
            first: Box::new(left),
            rest: vec![(op, right)],
        }
    }

    pub fn call(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Call {
            name: name.into(),
            args,
        }
    }

    /// Collect every referenced column name. Function names are not columns.
    pub fn column_names(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        self.collect_column_names(&mut names);
        names
    }

    fn collect_column_names(&self, names: &mut BTreeSet<String>) {
        match self {
            Expr::Literal(_) => {}
            Expr::ColumnRef(name) => {
                names.insert(name.clone());
            }
            Expr::UnaryOp { operand, .. } => operand.collect_column_names(names),
            Expr::BinaryOp { left, right, .. } => {
                left.collect_column_names(names);
                right.collect_column_names(names);
            }
            Expr::BoolOp { operands, .. } => {
                for operand in operands {
                    operand.collect_column_names(names);
                }
            }
            Expr::Compare { first, rest } => {
                first.collect_column_names(names);
                for (_, operand) in rest {
                    operand.collect_column_names(names);
                }
            }
            Expr::Call { args, .. } => {
                for arg in args {
                    arg.collect_column_names(names);
                }
            }
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Number(n) => write!(f, "{}", n),
            Literal::Boolean(true) => write!(f, "True"),
            Literal::Boolean(false) => write!(f, "False"),
        }
    }
}

/// Fully parenthesized rendering, used in logs
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(lit) => write!(f, "{}", lit),
            Expr::ColumnRef(name) => write!(f, "{}", name),
            Expr::UnaryOp {
                op: UnaryOperator::Not,
                operand,
            } => write!(f, "(not {})", operand),
            Expr::UnaryOp { op, operand } => write!(f, "({}{})", op, operand),
            Expr::BinaryOp { op, left, right } => write!(f, "({} {} {})", left, op, right),
            Expr::BoolOp { op, operands } => {
                write!(f, "(")?;
                for (i, operand) in operands.iter().enumerate() {
                    if i > 0 {
                        write!(f, " {} ", op)?;
                    }
                    write!(f, "{}", operand)?;
                }
                write!(f, ")")
            }
            Expr::Compare { first, rest } => {
                write!(f, "({}", first)?;
                for (op, operand) in rest {
                    write!(f, " {} {}", op, operand)?;
                }
                write!(f, ")")
            }
            Expr::Call { name, args } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Expr {
        // abs(dem_h - h_te_best_fit) <= 3 and cloud_flag < 3 and not dem_h == 0
        Expr::bool_op(
            BoolOperator::And,
            vec![
                Expr::compare(
                    Expr::call(
                        "abs",
                        vec![Expr::binary_op(
                            BinaryOperator::Sub,
                            Expr::column("dem_h"),
                            Expr::column("h_te_best_fit"),
                        )],
                    ),
                    CompareOperator::Le,
                    Expr::number(3.0),
                ),
                Expr::compare(Expr::column("cloud_flag"), CompareOperator::Lt, Expr::number(3.0)),
                Expr::unary_op(
                    UnaryOperator::Not,
                    Expr::compare(Expr::column("dem_h"), CompareOperator::Eq, Expr::number(0.0)),
                ),
            ],
        )
    }

    #[test]
    fn test_column_names() {
        let names: Vec<String> = sample().column_names().into_iter().collect();
        assert_eq!(names, vec!["cloud_flag", "dem_h", "h_te_best_fit"]);
    }

    #[test]
    fn test_function_name_is_not_a_column() {
        let expr = Expr::call("abs", vec![Expr::number(-1.0)]);
        assert!(expr.column_names().is_empty());

        // a bare identifier that happens to match a function name is a column
        let expr = Expr::compare(Expr::column("abs"), CompareOperator::Gt, Expr::number(1.0));
        assert!(expr.column_names().contains("abs"));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            sample().to_string(),
            "((abs((dem_h - h_te_best_fit)) <= 3) and (cloud_flag < 3) and (not (dem_h == 0)))"
        );
        assert_eq!(Expr::boolean(true).to_string(), "True");
        assert_eq!(Expr::number(2.5).to_string(), "2.5");
    }
}
