//! Default-deny validation.
//!
//! [`lower`] converts the raw parse tree into the closed AST and fails on any
//! node kind, operator, constant or call that is not explicitly allowed.
//! [`check`] then walks the closed AST a second time and re-verifies every
//! call against the function registry together with the structural rules of
//! each node. Both passes run for every compiled expression; `check` is also
//! the gate for trees built programmatically.

use crate::expression::ast::Expr;
use crate::expression::error::{ExprError, ExprResult};
use crate::expression::functions::FunctionRegistry;
use crate::expression::operator::{BinaryOperator, BoolOperator, CompareOperator, UnaryOperator};
use crate::expression::syntax::{
    Syntax, SyntaxBinaryOp, SyntaxBoolOp, SyntaxCompareOp, SyntaxUnaryOp,
};

/// Convert a raw parse tree into the closed AST, rejecting anything outside the allow-list
pub fn lower(node: &Syntax, registry: &FunctionRegistry) -> ExprResult<Expr> {
    match node {
        Syntax::Number(n) => Ok(Expr::number(*n)),

        Syntax::Boolean(b) => Ok(Expr::boolean(*b)),

        Syntax::Name(name) => Ok(Expr::column(name.clone())),

        Syntax::Unary { op, operand } => {
            let op = unary_operator(*op)?;
            Ok(Expr::unary_op(op, lower(operand, registry)?))
        }

        Syntax::Binary { op, left, right } => {
            let op = binary_operator(*op)?;
            Ok(Expr::binary_op(
                op,
                lower(left, registry)?,
                lower(right, registry)?,
            ))
        }

        Syntax::BoolOp { op, values } => {
            let op = match op {
                SyntaxBoolOp::And => BoolOperator::And,
                SyntaxBoolOp::Or => BoolOperator::Or,
            };
            let operands = values
                .iter()
                .map(|value| lower(value, registry))
                .collect::<ExprResult<Vec<_>>>()?;
            Ok(Expr::bool_op(op, operands))
        }

        Syntax::Compare { left, comparisons } => {
            let first = lower(left, registry)?;
            let rest = comparisons
                .iter()
                .map(|(op, operand)| -> ExprResult<(CompareOperator, Expr)> {
                    Ok((compare_operator(*op)?, lower(operand, registry)?))
                })
                .collect::<ExprResult<Vec<_>>>()?;
            Ok(Expr::Compare {
                first: Box::new(first),
                rest,
            })
        }

        Syntax::Call {
            func,
            args,
            keywords,
        } => {
            let Syntax::Name(name) = func.as_ref() else {
                return Err(ExprError::unsupported(
                    "only simple function calls like abs(x) are allowed",
                ));
            };
            check_call(name, args.len(), keywords.len(), registry)?;

            let args = args
                .iter()
                .map(|arg| lower(arg, registry))
                .collect::<ExprResult<Vec<_>>>()?;
            Ok(Expr::call(name.clone(), args))
        }

        Syntax::Str(_)
        | Syntax::NoneLiteral
        | Syntax::Attribute { .. }
        | Syntax::Subscript { .. }
        | Syntax::Conditional { .. }
        | Syntax::Tuple(_)
        | Syntax::List(_) => Err(ExprError::unsupported(format!(
            "node kind {} is not allowed",
            node.kind()
        ))),
    }
}

/// Second pass over a closed AST
pub fn check(expr: &Expr, registry: &FunctionRegistry) -> ExprResult<()> {
    match expr {
        Expr::Literal(_) | Expr::ColumnRef(_) => Ok(()),

        Expr::UnaryOp { operand, .. } => check(operand, registry),

        Expr::BinaryOp { left, right, .. } => {
            check(left, registry)?;
            check(right, registry)
        }

        Expr::BoolOp { op, operands } => {
            if operands.len() < 2 {
                return Err(ExprError::unsupported(format!(
                    "'{}' requires at least two operands",
                    op
                )));
            }
            operands.iter().try_for_each(|operand| check(operand, registry))
        }

        Expr::Compare { first, rest } => {
            if rest.is_empty() {
                return Err(ExprError::unsupported(
                    "comparison requires at least one operator",
                ));
            }
            check(first, registry)?;
            rest.iter().try_for_each(|(_, operand)| check(operand, registry))
        }

        Expr::Call { name, args } => {
            check_call(name, args.len(), 0, registry)?;
            args.iter().try_for_each(|arg| check(arg, registry))
        }
    }
}

fn check_call(
    name: &str,
    arg_count: usize,
    keyword_count: usize,
    registry: &FunctionRegistry,
) -> ExprResult<()> {
    let Some(function) = registry.get(name) else {
        return Err(ExprError::unsupported(format!(
            "function '{}' is not allowed (allowed: {})",
            name,
            registry.names().join(", ")
        )));
    };

    if keyword_count != 0 {
        return Err(ExprError::unsupported(
            "keyword arguments are not allowed in function calls",
        ));
    }

    if arg_count != function.arity {
        return Err(ExprError::unsupported(format!(
            "function '{}' must take exactly {} argument(s), got {}",
            name, function.arity, arg_count
        )));
    }

    Ok(())
}

fn unary_operator(op: SyntaxUnaryOp) -> ExprResult<UnaryOperator> {
    match op {
        SyntaxUnaryOp::Plus => Ok(UnaryOperator::Plus),
        SyntaxUnaryOp::Minus => Ok(UnaryOperator::Minus),
        SyntaxUnaryOp::Not => Ok(UnaryOperator::Not),
        SyntaxUnaryOp::Invert => Err(ExprError::unsupported(format!(
            "unary operator {} is not allowed",
            op
        ))),
    }
}

fn binary_operator(op: SyntaxBinaryOp) -> ExprResult<BinaryOperator> {
    match op {
        SyntaxBinaryOp::Add => Ok(BinaryOperator::Add),
        SyntaxBinaryOp::Sub => Ok(BinaryOperator::Sub),
        SyntaxBinaryOp::Mul => Ok(BinaryOperator::Mul),
        SyntaxBinaryOp::Div => Ok(BinaryOperator::Div),
        SyntaxBinaryOp::Pow => Ok(BinaryOperator::Pow),
        SyntaxBinaryOp::FloorDiv
        | SyntaxBinaryOp::Mod
        | SyntaxBinaryOp::MatMul
        | SyntaxBinaryOp::BitAnd
        | SyntaxBinaryOp::BitOr
        | SyntaxBinaryOp::BitXor
        | SyntaxBinaryOp::LShift
        | SyntaxBinaryOp::RShift => Err(ExprError::unsupported(format!(
            "operator {} is not allowed",
            op
        ))),
    }
}

fn compare_operator(op: SyntaxCompareOp) -> ExprResult<CompareOperator> {
    match op {
        SyntaxCompareOp::Lt => Ok(CompareOperator::Lt),
        SyntaxCompareOp::Le => Ok(CompareOperator::Le),
        SyntaxCompareOp::Gt => Ok(CompareOperator::Gt),
        SyntaxCompareOp::Ge => Ok(CompareOperator::Ge),
        SyntaxCompareOp::Eq => Ok(CompareOperator::Eq),
        SyntaxCompareOp::Ne => Ok(CompareOperator::Ne),
        SyntaxCompareOp::In
        | SyntaxCompareOp::NotIn
        | SyntaxCompareOp::Is
        | SyntaxCompareOp::IsNot => Err(ExprError::unsupported(format!(
            "comparison operator '{}' is not allowed",
            op
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::parser::parse;

    fn lower_text(text: &str) -> ExprResult<Expr> {
        lower(&parse(text).unwrap(), &FunctionRegistry::default())
    }

    fn assert_rejected(text: &str, fragment: &str) {
        match lower_text(text) {
            Err(ExprError::UnsupportedSyntax { message }) => {
                assert!(
                    message.contains(fragment),
                    "message {:?} for {:?} should mention {:?}",
                    message,
                    text,
                    fragment
                );
            }
            other => panic!("expected rejection of {:?}, got {:?}", text, other),
        }
    }

    #[test]
    fn test_lower_allowed_expression() {
        let expr = lower_text("abs(dem_h - h_te_best_fit) <= 3 and not cloud_flag > 2").unwrap();
        match expr {
            Expr::BoolOp {
                op: BoolOperator::And,
                operands,
            } => {
                assert_eq!(operands.len(), 2);
                assert!(matches!(operands[1], Expr::UnaryOp { op: UnaryOperator::Not, .. }));
            }
            other => panic!("unexpected tree {:?}", other),
        }

        assert_eq!(
            lower_text("-x ** 2 + +1").unwrap(),
            Expr::binary_op(
                BinaryOperator::Add,
                Expr::unary_op(
                    UnaryOperator::Minus,
                    Expr::binary_op(BinaryOperator::Pow, Expr::column("x"), Expr::number(2.0)),
                ),
                Expr::unary_op(UnaryOperator::Plus, Expr::number(1.0)),
            )
        );
    }

    #[test]
    fn test_rejects_code_execution_attempts() {
        assert_rejected("__import__('os').system('x')", "simple function calls");
        assert_rejected("__import__('os')", "'__import__' is not allowed");
        assert_rejected("eval('1')", "'eval' is not allowed");
        assert_rejected("open('/etc/passwd')", "'open' is not allowed");
        assert_rejected("x.__class__", "Attribute");
        assert_rejected("x[0]", "Subscript");
        assert_rejected("abs.__call__(x)", "simple function calls");
        assert_rejected("abs(x)(y)", "simple function calls");
    }

    #[test]
    fn test_rejects_disallowed_nodes() {
        assert_rejected("x == 'a'", "StringConstant");
        assert_rejected("x is None", "is");
        assert_rejected("x == None", "NoneConstant");
        assert_rejected("a if b else c", "IfExp");
        assert_rejected("(1, 2)", "Tuple");
        assert_rejected("x in [1, 2]", "'in'");
        assert_rejected("x not in (1, 2)", "'not in'");
    }

    #[test]
    fn test_rejects_disallowed_operators() {
        assert_rejected("x % 2 == 0", "operator %");
        assert_rejected("x // 2 > 1", "operator //");
        assert_rejected("x @ y", "operator @");
        assert_rejected("a & b", "operator &");
        assert_rejected("a | b", "operator |");
        assert_rejected("a ^ b", "operator ^");
        assert_rejected("a << 1", "operator <<");
        assert_rejected("a >> 1", "operator >>");
        assert_rejected("~a", "unary operator ~");
    }

    #[test]
    fn test_rejects_bad_calls() {
        assert_rejected("abs(x, y) > 1", "exactly 1 argument(s), got 2");
        assert_rejected("abs() > 1", "exactly 1 argument(s), got 0");
        assert_rejected("abs(x=1) > 1", "keyword arguments");
        assert_rejected("min(x, y) > 1", "'min' is not allowed (allowed: abs)");
    }

    #[test]
    fn test_rejection_inside_allowed_call() {
        assert_rejected("abs(x % 2) > 1", "operator %");
        assert_rejected("abs('x') > 1", "StringConstant");
    }

    #[test]
    fn test_check_programmatic_trees() {
        let registry = FunctionRegistry::default();

        let ok = Expr::compare(
            Expr::call("abs", vec![Expr::column("x")]),
            CompareOperator::Lt,
            Expr::number(1.0),
        );
        assert!(check(&ok, &registry).is_ok());

        let unknown = Expr::call("system", vec![Expr::number(1.0)]);
        assert!(matches!(
            check(&unknown, &registry),
            Err(ExprError::UnsupportedSyntax { .. })
        ));

        let wrong_arity = Expr::call("abs", vec![]);
        assert!(check(&wrong_arity, &registry).is_err());

        let lonely_and = Expr::bool_op(BoolOperator::And, vec![Expr::boolean(true)]);
        assert!(check(&lonely_and, &registry).is_err());

        let empty_compare = Expr::Compare {
            first: Box::new(Expr::number(1.0)),
            rest: vec![],
        };
        assert!(check(&empty_compare, &registry).is_err());

        let nested = Expr::unary_op(
            UnaryOperator::Not,
            Expr::bool_op(BoolOperator::Or, vec![Expr::boolean(true), unknown]),
        );
        assert!(check(&nested, &registry).is_err());
    }

    #[test]
    fn test_registry_controls_allow_list() {
        let empty = FunctionRegistry::empty();
        let tree = parse("abs(x) < 1").unwrap();
        assert!(matches!(
            lower(&tree, &empty),
            Err(ExprError::UnsupportedSyntax { .. })
        ));
    }
}
