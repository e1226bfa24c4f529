//! Vectorized expression evaluation.
//!
//! Every referenced column is bound to a vector of the table's row count.
//! Each node evaluates to a [`Value`]: a single scalar or one value per row.
//! Scalars broadcast against vectors in every operator. `and`/`or` evaluate
//! all of their operands, there is no short-circuit.

use std::borrow::Cow;
use std::collections::{BTreeSet, HashMap};

use crate::expression::ast::{Expr, Literal};
use crate::expression::compiled::CompiledExpression;
use crate::expression::error::{ExprError, ExprResult};
use crate::expression::functions::{Function, FunctionRegistry};
use crate::expression::operator::{BinaryOperator, BoolOperator, CompareOperator, UnaryOperator};
use crate::table::{ColumnData, Mask, Table};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    Number(f64),
    Boolean(bool),
}

/// One value per row. Column vectors are borrowed from the table where possible.
#[derive(Debug, Clone, PartialEq)]
pub enum Vector<'a> {
    Number(Cow<'a, [f64]>),
    Boolean(Cow<'a, [bool]>),
}

impl Vector<'_> {
    pub fn len(&self) -> usize {
        match self {
            Vector::Number(v) => v.len(),
            Vector::Boolean(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn view(&self) -> Vector<'_> {
        match self {
            Vector::Number(v) => Vector::Number(Cow::Borrowed(&v[..])),
            Vector::Boolean(v) => Vector::Boolean(Cow::Borrowed(&v[..])),
        }
    }
}

/// Result of evaluating one node
#[derive(Debug, Clone, PartialEq)]
pub enum Value<'a> {
    Scalar(Scalar),
    Vector(Vector<'a>),
}

impl Value<'_> {
    /// Kind name used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Scalar(Scalar::Number(_)) => "number",
            Value::Scalar(Scalar::Boolean(_)) => "boolean",
            Value::Vector(Vector::Number(_)) => "number vector",
            Value::Vector(Vector::Boolean(_)) => "boolean vector",
        }
    }

    fn numbers(&self) -> Option<Lane<'_, f64>> {
        match self {
            Value::Scalar(Scalar::Number(n)) => Some(Lane::Scalar(*n)),
            Value::Vector(Vector::Number(v)) => Some(Lane::Vector(&v[..])),
            _ => None,
        }
    }

    fn booleans(&self) -> Option<Lane<'_, bool>> {
        match self {
            Value::Scalar(Scalar::Boolean(b)) => Some(Lane::Scalar(*b)),
            Value::Vector(Vector::Boolean(v)) => Some(Lane::Vector(&v[..])),
            _ => None,
        }
    }
}

/// Operand view used for broadcasting
#[derive(Clone, Copy)]
enum Lane<'v, T> {
    Scalar(T),
    Vector(&'v [T]),
}

impl<T: Copy> Lane<'_, T> {
    fn get(&self, row: usize) -> T {
        match self {
            Lane::Scalar(v) => *v,
            Lane::Vector(v) => v[row],
        }
    }
}

trait Element: Copy {
    fn scalar(self) -> Value<'static>;
    fn vector(values: Vec<Self>) -> Value<'static>;
}

impl Element for f64 {
    fn scalar(self) -> Value<'static> {
        Value::Scalar(Scalar::Number(self))
    }

    fn vector(values: Vec<Self>) -> Value<'static> {
        Value::Vector(Vector::Number(Cow::Owned(values)))
    }
}

impl Element for bool {
    fn scalar(self) -> Value<'static> {
        Value::Scalar(Scalar::Boolean(self))
    }

    fn vector(values: Vec<Self>) -> Value<'static> {
        Value::Vector(Vector::Boolean(Cow::Owned(values)))
    }
}

fn map<T: Copy, R: Element>(lane: Lane<'_, T>, f: impl Fn(T) -> R) -> Value<'static> {
    match lane {
        Lane::Scalar(v) => f(v).scalar(),
        Lane::Vector(v) => R::vector(v.iter().map(|&x| f(x)).collect()),
    }
}

fn zip<T: Copy, R: Element>(
    left: Lane<'_, T>,
    right: Lane<'_, T>,
    f: impl Fn(T, T) -> R,
) -> Value<'static> {
    match (left, right) {
        (Lane::Scalar(l), Lane::Scalar(r)) => f(l, r).scalar(),
        (Lane::Vector(l), Lane::Scalar(r)) => R::vector(l.iter().map(|&x| f(x, r)).collect()),
        (Lane::Scalar(l), Lane::Vector(r)) => R::vector(r.iter().map(|&y| f(l, y)).collect()),
        (Lane::Vector(l), Lane::Vector(r)) => {
            R::vector(l.iter().zip(r).map(|(&x, &y)| f(x, y)).collect())
        }
    }
}

fn operand_error(operator: &str, left: &Value<'_>, right: Option<&Value<'_>>) -> ExprError {
    ExprError::InvalidOperandTypes {
        operator: operator.to_string(),
        left: left.kind().to_string(),
        right: right.map(|v| v.kind().to_string()),
    }
}

fn unary(op: UnaryOperator, operand: &Value<'_>) -> ExprResult<Value<'static>> {
    let result = match op {
        UnaryOperator::Not => operand.booleans().map(|lane| map(lane, |b: bool| !b)),
        UnaryOperator::Plus => operand.numbers().map(|lane| map(lane, |x: f64| x)),
        UnaryOperator::Minus => operand.numbers().map(|lane| map(lane, |x: f64| -x)),
    };
    result.ok_or_else(|| operand_error(op.as_str(), operand, None))
}

fn binary(op: BinaryOperator, left: &Value<'_>, right: &Value<'_>) -> ExprResult<Value<'static>> {
    match (left.numbers(), right.numbers()) {
        (Some(l), Some(r)) => Ok(zip(l, r, |x, y| op.apply(x, y))),
        _ => Err(operand_error(op.as_str(), left, Some(right))),
    }
}

fn logical(op: BoolOperator, left: &Value<'_>, right: &Value<'_>) -> ExprResult<Value<'static>> {
    match (left.booleans(), right.booleans()) {
        (Some(l), Some(r)) => Ok(zip(l, r, |x, y| op.apply(x, y))),
        _ => Err(operand_error(op.as_str(), left, Some(right))),
    }
}

fn compare(op: CompareOperator, left: &Value<'_>, right: &Value<'_>) -> ExprResult<Value<'static>> {
    if let (Some(l), Some(r)) = (left.numbers(), right.numbers()) {
        return Ok(zip(l, r, |x, y| op.compare(x, y)));
    }
    if let (Some(l), Some(r)) = (left.booleans(), right.booleans()) {
        return Ok(zip(l, r, |x, y| op.compare(x, y)));
    }
    Err(operand_error(op.as_str(), left, Some(right)))
}

/// Apply a registered function row by row. All-scalar arguments give a scalar.
fn apply_function(function: &Function, args: &[Lane<'_, f64>]) -> Value<'static> {
    let rows = args
        .iter()
        .filter_map(|arg| match arg {
            Lane::Vector(v) => Some(v.len()),
            Lane::Scalar(_) => None,
        })
        .min();

    let mut row_args = vec![0.0; args.len()];
    let mut call = |row: usize| {
        for (slot, arg) in row_args.iter_mut().zip(args) {
            *slot = arg.get(row);
        }
        (function.apply)(&row_args)
    };

    match rows {
        None => call(0).scalar(),
        Some(rows) => f64::vector((0..rows).map(call).collect()),
    }
}

/// Evaluator for one table: referenced names bound to column vectors
pub struct Evaluator<'a> {
    bindings: HashMap<&'a str, Vector<'a>>,
    functions: &'a FunctionRegistry,
}

impl<'a> Evaluator<'a> {
    /// Bind `names` to the columns of `table`.
    ///
    /// Fails with `UnknownColumn` listing every missing name, or with
    /// `UnsupportedColumnType` for a text column.
    pub fn new(
        table: &'a Table,
        names: &BTreeSet<String>,
        functions: &'a FunctionRegistry,
    ) -> ExprResult<Self> {
        let missing: Vec<String> = names
            .iter()
            .filter(|name| !table.contains_column(name.as_str()))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(ExprError::UnknownColumn { columns: missing });
        }

        let mut bindings = HashMap::with_capacity(names.len());
        for column in table.columns() {
            if !names.contains(&column.name) {
                continue;
            }

            let vector = match &column.data {
                // ints evaluate as floats
                ColumnData::Int(v) => {
                    Vector::Number(Cow::Owned(v.iter().map(|&x| x as f64).collect()))
                }
                ColumnData::Float(v) => Vector::Number(Cow::Borrowed(v.as_slice())),
                ColumnData::Boolean(v) => Vector::Boolean(Cow::Borrowed(v.as_slice())),
                ColumnData::Text(_) => {
                    return Err(ExprError::UnsupportedColumnType {
                        column: column.name.clone(),
                        data_type: column.data_type().to_string(),
                    })
                }
            };
            bindings.insert(column.name.as_str(), vector);
        }

        Ok(Self {
            bindings,
            functions,
        })
    }

    /// Evaluate an expression node
    pub fn evaluate(&self, expr: &Expr) -> ExprResult<Value<'_>> {
        match expr {
            Expr::Literal(Literal::Number(n)) => Ok(Value::Scalar(Scalar::Number(*n))),

            Expr::Literal(Literal::Boolean(b)) => Ok(Value::Scalar(Scalar::Boolean(*b))),

            Expr::ColumnRef(name) => self
                .bindings
                .get(name.as_str())
                .map(|vector| Value::Vector(vector.view()))
                .ok_or_else(|| ExprError::UnknownColumn {
                    columns: vec![name.clone()],
                }),

            Expr::UnaryOp { op, operand } => {
                let value = self.evaluate(operand)?;
                unary(*op, &value)
            }

            Expr::BinaryOp { op, left, right } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                binary(*op, &left, &right)
            }

            Expr::BoolOp { op, operands } => self.evaluate_bool_op(*op, operands),

            Expr::Compare { first, rest } => self.evaluate_compare(first, rest),

            Expr::Call { name, args } => self.evaluate_call(name, args),
        }
    }

    fn evaluate_bool_op(&self, op: BoolOperator, operands: &[Expr]) -> ExprResult<Value<'_>> {
        let values = operands
            .iter()
            .map(|operand| self.evaluate(operand))
            .collect::<ExprResult<Vec<_>>>()?;

        let mut values = values.into_iter();
        let first = values.next().ok_or_else(|| {
            ExprError::unsupported(format!("'{}' needs at least two operands", op))
        })?;
        if first.booleans().is_none() {
            return Err(operand_error(op.as_str(), &first, None));
        }

        let mut acc = first;
        for value in values {
            acc = logical(op, &acc, &value)?;
        }
        Ok(acc)
    }

    /// `a < b < c` is `(a < b) and (b < c)` with `b` evaluated once
    fn evaluate_compare(
        &self,
        first: &Expr,
        rest: &[(CompareOperator, Expr)],
    ) -> ExprResult<Value<'_>> {
        let mut left = self.evaluate(first)?;
        let mut result: Option<Value<'_>> = None;

        for (op, operand) in rest {
            let right = self.evaluate(operand)?;
            let step = compare(*op, &left, &right)?;
            result = Some(match result {
                None => step,
                Some(acc) => logical(BoolOperator::And, &acc, &step)?,
            });
            left = right;
        }

        result.ok_or_else(|| ExprError::unsupported("comparison without an operator"))
    }

    fn evaluate_call(&self, name: &str, args: &[Expr]) -> ExprResult<Value<'_>> {
        let function = self
            .functions
            .get(name)
            .ok_or_else(|| ExprError::unsupported(format!("function '{}' is not allowed", name)))?;
        if args.len() != function.arity {
            return Err(ExprError::unsupported(format!(
                "function '{}' must take exactly {} argument(s), got {}",
                name,
                function.arity,
                args.len()
            )));
        }

        let values = args
            .iter()
            .map(|arg| self.evaluate(arg))
            .collect::<ExprResult<Vec<_>>>()?;
        let lanes = values
            .iter()
            .map(|value| value.numbers().ok_or_else(|| operand_error(name, value, None)))
            .collect::<ExprResult<Vec<_>>>()?;

        Ok(apply_function(function, &lanes))
    }
}

/// Turn the top-level result into a mask of `num_rows` flags.
///
/// Only boolean results qualify. A numeric vector is never treated as truthy.
pub fn into_mask(value: Value<'_>, num_rows: usize) -> ExprResult<Mask> {
    match value {
        Value::Vector(Vector::Boolean(flags)) => Ok(Mask::new(flags.into_owned())),
        Value::Scalar(Scalar::Boolean(flag)) => Ok(Mask::filled(num_rows, flag)),
        other => Err(ExprError::NonBooleanResult {
            found: other.kind().to_string(),
        }),
    }
}

/// Evaluate a compiled expression against a table and produce a fresh mask
pub fn evaluate(compiled: &CompiledExpression, table: &Table) -> ExprResult<Mask> {
    let evaluator = Evaluator::new(table, compiled.names(), compiled.functions())?;
    let value = evaluator.evaluate(compiled.root())?;
    let mask = into_mask(value, table.num_rows())?;

    log::debug!(
        "'{}' selected {} of {} rows",
        compiled.source(),
        mask.count_selected(),
        mask.len()
    );
    Ok(mask)
}
