//! Raw parse tree.
//!
//! The parser accepts a wider surface syntax than a compiled expression may
//! contain, so that disallowed constructs such as `__import__('os').system('x')`
//! are reported as unsupported syntax rather than as parse failures. Nothing
//! in this tree is ever evaluated; it only feeds the validator.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxUnaryOp {
    Plus,
    Minus,
    Not,
    Invert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxBinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    FloorDiv,
    Mod,
    MatMul,
    BitAnd,
    BitOr,
    BitXor,
    LShift,
    RShift,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxBoolOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxCompareOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    In,
    NotIn,
    Is,
    IsNot,
}

/// Node of the raw parse tree
#[derive(Debug, Clone, PartialEq)]
pub enum Syntax {
    Number(f64),
    Boolean(bool),
    Str(String),
    NoneLiteral,
    Name(String),
    Attribute {
        value: Box<Syntax>,
        attr: String,
    },
    Subscript {
        value: Box<Syntax>,
        index: Box<Syntax>,
    },
    Call {
        func: Box<Syntax>,
        args: Vec<Syntax>,
        keywords: Vec<(String, Syntax)>,
    },
    Unary {
        op: SyntaxUnaryOp,
        operand: Box<Syntax>,
    },
    Binary {
        op: SyntaxBinaryOp,
        left: Box<Syntax>,
        right: Box<Syntax>,
    },
    BoolOp {
        op: SyntaxBoolOp,
        values: Vec<Syntax>,
    },
    Compare {
        left: Box<Syntax>,
        comparisons: Vec<(SyntaxCompareOp, Syntax)>,
    },
    Conditional {
        body: Box<Syntax>,
        test: Box<Syntax>,
        orelse: Box<Syntax>,
    },
    Tuple(Vec<Syntax>),
    List(Vec<Syntax>),
}

impl Syntax {
    /// Name of the node kind, used in rejection messages
    pub fn kind(&self) -> &'static str {
        match self {
            Syntax::Number(_) | Syntax::Boolean(_) => "Constant",
            Syntax::Str(_) => "StringConstant",
            Syntax::NoneLiteral => "NoneConstant",
            Syntax::Name(_) => "Name",
            Syntax::Attribute { .. } => "Attribute",
            Syntax::Subscript { .. } => "Subscript",
            Syntax::Call { .. } => "Call",
            Syntax::Unary { .. } => "UnaryOp",
            Syntax::Binary { .. } => "BinOp",
            Syntax::BoolOp { .. } => "BoolOp",
            Syntax::Compare { .. } => "Compare",
            Syntax::Conditional { .. } => "IfExp",
            Syntax::Tuple(_) => "Tuple",
            Syntax::List(_) => "List",
        }
    }
}

impl fmt::Display for SyntaxUnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SyntaxUnaryOp::Plus => "+",
            SyntaxUnaryOp::Minus => "-",
            SyntaxUnaryOp::Not => "not",
            SyntaxUnaryOp::Invert => "~",
        };
        f.write_str(s)
    }
}

impl fmt::Display for SyntaxBinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SyntaxBinaryOp::Add => "+",
            SyntaxBinaryOp::Sub => "-",
            SyntaxBinaryOp::Mul => "*",
            SyntaxBinaryOp::Div => "/",
            SyntaxBinaryOp::Pow => "**",
            SyntaxBinaryOp::FloorDiv => "//",
            SyntaxBinaryOp::Mod => "%",
            SyntaxBinaryOp::MatMul => "@",
            SyntaxBinaryOp::BitAnd => "&",
            SyntaxBinaryOp::BitOr => "|",
            SyntaxBinaryOp::BitXor => "^",
            SyntaxBinaryOp::LShift => "<<",
            SyntaxBinaryOp::RShift => ">>",
        };
        f.write_str(s)
    }
}

impl fmt::Display for SyntaxCompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SyntaxCompareOp::Lt => "<",
            SyntaxCompareOp::Le => "<=",
            SyntaxCompareOp::Gt => ">",
            SyntaxCompareOp::Ge => ">=",
            SyntaxCompareOp::Eq => "==",
            SyntaxCompareOp::Ne => "!=",
            SyntaxCompareOp::In => "in",
            SyntaxCompareOp::NotIn => "not in",
            SyntaxCompareOp::Is => "is",
            SyntaxCompareOp::IsNot => "is not",
        };
        f.write_str(s)
    }
}
