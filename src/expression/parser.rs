// Expression parser - converts tokens to a raw parse tree

use super::error::{ExprError, ExprResult};
use super::lexer::Lexer;
use super::syntax::{Syntax, SyntaxBinaryOp, SyntaxBoolOp, SyntaxCompareOp, SyntaxUnaryOp};
use super::token::{Spanned, Token};

/// Maximum recursive nesting: parentheses, call arguments, subscripts,
/// conditionals, `not` and unary operators. Each level costs a full trip
/// through the precedence chain, so this must fit a 2 MiB thread stack.
pub const MAX_NESTING: usize = 48;

/// Maximum depth of the resulting tree, including the left spine that flat
/// chains like `a + b + c` build without recursing in the parser.
pub const MAX_DEPTH: usize = 200;

pub struct Parser {
    tokens: Vec<Spanned>,
    position: usize,
    nesting: usize,
    depth: usize,
}

impl Parser {
    pub fn new(input: &str) -> ExprResult<Self> {
        let tokens = Lexer::new(input).tokenize()?;
        Ok(Parser {
            tokens,
            position: 0,
            nesting: 0,
            depth: 0,
        })
    }

    /// Parse a complete expression. All input must be consumed.
    pub fn parse(&mut self) -> ExprResult<Syntax> {
        if self.match_token(&Token::Eof) {
            return Err(self.error("empty expression"));
        }

        let expr = self.parse_test()?;

        if !self.match_token(&Token::Eof) {
            return Err(self.error(format!(
                "unexpected {:?} after end of expression",
                self.current_token()
            )));
        }

        Ok(expr)
    }

    /// Parse a conditional expression: `body if test else orelse`
    fn parse_test(&mut self) -> ExprResult<Syntax> {
        self.enter()?;
        let body = self.parse_or()?;

        let result = if self.match_token(&Token::If) {
            self.advance();
            let test = self.parse_or()?;
            self.expect_token(Token::Else)?;
            let orelse = self.parse_test()?;
            Syntax::Conditional {
                body: Box::new(body),
                test: Box::new(test),
                orelse: Box::new(orelse),
            }
        } else {
            body
        };

        self.leave();
        Ok(result)
    }

    /// Parse OR expression
    fn parse_or(&mut self) -> ExprResult<Syntax> {
        let first = self.parse_and()?;
        self.parse_bool_chain(first, Token::Or, SyntaxBoolOp::Or, Self::parse_and)
    }

    /// Parse AND expression
    fn parse_and(&mut self) -> ExprResult<Syntax> {
        let first = self.parse_not()?;
        self.parse_bool_chain(first, Token::And, SyntaxBoolOp::And, Self::parse_not)
    }

    /// Collect `a op b op c` into one n-ary node
    fn parse_bool_chain(
        &mut self,
        first: Syntax,
        token: Token,
        op: SyntaxBoolOp,
        next: fn(&mut Self) -> ExprResult<Syntax>,
    ) -> ExprResult<Syntax> {
        if !self.match_token(&token) {
            return Ok(first);
        }

        let mut values = vec![first];
        while self.match_token(&token) {
            self.advance();
            values.push(next(self)?);
        }

        Ok(Syntax::BoolOp { op, values })
    }

    /// Parse NOT expression
    fn parse_not(&mut self) -> ExprResult<Syntax> {
        if self.match_token(&Token::Not) {
            self.advance();
            self.enter()?;
            let operand = self.parse_not()?;
            self.leave();
            Ok(Syntax::Unary {
                op: SyntaxUnaryOp::Not,
                operand: Box::new(operand),
            })
        } else {
            self.parse_comparison()
        }
    }

    /// Parse a (possibly chained) comparison
    fn parse_comparison(&mut self) -> ExprResult<Syntax> {
        let left = self.parse_bit_or()?;
        let mut comparisons = Vec::new();

        while let Some(op) = self.comparison_operator()? {
            let right = self.parse_bit_or()?;
            comparisons.push((op, right));
        }

        if comparisons.is_empty() {
            Ok(left)
        } else {
            Ok(Syntax::Compare {
                left: Box::new(left),
                comparisons,
            })
        }
    }

    /// Consume a comparison operator if one is next
    fn comparison_operator(&mut self) -> ExprResult<Option<SyntaxCompareOp>> {
        let op = match self.current_token() {
            Token::Less => SyntaxCompareOp::Lt,
            Token::LessEqual => SyntaxCompareOp::Le,
            Token::Greater => SyntaxCompareOp::Gt,
            Token::GreaterEqual => SyntaxCompareOp::Ge,
            Token::EqualEqual => SyntaxCompareOp::Eq,
            Token::NotEqual => SyntaxCompareOp::Ne,
            Token::In => SyntaxCompareOp::In,
            Token::Is => {
                self.advance();
                if self.match_token(&Token::Not) {
                    self.advance();
                    return Ok(Some(SyntaxCompareOp::IsNot));
                }
                return Ok(Some(SyntaxCompareOp::Is));
            }
            Token::Not if self.peek_token() == Token::In => {
                self.advance();
                self.advance();
                return Ok(Some(SyntaxCompareOp::NotIn));
            }
            _ => return Ok(None),
        };

        self.advance();
        Ok(Some(op))
    }

    fn parse_bit_or(&mut self) -> ExprResult<Syntax> {
        self.parse_binary_level(&[(Token::Pipe, SyntaxBinaryOp::BitOr)], Self::parse_bit_xor)
    }

    fn parse_bit_xor(&mut self) -> ExprResult<Syntax> {
        self.parse_binary_level(&[(Token::Caret, SyntaxBinaryOp::BitXor)], Self::parse_bit_and)
    }

    fn parse_bit_and(&mut self) -> ExprResult<Syntax> {
        self.parse_binary_level(&[(Token::Ampersand, SyntaxBinaryOp::BitAnd)], Self::parse_shift)
    }

    fn parse_shift(&mut self) -> ExprResult<Syntax> {
        self.parse_binary_level(
            &[
                (Token::ShiftLeft, SyntaxBinaryOp::LShift),
                (Token::ShiftRight, SyntaxBinaryOp::RShift),
            ],
            Self::parse_addition,
        )
    }

    /// Parse addition/subtraction expression
    fn parse_addition(&mut self) -> ExprResult<Syntax> {
        self.parse_binary_level(
            &[
                (Token::Plus, SyntaxBinaryOp::Add),
                (Token::Minus, SyntaxBinaryOp::Sub),
            ],
            Self::parse_multiplication,
        )
    }

    /// Parse multiplication/division expression
    fn parse_multiplication(&mut self) -> ExprResult<Syntax> {
        self.parse_binary_level(
            &[
                (Token::Star, SyntaxBinaryOp::Mul),
                (Token::Slash, SyntaxBinaryOp::Div),
                (Token::DoubleSlash, SyntaxBinaryOp::FloorDiv),
                (Token::Percent, SyntaxBinaryOp::Mod),
                (Token::At, SyntaxBinaryOp::MatMul),
            ],
            Self::parse_unary,
        )
    }

    /// Left-associative binary level
    fn parse_binary_level(
        &mut self,
        operators: &[(Token, SyntaxBinaryOp)],
        next: fn(&mut Self) -> ExprResult<Syntax>,
    ) -> ExprResult<Syntax> {
        let mut left = next(self)?;
        // every fold deepens the left spine of the tree
        let mut folded = 0;

        loop {
            let current = self.current_token();
            let Some((_, op)) = operators.iter().find(|(token, _)| *token == current) else {
                break;
            };
            let op = *op;
            self.advance();
            self.deepen()?;
            folded += 1;

            let right = next(self)?;
            left = Syntax::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        self.depth -= folded;
        Ok(left)
    }

    /// Parse unary expression
    fn parse_unary(&mut self) -> ExprResult<Syntax> {
        let op = match self.current_token() {
            Token::Plus => SyntaxUnaryOp::Plus,
            Token::Minus => SyntaxUnaryOp::Minus,
            Token::Tilde => SyntaxUnaryOp::Invert,
            _ => return self.parse_power(),
        };
        self.advance();

        self.enter()?;
        let operand = self.parse_unary()?;
        self.leave();

        Ok(Syntax::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    /// Parse `base ** exponent`. Right-associative; the exponent may carry a sign.
    fn parse_power(&mut self) -> ExprResult<Syntax> {
        let base = self.parse_postfix()?;

        if self.match_token(&Token::DoubleStar) {
            self.advance();
            self.enter()?;
            let exponent = self.parse_unary()?;
            self.leave();
            return Ok(Syntax::Binary {
                op: SyntaxBinaryOp::Pow,
                left: Box::new(base),
                right: Box::new(exponent),
            });
        }

        Ok(base)
    }

    /// Parse calls, attribute access and subscripts trailing a primary
    fn parse_postfix(&mut self) -> ExprResult<Syntax> {
        let mut expr = self.parse_primary()?;
        let mut folded = 0;

        loop {
            if matches!(
                self.current_token(),
                Token::LeftParen | Token::Dot | Token::LeftBracket
            ) {
                self.deepen()?;
                folded += 1;
            }

            match self.current_token() {
                Token::LeftParen => {
                    self.advance();
                    let (args, keywords) = self.parse_call_arguments()?;
                    expr = Syntax::Call {
                        func: Box::new(expr),
                        args,
                        keywords,
                    };
                }
                Token::Dot => {
                    self.advance();
                    let attr = self.expect_identifier()?;
                    expr = Syntax::Attribute {
                        value: Box::new(expr),
                        attr,
                    };
                }
                Token::LeftBracket => {
                    self.advance();
                    let index = self.parse_test()?;
                    self.expect_token(Token::RightBracket)?;
                    expr = Syntax::Subscript {
                        value: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                _ => break,
            }
        }

        self.depth -= folded;
        Ok(expr)
    }

    /// Parse call arguments after `(`, including the closing `)`
    fn parse_call_arguments(&mut self) -> ExprResult<(Vec<Syntax>, Vec<(String, Syntax)>)> {
        let mut args = Vec::new();
        let mut keywords = Vec::new();

        while !self.match_token(&Token::RightParen) {
            if let (Token::Identifier(name), Token::Assign) = (self.current_token(), self.peek_token()) {
                self.advance();
                self.advance();
                keywords.push((name, self.parse_test()?));
            } else if keywords.is_empty() {
                args.push(self.parse_test()?);
            } else {
                return Err(self.error("positional argument follows keyword argument"));
            }

            if !self.match_token(&Token::Comma) {
                break;
            }
            self.advance();
        }

        self.expect_token(Token::RightParen)?;
        Ok((args, keywords))
    }

    /// Parse primary expression
    fn parse_primary(&mut self) -> ExprResult<Syntax> {
        match self.current_token() {
            Token::Number(n) => {
                let value = n
                    .parse::<f64>()
                    .map_err(|_| self.error(format!("invalid number: {}", n)))?;
                self.advance();
                Ok(Syntax::Number(value))
            }
            Token::String(s) => {
                self.advance();
                Ok(Syntax::Str(s))
            }
            Token::True => {
                self.advance();
                Ok(Syntax::Boolean(true))
            }
            Token::False => {
                self.advance();
                Ok(Syntax::Boolean(false))
            }
            Token::None => {
                self.advance();
                Ok(Syntax::NoneLiteral)
            }
            Token::Identifier(name) => {
                self.advance();
                Ok(Syntax::Name(name))
            }
            Token::LeftParen => {
                self.advance();
                if self.match_token(&Token::RightParen) {
                    self.advance();
                    return Ok(Syntax::Tuple(vec![]));
                }

                let first = self.parse_test()?;
                if self.match_token(&Token::Comma) {
                    let items = self.parse_sequence_tail(first, Token::RightParen)?;
                    return Ok(Syntax::Tuple(items));
                }

                self.expect_token(Token::RightParen)?;
                Ok(first)
            }
            Token::LeftBracket => {
                self.advance();
                if self.match_token(&Token::RightBracket) {
                    self.advance();
                    return Ok(Syntax::List(vec![]));
                }

                let first = self.parse_test()?;
                let items = self.parse_sequence_tail(first, Token::RightBracket)?;
                Ok(Syntax::List(items))
            }
            Token::Eof => Err(self.error("unexpected end of expression")),
            token => Err(self.error(format!("unexpected token {:?}", token))),
        }
    }

    /// Parse `, item, item ... <close>` following the first item of a tuple or list
    fn parse_sequence_tail(&mut self, first: Syntax, close: Token) -> ExprResult<Vec<Syntax>> {
        let mut items = vec![first];

        while self.match_token(&Token::Comma) {
            self.advance();
            if self.match_token(&close) {
                break;
            }
            items.push(self.parse_test()?);
        }

        self.expect_token(close)?;
        Ok(items)
    }

    // Helper methods

    /// Get current token
    fn current_token(&self) -> Token {
        self.tokens
            .get(self.position)
            .map(|s| s.token.clone())
            .unwrap_or(Token::Eof)
    }

    fn peek_token(&self) -> Token {
        self.tokens
            .get(self.position + 1)
            .map(|s| s.token.clone())
            .unwrap_or(Token::Eof)
    }

    fn current_position(&self) -> usize {
        self.tokens
            .get(self.position)
            .or_else(|| self.tokens.last())
            .map(|s| s.position)
            .unwrap_or(0)
    }

    /// Advance to next token
    fn advance(&mut self) {
        if self.position + 1 < self.tokens.len() {
            self.position += 1;
        }
    }

    /// Check if current token matches
    fn match_token(&self, token: &Token) -> bool {
        self.current_token() == *token
    }

    /// Expect a specific token
    fn expect_token(&mut self, token: Token) -> ExprResult<()> {
        if self.current_token() == token {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!(
                "expected {:?}, found {:?}",
                token,
                self.current_token()
            )))
        }
    }

    /// Expect an identifier
    fn expect_identifier(&mut self) -> ExprResult<String> {
        match self.current_token() {
            Token::Identifier(name) => {
                self.advance();
                Ok(name)
            }
            token => Err(self.error(format!("expected identifier, found {:?}", token))),
        }
    }

    /// Recurse one level
    fn enter(&mut self) -> ExprResult<()> {
        self.nesting += 1;
        if self.nesting > MAX_NESTING {
            return Err(self.too_deep(MAX_NESTING));
        }
        self.deepen()
    }

    fn leave(&mut self) {
        self.nesting -= 1;
        self.depth -= 1;
    }

    /// Grow the tree one level without recursing
    fn deepen(&mut self) -> ExprResult<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(self.too_deep(MAX_DEPTH));
        }
        Ok(())
    }

    fn too_deep(&self, limit: usize) -> ExprError {
        ExprError::TooDeep {
            limit,
            position: self.current_position(),
        }
    }

    fn error(&self, message: impl Into<String>) -> ExprError {
        ExprError::syntax(message, self.current_position())
    }
}

/// Parse an expression string into a raw parse tree
pub fn parse(input: &str) -> ExprResult<Syntax> {
    Parser::new(input)?.parse()
}
