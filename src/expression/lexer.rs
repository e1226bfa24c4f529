// Expression lexer - tokenizes filter expressions

use super::error::{ExprError, ExprResult};
use super::token::{Spanned, Token};

pub struct Lexer<'a> {
    input: &'a [u8],
    position: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input: input.as_bytes(),
            position: 0,
        }
    }

    /// Get the next token from the input
    pub fn next_token(&mut self) -> ExprResult<Spanned> {
        self.skip_whitespace();

        let start = self.position;
        let Some(ch) = self.current_char() else {
            return Ok(Spanned {
                token: Token::Eof,
                position: start,
            });
        };

        if !ch.is_ascii() {
            return Err(ExprError::syntax("non-ASCII character", start));
        }

        let token = match ch {
            '+' => self.single(Token::Plus),
            '-' => self.single(Token::Minus),
            '*' => self.one_or_two('*', Token::Star, Token::DoubleStar),
            '/' => self.one_or_two('/', Token::Slash, Token::DoubleSlash),
            '%' => self.single(Token::Percent),
            '@' => self.single(Token::At),
            '&' => self.single(Token::Ampersand),
            '|' => self.single(Token::Pipe),
            '^' => self.single(Token::Caret),
            '~' => self.single(Token::Tilde),
            '<' => {
                self.advance();
                match self.current_char() {
                    Some('=') => self.single(Token::LessEqual),
                    Some('<') => self.single(Token::ShiftLeft),
                    _ => Token::Less,
                }
            }
            '>' => {
                self.advance();
                match self.current_char() {
                    Some('=') => self.single(Token::GreaterEqual),
                    Some('>') => self.single(Token::ShiftRight),
                    _ => Token::Greater,
                }
            }
            '=' => self.one_or_two('=', Token::Assign, Token::EqualEqual),
            '!' => {
                self.advance();
                if self.current_char() == Some('=') {
                    self.single(Token::NotEqual)
                } else {
                    return Err(ExprError::syntax("unexpected character '!'", start));
                }
            }
            '(' => self.single(Token::LeftParen),
            ')' => self.single(Token::RightParen),
            '[' => self.single(Token::LeftBracket),
            ']' => self.single(Token::RightBracket),
            ',' => self.single(Token::Comma),
            '.' => {
                if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.read_number()?
                } else {
                    self.single(Token::Dot)
                }
            }
            '\'' | '"' => self.read_string(ch)?,
            c if c.is_ascii_alphabetic() || c == '_' => self.read_identifier(),
            c if c.is_ascii_digit() => self.read_number()?,
            c => {
                return Err(ExprError::syntax(
                    format!("unexpected character '{}'", c),
                    start,
                ))
            }
        };

        Ok(Spanned {
            token,
            position: start,
        })
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).map(|&b| b as char)
    }

    /// Peek at the next character without advancing
    fn peek(&self) -> Option<char> {
        self.input.get(self.position + 1).map(|&b| b as char)
    }

    fn advance(&mut self) {
        if self.position < self.input.len() {
            self.position += 1;
        }
    }

    fn single(&mut self, token: Token) -> Token {
        self.advance();
        token
    }

    /// Consume one character, or two when the second is `next`
    fn one_or_two(&mut self, next: char, one: Token, two: Token) -> Token {
        self.advance();
        if self.current_char() == Some(next) {
            self.advance();
            two
        } else {
            one
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_ascii_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Read an identifier or keyword
    fn read_identifier(&mut self) -> Token {
        let start = self.position;
        while let Some(ch) = self.current_char() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                self.advance();
            } else {
                break;
            }
        }

        let word = self.slice(start);
        Token::keyword_from_str(&word).unwrap_or(Token::Identifier(word))
    }

    /// Read a number: digits, optional fraction, optional exponent
    fn read_number(&mut self) -> ExprResult<Token> {
        let start = self.position;
        self.consume_digits();

        if self.current_char() == Some('.') {
            self.advance();
            self.consume_digits();
        }

        if matches!(self.current_char(), Some('e') | Some('E')) {
            self.advance();
            if matches!(self.current_char(), Some('+') | Some('-')) {
                self.advance();
            }
            if !self.current_char().is_some_and(|c| c.is_ascii_digit()) {
                return Err(ExprError::syntax("malformed exponent", self.position));
            }
            self.consume_digits();
        }

        if self
            .current_char()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
        {
            return Err(ExprError::syntax("invalid numeric literal", start));
        }

        Ok(Token::Number(self.slice(start)))
    }

    fn consume_digits(&mut self) {
        while self.current_char().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
    }

    /// Read a quoted string literal. Backslash escapes the next character.
    fn read_string(&mut self, quote: char) -> ExprResult<Token> {
        let start = self.position;
        self.advance(); // Skip opening quote
        let mut string = String::new();

        loop {
            match self.current_char() {
                None => return Err(ExprError::syntax("unterminated string literal", start)),
                Some(c) if c == quote => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    if let Some(escaped) = self.current_char() {
                        string.push(escaped);
                        self.advance();
                    }
                }
                Some(c) => {
                    string.push(c);
                    self.advance();
                }
            }
        }

        Ok(Token::String(string))
    }

    fn slice(&self, start: usize) -> String {
        String::from_utf8_lossy(&self.input[start..self.position]).into_owned()
    }

    /// Tokenize the entire input
    pub fn tokenize(&mut self) -> ExprResult<Vec<Spanned>> {
        let mut tokens = Vec::new();

        loop {
            let spanned = self.next_token()?;
            let done = spanned.token == Token::Eof;
            tokens.push(spanned);
            if done {
                break;
            }
        }

        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        Lexer::new(input)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|s| s.token)
            .collect()
    }

    #[test]
    fn test_basic_tokens() {
        assert_eq!(
            tokens("abs(dem_h-h_te_best_fit)<=3"),
            vec![
                Token::Identifier("abs".to_string()),
                Token::LeftParen,
                Token::Identifier("dem_h".to_string()),
                Token::Minus,
                Token::Identifier("h_te_best_fit".to_string()),
                Token::RightParen,
                Token::LessEqual,
                Token::Number("3".to_string()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            tokens("+ - * ** / // % @ & | ^ ~ << >> < <= > >= == != ="),
            vec![
                Token::Plus,
                Token::Minus,
                Token::Star,
                Token::DoubleStar,
                Token::Slash,
                Token::DoubleSlash,
                Token::Percent,
                Token::At,
                Token::Ampersand,
                Token::Pipe,
                Token::Caret,
                Token::Tilde,
                Token::ShiftLeft,
                Token::ShiftRight,
                Token::Less,
                Token::LessEqual,
                Token::Greater,
                Token::GreaterEqual,
                Token::EqualEqual,
                Token::NotEqual,
                Token::Assign,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            tokens("123 456.789 .5 1. 1e3 2.5E-2"),
            vec![
                Token::Number("123".to_string()),
                Token::Number("456.789".to_string()),
                Token::Number(".5".to_string()),
                Token::Number("1.".to_string()),
                Token::Number("1e3".to_string()),
                Token::Number("2.5E-2".to_string()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_keywords_and_strings() {
        assert_eq!(
            tokens("not x and True or None 'os' \"a\\\"b\""),
            vec![
                Token::Not,
                Token::Identifier("x".to_string()),
                Token::And,
                Token::True,
                Token::Or,
                Token::None,
                Token::String("os".to_string()),
                Token::String("a\"b".to_string()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_positions() {
        let spanned = Lexer::new("a  <= 10").tokenize().unwrap();
        let positions: Vec<usize> = spanned.iter().map(|s| s.position).collect();
        assert_eq!(positions, vec![0, 3, 6, 8]);
    }

    #[test]
    fn test_lex_errors() {
        for (input, position) in [
            ("a ! b", 2),
            ("x $ 1", 2),
            ("'open", 0),
            ("1e", 2),
            ("12abc", 0),
            ("h\u{e9}", 1),
        ] {
            match Lexer::new(input).tokenize() {
                Err(ExprError::Syntax { position: p, .. }) => assert_eq!(p, position, "{}", input),
                other => panic!("expected syntax error for {:?}, got {:?}", input, other),
            }
        }
    }
}
