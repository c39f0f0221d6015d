//! Sandboxed evaluator for plotted equations.
//!
//! Accepts numbers, `x`, `pi`, `sin`/`cos`/`tan`, the four arithmetic
//! operators, `^` and parentheses. Nothing else parses.

use std::fmt;

use thiserror::Error;

/// Deepest chain of parentheses, calls and signs the parser will follow.
pub const MAX_NESTING: usize = 64;
/// Longest token stream accepted. Also bounds left-leaning operator chains,
/// which `eval` walks recursively.
pub const MAX_TOKENS: usize = 1024;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    #[error("empty expression")]
    Empty,
    #[error("unexpected character `{0}` at offset {1}")]
    UnexpectedChar(char, usize),
    #[error("unknown identifier `{0}`")]
    UnknownIdentifier(String),
    #[error("invalid number `{0}`")]
    InvalidNumber(String),
    #[error("unexpected token `{0}`")]
    UnexpectedToken(String),
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("expression nests deeper than {0} levels")]
    TooDeep(usize),
    #[error("expression is longer than {0} tokens")]
    TooLong(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Func {
    Sin,
    Cos,
    Tan,
}

impl Func {
    fn apply(self, value: f64) -> f64 {
        match self {
            Func::Sin => value.sin(),
            Func::Cos => value.cos(),
            Func::Tan => value.tan(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Num(f64),
    X,
    Neg(Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Call(Func, Box<Expr>),
}

impl Expr {
    pub fn eval(&self, x: f64) -> f64 {
        match self {
            Expr::Num(value) => *value,
            Expr::X => x,
            Expr::Neg(inner) => -inner.eval(x),
            Expr::Call(func, arg) => func.apply(arg.eval(x)),
            Expr::Binary(op, lhs, rhs) => {
                let (a, b) = (lhs.eval(x), rhs.eval(x));
                match op {
                    BinaryOp::Add => a + b,
                    BinaryOp::Sub => a - b,
                    BinaryOp::Mul => a * b,
                    BinaryOp::Div => a / b,
                    BinaryOp::Pow => a.powf(b),
                }
            }
        }
    }
}

/// A parsed `y = f(x)` equation.
#[derive(Debug, Clone, PartialEq)]
pub struct Equation {
    source: String,
    expr: Expr,
}

impl Equation {
    /// Parse an equation, accepting an optional `y =` or `f(x) =` prefix.
    pub fn parse(source: &str) -> Result<Self, ExprError> {
        let body = match source.split_once('=') {
            Some((lhs, rhs)) => {
                let lhs = lhs.trim();
                if lhs.eq_ignore_ascii_case("y") || lhs.eq_ignore_ascii_case("f(x)") {
                    rhs
                } else {
                    let offset = lhs.len();
                    return Err(ExprError::UnexpectedChar('=', offset));
                }
            }
            None => source,
        };

        let tokens = tokenize(body)?;
        if tokens.is_empty() {
            return Err(ExprError::Empty);
        }
        if tokens.len() > MAX_TOKENS {
            return Err(ExprError::TooLong(MAX_TOKENS));
        }
        let mut parser = Parser {
            tokens,
            pos: 0,
            depth: 0,
        };
        let expr = parser.expression()?;
        if let Some(token) = parser.peek() {
            return Err(ExprError::UnexpectedToken(token.to_string()));
        }
        Ok(Self {
            source: source.trim().to_string(),
            expr,
        })
    }

    pub fn eval(&self, x: f64) -> f64 {
        self.expr.eval(x)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Num(f64),
    X,
    Pi,
    Func(Func),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
}

impl Token {
    fn starts_operand(&self) -> bool {
        matches!(
            self,
            Token::Num(_) | Token::X | Token::Pi | Token::Func(_) | Token::LParen
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Num(value) => write!(f, "{value}"),
            Token::X => f.write_str("x"),
            Token::Pi => f.write_str("pi"),
            Token::Func(Func::Sin) => f.write_str("sin"),
            Token::Func(Func::Cos) => f.write_str("cos"),
            Token::Func(Func::Tan) => f.write_str("tan"),
            Token::Plus => f.write_str("+"),
            Token::Minus => f.write_str("-"),
            Token::Star => f.write_str("*"),
            Token::Slash => f.write_str("/"),
            Token::Caret => f.write_str("^"),
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, ExprError> {
    let chars: Vec<(usize, char)> = input.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let (offset, ch) = chars[i];
        match ch {
            c if c.is_whitespace() => i += 1,
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].1.is_ascii_digit() || chars[i].1 == '.') {
                    i += 1;
                }
                let literal: String = chars[start..i].iter().map(|(_, c)| c).collect();
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| ExprError::InvalidNumber(literal.clone()))?;
                tokens.push(Token::Num(value));
            }
            c if c.is_ascii_alphabetic() => {
                let start = i;
                while i < chars.len() && chars[i].1.is_ascii_alphabetic() {
                    i += 1;
                }
                let ident: String = chars[start..i]
                    .iter()
                    .map(|(_, c)| c.to_ascii_lowercase())
                    .collect();
                let token = match ident.as_str() {
                    "x" => Token::X,
                    "pi" => Token::Pi,
                    "sin" => Token::Func(Func::Sin),
                    "cos" => Token::Func(Func::Cos),
                    "tan" => Token::Func(Func::Tan),
                    _ => return Err(ExprError::UnknownIdentifier(ident)),
                };
                tokens.push(token);
            }
            'π' => {
                tokens.push(Token::Pi);
                i += 1;
            }
            '+' | '-' | '*' | '/' | '^' | '(' | ')' => {
                tokens.push(match ch {
                    '+' => Token::Plus,
                    '-' => Token::Minus,
                    '*' => Token::Star,
                    '/' => Token::Slash,
                    '^' => Token::Caret,
                    '(' => Token::LParen,
                    _ => Token::RParen,
                });
                i += 1;
            }
            other => return Err(ExprError::UnexpectedChar(other, offset)),
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.peek();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: Token) -> Result<(), ExprError> {
        match self.next() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(ExprError::UnexpectedToken(token.to_string())),
            None => Err(ExprError::UnexpectedEnd),
        }
    }

    // expression := term (('+' | '-') term)*
    fn expression(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.term()?;
        while let Some(token) = self.peek() {
            let op = match token {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.term()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    // term := unary (('*' | '/') unary | <implicit> unary)*
    fn term(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.unary()?;
        while let Some(token) = self.peek() {
            let op = match token {
                Token::Star => {
                    self.pos += 1;
                    BinaryOp::Mul
                }
                Token::Slash => {
                    self.pos += 1;
                    BinaryOp::Div
                }
                t if t.starts_operand() => BinaryOp::Mul,
                _ => break,
            };
            let rhs = self.unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    // Every recursive path passes through here.
    fn unary(&mut self) -> Result<Expr, ExprError> {
        if self.depth >= MAX_NESTING {
            return Err(ExprError::TooDeep(MAX_NESTING));
        }
        self.depth += 1;
        let expr = self.signed();
        self.depth -= 1;
        expr
    }

    // unary := ('-' | '+') unary | power
    fn signed(&mut self) -> Result<Expr, ExprError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                Ok(Expr::Neg(Box::new(self.unary()?)))
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.power(),
        }
    }

    // power := primary ('^' unary)?
    fn power(&mut self) -> Result<Expr, ExprError> {
        let base = self.primary()?;
        if self.peek() == Some(Token::Caret) {
            self.pos += 1;
            let exponent = self.unary()?;
            return Ok(Expr::Binary(
                BinaryOp::Pow,
                Box::new(base),
                Box::new(exponent),
            ));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Expr, ExprError> {
        match self.next() {
            Some(Token::Num(value)) => Ok(Expr::Num(value)),
            Some(Token::X) => Ok(Expr::X),
            Some(Token::Pi) => Ok(Expr::Num(std::f64::consts::PI)),
            Some(Token::Func(func)) => {
                self.expect(Token::LParen)?;
                let arg = self.expression()?;
                self.expect(Token::RParen)?;
                Ok(Expr::Call(func, Box::new(arg)))
            }
            Some(Token::LParen) => {
                let inner = self.expression()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(token) => Err(ExprError::UnexpectedToken(token.to_string())),
            None => Err(ExprError::UnexpectedEnd),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(source: &str, x: f64) -> f64 {
        Equation::parse(source).unwrap().eval(x)
    }

    #[test]
    fn precedence_and_associativity() {
        assert_eq!(eval("1 + 2 * 3", 0.0), 7.0);
        assert_eq!(eval("2 ^ 3 ^ 2", 0.0), 512.0);
        assert_eq!(eval("-x^2", 3.0), -9.0);
        assert_eq!(eval("(1 + 2) * 3", 0.0), 9.0);
        assert_eq!(eval("2^-1", 0.0), 0.5);
    }

    #[test]
    fn implicit_multiplication() {
        assert_eq!(eval("2x", 4.0), 8.0);
        assert_eq!(eval("(x+1)(x-1)", 3.0), 8.0);
        assert!((eval("2sin(pi/2)", 0.0) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn strips_assignment_prefix() {
        assert_eq!(eval("y = x + 1", 1.0), 2.0);
        assert_eq!(eval("f(x) = x*x", 5.0), 25.0);
        assert!(matches!(
            Equation::parse("z = x"),
            Err(ExprError::UnexpectedChar('=', _))
        ));
    }

    #[test]
    fn rejects_anything_outside_the_function_set() {
        assert_eq!(
            Equation::parse("exp(x)"),
            Err(ExprError::UnknownIdentifier("exp".into()))
        );
        assert!(matches!(
            Equation::parse("x; drop"),
            Err(ExprError::UnexpectedChar(';', _))
        ));
        assert_eq!(Equation::parse("   "), Err(ExprError::Empty));
        assert_eq!(Equation::parse("sin(x"), Err(ExprError::UnexpectedEnd));
        assert!(matches!(
            Equation::parse("x )"),
            Err(ExprError::UnexpectedToken(_))
        ));
    }

    #[test]
    fn division_by_zero_is_not_finite() {
        assert!(!eval("1/x", 0.0).is_finite());
    }

    #[test]
    fn deep_nesting_is_refused_without_recursing() {
        let depth = 100_000;
        let source = format!("{}x{}", "(".repeat(depth), ")".repeat(depth));
        assert!(Equation::parse(&source).is_err());

        let parens = format!("{}x{}", "(".repeat(100), ")".repeat(100));
        assert_eq!(
            Equation::parse(&parens),
            Err(ExprError::TooDeep(MAX_NESTING))
        );
        let signs = format!("{}x", "-".repeat(100));
        assert_eq!(Equation::parse(&signs), Err(ExprError::TooDeep(MAX_NESTING)));
        assert_eq!(
            Equation::parse(&format!("sin({}x{})", "(".repeat(80), ")".repeat(80))),
            Err(ExprError::TooDeep(MAX_NESTING))
        );
    }

    #[test]
    fn long_operator_chains_are_refused() {
        let chain = vec!["x"; 2_000].join("+");
        assert_eq!(Equation::parse(&chain), Err(ExprError::TooLong(MAX_TOKENS)));
    }

    #[test]
    fn reasonable_nesting_still_parses() {
        let source = format!("{}x + 1{}", "(".repeat(20), ")".repeat(20));
        assert_eq!(eval(&source, 2.0), 3.0);
        assert_eq!(eval("--x", 4.0), 4.0);
    }
}
