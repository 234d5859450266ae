//! Live scoring: a small arithmetic expression evaluated over the JSON outcard.
//!
//! Grammar:
//!
//! ```text
//! expr   := term (('+' | '-') term)*
//! term   := unary (('*' | '/' | '%') unary)*
//! unary  := '-' unary | atom
//! atom   := number | path | '(' expr ')'
//! path   := ident ('.' ident)*
//! ```

use std::fmt;

use serde_json::Value;
use thiserror::Error;

/// Marker every JSON-encoded outcard starts with.
pub const JSON_OUTCARD_MARKER: &[u8; 4] = b"JSON";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoreError {
    #[error("unexpected character {0:?} at {1}")]
    UnexpectedChar(char, usize),
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("unexpected token {0}")]
    UnexpectedToken(String),
    #[error("unknown field {0}")]
    UnknownField(String),
    #[error("field {0} is not a number")]
    NotANumber(String),
    #[error("division by zero")]
    DivisionByZero,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Op(char),
    Open,
    Close,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{n}"),
            Token::Ident(name) => f.write_str(name),
            Token::Op(op) => write!(f, "{op}"),
            Token::Open => f.write_str("("),
            Token::Close => f.write_str(")"),
        }
    }
}

fn tokenize(source: &str) -> Result<Vec<Token>, ScoreError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '+' | '-' | '*' | '/' | '%' => {
                tokens.push(Token::Op(c));
                i += 1;
            }
            '(' => {
                tokens.push(Token::Open);
                i += 1;
            }
            ')' => {
                tokens.push(Token::Close);
                i += 1;
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let value = text
                    .parse()
                    .map_err(|_| ScoreError::UnexpectedToken(text.clone()))?;
                tokens.push(Token::Number(value));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '.')
                {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            other => return Err(ScoreError::UnexpectedChar(other, i)),
        }
    }

    Ok(tokens)
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Number(f64),
    Field(String),
    Neg(Box<Expr>),
    Binary(char, Box<Expr>, Box<Expr>),
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn expr(&mut self) -> Result<Expr, ScoreError> {
        let mut lhs = self.term()?;
        while let Some(Token::Op(op @ ('+' | '-'))) = self.peek().cloned() {
            self.pos += 1;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(self.term()?));
        }
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Expr, ScoreError> {
        let mut lhs = self.unary()?;
        while let Some(Token::Op(op @ ('*' | '/' | '%'))) = self.peek().cloned() {
            self.pos += 1;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(self.unary()?));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, ScoreError> {
        if self.peek() == Some(&Token::Op('-')) {
            self.pos += 1;
            return Ok(Expr::Neg(Box::new(self.unary()?)));
        }
        self.atom()
    }

    fn atom(&mut self) -> Result<Expr, ScoreError> {
        match self.next().ok_or(ScoreError::UnexpectedEnd)? {
            Token::Number(n) => Ok(Expr::Number(n)),
            Token::Ident(name) => Ok(Expr::Field(name)),
            Token::Open => {
                let inner = self.expr()?;
                match self.next() {
                    Some(Token::Close) => Ok(inner),
                    Some(other) => Err(ScoreError::UnexpectedToken(other.to_string())),
                    None => Err(ScoreError::UnexpectedEnd),
                }
            }
            other => Err(ScoreError::UnexpectedToken(other.to_string())),
        }
    }
}

fn parse(source: &str) -> Result<Expr, ScoreError> {
    let mut parser = Parser {
        tokens: tokenize(source)?,
        pos: 0,
    };
    let expr = parser.expr()?;
    match parser.next() {
        None => Ok(expr),
        Some(extra) => Err(ScoreError::UnexpectedToken(extra.to_string())),
    }
}

fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(root, |value, key| value.get(key))
}

fn eval(expr: &Expr, fields: &Value) -> Result<f64, ScoreError> {
    match expr {
        Expr::Number(n) => Ok(*n),
        Expr::Field(path) => {
            let value = lookup(fields, path).ok_or_else(|| ScoreError::UnknownField(path.clone()))?;
            match value {
                Value::Number(n) => n.as_f64().ok_or_else(|| ScoreError::NotANumber(path.clone())),
                Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
                _ => Err(ScoreError::NotANumber(path.clone())),
            }
        }
        Expr::Neg(inner) => Ok(-eval(inner, fields)?),
        Expr::Binary(op, lhs, rhs) => {
            let (a, b) = (eval(lhs, fields)?, eval(rhs, fields)?);
            match op {
                '+' => Ok(a + b),
                '-' => Ok(a - b),
                '*' => Ok(a * b),
                '/' | '%' if b == 0.0 => Err(ScoreError::DivisionByZero),
                '/' => Ok(a / b),
                _ => Ok(a % b),
            }
        }
    }
}

/// Result of scoring one outcard snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum ScoreOutcome {
    NotConfigured,
    NoJsonMarker,
    Malformed(String),
    Value(f64),
}

impl ScoreOutcome {
    /// Integer score, truncated toward zero. `None` for every non-value outcome.
    pub fn score(&self) -> Option<i64> {
        match self {
            ScoreOutcome::Value(v) if v.is_finite() => Some(v.trunc() as i64),
            _ => None,
        }
    }
}

/// Compiled score function of a rule.
#[derive(Debug, Clone)]
pub struct ScoreEvaluator {
    compiled: Option<Result<Expr, ScoreError>>,
}

impl ScoreEvaluator {
    pub fn new(score_function: &str) -> Self {
        let source = score_function.trim();
        let compiled = (!source.is_empty()).then(|| parse(source));
        Self { compiled }
    }

    pub fn is_configured(&self) -> bool {
        self.compiled.is_some()
    }

    pub fn evaluate(&self, outcard: &[u8]) -> ScoreOutcome {
        let Some(compiled) = &self.compiled else {
            return ScoreOutcome::NotConfigured;
        };
        let Some(body) = outcard.strip_prefix(JSON_OUTCARD_MARKER) else {
            return ScoreOutcome::NoJsonMarker;
        };
        let expr = match compiled {
            Ok(expr) => expr,
            Err(err) => return ScoreOutcome::Malformed(format!("score function: {err}")),
        };

        let body = trim_trailing_padding(body);
        let fields: Value = match serde_json::from_slice(body) {
            Ok(fields) => fields,
            Err(err) => return ScoreOutcome::Malformed(format!("outcard json: {err}")),
        };

        match eval(expr, &fields) {
            Ok(value) => ScoreOutcome::Value(value),
            Err(err) => ScoreOutcome::Malformed(err.to_string()),
        }
    }
}

fn trim_trailing_padding(body: &[u8]) -> &[u8] {
    let end = body
        .iter()
        .rposition(|b| *b != 0 && !b.is_ascii_whitespace())
        .map_or(0, |i| i + 1);
    &body[..end]
}

#[cfg(test)]
#[path = "tests/score_tests.rs"]
mod tests;
