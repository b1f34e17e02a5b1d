//! Tokenizer and recursive-descent evaluator for the arithmetic grammar.
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/' | '%') unary)*
//! unary   := ('+' | '-') unary | power
//! power   := primary ('^' unary)?
//! primary := number | '(' expr ')'
//! ```
//!
//! `^` is right-associative and binds tighter than a leading sign, so
//! `-2^2` is `-4` and `2^3^2` is `512`.

use std::iter::Peekable;
use std::vec::IntoIter;

use crate::error::EvalError;

/// Parenthesis/sign nesting limit. Keeps hostile input from exhausting the stack.
const MAX_DEPTH: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Token {
    Num(f64),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    ParenOpen,
    ParenClose,
}

pub fn tokenize(input: &str) -> Result<Vec<Token>, EvalError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(pos, c)) = chars.peek() {
        let token = match c {
            ' ' | '\t' => {
                chars.next();
                continue;
            }
            '0'..='9' | '.' => {
                let mut end = pos;
                let mut dots = 0;
                while let Some(&(i, d)) = chars.peek() {
                    if d.is_ascii_digit() {
                        end = i + 1;
                    } else if d == '.' {
                        dots += 1;
                        end = i + 1;
                    } else {
                        break;
                    }
                    chars.next();
                }
                let literal = &input[pos..end];
                if dots > 1 || literal == "." {
                    return Err(EvalError::InvalidExpression(format!(
                        "malformed number {literal:?}"
                    )));
                }
                let value = literal.parse::<f64>().map_err(|_| {
                    EvalError::InvalidExpression(format!("malformed number {literal:?}"))
                })?;
                tokens.push(Token::Num(value));
                continue;
            }
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '%' => Token::Percent,
            '^' => Token::Caret,
            '(' => Token::ParenOpen,
            ')' => Token::ParenClose,
            other => {
                return Err(EvalError::InvalidExpression(format!(
                    "unexpected character {other:?} at position {pos}"
                )));
            }
        };
        tokens.push(token);
        chars.next();
    }

    Ok(tokens)
}

/// Parse and evaluate `input` in one pass. No rounding or finiteness checks.
pub fn evaluate(input: &str) -> Result<f64, EvalError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser {
        tokens: tokens.into_iter().peekable(),
        depth: 0,
    };
    let value = parser.expr()?;
    match parser.tokens.next() {
        None => Ok(value),
        Some(extra) => Err(unexpected(Some(extra))),
    }
}

struct Parser {
    tokens: Peekable<IntoIter<Token>>,
    depth: usize,
}

impl Parser {
    fn expr(&mut self) -> Result<f64, EvalError> {
        let mut acc = self.term()?;
        loop {
            match self.tokens.peek() {
                Some(Token::Plus) => {
                    self.tokens.next();
                    acc += self.term()?;
                }
                Some(Token::Minus) => {
                    self.tokens.next();
                    acc -= self.term()?;
                }
                _ => return Ok(acc),
            }
        }
    }

    fn term(&mut self) -> Result<f64, EvalError> {
        let mut acc = self.unary()?;
        loop {
            match self.tokens.peek() {
                Some(Token::Star) => {
                    self.tokens.next();
                    acc *= self.unary()?;
                }
                Some(Token::Slash) => {
                    self.tokens.next();
                    acc /= self.unary()?;
                }
                Some(Token::Percent) => {
                    self.tokens.next();
                    acc %= self.unary()?;
                }
                _ => return Ok(acc),
            }
        }
    }

    fn unary(&mut self) -> Result<f64, EvalError> {
        match self.tokens.peek() {
            Some(Token::Minus) => {
                self.tokens.next();
                self.nested(|p| p.unary()).map(|v| -v)
            }
            Some(Token::Plus) => {
                self.tokens.next();
                self.nested(|p| p.unary())
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<f64, EvalError> {
        let base = self.primary()?;
        if self.tokens.peek() == Some(&Token::Caret) {
            self.tokens.next();
            let exponent = self.nested(|p| p.unary())?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<f64, EvalError> {
        match self.tokens.next() {
            Some(Token::Num(n)) => Ok(n),
            Some(Token::ParenOpen) => {
                let value = self.nested(|p| p.expr())?;
                match self.tokens.next() {
                    Some(Token::ParenClose) => Ok(value),
                    other => Err(unexpected(other)),
                }
            }
            other => Err(unexpected(other)),
        }
    }

    fn nested(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<f64, EvalError>,
    ) -> Result<f64, EvalError> {
        if self.depth >= MAX_DEPTH {
            return Err(EvalError::InvalidExpression("nesting too deep".to_string()));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }
}

fn unexpected(token: Option<Token>) -> EvalError {
    let msg = match token {
        None => "unexpected end of expression".to_string(),
        Some(t) => format!("unexpected token {t:?}"),
    };
    EvalError::InvalidExpression(msg)
}
