//! Restricted arithmetic expressions for numeric text fields
//!
//! Accepts number literals (with optional fraction and exponent), the four
//! basic operators, unary signs and parentheses. Nothing else is evaluated.
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := ('+' | '-') unary | primary
//! primary := number | '(' expr ')'
//! ```

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    #[error("empty expression")]
    Empty,
    #[error("unexpected character '{ch}' at offset {pos}")]
    UnexpectedChar { ch: char, pos: usize },
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("malformed number '{text}' at offset {pos}")]
    BadNumber { text: String, pos: usize },
    #[error("unbalanced parenthesis at offset {pos}")]
    Unbalanced { pos: usize },
    #[error("result is not finite")]
    NotFinite,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Num(f64),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

/// Evaluate `input` to a finite `f64`
pub fn evaluate(input: &str) -> Result<f64, ExprError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(ExprError::Empty);
    }

    let mut parser = Parser { tokens: &tokens, pos: 0 };
    let value = parser.expr()?;

    if let Some(&(_, offset)) = parser.tokens.get(parser.pos) {
        return Err(match parser.tokens[parser.pos].0 {
            Token::RParen => ExprError::Unbalanced { pos: offset },
            _ => ExprError::UnexpectedChar { ch: input[offset..].chars().next().unwrap_or(' '), pos: offset },
        });
    }

    if value.is_finite() {
        Ok(value)
    } else {
        Err(ExprError::NotFinite)
    }
}

fn tokenize(input: &str) -> Result<Vec<(Token, usize)>, ExprError> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        let tok = match c {
            b' ' | b'\t' | b'\n' | b'\r' => {
                i += 1;
                continue;
            }
            b'+' => Token::Plus,
            b'-' => Token::Minus,
            b'*' => Token::Star,
            b'/' => Token::Slash,
            b'(' => Token::LParen,
            b')' => Token::RParen,
            b'0'..=b'9' | b'.' => {
                let start = i;
                i = scan_number(bytes, i);
                let text = &input[start..i];
                let value = text.parse::<f64>().map_err(|_| ExprError::BadNumber {
                    text: text.to_string(),
                    pos: start,
                })?;
                tokens.push((Token::Num(value), start));
                continue;
            }
            _ => {
                let ch = input[i..].chars().next().unwrap_or('?');
                return Err(ExprError::UnexpectedChar { ch, pos: i });
            }
        };
        tokens.push((tok, i));
        i += 1;
    }

    Ok(tokens)
}

/// Returns the end offset of the number literal starting at `start`
fn scan_number(bytes: &[u8], start: usize) -> usize {
    let mut i = start;
    while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
        i += 1;
    }
    // Exponent only counts if digits follow, otherwise "2e" is left for the parser to reject
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        let mut j = i + 1;
        if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
            j += 1;
        }
        if j < bytes.len() && bytes[j].is_ascii_digit() {
            while j < bytes.len() && bytes[j].is_ascii_digit() {
                j += 1;
            }
            i = j;
        }
    }
    i
}

struct Parser<'a> {
    tokens: &'a [(Token, usize)],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).map(|&(t, _)| t)
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map(|&(_, o)| o).unwrap_or(usize::MAX)
    }

    fn expr(&mut self) -> Result<f64, ExprError> {
        let mut acc = self.term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.pos += 1;
                    acc += self.term()?;
                }
                Some(Token::Minus) => {
                    self.pos += 1;
                    acc -= self.term()?;
                }
                _ => return Ok(acc),
            }
        }
    }

    fn term(&mut self) -> Result<f64, ExprError> {
        let mut acc = self.unary()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.pos += 1;
                    acc *= self.unary()?;
                }
                Some(Token::Slash) => {
                    self.pos += 1;
                    acc /= self.unary()?;
                }
                _ => return Ok(acc),
            }
        }
    }

    fn unary(&mut self) -> Result<f64, ExprError> {
        match self.peek() {
            Some(Token::Plus) => {
                self.pos += 1;
                self.unary()
            }
            Some(Token::Minus) => {
                self.pos += 1;
                Ok(-self.unary()?)
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<f64, ExprError> {
        let open = self.offset();
        match self.peek() {
            Some(Token::Num(v)) => {
                self.pos += 1;
                Ok(v)
            }
            Some(Token::LParen) => {
                self.pos += 1;
                let v = self.expr()?;
                match self.peek() {
                    Some(Token::RParen) => {
                        self.pos += 1;
                        Ok(v)
                    }
                    _ => Err(ExprError::Unbalanced { pos: open }),
                }
            }
            Some(Token::RParen) => Err(ExprError::Unbalanced { pos: open }),
            Some(_) => Err(ExprError::UnexpectedChar { ch: self.symbol(), pos: open }),
            None => Err(ExprError::UnexpectedEnd),
        }
    }

    fn symbol(&self) -> char {
        match self.peek() {
            Some(Token::Plus) => '+',
            Some(Token::Minus) => '-',
            Some(Token::Star) => '*',
            Some(Token::Slash) => '/',
            Some(Token::LParen) => '(',
            Some(Token::RParen) => ')',
            _ => '?',
        }
    }
}
