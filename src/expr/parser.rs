//! Infix reader for expressions written by [`Display`](std::fmt::Display).
//!
//! Grammar, whitespace-insensitive:
//!
//! ```text
//! expr    := operand (op expr)?
//! operand := '(' expr ')' | 'x' digits | number
//! op      := '+' | '-' | '*' | '/'
//! ```
//!
//! An unparenthesised chain `a op b op c` groups to the right. A `-` is a
//! sign when it starts an operand and is directly followed by a digit.

use super::node::{Node, Operator};
use crate::error::{Result, SymregError};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Open,
    Close,
    Op(Operator),
    Var(u32),
    Num(f64),
}

/// A token with its byte offset in the input.
type Spanned = (usize, Token);

fn error(position: usize, message: impl Into<String>) -> SymregError {
    SymregError::Parse {
        position,
        message: message.into(),
    }
}

fn tokenize(line: &str) -> Result<Vec<Spanned>> {
    let bytes = line.as_bytes();
    let mut tokens: Vec<Spanned> = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        let starts_operand = matches!(tokens.last(), None | Some((_, Token::Open | Token::Op(_))));
        let next_is_digit = bytes
            .get(i + 1)
            .is_some_and(|b| b.is_ascii_digit() || *b == b'.');

        match c {
            b' ' | b'\t' | b'\r' | b'\n' => {
                i += 1;
            }
            b'(' => {
                tokens.push((i, Token::Open));
                i += 1;
            }
            b')' => {
                tokens.push((i, Token::Close));
                i += 1;
            }
            b'x' | b'X' => {
                let start = i;
                i += 1;
                while i < bytes.len() && bytes[i].is_ascii_digit() {
                    i += 1;
                }
                let index = line[start + 1..i]
                    .parse::<u32>()
                    .map_err(|_| error(start, "variable needs a column index"))?;
                tokens.push((start, Token::Var(index)));
            }
            b'-' if starts_operand && next_is_digit => {
                let (end, value) = read_number(line, i)?;
                tokens.push((i, Token::Num(value)));
                i = end;
            }
            b'0'..=b'9' | b'.' => {
                let (end, value) = read_number(line, i)?;
                tokens.push((i, Token::Num(value)));
                i = end;
            }
            _ => {
                let symbol = line[i..].chars().next().unwrap_or(' ');
                let mut buf = [0u8; 4];
                match Operator::from_symbol(symbol.encode_utf8(&mut buf)) {
                    Some(op) => tokens.push((i, Token::Op(op))),
                    None => return Err(error(i, format!("unexpected character '{symbol}'"))),
                }
                i += symbol.len_utf8();
            }
        }
    }

    Ok(tokens)
}

/// Reads a decimal number, optionally signed and with an exponent.
fn read_number(line: &str, start: usize) -> Result<(usize, f64)> {
    let bytes = line.as_bytes();
    let mut i = start;
    if bytes[i] == b'-' {
        i += 1;
    }
    while i < bytes.len() {
        let b = bytes[i];
        if b.is_ascii_digit() || b == b'.' {
            i += 1;
        } else if (b == b'e' || b == b'E') && i > start {
            i += 1;
            if i < bytes.len() && (bytes[i] == b'-' || bytes[i] == b'+') {
                i += 1;
            }
        } else {
            break;
        }
    }
    let text = &line[start..i];
    let value = text
        .parse::<f64>()
        .map_err(|_| error(start, format!("invalid number '{text}'")))?;
    Ok((i, value))
}

/// Parses one infix expression into preorder nodes.
pub fn parse_infix(line: &str) -> Result<Vec<Node>> {
    let tokens = tokenize(line)?;
    if tokens.is_empty() {
        return Err(error(0, "empty expression"));
    }
    let mut out = Vec::with_capacity(tokens.len());
    parse_expr(&tokens, line.len(), &mut out)?;
    Ok(out)
}

fn parse_expr(tokens: &[Spanned], end: usize, out: &mut Vec<Node>) -> Result<()> {
    let Some(&(start, _)) = tokens.first() else {
        return Err(error(end, "missing operand"));
    };

    // first operator outside any parentheses
    let mut depth = 0usize;
    let mut split = None;
    for (i, &(pos, token)) in tokens.iter().enumerate() {
        match token {
            Token::Open => depth += 1,
            Token::Close => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| error(pos, "unbalanced ')'"))?;
            }
            Token::Op(op) if depth == 0 => {
                split = Some((i, op));
                break;
            }
            _ => {}
        }
    }

    match split {
        Some((i, op)) => {
            let right_start = tokens.get(i + 1).map_or(end, |t| t.0);
            out.push(Node::Operator(op));
            parse_operand(&tokens[..i], start, out)?;
            parse_expr(&tokens[i + 1..], right_start.max(start), out)
        }
        None => parse_operand(tokens, start, out),
    }
}

fn parse_operand(tokens: &[Spanned], start: usize, out: &mut Vec<Node>) -> Result<()> {
    match tokens {
        [] => Err(error(start, "missing operand")),
        [(_, Token::Var(index))] => {
            out.push(Node::Variable(*index));
            Ok(())
        }
        [(_, Token::Num(value))] => {
            out.push(Node::Number(*value));
            Ok(())
        }
        [(open, Token::Open), inner @ .., (_, Token::Close)] => {
            if !closes_at_end(inner) {
                return Err(error(*open, "parenthesised group does not span the operand"));
            }
            parse_expr(inner, *open + 1, out)
        }
        [(pos, token), ..] => Err(error(*pos, format!("unexpected {token:?}"))),
    }
}

/// True when `inner` never closes more groups than it opens.
fn closes_at_end(inner: &[Spanned]) -> bool {
    let mut depth = 0i64;
    for &(_, token) in inner {
        match token {
            Token::Open => depth += 1,
            Token::Close => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}
