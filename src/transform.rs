//! Password transformation.
//!
//! Every layer encrypts under a different effective password, produced by
//! applying a caller-supplied per-byte transform to the user password. The
//! transform is a small arithmetic expression over two variables: `b`, the
//! current password byte, and `i`, the round index. Examples:
//!
//! - `b` — identity
//! - `(b + i) % 256` — rotate each byte by the round
//! - `b ^ (i * 7)` — round-dependent mask
//!
//! The expression is parsed once per operation and evaluated once per byte
//! per layer. It is a closed interpreter, not host-language evaluation:
//! the only operations are integer arithmetic and bitwise operators, so a
//! transform can never touch anything beyond the two inputs it is given.
//!
//! The transformed bytes are base64-encoded, and the encoded string is the
//! layer's effective password for key derivation.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use zeroize::Zeroize;

use crate::error::{EngineError, Result};

/// Binary operators, in increasing binding power:
/// `|` < `^` < `&` < `<< >>` < `+ -` < `* / %`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum BinOp {
    Or,
    Xor,
    And,
    Shl,
    Shr,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinOp {
    fn binding_power(self) -> u8 {
        match self {
            Self::Or => 1,
            Self::Xor => 2,
            Self::And => 3,
            Self::Shl | Self::Shr => 4,
            Self::Add | Self::Sub => 5,
            Self::Mul | Self::Div | Self::Rem => 6,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Token {
    Num(i64),
    Byte,
    Round,
    Op(BinOp),
    Tilde,
    LParen,
    RParen,
}

#[derive(Clone, Debug)]
enum Expr {
    Num(i64),
    Byte,
    Round,
    Neg(Box<Expr>),
    Not(Box<Expr>),
    Bin(BinOp, Box<Expr>, Box<Expr>),
}

fn lex(source: &str) -> Result<Vec<Token>> {
    let err = |msg: String| EngineError::TransformError(msg);
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let c = bytes[pos];
        match c {
            b' ' | b'\t' | b'\n' | b'\r' => pos += 1,
            b'(' => {
                tokens.push(Token::LParen);
                pos += 1;
            }
            b')' => {
                tokens.push(Token::RParen);
                pos += 1;
            }
            b'+' => {
                tokens.push(Token::Op(BinOp::Add));
                pos += 1;
            }
            b'-' => {
                tokens.push(Token::Op(BinOp::Sub));
                pos += 1;
            }
            b'*' => {
                tokens.push(Token::Op(BinOp::Mul));
                pos += 1;
            }
            b'/' => {
                tokens.push(Token::Op(BinOp::Div));
                pos += 1;
            }
            b'%' => {
                tokens.push(Token::Op(BinOp::Rem));
                pos += 1;
            }
            b'&' => {
                tokens.push(Token::Op(BinOp::And));
                pos += 1;
            }
            b'^' => {
                tokens.push(Token::Op(BinOp::Xor));
                pos += 1;
            }
            b'|' => {
                tokens.push(Token::Op(BinOp::Or));
                pos += 1;
            }
            b'~' => {
                tokens.push(Token::Tilde);
                pos += 1;
            }
            b'<' | b'>' => {
                if pos + 1 >= bytes.len() || bytes[pos + 1] != c {
                    return Err(err(format!("expected `{0}{0}`", c as char)));
                }
                tokens.push(Token::Op(if c == b'<' { BinOp::Shl } else { BinOp::Shr }));
                pos += 2;
            }
            b'b' => {
                tokens.push(Token::Byte);
                pos += 1;
            }
            b'i' => {
                tokens.push(Token::Round);
                pos += 1;
            }
            b'0'..=b'9' => {
                let start = pos;
                let radix = if c == b'0'
                    && pos + 1 < bytes.len()
                    && (bytes[pos + 1] == b'x' || bytes[pos + 1] == b'X')
                {
                    pos += 2;
                    16
                } else {
                    10
                };
                let digits_start = pos;
                while pos < bytes.len() && bytes[pos].is_ascii_alphanumeric() {
                    pos += 1;
                }
                let digits = &source[digits_start..pos];
                if digits.is_empty() {
                    return Err(err("hex literal has no digits".into()));
                }
                let value = i64::from_str_radix(digits, radix)
                    .map_err(|_| err(format!("invalid number {:?}", &source[start..pos])))?;
                tokens.push(Token::Num(value));
            }
            _ => return Err(err(format!("unexpected character {:?}", c as char))),
        }
    }

    if tokens.is_empty() {
        return Err(err("empty transform expression".into()));
    }

    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> Result<Token> {
        let token = self
            .peek()
            .ok_or_else(|| EngineError::TransformError("unexpected end of expression".into()))?;
        self.pos += 1;
        Ok(token)
    }

    fn parse_expr(&mut self, min_power: u8) -> Result<Expr> {
        let mut lhs = self.parse_prefix()?;

        while let Some(Token::Op(op)) = self.peek() {
            let power = op.binding_power();
            if power < min_power {
                break;
            }
            self.pos += 1;
            // Left-associative: the right side binds one level tighter.
            let rhs = self.parse_expr(power + 1)?;
            lhs = Expr::Bin(op, Box::new(lhs), Box::new(rhs));
        }

        Ok(lhs)
    }

    fn parse_prefix(&mut self) -> Result<Expr> {
        const UNARY_POWER: u8 = 7;

        match self.next()? {
            Token::Num(n) => Ok(Expr::Num(n)),
            Token::Byte => Ok(Expr::Byte),
            Token::Round => Ok(Expr::Round),
            Token::Op(BinOp::Sub) => Ok(Expr::Neg(Box::new(self.parse_expr(UNARY_POWER)?))),
            Token::Tilde => Ok(Expr::Not(Box::new(self.parse_expr(UNARY_POWER)?))),
            Token::LParen => {
                let inner = self.parse_expr(0)?;
                match self.next()? {
                    Token::RParen => Ok(inner),
                    other => Err(EngineError::TransformError(format!(
                        "expected `)`, found {other:?}"
                    ))),
                }
            }
            other => Err(EngineError::TransformError(format!(
                "unexpected token {other:?}"
            ))),
        }
    }
}

impl Expr {
    fn eval(&self, byte: i64, round: i64) -> Result<i64> {
        let err = |msg: &str| EngineError::TransformError(msg.to_owned());

        match self {
            Self::Num(n) => Ok(*n),
            Self::Byte => Ok(byte),
            Self::Round => Ok(round),
            Self::Neg(inner) => Ok(inner.eval(byte, round)?.wrapping_neg()),
            Self::Not(inner) => Ok(!inner.eval(byte, round)?),
            Self::Bin(op, lhs, rhs) => {
                let l = lhs.eval(byte, round)?;
                let r = rhs.eval(byte, round)?;
                match op {
                    BinOp::Add => Ok(l.wrapping_add(r)),
                    BinOp::Sub => Ok(l.wrapping_sub(r)),
                    BinOp::Mul => Ok(l.wrapping_mul(r)),
                    BinOp::Div => l.checked_div(r).ok_or_else(|| err("division by zero")),
                    BinOp::Rem => l.checked_rem(r).ok_or_else(|| err("modulo by zero")),
                    BinOp::And => Ok(l & r),
                    BinOp::Xor => Ok(l ^ r),
                    BinOp::Or => Ok(l | r),
                    BinOp::Shl | BinOp::Shr => {
                        if !(0..64).contains(&r) {
                            return Err(err("shift count out of range"));
                        }
                        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
                        let count = r as u32;
                        Ok(if *op == BinOp::Shl { l.wrapping_shl(count) } else { l.wrapping_shr(count) })
                    }
                }
            }
        }
    }
}

/// A parsed password-transform expression.
///
/// Parsing happens once per operation; [`Transform::effective_password`] is
/// then called once per layer with the layer's round index.
pub struct Transform {
    expr: Expr,
}

impl Transform {
    /// Parses a transform expression, failing with
    /// [`EngineError::TransformError`] on any lexical or syntactic problem.
    pub fn parse(source: &str) -> Result<Self> {
        let tokens = lex(source)?;
        let mut parser = Parser { tokens: &tokens, pos: 0 };
        let expr = parser.parse_expr(0)?;
        if parser.pos != tokens.len() {
            return Err(EngineError::TransformError(format!(
                "trailing input after expression: {:?}",
                tokens[parser.pos]
            )));
        }
        Ok(Self { expr })
    }

    /// Maps every password byte through the expression at the given round
    /// and base64-encodes the result into the layer's effective password.
    pub fn effective_password(&self, password: &str, round: usize) -> Result<String> {
        let input = password.as_bytes();
        let mut output = Vec::with_capacity(input.len());

        #[allow(clippy::cast_possible_wrap)]
        let round = round as i64;
        for &byte in input {
            let value = self.expr.eval(i64::from(byte), round)?;
            output.push(value.rem_euclid(256) as u8);
        }

        // The per-byte map cannot change arity, but the contract says the
        // output must match the input length, so keep the check explicit.
        if output.len() != input.len() {
            output.zeroize();
            return Err(EngineError::TransformError(
                "transform output length does not match password length".into(),
            ));
        }

        let encoded = BASE64.encode(&output);
        output.zeroize();
        Ok(encoded)
    }
}
