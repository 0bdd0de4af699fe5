//! Operand expressions: one token parses into one expression tree.
//!
//! ```text
//! expr    := binary
//! binary  := prefix (op prefix)*          precedence climbing, left assoc
//! prefix  := '-' prefix | '!' prefix | primary
//! primary := int | string | 'store' | '(' expr ')'
//!          | 'int' BANK '[' expr ']' | 'str' BANK '[' expr ']'
//! ```
//!
//! Memory references keep their index as an expression; the index is only
//! read when the expression is evaluated.

use std::str::FromStr;

use crate::error::{EvalError, ExpressionError, MemoryError};
use crate::memory::{IntBank, IntLocation, Memory, StrBank, StrLocation};

/// Prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

/// Infix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Mul,
    Div,
    Rem,
    Add,
    Sub,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

/// Two-character operators must be matched before their one-character prefixes.
const BINARY_OPS: [(&str, BinaryOp); 13] = [
    ("||", BinaryOp::Or),
    ("&&", BinaryOp::And),
    ("==", BinaryOp::Eq),
    ("!=", BinaryOp::Ne),
    ("<=", BinaryOp::Le),
    (">=", BinaryOp::Ge),
    ("<", BinaryOp::Lt),
    (">", BinaryOp::Gt),
    ("+", BinaryOp::Add),
    ("-", BinaryOp::Sub),
    ("*", BinaryOp::Mul),
    ("/", BinaryOp::Div),
    ("%", BinaryOp::Rem),
];

impl BinaryOp {
    fn precedence(self) -> u8 {
        match self {
            BinaryOp::Or => 1,
            BinaryOp::And => 2,
            BinaryOp::Eq | BinaryOp::Ne => 3,
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => 4,
            BinaryOp::Add | BinaryOp::Sub => 5,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => 6,
        }
    }

    fn apply(self, a: i32, b: i32) -> Result<i32, EvalError> {
        Ok(match self {
            BinaryOp::Mul => a.wrapping_mul(b),
            BinaryOp::Div if b == 0 => return Err(EvalError::DivisionByZero),
            BinaryOp::Div => a.wrapping_div(b),
            BinaryOp::Rem if b == 0 => return Err(EvalError::DivisionByZero),
            BinaryOp::Rem => a.wrapping_rem(b),
            BinaryOp::Add => a.wrapping_add(b),
            BinaryOp::Sub => a.wrapping_sub(b),
            BinaryOp::Lt => (a < b) as i32,
            BinaryOp::Le => (a <= b) as i32,
            BinaryOp::Gt => (a > b) as i32,
            BinaryOp::Ge => (a >= b) as i32,
            BinaryOp::Eq => (a == b) as i32,
            BinaryOp::Ne => (a != b) as i32,
            BinaryOp::And => (a != 0 && b != 0) as i32,
            BinaryOp::Or => (a != 0 || b != 0) as i32,
        })
    }
}

/// A parsed operand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    /// Integer literal.
    Int(i32),
    /// String literal.
    Str(String),
    /// The store register.
    Store,
    /// `intX[index]`.
    IntRef {
        bank: IntBank,
        index: Box<Expression>,
    },
    /// `strX[index]`.
    StrRef {
        bank: StrBank,
        index: Box<Expression>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expression>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
    /// A group of already-parsed expressions. Produced by grouped operand
    /// descriptors, never by [`Expression::parse`].
    Complex(Vec<Expression>),
}

/// The result of evaluating a scalar expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scalar {
    Int(i32),
    Str(String),
}

impl Scalar {
    /// Human-readable kind, for type errors.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Scalar::Int(_) => "integer",
            Scalar::Str(_) => "string",
        }
    }
}

impl FromStr for Expression {
    type Err = ExpressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Expression::parse(s)
    }
}

impl Expression {
    /// Parse one operand token.
    pub fn parse(token: &str) -> Result<Self, ExpressionError> {
        let mut parser = Parser::new(token);
        parser.skip_ws();
        if parser.at_end() {
            return Err(ExpressionError::Empty);
        }
        let expr = parser.binary(0)?;
        parser.skip_ws();
        if !parser.at_end() {
            return Err(ExpressionError::TrailingInput { offset: parser.pos });
        }
        Ok(expr)
    }

    /// The value of an integer literal, if this is one.
    pub fn as_literal_int(&self) -> Option<i32> {
        match self {
            Expression::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Evaluate to a scalar value.
    pub fn evaluate(&self, mem: &Memory) -> Result<Scalar, EvalError> {
        match self {
            Expression::Int(v) => Ok(Scalar::Int(*v)),
            Expression::Str(s) => Ok(Scalar::Str(s.clone())),
            Expression::Store => Ok(Scalar::Int(mem.store())),
            Expression::IntRef { .. } => Ok(Scalar::Int(mem.int(self.int_location(mem)?)?)),
            Expression::StrRef { .. } => Ok(Scalar::Str(
                mem.string(self.str_location(mem)?)?.to_string(),
            )),
            Expression::Unary { op, operand } => {
                let v = operand.int_value(mem)?;
                Ok(Scalar::Int(match op {
                    UnaryOp::Neg => v.wrapping_neg(),
                    UnaryOp::Not => (v == 0) as i32,
                }))
            }
            Expression::Binary { op, lhs, rhs } => {
                let l = lhs.evaluate(mem)?;
                let r = rhs.evaluate(mem)?;
                match (op, l, r) {
                    (_, Scalar::Int(a), Scalar::Int(b)) => Ok(Scalar::Int(op.apply(a, b)?)),
                    (BinaryOp::Add, Scalar::Str(a), Scalar::Str(b)) => Ok(Scalar::Str(a + &b)),
                    (BinaryOp::Eq, Scalar::Str(a), Scalar::Str(b)) => {
                        Ok(Scalar::Int((a == b) as i32))
                    }
                    (BinaryOp::Ne, Scalar::Str(a), Scalar::Str(b)) => {
                        Ok(Scalar::Int((a != b) as i32))
                    }
                    (_, l, r) => Err(EvalError::TypeMismatch {
                        expected: "integer",
                        found: if matches!(l, Scalar::Str(_)) {
                            l.kind_name()
                        } else {
                            r.kind_name()
                        },
                    }),
                }
            }
            Expression::Complex(_) => Err(EvalError::TypeMismatch {
                expected: "scalar",
                found: "group",
            }),
        }
    }

    /// Evaluate to an integer, or fail with a type error.
    pub fn int_value(&self, mem: &Memory) -> Result<i32, EvalError> {
        match self.evaluate(mem)? {
            Scalar::Int(v) => Ok(v),
            other => Err(EvalError::TypeMismatch {
                expected: "integer",
                found: other.kind_name(),
            }),
        }
    }

    /// Evaluate to a string, or fail with a type error.
    pub fn str_value(&self, mem: &Memory) -> Result<String, EvalError> {
        match self.evaluate(mem)? {
            Scalar::Str(s) => Ok(s),
            other => Err(EvalError::TypeMismatch {
                expected: "string",
                found: other.kind_name(),
            }),
        }
    }

    /// Resolve an integer memory reference. The index is evaluated now.
    pub fn int_location(&self, mem: &Memory) -> Result<IntLocation, EvalError> {
        match self {
            Expression::IntRef { bank, index } => {
                Ok(IntLocation::new(*bank, resolve_index(index, mem)?))
            }
            _ => Err(EvalError::NotAReference {
                expected: "integer",
            }),
        }
    }

    /// Resolve a string memory reference. The index is evaluated now.
    pub fn str_location(&self, mem: &Memory) -> Result<StrLocation, EvalError> {
        match self {
            Expression::StrRef { bank, index } => {
                Ok(StrLocation::new(*bank, resolve_index(index, mem)?))
            }
            _ => Err(EvalError::NotAReference { expected: "string" }),
        }
    }
}

fn resolve_index(index: &Expression, mem: &Memory) -> Result<usize, EvalError> {
    let v = index.int_value(mem)?;
    usize::try_from(v).map_err(|_| EvalError::Memory(MemoryError::NegativeIndex(v)))
}

/// Deepest expression tree a token may parse into. Evaluation and drop both
/// recurse over the tree.
pub const MAX_DEPTH: usize = 128;

struct Parser {
    chars: Vec<char>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn new(src: &str) -> Self {
        Self {
            chars: src.chars().collect(),
            pos: 0,
            depth: 0,
        }
    }

    fn descend(&mut self) -> Result<(), ExpressionError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ExpressionError::TooDeep { offset: self.pos });
        }
        Ok(())
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).copied()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn starts_with(&self, s: &str) -> bool {
        s.chars().enumerate().all(|(i, c)| self.peek_at(i) == Some(c))
    }

    fn expect(&mut self, want: char) -> Result<(), ExpressionError> {
        self.skip_ws();
        match self.peek() {
            Some(c) if c == want => {
                self.pos += 1;
                Ok(())
            }
            Some(ch) => Err(ExpressionError::UnexpectedChar {
                offset: self.pos,
                ch,
            }),
            None => Err(ExpressionError::UnexpectedEnd),
        }
    }

    fn peek_binary(&self) -> Option<(BinaryOp, usize)> {
        BINARY_OPS
            .iter()
            .find(|(sym, _)| self.starts_with(sym))
            .map(|(sym, op)| (*op, sym.len()))
    }

    fn binary(&mut self, min_prec: u8) -> Result<Expression, ExpressionError> {
        let mut lhs = self.prefix()?;
        // Each operator folded in here nests `lhs` one level deeper.
        let outer = self.depth;
        loop {
            self.skip_ws();
            let Some((op, width)) = self.peek_binary() else {
                break;
            };
            if op.precedence() < min_prec {
                break;
            }
            self.descend()?;
            self.pos += width;
            let rhs = self.binary(op.precedence() + 1)?;
            lhs = Expression::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        self.depth = outer;
        Ok(lhs)
    }

    fn prefix(&mut self) -> Result<Expression, ExpressionError> {
        self.descend()?;
        let expr = self.primary();
        self.depth -= 1;
        expr
    }

    fn primary(&mut self) -> Result<Expression, ExpressionError> {
        self.skip_ws();
        match self.peek() {
            None => Err(ExpressionError::UnexpectedEnd),
            Some(c) if c.is_ascii_digit() => self.number(false),
            Some('-') if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => {
                self.pos += 1;
                self.number(true)
            }
            Some('-') => {
                self.pos += 1;
                Ok(Expression::Unary {
                    op: UnaryOp::Neg,
                    operand: Box::new(self.prefix()?),
                })
            }
            Some('!') => {
                self.pos += 1;
                Ok(Expression::Unary {
                    op: UnaryOp::Not,
                    operand: Box::new(self.prefix()?),
                })
            }
            Some('(') => {
                self.pos += 1;
                let inner = self.binary(0)?;
                self.expect(')')?;
                Ok(inner)
            }
            Some('"') => self.string(),
            Some(c) if c.is_ascii_alphabetic() => self.identifier(),
            Some(ch) => Err(ExpressionError::UnexpectedChar {
                offset: self.pos,
                ch,
            }),
        }
    }

    fn number(&mut self, negative: bool) -> Result<Expression, ExpressionError> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        let digits: String = self.chars[start..self.pos].iter().collect();
        let literal = if negative {
            format!("-{digits}")
        } else {
            digits
        };
        literal
            .parse::<i32>()
            .map(Expression::Int)
            .map_err(|_| ExpressionError::IntegerOutOfRange { literal })
    }

    fn string(&mut self) -> Result<Expression, ExpressionError> {
        // Opening quote.
        self.pos += 1;
        let mut out = String::new();
        loop {
            match self.peek() {
                None => return Err(ExpressionError::UnterminatedString),
                Some('"') => {
                    self.pos += 1;
                    return Ok(Expression::Str(out));
                }
                Some('\\') => {
                    let escaped = self
                        .peek_at(1)
                        .ok_or(ExpressionError::UnterminatedString)?;
                    out.push(escaped);
                    self.pos += 2;
                }
                Some(c) => {
                    out.push(c);
                    self.pos += 1;
                }
            }
        }
    }

    fn identifier(&mut self) -> Result<Expression, ExpressionError> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.pos += 1;
        }
        let name: String = self.chars[start..self.pos].iter().collect();
        if name == "store" {
            return Ok(Expression::Store);
        }

        let bank_letter = |prefix: &str| -> Option<char> {
            let rest = name.strip_prefix(prefix)?;
            let mut chars = rest.chars();
            let letter = chars.next()?;
            chars.next().is_none().then_some(letter)
        };

        if let Some(bank) = bank_letter("int").and_then(IntBank::from_letter) {
            let index = self.bracketed()?;
            return Ok(Expression::IntRef {
                bank,
                index: Box::new(index),
            });
        }
        if let Some(bank) = bank_letter("str").and_then(StrBank::from_letter) {
            let index = self.bracketed()?;
            return Ok(Expression::StrRef {
                bank,
                index: Box::new(index),
            });
        }
        Err(ExpressionError::UnknownIdentifier { name })
    }

    fn bracketed(&mut self) -> Result<Expression, ExpressionError> {
        self.expect('[')?;
        let index = self.binary(0)?;
        self.expect(']')?;
        Ok(index)
    }
}
