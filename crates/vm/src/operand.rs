//! Operand descriptors: how one parameter slot is parsed and evaluated.
//!
//! A descriptor is a stateless, shared definition. Parsing consumes tokens
//! through a [`TokenCursor`] and appends expressions; evaluation consumes the
//! same expressions, in the same order, through an [`ExprCursor`] and yields a
//! [`Value`]. The pairing of the two cursors is what keeps parse order and
//! argument order identical.
//!
//! | Descriptor | Tokens consumed | Value |
//! |---|---|---|
//! | [`IntConstant`] | 1 | `Value::Int` |
//! | [`StrConstant`] | 1 | `Value::Str` |
//! | [`IntReference`] | 1 | `Value::IntRef` |
//! | [`StrReference`] | 1 | `Value::StrRef` |
//! | [`Repeated`] | 1 count + count × element | `Value::List` |
//! | [`Empty`] | 0 | `Value::Empty` |

use std::fmt;

use opvm_common::{EvalError, Expression, IntLocation, MemoryError, StrLocation};

use crate::error::ParseError;
use crate::machine::Machine;

/// The kind of value a descriptor produces and a handler parameter accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueKind {
    Int,
    Str,
    IntRef,
    StrRef,
    List(Box<ValueKind>),
    Empty,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Int => write!(f, "int"),
            ValueKind::Str => write!(f, "str"),
            ValueKind::IntRef => write!(f, "intRef"),
            ValueKind::StrRef => write!(f, "strRef"),
            ValueKind::List(inner) => write!(f, "{inner}+"),
            ValueKind::Empty => write!(f, "empty"),
        }
    }
}

/// An ordered list of value kinds: an operation's operand shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature(pub Vec<ValueKind>);

impl Signature {
    /// The signature produced by a descriptor list.
    pub fn of(operands: &[&dyn Operand]) -> Self {
        Signature(operands.iter().map(|operand| operand.kind()).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, kind) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{kind}")?;
        }
        write!(f, ")")
    }
}

/// Handle to an integer memory cell, handed to handlers as an output parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntRef(pub IntLocation);

impl IntRef {
    pub fn location(&self) -> IntLocation {
        self.0
    }

    pub fn get(&self, machine: &Machine) -> Result<i32, MemoryError> {
        machine.memory().int(self.0)
    }

    pub fn set(&self, machine: &mut Machine, value: i32) -> Result<(), MemoryError> {
        machine.memory_mut().set_int(self.0, value)
    }

    /// The handle `offset` cells further along the same bank.
    pub fn offset(&self, offset: usize) -> IntRef {
        IntRef(self.0.offset(offset))
    }
}

/// Handle to a string memory cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrRef(pub StrLocation);

impl StrRef {
    pub fn location(&self) -> StrLocation {
        self.0
    }

    pub fn get(&self, machine: &Machine) -> Result<String, MemoryError> {
        machine.memory().string(self.0).map(str::to_string)
    }

    pub fn set(&self, machine: &mut Machine, value: impl Into<String>) -> Result<(), MemoryError> {
        machine.memory_mut().set_string(self.0, value)
    }
}

/// An evaluated operand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int(i32),
    Str(String),
    IntRef(IntRef),
    StrRef(StrRef),
    List(Vec<Value>),
    /// Placeholder produced by [`Empty`].
    Empty,
}

/// Single cursor over an instruction's raw operand tokens.
#[derive(Debug)]
pub struct TokenCursor<'a> {
    tokens: &'a [String],
    position: usize,
}

impl<'a> TokenCursor<'a> {
    pub fn new(tokens: &'a [String]) -> Self {
        Self {
            tokens,
            position: 0,
        }
    }

    /// Number of tokens consumed so far.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn is_exhausted(&self) -> bool {
        self.position >= self.tokens.len()
    }

    /// Number of tokens not yet consumed.
    pub fn remaining(&self) -> usize {
        self.tokens.len().saturating_sub(self.position)
    }

    /// Take the next raw token and its position.
    pub fn next_token(&mut self) -> Result<(usize, &'a str), ParseError> {
        let position = self.position;
        let token = self
            .tokens
            .get(position)
            .ok_or(ParseError::MissingToken { position })?;
        self.position += 1;
        Ok((position, token.as_str()))
    }

    /// Take the next token and parse it as an expression.
    pub fn next_expression(&mut self) -> Result<Expression, ParseError> {
        let (position, token) = self.next_token()?;
        Expression::parse(token).map_err(|source| ParseError::Expression {
            position,
            token: token.to_string(),
            source,
        })
    }
}

/// Cursor over the expressions produced by parsing, consumed during evaluation.
#[derive(Debug)]
pub struct ExprCursor<'a> {
    exprs: &'a [Expression],
    position: usize,
}

impl<'a> ExprCursor<'a> {
    pub fn new(exprs: &'a [Expression]) -> Self {
        Self { exprs, position: 0 }
    }

    pub fn next_expression(&mut self) -> Result<&'a Expression, EvalError> {
        let expr = self
            .exprs
            .get(self.position)
            .ok_or(EvalError::MissingExpression)?;
        self.position += 1;
        Ok(expr)
    }

    pub fn is_exhausted(&self) -> bool {
        self.position >= self.exprs.len()
    }
}

/// How to parse and evaluate one parameter slot.
pub trait Operand {
    /// The kind of value [`Operand::evaluate`] produces.
    fn kind(&self) -> ValueKind;

    /// Consume this slot's tokens and append its expression(s) to `out`.
    fn parse(
        &self,
        tokens: &mut TokenCursor<'_>,
        out: &mut Vec<Expression>,
    ) -> Result<(), ParseError>;

    /// Consume this slot's expression(s) and produce its value.
    fn evaluate(
        &self,
        machine: &mut Machine,
        exprs: &mut ExprCursor<'_>,
    ) -> Result<Value, EvalError>;
}

/// A constant (possibly computed) integer.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntConstant;

impl Operand for IntConstant {
    fn kind(&self) -> ValueKind {
        ValueKind::Int
    }

    fn parse(
        &self,
        tokens: &mut TokenCursor<'_>,
        out: &mut Vec<Expression>,
    ) -> Result<(), ParseError> {
        out.push(tokens.next_expression()?);
        Ok(())
    }

    fn evaluate(
        &self,
        machine: &mut Machine,
        exprs: &mut ExprCursor<'_>,
    ) -> Result<Value, EvalError> {
        let expr = exprs.next_expression()?;
        Ok(Value::Int(expr.int_value(machine.memory())?))
    }
}

/// A constant (possibly computed) string.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrConstant;

impl Operand for StrConstant {
    fn kind(&self) -> ValueKind {
        ValueKind::Str
    }

    fn parse(
        &self,
        tokens: &mut TokenCursor<'_>,
        out: &mut Vec<Expression>,
    ) -> Result<(), ParseError> {
        out.push(tokens.next_expression()?);
        Ok(())
    }

    fn evaluate(
        &self,
        machine: &mut Machine,
        exprs: &mut ExprCursor<'_>,
    ) -> Result<Value, EvalError> {
        let expr = exprs.next_expression()?;
        Ok(Value::Str(expr.str_value(machine.memory())?))
    }
}

/// An integer memory location the handler may read or write.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntReference;

impl Operand for IntReference {
    fn kind(&self) -> ValueKind {
        ValueKind::IntRef
    }

    fn parse(
        &self,
        tokens: &mut TokenCursor<'_>,
        out: &mut Vec<Expression>,
    ) -> Result<(), ParseError> {
        out.push(tokens.next_expression()?);
        Ok(())
    }

    fn evaluate(
        &self,
        machine: &mut Machine,
        exprs: &mut ExprCursor<'_>,
    ) -> Result<Value, EvalError> {
        let expr = exprs.next_expression()?;
        Ok(Value::IntRef(IntRef(expr.int_location(machine.memory())?)))
    }
}

/// A string memory location the handler may read or write.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrReference;

impl Operand for StrReference {
    fn kind(&self) -> ValueKind {
        ValueKind::StrRef
    }

    fn parse(
        &self,
        tokens: &mut TokenCursor<'_>,
        out: &mut Vec<Expression>,
    ) -> Result<(), ParseError> {
        out.push(tokens.next_expression()?);
        Ok(())
    }

    fn evaluate(
        &self,
        machine: &mut Machine,
        exprs: &mut ExprCursor<'_>,
    ) -> Result<Value, EvalError> {
        let expr = exprs.next_expression()?;
        Ok(Value::StrRef(StrRef(expr.str_location(machine.memory())?)))
    }
}

/// A count token followed by that many groups of the wrapped descriptor.
///
/// The count is read once, at parse time. The parsed form is one
/// `Expression::Complex` holding one `Expression::Complex` per element, so
/// evaluation never needs the tokens again.
#[derive(Clone, Copy)]
pub struct Repeated {
    element: &'static dyn Operand,
}

impl Repeated {
    pub const fn of(element: &'static dyn Operand) -> Self {
        Self { element }
    }
}

impl fmt::Debug for Repeated {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Repeated<{}>", self.element.kind())
    }
}

impl Operand for Repeated {
    fn kind(&self) -> ValueKind {
        ValueKind::List(Box::new(self.element.kind()))
    }

    fn parse(
        &self,
        tokens: &mut TokenCursor<'_>,
        out: &mut Vec<Expression>,
    ) -> Result<(), ParseError> {
        let (position, token) = tokens.next_token()?;
        let count = Expression::parse(token)
            .ok()
            .and_then(|expr| expr.as_literal_int())
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| ParseError::InvalidCount {
                position,
                token: token.to_string(),
            })?;

        // Empty elements consume nothing, so their count is bounded by the
        // tokens that remain like every other element's.
        if self.element.kind() == ValueKind::Empty && count > tokens.remaining() {
            return Err(ParseError::InvalidCount {
                position,
                token: token.to_string(),
            });
        }

        let mut groups = Vec::with_capacity(count.min(tokens.remaining()));
        for _ in 0..count {
            let mut group = Vec::new();
            self.element.parse(tokens, &mut group)?;
            groups.push(Expression::Complex(group));
        }
        out.push(Expression::Complex(groups));
        Ok(())
    }

    fn evaluate(
        &self,
        machine: &mut Machine,
        exprs: &mut ExprCursor<'_>,
    ) -> Result<Value, EvalError> {
        let Expression::Complex(groups) = exprs.next_expression()? else {
            return Err(EvalError::MalformedGroup);
        };
        let mut values = Vec::with_capacity(groups.len());
        for group in groups {
            let Expression::Complex(items) = group else {
                return Err(EvalError::MalformedGroup);
            };
            let mut cursor = ExprCursor::new(items);
            values.push(self.element.evaluate(machine, &mut cursor)?);
            if !cursor.is_exhausted() {
                return Err(EvalError::MalformedGroup);
            }
        }
        Ok(Value::List(values))
    }
}

/// Fills an unused slot: no tokens, no expression, `Value::Empty`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Empty;

impl Operand for Empty {
    fn kind(&self) -> ValueKind {
        ValueKind::Empty
    }

    fn parse(
        &self,
        _tokens: &mut TokenCursor<'_>,
        _out: &mut Vec<Expression>,
    ) -> Result<(), ParseError> {
        Ok(())
    }

    fn evaluate(
        &self,
        _machine: &mut Machine,
        _exprs: &mut ExprCursor<'_>,
    ) -> Result<Value, EvalError> {
        Ok(Value::Empty)
    }
}

/// Shared descriptor instances.
pub const INT_C: &dyn Operand = &IntConstant;
pub const STR_C: &dyn Operand = &StrConstant;
pub const INT_REF: &dyn Operand = &IntReference;
pub const STR_REF: &dyn Operand = &StrReference;
pub const EMPTY: &dyn Operand = &Empty;
pub const INT_C_LIST: &dyn Operand = &Repeated::of(INT_C);
pub const STR_C_LIST: &dyn Operand = &Repeated::of(STR_C);
pub const INT_REF_LIST: &dyn Operand = &Repeated::of(INT_REF);
