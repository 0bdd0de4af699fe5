//! Errors for expression parsing, expression evaluation and memory access.

use thiserror::Error;

use crate::memory::{IntLocation, StrLocation};

/// Errors that occur while parsing one operand token into an expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpressionError {
    /// The token was empty or only whitespace.
    #[error("empty expression")]
    Empty,

    /// A character that cannot start or continue an expression.
    #[error("unexpected character '{ch}' at offset {offset}")]
    UnexpectedChar { offset: usize, ch: char },

    /// The expression ended where more input was required.
    #[error("unexpected end of expression")]
    UnexpectedEnd,

    /// Input remained after a complete expression.
    #[error("trailing input at offset {offset}")]
    TrailingInput { offset: usize },

    /// An integer literal did not fit in 32 bits.
    #[error("integer literal '{literal}' out of range")]
    IntegerOutOfRange { literal: String },

    /// A string literal was not closed.
    #[error("unterminated string literal")]
    UnterminatedString,

    /// Parentheses, prefix operators or operator chains nest too deeply.
    #[error("expression nested too deeply at offset {offset}")]
    TooDeep { offset: usize },

    /// An identifier that is neither a memory bank nor a keyword.
    #[error("unknown identifier '{name}'")]
    UnknownIdentifier { name: String },
}

/// Errors from memory access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    #[error("integer location {0} out of range")]
    IntOutOfRange(IntLocation),

    #[error("string location {0} out of range")]
    StrOutOfRange(StrLocation),

    /// A memory index expression evaluated to a negative value.
    #[error("negative memory index {0}")]
    NegativeIndex(i32),
}

/// Errors that occur while evaluating an expression against memory.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    /// The expression reduced to a different kind of value than required.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// An output parameter was given something that is not a memory location.
    #[error("expected a {expected} memory reference")]
    NotAReference { expected: &'static str },

    /// Integer division or modulo by zero.
    #[error("division by zero")]
    DivisionByZero,

    /// Fewer parsed expressions than operand slots.
    #[error("missing operand expression")]
    MissingExpression,

    /// A grouped operand did not have the parsed shape its descriptor expects.
    #[error("malformed operand group")]
    MalformedGroup,

    #[error(transparent)]
    Memory(#[from] MemoryError),
}
