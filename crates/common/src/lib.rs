//! opvm common types.
//!
//! This crate provides the data the dispatch engine borrows from its
//! surroundings:
//!
//! - [`OpcodeKey`]: (module type, module, opcode, overload) identity
//! - [`Instruction`] / [`Body`]: one fetched instruction
//! - [`Program`]: an instruction stream
//! - [`Expression`]: a parsed operand token, evaluated against [`Memory`]
//! - [`Memory`]: integer and string banks plus the store register
//!
//! # Dependencies
//!
//! This crate uses `thiserror` and has no other dependencies.

pub mod error;
pub mod expression;
pub mod instruction;
pub mod key;
pub mod memory;
pub mod program;

// Re-export commonly used types at the crate root.
pub use error::{EvalError, ExpressionError, MemoryError};
pub use expression::{BinaryOp, Expression, Scalar, UnaryOp};
pub use instruction::{Body, Instruction};
pub use key::OpcodeKey;
pub use memory::{IntBank, IntLocation, Memory, StrBank, StrLocation};
pub use program::Program;
