//! Errors for operand parsing, operation registration and execution.
//!
//! Parse errors are about the shape of one instruction's token list and can
//! be found before anything runs. Runtime errors carry the operation name
//! (and, where the instruction is known, its opcode key) for diagnostics.

use opvm_common::{EvalError, ExpressionError, MemoryError, OpcodeKey};
use thiserror::Error;

use crate::operand::Signature;

/// Errors that occur while parsing an instruction's operand tokens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The descriptor list needs more tokens than the instruction supplied.
    #[error("missing operand token at position {position}")]
    MissingToken { position: usize },

    /// Tokens remained after the last descriptor ran.
    #[error("expected {expected} operand token(s), found {found}")]
    TrailingTokens { expected: usize, found: usize },

    /// A token did not parse as an expression.
    #[error("operand token {position} '{token}': {source}")]
    Expression {
        position: usize,
        token: String,
        #[source]
        source: ExpressionError,
    },

    /// A repeated group's count token was not a non-negative integer literal.
    #[error("invalid group count '{token}' at position {position}")]
    InvalidCount { position: usize, token: String },
}

/// Errors that occur while building modules and the registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// The handler's parameter types disagree with the operand descriptors.
    #[error("operation '{name}' declares operands {declared} but its handler takes {handler}")]
    SignatureMismatch {
        name: String,
        declared: Signature,
        handler: Signature,
    },

    /// The (opcode, overload) slot is already taken in this module.
    #[error("module {module}: opcode {opcode}, overload {overload} already registered")]
    Duplicate {
        module: String,
        opcode: u16,
        overload: u8,
    },

    /// A module with the same (type, number) is already attached.
    #[error("module {module_type}:{module} already attached")]
    DuplicateModule { module_type: u8, module: u8 },
}

/// Errors that occur during execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// The instruction's tokens do not fit the operation's operand shape.
    #[error("{name}{key}: {source}")]
    Parse {
        key: OpcodeKey,
        name: String,
        #[source]
        source: ParseError,
    },

    /// An operand failed to evaluate. Operands before it have already run.
    #[error("{name}: {source}")]
    Evaluate {
        name: String,
        #[source]
        source: EvalError,
    },

    /// No operation is registered for the key and the policy is `error`.
    #[error("unknown opcode {key} at instruction {at}")]
    UnknownOpcode { key: OpcodeKey, at: usize },

    /// The instruction body does not have the shape the operation handles.
    #[error("{name}: malformed instruction at {at}")]
    MalformedInstruction { name: String, at: usize },

    /// The instruction pointer points past the end of the program.
    #[error("instruction pointer {ip} out of range (program length {len})")]
    InstructionPointerOutOfRange { ip: usize, len: usize },

    /// `ret` with an empty call stack.
    #[error("ret without matching gosub at instruction {at}")]
    ReturnWithoutGosub { at: usize },

    /// The configured step limit was reached.
    #[error("step limit {limit} exceeded")]
    StepLimitExceeded { limit: u64 },

    /// Load-time validation rejected the program.
    #[error("program failed validation with {} error(s)", .0.len())]
    Validation(Vec<ValidationError>),

    /// A handler reported a failure of its own.
    #[error("{name}: {message}")]
    Fault { name: String, message: String },

    #[error(transparent)]
    Memory(#[from] MemoryError),
}

impl RuntimeError {
    /// Shorthand for a handler fault.
    pub fn fault(name: impl Into<String>, message: impl Into<String>) -> Self {
        RuntimeError::Fault {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Problems found by load-time validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A call instruction's tokens do not fit its operation.
    #[error("instruction {at}: {name}{key}: {source}")]
    Parse {
        at: usize,
        key: OpcodeKey,
        name: String,
        #[source]
        source: ParseError,
    },

    /// An operation that takes operand tokens was given a control-flow body.
    #[error("instruction {at}: {name}{key}: expects a call instruction")]
    Shape {
        at: usize,
        key: OpcodeKey,
        name: String,
    },

    /// A jump target lies beyond the end of the program.
    #[error("instruction {at}: jump target {target} out of range (program length {len})")]
    JumpOutOfRange { at: usize, target: usize, len: usize },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operand::ValueKind;

    #[test]
    fn display_parse_errors() {
        assert_eq!(
            ParseError::MissingToken { position: 2 }.to_string(),
            "missing operand token at position 2"
        );
        assert_eq!(
            ParseError::TrailingTokens {
                expected: 3,
                found: 4
            }
            .to_string(),
            "expected 3 operand token(s), found 4"
        );
    }

    #[test]
    fn display_runtime_parse_error_names_opcode() {
        let err = RuntimeError::Parse {
            key: OpcodeKey::new(1, 4, 7, 0),
            name: "Sum3".to_string(),
            source: ParseError::MissingToken { position: 2 },
        };
        assert_eq!(
            err.to_string(),
            "Sum3<1:4:7, 0>: missing operand token at position 2"
        );
    }

    #[test]
    fn display_signature_mismatch() {
        let err = RegistrationError::SignatureMismatch {
            name: "strcpy".to_string(),
            declared: Signature(vec![ValueKind::StrRef, ValueKind::Str]),
            handler: Signature(vec![ValueKind::Int]),
        };
        assert_eq!(
            err.to_string(),
            "operation 'strcpy' declares operands (strRef, str) but its handler takes (int)"
        );
    }

    #[test]
    fn display_validation_count() {
        let err = RuntimeError::Validation(vec![ValidationError::JumpOutOfRange {
            at: 0,
            target: 9,
            len: 2,
        }]);
        assert_eq!(err.to_string(), "program failed validation with 1 error(s)");
    }
}
