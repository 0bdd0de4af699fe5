//! Load-time validation: find shape errors before anything runs.
//!
//! Every error is collected, not just the first. Two passes:
//!
//! 1. **Operands**: each call instruction is parsed by the operation that
//!    handles it; control flow conditions and options are parsed as
//!    expressions.
//! 2. **Jumps**: every jump target lies inside the program (or exactly at
//!    its end, which stops the machine).
//!
//! Unknown opcodes are not errors here; they are logged and left to the
//! fetch loop's policy.

use opvm_common::{Body, Expression, Instruction, Program};

use crate::error::{ParseError, ValidationError};
use crate::registry::Registry;

/// Validate `program` against the operations in `registry`.
pub fn validate(registry: &Registry, program: &Program) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    errors.extend(check_operands(registry, program));
    errors.extend(check_jumps(program));

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_operands(registry: &Registry, program: &Program) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    for (at, instruction) in program.instructions.iter().enumerate() {
        let Some(op) = registry.lookup(&instruction.key) else {
            tracing::warn!(key = %instruction.key, at, "no operation registered for opcode");
            continue;
        };
        if op.signature().is_some() && !matches!(instruction.body, Body::Call { .. }) {
            errors.push(ValidationError::Shape {
                at,
                key: instruction.key,
                name: op.name().to_string(),
            });
            continue;
        }
        let result = match &instruction.body {
            Body::Call { params } => op.parse(params).map(drop),
            Body::GotoIf { condition, .. } => parse_expression(condition),
            Body::GotoOn { selector, .. } => parse_expression(selector),
            Body::Select { options } => {
                options.iter().try_for_each(|option| parse_expression(option))
            }
            Body::Goto { .. } => Ok(()),
        };
        if let Err(source) = result {
            errors.push(parse_error(at, instruction, op.name(), source));
        }
    }
    errors
}

fn check_jumps(program: &Program) -> Vec<ValidationError> {
    let len = program.len();
    let mut errors = Vec::new();
    for (at, instruction) in program.instructions.iter().enumerate() {
        let targets: &[usize] = match &instruction.body {
            Body::Goto { target } | Body::GotoIf { target, .. } => std::slice::from_ref(target),
            Body::GotoOn { targets, .. } => targets,
            Body::Call { .. } | Body::Select { .. } => &[],
        };
        for &target in targets {
            if target > len {
                errors.push(ValidationError::JumpOutOfRange { at, target, len });
            }
        }
    }
    errors
}

fn parse_expression(token: &str) -> Result<(), ParseError> {
    Expression::parse(token)
        .map(drop)
        .map_err(|source| ParseError::Expression {
            position: 0,
            token: token.to_string(),
            source,
        })
}

fn parse_error(
    at: usize,
    instruction: &Instruction,
    name: &str,
    source: ParseError,
) -> ValidationError {
    ValidationError::Parse {
        at,
        key: instruction.key,
        name: name.to_string(),
        source,
    }
}
