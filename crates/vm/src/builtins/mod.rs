//! Built-in modules.
//!
//! | Module | Type:Number | Contents |
//! |---|---|---|
//! | `Jmp` | 0:1 | `goto`, `goto_if`, `goto_unless`, `goto_on`, `gosub`, `ret` |
//! | `Sel` | 0:2 | `select` |
//! | `Sys` | 1:4 | `halt`, `wait`, `abs`, `max`, `min` |
//! | `Str` | 1:10 | `strcpy`, `strlen`, `strcmp`, `strcat`, `itoa` |
//! | `Mem` | 1:11 | `setarray`, `setrng`, `sum` |

pub mod jmp;
pub mod mem;
pub mod sel;
pub mod strings;
pub mod sys;

use opvm_common::{Expression, Instruction};

use crate::error::{ParseError, RegistrationError, RuntimeError};
use crate::machine::Machine;
use crate::registry::Registry;

/// Attach every built-in module to `registry`.
pub fn install(registry: &mut Registry) -> Result<(), RegistrationError> {
    registry
        .attach(jmp::module()?)?
        .attach(sel::module()?)?
        .attach(sys::module()?)?
        .attach(strings::module()?)?
        .attach(mem::module()?)?;
    Ok(())
}

/// Parse one operand carried in a control flow body.
fn parse_operand(
    name: &str,
    instruction: &Instruction,
    token: &str,
) -> Result<Expression, RuntimeError> {
    Expression::parse(token).map_err(|source| RuntimeError::Parse {
        key: instruction.key,
        name: name.to_string(),
        source: ParseError::Expression {
            position: 0,
            token: token.to_string(),
            source,
        },
    })
}

fn int_operand(
    name: &str,
    machine: &Machine,
    instruction: &Instruction,
    token: &str,
) -> Result<i32, RuntimeError> {
    parse_operand(name, instruction, token)?
        .int_value(machine.memory())
        .map_err(|source| RuntimeError::Evaluate {
            name: name.to_string(),
            source,
        })
}

fn str_operand(
    name: &str,
    machine: &Machine,
    instruction: &Instruction,
    token: &str,
) -> Result<String, RuntimeError> {
    parse_operand(name, instruction, token)?
        .str_value(machine.memory())
        .map_err(|source| RuntimeError::Evaluate {
            name: name.to_string(),
            source,
        })
}

fn malformed(name: &str, machine: &Machine) -> RuntimeError {
    RuntimeError::MalformedInstruction {
        name: name.to_string(),
        at: machine.instruction_pointer(),
    }
}
