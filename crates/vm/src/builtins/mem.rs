//! Bulk integer memory operations.

use crate::error::{RegistrationError, RuntimeError};
use crate::handler::Handler;
use crate::machine::Machine;
use crate::module::Module;
use crate::operand::{IntRef, INT_C, INT_C_LIST, INT_REF};

pub fn module() -> Result<Module, RegistrationError> {
    let mut module = Module::new("Mem", 1, 11);
    module
        .add_opcode(0, 0, Handler::new("setarray", &[INT_REF, INT_C_LIST], setarray)?)?
        .add_opcode(
            1,
            0,
            Handler::new("setrng", &[INT_REF, INT_REF], |m, (first, last): (IntRef, IntRef)| {
                fill(m, first, last, 0)
            })?,
        )?
        .add_opcode(
            1,
            1,
            Handler::new(
                "setrng",
                &[INT_REF, INT_REF, INT_C],
                |m, (first, last, value): (IntRef, IntRef, i32)| fill(m, first, last, value),
            )?,
        )?
        .add_opcode(100, 0, Handler::new("sum", &[INT_C_LIST], |_, (values,): (Vec<i32>,)| {
            values.into_iter().fold(0i32, i32::wrapping_add)
        })?)?;
    Ok(module)
}

/// Write `values` to consecutive cells starting at `first`.
fn setarray(
    machine: &mut Machine,
    (first, values): (IntRef, Vec<i32>),
) -> Result<(), RuntimeError> {
    for (i, value) in values.into_iter().enumerate() {
        first.offset(i).set(machine, value)?;
    }
    Ok(())
}

/// Set every cell from `first` to `last`, inclusive.
fn fill(
    machine: &mut Machine,
    first: IntRef,
    last: IntRef,
    value: i32,
) -> Result<(), RuntimeError> {
    let (from, to) = (first.location(), last.location());
    if from.bank != to.bank {
        return Err(RuntimeError::fault(
            "setrng",
            format!("range {from}..{to} spans two banks"),
        ));
    }
    if from.index > to.index {
        return Err(RuntimeError::fault(
            "setrng",
            format!("range {from}..{to} is reversed"),
        ));
    }
    for i in 0..=(to.index - from.index) {
        first.offset(i).set(machine, value)?;
    }
    Ok(())
}
