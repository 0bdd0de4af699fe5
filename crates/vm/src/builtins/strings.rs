//! String operations.

use std::cmp::Ordering;

use opvm_common::MemoryError;

use crate::error::RegistrationError;
use crate::handler::Handler;
use crate::machine::Machine;
use crate::module::Module;
use crate::operand::{StrRef, INT_C, STR_C, STR_REF};

pub fn module() -> Result<Module, RegistrationError> {
    let mut module = Module::new("Str", 1, 10);
    module
        .add_opcode(
            0,
            0,
            Handler::new("strcpy", &[STR_REF, STR_C], |m, (dst, text): (StrRef, String)| {
                dst.set(m, text)
            })?,
        )?
        .add_opcode(
            2,
            0,
            Handler::new("strlen", &[STR_C], |_, (text,): (String,)| {
                i32::try_from(text.chars().count()).unwrap_or(i32::MAX)
            })?,
        )?
        .add_opcode(
            3,
            0,
            Handler::new("strcmp", &[STR_C, STR_C], |_, (a, b): (String, String)| match a.cmp(&b) {
                Ordering::Less => -1,
                Ordering::Equal => 0,
                Ordering::Greater => 1,
            })?,
        )?
        .add_opcode(4, 0, Handler::new("strcat", &[STR_REF, STR_C], strcat)?)?
        .add_opcode(
            12,
            0,
            Handler::new("itoa", &[INT_C, STR_REF], |m, (value, dst): (i32, StrRef)| {
                dst.set(m, value.to_string())
            })?,
        )?;
    Ok(module)
}

fn strcat(machine: &mut Machine, (dst, text): (StrRef, String)) -> Result<(), MemoryError> {
    let mut current = dst.get(machine)?;
    current.push_str(&text);
    dst.set(machine, current)
}
