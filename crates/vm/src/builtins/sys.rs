//! System operations: halting, waiting, and small store-returning helpers.

use crate::error::{RegistrationError, RuntimeError};
use crate::handler::Handler;
use crate::long_op::{LongOperation, Progress};
use crate::machine::Machine;
use crate::module::Module;
use crate::operand::INT_C;

pub fn module() -> Result<Module, RegistrationError> {
    let mut module = Module::new("Sys", 1, 4);
    module
        .add_opcode(0, 0, Handler::new("halt", &[], |m, (): ()| m.halt())?.no_advance())?
        .add_opcode(100, 0, Handler::new("wait", &[INT_C], wait)?)?
        .add_opcode(1000, 0, Handler::new("abs", &[INT_C], |_, (v,): (i32,)| v.wrapping_abs())?)?
        .add_opcode(
            1001,
            0,
            Handler::new("max", &[INT_C, INT_C], |_, (a, b): (i32, i32)| a.max(b))?,
        )?
        .add_opcode(
            1002,
            0,
            Handler::new("min", &[INT_C, INT_C], |_, (a, b): (i32, i32)| a.min(b))?,
        )?;
    Ok(module)
}

fn wait(machine: &mut Machine, (frames,): (i32,)) {
    if let Ok(remaining) = u32::try_from(frames) {
        if remaining > 0 {
            machine.push_long_operation(Box::new(Wait { remaining }));
        }
    }
}

/// Occupies a fixed number of fetch cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wait {
    remaining: u32,
}

impl LongOperation for Wait {
    fn name(&self) -> &str {
        "wait"
    }

    fn step(&mut self, _machine: &mut Machine) -> Result<Progress, RuntimeError> {
        self.remaining = self.remaining.saturating_sub(1);
        Ok(if self.remaining == 0 {
            Progress::Done
        } else {
            Progress::Continue
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::Operation;
    use opvm_common::{Instruction, OpcodeKey};

    fn exec(machine: &mut Machine, opcode: u16, params: &[&str]) -> Result<(), RuntimeError> {
        let module = module().unwrap();
        let op = module.get(opcode, 0).unwrap();
        op.execute(
            machine,
            &Instruction::call(OpcodeKey::new(1, 4, opcode, 0), params.iter().copied()),
        )
    }

    #[test]
    fn halt_does_not_advance() {
        let mut machine = Machine::new();
        exec(&mut machine, 0, &[]).unwrap();
        assert!(machine.is_halted());
        assert_eq!(machine.instruction_pointer(), 0);
    }

    #[test]
    fn helpers_write_store() {
        let mut machine = Machine::new();
        exec(&mut machine, 1000, &["-5"]).unwrap();
        assert_eq!(machine.store(), 5);
        exec(&mut machine, 1001, &["3", "store * 2"]).unwrap();
        assert_eq!(machine.store(), 10);
        exec(&mut machine, 1002, &["3", "store"]).unwrap();
        assert_eq!(machine.store(), 3);
        assert_eq!(machine.instruction_pointer(), 3);
    }

    #[test]
    fn wait_spans_cycles() {
        let mut machine = Machine::new();
        exec(&mut machine, 100, &["2"]).unwrap();
        assert_eq!(machine.long_operation_depth(), 1);
        let mut wait = Wait { remaining: 2 };
        assert_eq!(wait.step(&mut machine), Ok(Progress::Continue));
        assert_eq!(wait.step(&mut machine), Ok(Progress::Done));
    }

    #[test]
    fn wait_zero_installs_nothing() {
        let mut machine = Machine::new();
        exec(&mut machine, 100, &["0"]).unwrap();
        exec(&mut machine, 100, &["-3"]).unwrap();
        assert!(!machine.has_long_operation());
    }
}
