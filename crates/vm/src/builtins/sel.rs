//! Multi-way selection.
//!
//! `select` evaluates its options, installs a [`Selection`] and moves on. The
//! selection completes once the host queues a decision with
//! [`Machine::queue_decision`]; the chosen index lands in the store register.

use opvm_common::{Body, Instruction};

use super::{malformed, str_operand};
use crate::error::{RegistrationError, RuntimeError};
use crate::long_op::{LongOperation, Progress};
use crate::machine::Machine;
use crate::module::Module;
use crate::special::SpecialCase;

pub fn module() -> Result<Module, RegistrationError> {
    let mut module = Module::new("Sel", 0, 2);
    module.add_opcode(1, 0, SpecialCase::new("select", select))?;
    Ok(module)
}

fn select(machine: &mut Machine, instruction: &Instruction) -> Result<(), RuntimeError> {
    let Body::Select { options } = &instruction.body else {
        return Err(malformed("select", machine));
    };
    let options = options
        .iter()
        .map(|option| str_operand("select", machine, instruction, option))
        .collect::<Result<Vec<_>, _>>()?;
    let at = machine.instruction_pointer();
    machine.push_long_operation(Box::new(Selection::new(at, options)));
    machine.advance_instruction_pointer();
    Ok(())
}

/// Waits for a decision among its options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    at: usize,
    name: String,
    options: Vec<String>,
}

impl Selection {
    /// A selection installed by the `select` at instruction `at`.
    pub fn new(at: usize, options: Vec<String>) -> Self {
        Self {
            at,
            name: format!("select at instruction {at}"),
            options,
        }
    }

    pub fn at(&self) -> usize {
        self.at
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }
}

impl LongOperation for Selection {
    fn name(&self) -> &str {
        &self.name
    }

    fn step(&mut self, machine: &mut Machine) -> Result<Progress, RuntimeError> {
        let Some(choice) = machine.take_decision() else {
            return Ok(Progress::Blocked);
        };
        let Some(option) = self.options.get(choice) else {
            return Err(RuntimeError::fault(
                "select",
                format!(
                    "choice {choice} out of range for {} option(s)",
                    self.options.len()
                ),
            ));
        };
        tracing::debug!(choice, option = option.as_str(), "selection made");
        machine.set_store(choice as i32);
        Ok(Progress::Done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::Operation;
    use opvm_common::{OpcodeKey, StrBank, StrLocation};

    fn select_instruction(options: &[&str]) -> Instruction {
        Instruction::new(
            OpcodeKey::new(0, 2, 1, 0),
            Body::Select {
                options: options.iter().map(|s| s.to_string()).collect(),
            },
        )
    }

    #[test]
    fn select_installs_selection_and_advances() {
        let module = module().unwrap();
        let op = module.get(1, 0).unwrap();
        let mut machine = Machine::new();
        machine
            .memory_mut()
            .set_string(StrLocation::new(StrBank::S, 0), "Stay")
            .unwrap();
        machine.jump(4);
        op.execute(&mut machine, &select_instruction(&["\"Go\"", "strS[0]"]))
            .unwrap();
        assert_eq!(machine.instruction_pointer(), 5);
        assert_eq!(
            machine.pending_long_operation(),
            Some("select at instruction 4")
        );
    }

    #[test]
    fn blocked_until_decision() {
        let mut selection = Selection::new(0, vec!["a".into(), "b".into()]);
        let mut machine = Machine::new();
        assert_eq!(selection.step(&mut machine), Ok(Progress::Blocked));
        machine.queue_decision(1);
        assert_eq!(selection.step(&mut machine), Ok(Progress::Done));
        assert_eq!(machine.store(), 1);
    }

    #[test]
    fn out_of_range_choice_faults() {
        let mut selection = Selection::new(0, vec!["a".into()]);
        let mut machine = Machine::new();
        machine.queue_decision(3);
        assert_eq!(
            selection.step(&mut machine),
            Err(RuntimeError::fault("select", "choice 3 out of range for 1 option(s)"))
        );
    }

    #[test]
    fn options_must_be_strings() {
        let module = module().unwrap();
        let op = module.get(1, 0).unwrap();
        let mut machine = Machine::new();
        assert!(matches!(
            op.execute(&mut machine, &select_instruction(&["1"])),
            Err(RuntimeError::Evaluate { .. })
        ));
        assert!(!machine.has_long_operation());
    }
}
