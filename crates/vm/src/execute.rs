//! The fetch loop: run pending long operations, then fetch and dispatch.

use opvm_common::{OpcodeKey, Program};

use crate::config::UnknownOpcodePolicy;
use crate::error::RuntimeError;
use crate::long_op::Progress;
use crate::machine::Machine;
use crate::registry::Registry;
use crate::validate::validate;

/// What one call to [`Machine::step`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// An instruction was dispatched.
    Executed,
    /// A long operation ran instead of an instruction.
    LongOperation,
    /// No operation handles this key; the instruction was skipped.
    Skipped(OpcodeKey),
    /// A long operation is waiting on outside input.
    Blocked,
    Halted,
    /// The instruction pointer sits exactly at the end of the program.
    EndOfProgram,
}

/// Why [`Machine::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Halted,
    EndOfProgram,
    /// Waiting on outside input; queue it and call `run` again.
    Blocked,
}

impl Machine {
    /// Perform one fetch cycle.
    pub fn step(&mut self, registry: &Registry, program: &Program) -> Result<Step, RuntimeError> {
        if self.is_halted() {
            return Ok(Step::Halted);
        }

        if let Some(mut op) = self.pop_long_operation() {
            let depth = self.long_operation_depth();
            self.count_step();
            return match op.step(self) {
                Ok(Progress::Done) => {
                    tracing::debug!(name = op.name(), "long operation finished");
                    Ok(Step::LongOperation)
                }
                Ok(Progress::Continue) => {
                    self.reinsert_long_operation(depth, op);
                    Ok(Step::LongOperation)
                }
                Ok(Progress::Blocked) => {
                    self.reinsert_long_operation(depth, op);
                    Ok(Step::Blocked)
                }
                // A failed step leaves the operation pending so the caller can
                // correct its input and resume.
                Err(e) => {
                    tracing::debug!(name = op.name(), error = %e, "long operation failed");
                    self.reinsert_long_operation(depth, op);
                    Err(e)
                }
            };
        }

        let ip = self.instruction_pointer();
        let instruction = match program.get(ip) {
            Some(instruction) => instruction,
            None if ip == program.len() => return Ok(Step::EndOfProgram),
            None => {
                return Err(RuntimeError::InstructionPointerOutOfRange {
                    ip,
                    len: program.len(),
                })
            }
        };
        self.count_step();

        let Some(op) = registry.lookup(&instruction.key) else {
            return match self.config().unknown_opcode {
                UnknownOpcodePolicy::Skip => {
                    tracing::warn!(key = %instruction.key, at = ip, "unknown opcode, skipping");
                    self.advance_instruction_pointer();
                    Ok(Step::Skipped(instruction.key))
                }
                UnknownOpcodePolicy::Error => Err(RuntimeError::UnknownOpcode {
                    key: instruction.key,
                    at: ip,
                }),
            };
        };

        tracing::debug!(op = op.name(), key = %instruction.key, ip, "dispatch");
        op.execute(self, instruction)?;
        Ok(Step::Executed)
    }

    /// Step until the program halts, runs off its end, or blocks.
    ///
    /// On a fresh machine with `preflight` set, the program is validated
    /// first and nothing runs if validation fails.
    pub fn run(&mut self, registry: &Registry, program: &Program) -> Result<Exit, RuntimeError> {
        if self.config().preflight && self.steps() == 0 {
            validate(registry, program).map_err(RuntimeError::Validation)?;
        }

        loop {
            if let Some(limit) = self.config().max_steps {
                if self.steps() >= limit && self.has_pending_work(program) {
                    return Err(RuntimeError::StepLimitExceeded { limit });
                }
            }
            match self.step(registry, program)? {
                Step::Halted => return Ok(Exit::Halted),
                Step::EndOfProgram => return Ok(Exit::EndOfProgram),
                Step::Blocked => return Ok(Exit::Blocked),
                Step::Executed | Step::LongOperation | Step::Skipped(_) => {}
            }
        }
    }

    fn has_pending_work(&self, program: &Program) -> bool {
        !self.is_halted()
            && (self.has_long_operation() || self.instruction_pointer() < program.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MachineConfig;
    use crate::handler::Handler;
    use crate::long_op::LongOperation;
    use crate::module::Module;
    use crate::operand::INT_C;
    use opvm_common::Instruction;

    const ADD: OpcodeKey = OpcodeKey::new(1, 9, 0, 0);
    const SPAWN: OpcodeKey = OpcodeKey::new(1, 9, 1, 0);

    struct Countdown {
        name: &'static str,
        left: u32,
        spawn: bool,
    }

    impl LongOperation for Countdown {
        fn name(&self) -> &str {
            self.name
        }

        fn step(&mut self, machine: &mut Machine) -> Result<Progress, RuntimeError> {
            let store = machine.store();
            machine.set_store(store * 10 + if self.name == "outer" { 1 } else { 2 });
            if self.spawn {
                self.spawn = false;
                machine.push_long_operation(Box::new(Countdown {
                    name: "inner",
                    left: 1,
                    spawn: false,
                }));
            }
            self.left -= 1;
            Ok(if self.left == 0 {
                Progress::Done
            } else {
                Progress::Continue
            })
        }
    }

    fn registry() -> Registry {
        let mut module = Module::new("Test", 1, 9);
        module
            .add_opcode(
                0,
                0,
                Handler::new("add", &[INT_C], |m, (n,): (i32,)| m.store() + n).unwrap(),
            )
            .unwrap()
            .add_opcode(
                1,
                0,
                Handler::new("spawn", &[], |m, (): ()| {
                    m.push_long_operation(Box::new(Countdown {
                        name: "outer",
                        left: 2,
                        spawn: true,
                    }))
                })
                .unwrap(),
            )
            .unwrap();
        let mut registry = Registry::new();
        registry.attach(module).unwrap();
        registry
    }

    #[test]
    fn runs_to_end_of_program() {
        let program = Program::new(vec![
            Instruction::call(ADD, ["2"]),
            Instruction::call(ADD, ["3"]),
        ]);
        let mut machine = Machine::new();
        assert_eq!(machine.run(&registry(), &program), Ok(Exit::EndOfProgram));
        assert_eq!(machine.store(), 5);
        assert_eq!(machine.steps(), 2);
    }

    #[test]
    fn unknown_opcode_skipped_by_default() {
        let unknown = OpcodeKey::new(3, 3, 3, 0);
        let program = Program::new(vec![
            Instruction::call(unknown, ["x"]),
            Instruction::call(ADD, ["1"]),
        ]);
        let registry = registry();
        let mut machine = Machine::new();
        assert_eq!(machine.step(&registry, &program), Ok(Step::Skipped(unknown)));
        assert_eq!(machine.instruction_pointer(), 1);
        assert_eq!(machine.step(&registry, &program), Ok(Step::Executed));
        assert_eq!(machine.store(), 1);
    }

    #[test]
    fn unknown_opcode_error_policy() {
        let unknown = OpcodeKey::new(3, 3, 3, 0);
        let program = Program::new(vec![Instruction::call(unknown, ["x"])]);
        let mut machine = Machine::with_config(MachineConfig {
            unknown_opcode: UnknownOpcodePolicy::Error,
            ..MachineConfig::default()
        });
        assert_eq!(
            machine.run(&registry(), &program),
            Err(RuntimeError::UnknownOpcode { key: unknown, at: 0 })
        );
    }

    #[test]
    fn pointer_past_end_is_an_error() {
        let program = Program::new(vec![Instruction::call(ADD, ["1"])]);
        let mut machine = Machine::new();
        machine.jump(4);
        assert_eq!(
            machine.step(&registry(), &program),
            Err(RuntimeError::InstructionPointerOutOfRange { ip: 4, len: 1 })
        );
    }

    #[test]
    fn long_operation_runs_before_fetch_and_keeps_its_place() {
        let program = Program::new(vec![Instruction::call(SPAWN, Vec::<String>::new())]);
        let registry = registry();
        let mut machine = Machine::new();
        assert_eq!(machine.step(&registry, &program), Ok(Step::Executed));
        // outer runs and installs inner above itself
        assert_eq!(machine.step(&registry, &program), Ok(Step::LongOperation));
        assert_eq!(machine.long_operation_depth(), 2);
        // inner runs next and finishes, then outer finishes
        assert_eq!(machine.step(&registry, &program), Ok(Step::LongOperation));
        assert_eq!(machine.step(&registry, &program), Ok(Step::LongOperation));
        assert!(!machine.has_long_operation());
        assert_eq!(machine.store(), 121);
        assert_eq!(machine.step(&registry, &program), Ok(Step::EndOfProgram));
    }

    #[test]
    fn cancel_between_cycles() {
        let program = Program::new(vec![Instruction::call(SPAWN, Vec::<String>::new())]);
        let registry = registry();
        let mut machine = Machine::new();
        machine.step(&registry, &program).unwrap();
        machine.cancel_long_operations();
        assert_eq!(machine.step(&registry, &program), Ok(Step::EndOfProgram));
        assert_eq!(machine.store(), 0);
    }

    #[test]
    fn step_limit() {
        let program = Program::new(vec![Instruction::call(ADD, ["1"]); 5]);
        let mut machine = Machine::with_config(MachineConfig {
            max_steps: Some(3),
            ..MachineConfig::default()
        });
        assert_eq!(
            machine.run(&registry(), &program),
            Err(RuntimeError::StepLimitExceeded { limit: 3 })
        );
        assert_eq!(machine.store(), 3);
    }

    #[test]
    fn step_limit_not_hit_when_program_ends() {
        let program = Program::new(vec![Instruction::call(ADD, ["1"]); 3]);
        let mut machine = Machine::with_config(MachineConfig {
            max_steps: Some(3),
            ..MachineConfig::default()
        });
        assert_eq!(machine.run(&registry(), &program), Ok(Exit::EndOfProgram));
    }

    #[test]
    fn preflight_blocks_bad_program() {
        let program = Program::new(vec![
            Instruction::call(ADD, ["1"]),
            Instruction::call(ADD, Vec::<String>::new()),
        ]);
        let mut machine = Machine::new();
        let err = machine.run(&registry(), &program).unwrap_err();
        assert!(matches!(err, RuntimeError::Validation(ref errors) if errors.len() == 1));
        assert_eq!(machine.store(), 0);
        assert_eq!(machine.steps(), 0);
    }

    #[test]
    fn without_preflight_runs_until_bad_instruction() {
        let program = Program::new(vec![
            Instruction::call(ADD, ["1"]),
            Instruction::call(ADD, Vec::<String>::new()),
        ]);
        let mut machine = Machine::with_config(MachineConfig {
            preflight: false,
            ..MachineConfig::default()
        });
        let err = machine.run(&registry(), &program).unwrap_err();
        assert!(matches!(err, RuntimeError::Parse { key: ADD, .. }));
        assert_eq!(machine.store(), 1);
        assert_eq!(machine.instruction_pointer(), 1);
    }
}
