//! Jumps and subroutine calls. Every operation here places the instruction
//! pointer itself.

use opvm_common::{Body, Instruction};

use super::{int_operand, malformed};
use crate::error::{RegistrationError, RuntimeError};
use crate::machine::Machine;
use crate::module::Module;
use crate::special::SpecialCase;

pub fn module() -> Result<Module, RegistrationError> {
    let mut module = Module::new("Jmp", 0, 1);
    module
        .add_opcode(0, 0, SpecialCase::new("goto", goto))?
        .add_opcode(
            1,
            0,
            SpecialCase::new("goto_if", |m, i| goto_if("goto_if", m, i, true)),
        )?
        .add_opcode(
            2,
            0,
            SpecialCase::new("goto_unless", |m, i| goto_if("goto_unless", m, i, false)),
        )?
        .add_opcode(3, 0, SpecialCase::new("goto_on", goto_on))?
        .add_opcode(5, 0, SpecialCase::new("gosub", gosub))?
        .add_opcode(10, 0, SpecialCase::new("ret", ret))?;
    Ok(module)
}

fn goto(machine: &mut Machine, instruction: &Instruction) -> Result<(), RuntimeError> {
    let Body::Goto { target } = &instruction.body else {
        return Err(malformed("goto", machine));
    };
    machine.jump(*target);
    Ok(())
}

fn goto_if(
    name: &str,
    machine: &mut Machine,
    instruction: &Instruction,
    when: bool,
) -> Result<(), RuntimeError> {
    let Body::GotoIf { condition, target } = &instruction.body else {
        return Err(malformed(name, machine));
    };
    let value = int_operand(name, machine, instruction, condition)?;
    if (value != 0) == when {
        machine.jump(*target);
    } else {
        machine.advance_instruction_pointer();
    }
    Ok(())
}

/// `targets[selector]`; a selector outside the table falls through.
fn goto_on(machine: &mut Machine, instruction: &Instruction) -> Result<(), RuntimeError> {
    let Body::GotoOn { selector, targets } = &instruction.body else {
        return Err(malformed("goto_on", machine));
    };
    let value = int_operand("goto_on", machine, instruction, selector)?;
    match usize::try_from(value).ok().and_then(|i| targets.get(i)) {
        Some(&target) => machine.jump(target),
        None => machine.advance_instruction_pointer(),
    }
    Ok(())
}

fn gosub(machine: &mut Machine, instruction: &Instruction) -> Result<(), RuntimeError> {
    let Body::Goto { target } = &instruction.body else {
        return Err(malformed("gosub", machine));
    };
    machine.push_call(machine.instruction_pointer() + 1);
    machine.jump(*target);
    Ok(())
}

fn ret(machine: &mut Machine, _instruction: &Instruction) -> Result<(), RuntimeError> {
    let at = machine.instruction_pointer();
    let return_to = machine
        .pop_call()
        .ok_or(RuntimeError::ReturnWithoutGosub { at })?;
    machine.jump(return_to);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::Operation;
    use opvm_common::{EvalError, OpcodeKey};

    fn exec(opcode: u16, machine: &mut Machine, body: Body) -> Result<(), RuntimeError> {
        let module = module().unwrap();
        let op = module.get(opcode, 0).unwrap();
        op.execute(machine, &Instruction::new(OpcodeKey::new(0, 1, opcode, 0), body))
    }

    fn cond(condition: &str, target: usize) -> Body {
        Body::GotoIf {
            condition: condition.to_string(),
            target,
        }
    }

    #[test]
    fn goto_sets_pointer() {
        let mut machine = Machine::new();
        exec(0, &mut machine, Body::Goto { target: 9 }).unwrap();
        assert_eq!(machine.instruction_pointer(), 9);
    }

    #[test]
    fn goto_if_and_unless() {
        let mut machine = Machine::new();
        exec(1, &mut machine, cond("1 == 1", 4)).unwrap();
        assert_eq!(machine.instruction_pointer(), 4);
        exec(1, &mut machine, cond("0", 0)).unwrap();
        assert_eq!(machine.instruction_pointer(), 5);
        exec(2, &mut machine, cond("0", 1)).unwrap();
        assert_eq!(machine.instruction_pointer(), 1);
        exec(2, &mut machine, cond("7", 0)).unwrap();
        assert_eq!(machine.instruction_pointer(), 2);
    }

    #[test]
    fn goto_if_requires_integer() {
        let mut machine = Machine::new();
        assert_eq!(
            exec(1, &mut machine, cond("\"yes\"", 4)),
            Err(RuntimeError::Evaluate {
                name: "goto_if".to_string(),
                source: EvalError::TypeMismatch {
                    expected: "integer",
                    found: "string"
                },
            })
        );
        assert_eq!(machine.instruction_pointer(), 0);
    }

    #[test]
    fn goto_on_table_and_fall_through() {
        let table = |selector: &str| Body::GotoOn {
            selector: selector.to_string(),
            targets: vec![10, 20, 30],
        };
        let mut machine = Machine::new();
        exec(3, &mut machine, table("1")).unwrap();
        assert_eq!(machine.instruction_pointer(), 20);
        exec(3, &mut machine, table("3")).unwrap();
        assert_eq!(machine.instruction_pointer(), 21);
        exec(3, &mut machine, table("-1")).unwrap();
        assert_eq!(machine.instruction_pointer(), 22);
    }

    #[test]
    fn gosub_and_ret() {
        let mut machine = Machine::new();
        machine.jump(3);
        exec(5, &mut machine, Body::Goto { target: 8 }).unwrap();
        assert_eq!(machine.instruction_pointer(), 8);
        exec(10, &mut machine, Body::Call { params: vec![] }).unwrap();
        assert_eq!(machine.instruction_pointer(), 4);
        assert_eq!(
            exec(10, &mut machine, Body::Call { params: vec![] }),
            Err(RuntimeError::ReturnWithoutGosub { at: 4 })
        );
    }

    #[test]
    fn wrong_body_is_malformed() {
        let mut machine = Machine::new();
        assert_eq!(
            exec(0, &mut machine, Body::Call { params: vec![] }),
            Err(RuntimeError::MalformedInstruction {
                name: "goto".to_string(),
                at: 0
            })
        );
    }
}
