//! Operations that receive the raw instruction.
//!
//! Jumps, computed jumps and selections do not carry a flat operand list.
//! A [`SpecialCase`] skips the generic decode step and hands the instruction
//! to its handler, which interprets the body and places the instruction
//! pointer itself.

use std::fmt;

use opvm_common::{Expression, Instruction};

use crate::error::{ParseError, RuntimeError};
use crate::machine::Machine;
use crate::operation::{Operation, Properties};

type SpecialFn = Box<dyn Fn(&mut Machine, &Instruction) -> Result<(), RuntimeError>>;

pub struct SpecialCase {
    name: String,
    func: SpecialFn,
    properties: Properties,
}

impl SpecialCase {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&mut Machine, &Instruction) -> Result<(), RuntimeError> + 'static,
    {
        Self {
            name: name.into(),
            func: Box::new(func),
            properties: Properties::new(),
        }
    }

    pub fn with_property(mut self, key: i32, value: i32) -> Self {
        self.properties.set(key, value);
        self
    }
}

impl fmt::Debug for SpecialCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpecialCase")
            .field("name", &self.name)
            .field("properties", &self.properties)
            .finish()
    }
}

impl Operation for SpecialCase {
    fn name(&self) -> &str {
        &self.name
    }

    fn properties(&self) -> &Properties {
        &self.properties
    }

    fn properties_mut(&mut self) -> &mut Properties {
        &mut self.properties
    }

    fn advances_instruction_pointer(&self) -> bool {
        false
    }

    /// Each token becomes one expression, with no shape check.
    fn parse(&self, tokens: &[String]) -> Result<Vec<Expression>, ParseError> {
        tokens
            .iter()
            .enumerate()
            .map(|(position, token)| {
                Expression::parse(token).map_err(|source| ParseError::Expression {
                    position,
                    token: token.clone(),
                    source,
                })
            })
            .collect()
    }

    fn dispatch(&self, _machine: &mut Machine, _exprs: &[Expression]) -> Result<(), RuntimeError> {
        Ok(())
    }

    fn execute(
        &self,
        machine: &mut Machine,
        instruction: &Instruction,
    ) -> Result<(), RuntimeError> {
        (self.func)(machine, instruction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opvm_common::{Body, OpcodeKey};

    fn jump() -> SpecialCase {
        SpecialCase::new("goto", |machine, instruction| match instruction.body {
            Body::Goto { target } => {
                machine.jump(target);
                Ok(())
            }
            _ => Err(RuntimeError::MalformedInstruction {
                name: "goto".to_string(),
                at: machine.instruction_pointer(),
            }),
        })
    }

    #[test]
    fn handler_sets_pointer_without_advance() {
        let op = jump();
        let mut machine = Machine::new();
        let instruction = Instruction::new(OpcodeKey::new(0, 1, 0, 0), Body::Goto { target: 7 });
        op.execute(&mut machine, &instruction).unwrap();
        assert_eq!(machine.instruction_pointer(), 7);
        assert!(!op.advances_instruction_pointer());
    }

    #[test]
    fn handler_sees_raw_body() {
        let op = jump();
        let mut machine = Machine::new();
        let instruction = Instruction::call(OpcodeKey::new(0, 1, 0, 0), ["1"]);
        assert!(matches!(
            op.execute(&mut machine, &instruction),
            Err(RuntimeError::MalformedInstruction { .. })
        ));
        assert_eq!(machine.instruction_pointer(), 0);
    }

    #[test]
    fn parse_accepts_any_count() {
        let op = jump();
        let tokens: Vec<String> = vec!["1".into(), "2".into(), "3".into()];
        assert_eq!(op.parse(&tokens).unwrap().len(), 3);
        assert_eq!(op.parse(&[]).unwrap().len(), 0);
    }

    #[test]
    fn property_chain_through_trait_object() {
        let mut op: Box<dyn Operation> = Box::new(jump().with_property(1, 0));
        op.set_property(1, 1).set_property(2, 4);
        assert_eq!(op.property(1), Some(1));
        assert_eq!(op.property(2), Some(4));
        assert_eq!(op.signature(), None);
    }
}
