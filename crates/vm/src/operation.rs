//! The contract every opcode handler implements, and its property bag.

use opvm_common::{Expression, Instruction};

use crate::error::{ParseError, RuntimeError};
use crate::machine::Machine;
use crate::operand::Signature;

/// Property key: the operation draws on the foreground (0) or background (1) layer.
pub const PROP_FGBG: i32 = 1;
/// Property key: which object set the operation addresses.
pub const PROP_OBJSET: i32 = 2;

/// Small ordered (key, value) store. A later set of the same key replaces
/// the earlier value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    entries: Vec<(i32, i32)>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: i32, value: i32) -> &mut Self {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
        self
    }

    pub fn get(&self, key: i32) -> Option<i32> {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|&(_, v)| v)
    }

    /// Entries in first-set order.
    pub fn iter(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// An opcode handler.
///
/// The fetch loop calls [`Operation::execute`]. The default implementation
/// is the standard protocol: parse the instruction's tokens, dispatch the
/// parsed expressions, then advance the instruction pointer unless the
/// operation opts out.
pub trait Operation {
    /// Name used in diagnostics and logs.
    fn name(&self) -> &str;

    fn properties(&self) -> &Properties;

    fn properties_mut(&mut self) -> &mut Properties;

    /// Look up a property; `None` if it was never set.
    fn property(&self, key: i32) -> Option<i32> {
        self.properties().get(key)
    }

    /// Whether the engine moves past the instruction after dispatch.
    fn advances_instruction_pointer(&self) -> bool {
        true
    }

    /// Whether the handler's result is written to the store register.
    fn stores_result(&self) -> bool {
        false
    }

    /// The operand shape, for operations that have one.
    fn signature(&self) -> Option<Signature> {
        None
    }

    /// Turn raw operand tokens into expressions.
    fn parse(&self, tokens: &[String]) -> Result<Vec<Expression>, ParseError>;

    /// Evaluate parsed expressions and invoke the handler.
    fn dispatch(&self, machine: &mut Machine, exprs: &[Expression]) -> Result<(), RuntimeError>;

    /// Run one instruction.
    fn execute(
        &self,
        machine: &mut Machine,
        instruction: &Instruction,
    ) -> Result<(), RuntimeError> {
        let params = instruction
            .params()
            .ok_or_else(|| RuntimeError::MalformedInstruction {
                name: self.name().to_string(),
                at: machine.instruction_pointer(),
            })?;
        let exprs = self
            .parse(params)
            .map_err(|source| RuntimeError::Parse {
                key: instruction.key,
                name: self.name().to_string(),
                source,
            })?;
        tracing::trace!(op = self.name(), operands = ?exprs, "parsed operands");

        self.dispatch(machine, &exprs)?;
        if self.advances_instruction_pointer() {
            machine.advance_instruction_pointer();
        }
        Ok(())
    }
}

impl<'a> dyn Operation + 'a {
    /// Upsert a property, returning the operation for chaining.
    pub fn set_property(&mut self, key: i32, value: i32) -> &mut Self {
        self.properties_mut().set(key, value);
        self
    }
}
