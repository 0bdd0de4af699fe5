//! Interpreter state: memory, instruction pointer, call stack, long operations.

use std::collections::VecDeque;

use opvm_common::Memory;

use crate::config::MachineConfig;
use crate::long_op::LongOperation;

/// The interpreter state an operation can read and mutate.
pub struct Machine {
    memory: Memory,
    /// Instruction index of the next instruction to fetch.
    ip: usize,
    /// Return addresses pushed by `gosub`.
    call_stack: Vec<usize>,
    /// Pending long operations; the last one runs first.
    long_ops: Vec<Box<dyn LongOperation>>,
    /// Queued answers for selections.
    decisions: VecDeque<usize>,
    halted: bool,
    steps: u64,
    config: MachineConfig,
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

impl Machine {
    /// A machine with zeroed memory and the default configuration.
    pub fn new() -> Self {
        Self::with_config(MachineConfig::default())
    }

    pub fn with_config(config: MachineConfig) -> Self {
        Self {
            memory: Memory::new(),
            ip: 0,
            call_stack: Vec::new(),
            long_ops: Vec::new(),
            decisions: VecDeque::new(),
            halted: false,
            steps: 0,
            config,
        }
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    /// The store register.
    pub fn store(&self) -> i32 {
        self.memory.store()
    }

    pub fn set_store(&mut self, value: i32) {
        self.memory.set_store(value);
    }

    pub fn instruction_pointer(&self) -> usize {
        self.ip
    }

    /// Move to the next instruction.
    pub fn advance_instruction_pointer(&mut self) {
        self.ip += 1;
    }

    /// Set the instruction pointer. The target is checked at the next fetch.
    pub fn jump(&mut self, target: usize) {
        self.ip = target;
    }

    pub fn push_call(&mut self, return_to: usize) {
        self.call_stack.push(return_to);
    }

    pub fn pop_call(&mut self) -> Option<usize> {
        self.call_stack.pop()
    }

    pub fn call_depth(&self) -> usize {
        self.call_stack.len()
    }

    /// Install a long operation. It runs before the next instruction is fetched.
    pub fn push_long_operation(&mut self, op: Box<dyn LongOperation>) {
        tracing::debug!(name = op.name(), depth = self.long_ops.len(), "long operation installed");
        self.long_ops.push(op);
    }

    pub fn has_long_operation(&self) -> bool {
        !self.long_ops.is_empty()
    }

    /// Drop every pending long operation.
    pub fn cancel_long_operations(&mut self) {
        self.long_ops.clear();
    }

    pub fn long_operation_depth(&self) -> usize {
        self.long_ops.len()
    }

    /// Name of the long operation that runs on the next step.
    pub fn pending_long_operation(&self) -> Option<&str> {
        self.long_ops.last().map(|op| op.name())
    }

    pub(crate) fn pop_long_operation(&mut self) -> Option<Box<dyn LongOperation>> {
        self.long_ops.pop()
    }

    /// Put a long operation back at `depth`, below anything it installed itself.
    pub(crate) fn reinsert_long_operation(&mut self, depth: usize, op: Box<dyn LongOperation>) {
        let depth = depth.min(self.long_ops.len());
        self.long_ops.insert(depth, op);
    }

    /// Queue an answer for the next selection.
    pub fn queue_decision(&mut self, choice: usize) {
        self.decisions.push_back(choice);
    }

    pub fn take_decision(&mut self) -> Option<usize> {
        self.decisions.pop_front()
    }

    pub fn halt(&mut self) {
        self.halted = true;
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    /// Instructions and long operation steps executed so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub(crate) fn count_step(&mut self) {
        self.steps += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RuntimeError;
    use crate::long_op::Progress;

    struct Named(&'static str);

    impl LongOperation for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn step(&mut self, _machine: &mut Machine) -> Result<Progress, RuntimeError> {
            Ok(Progress::Done)
        }
    }

    #[test]
    fn call_stack_is_lifo() {
        let mut machine = Machine::new();
        machine.push_call(3);
        machine.push_call(7);
        assert_eq!(machine.call_depth(), 2);
        assert_eq!(machine.pop_call(), Some(7));
        assert_eq!(machine.pop_call(), Some(3));
        assert_eq!(machine.pop_call(), None);
    }

    #[test]
    fn decisions_are_fifo() {
        let mut machine = Machine::new();
        machine.queue_decision(1);
        machine.queue_decision(0);
        assert_eq!(machine.take_decision(), Some(1));
        assert_eq!(machine.take_decision(), Some(0));
        assert_eq!(machine.take_decision(), None);
    }

    #[test]
    fn reinsert_clamps_depth() {
        let mut machine = Machine::new();
        machine.push_long_operation(Box::new(Named("a")));
        machine.reinsert_long_operation(5, Box::new(Named("b")));
        machine.reinsert_long_operation(0, Box::new(Named("c")));
        let order: Vec<_> = std::iter::from_fn(|| machine.pop_long_operation())
            .map(|op| op.name().to_string())
            .collect();
        assert_eq!(order, ["b", "a", "c"]);
    }

    #[test]
    fn pending_long_operation_is_the_top() {
        let mut machine = Machine::new();
        assert_eq!(machine.pending_long_operation(), None);
        machine.push_long_operation(Box::new(Named("outer")));
        machine.push_long_operation(Box::new(Named("inner")));
        assert_eq!(machine.pending_long_operation(), Some("inner"));
    }

    #[test]
    fn store_is_memory_register() {
        let mut machine = Machine::new();
        machine.set_store(9);
        assert_eq!(machine.memory().store(), 9);
        assert_eq!(machine.store(), 9);
    }
}
