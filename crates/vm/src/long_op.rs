//! Long operations: work that spans several steps of the fetch loop.

use crate::error::RuntimeError;
use crate::machine::Machine;

/// Result of one long operation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Finished; drop it and resume fetching.
    Done,
    /// Keep it installed and run it again next step.
    Continue,
    /// Waiting on outside input (such as a selection decision).
    Blocked,
}

/// An operation installed on the machine that runs before instruction fetch
/// until it reports [`Progress::Done`].
pub trait LongOperation {
    fn name(&self) -> &str;

    fn step(&mut self, machine: &mut Machine) -> Result<Progress, RuntimeError>;
}
