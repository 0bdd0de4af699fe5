//! Fetched instructions as the dispatch engine sees them.
//!
//! Most instructions are plain function calls whose operands arrive as a flat
//! list of textual tokens. Control flow instructions (jumps, multi-way
//! selects) carry a different shape and are interpreted by the handler that
//! owns them.

use crate::key::OpcodeKey;

/// The payload of an instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    /// The normal shape: a flat ordered list of operand tokens.
    Call {
        /// Raw operand tokens, one per top-level operand.
        params: Vec<String>,
    },
    /// Unconditional jump (also used by `gosub`).
    Goto {
        /// Target instruction index.
        target: usize,
    },
    /// Conditional jump (`goto_if` / `goto_unless`).
    GotoIf {
        /// Condition expression token.
        condition: String,
        /// Target instruction index.
        target: usize,
    },
    /// Computed jump: `targets[selector]`.
    GotoOn {
        /// Selector expression token.
        selector: String,
        /// Jump table.
        targets: Vec<usize>,
    },
    /// Multi-way selection presented to the player.
    Select {
        /// Option expression tokens (usually string literals).
        options: Vec<String>,
    },
}

/// A single instruction: opcode identity plus payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// Which operation handles this instruction.
    pub key: OpcodeKey,
    /// The instruction payload.
    pub body: Body,
}

impl Instruction {
    /// Create a new instruction.
    pub fn new(key: OpcodeKey, body: Body) -> Self {
        Self { key, body }
    }

    /// Create a function-call instruction from operand tokens.
    pub fn call<I, S>(key: OpcodeKey, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            key,
            body: Body::Call {
                params: params.into_iter().map(Into::into).collect(),
            },
        }
    }

    /// The operand tokens of a function-call instruction.
    ///
    /// Returns `None` for control flow shapes.
    pub fn params(&self) -> Option<&[String]> {
        match &self.body {
            Body::Call { params } => Some(params),
            _ => None,
        }
    }
}
