//! Error types for the script loader.

use thiserror::Error;

/// Errors produced while loading a script. Every variant carries the
/// 1-based line it was found on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    /// A call name that is not in the mnemonic table.
    #[error("line {line}: unknown mnemonic '{token}'")]
    UnknownMnemonic { line: usize, token: String },

    /// An `op<...>` key or `name/N` overload that does not parse.
    #[error("line {line}: bad opcode key '{token}'")]
    BadKey { line: usize, token: String },

    #[error("line {line}: undefined label '@{label}'")]
    UndefinedLabel { line: usize, label: String },

    #[error("line {line}: label '@{label}' already defined")]
    DuplicateLabel { line: usize, label: String },

    #[error("line {line}: unterminated string literal")]
    UnterminatedString { line: usize },

    /// Brackets or parentheses do not pair up.
    #[error("line {line}: unbalanced brackets")]
    UnbalancedBrackets { line: usize },

    /// A control form did not get the operands it needs.
    #[error("line {line}: {form} expects {expected}")]
    MissingArgument {
        line: usize,
        form: String,
        expected: &'static str,
    },

    /// A token appeared where it was not expected.
    #[error("line {line}: unexpected token '{token}'")]
    UnexpectedToken { line: usize, token: String },
}
