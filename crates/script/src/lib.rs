//! opvm script loader: line-oriented text to [`Program`].
//!
//! One instruction per line. `;` starts a comment, `@name` defines a label
//! at the next instruction, and operand tokens are passed through unparsed
//! for the dispatch engine.
//!
//! ```text
//! setarray intA[0] 2 10 20     ; call by mnemonic
//! op<1:11:100,0> 2 intA[0] intA[1]
//! @again
//! goto_if (store < 100) @again ; spaces only inside brackets or parens
//! select "yes" "no"
//! ```
//!
//! # Usage
//!
//! ```
//! use opvm_script::load;
//!
//! let program = load("@top\nsum 3 1 2 3\ngoto_if (store < 6) @top\n").unwrap();
//! assert_eq!(program.len(), 2);
//! ```

pub mod error;

mod lexer;
mod parser;

pub use error::ScriptError;

use lexer::tokenize_line;
use opvm_common::Program;
use parser::{parse_line, take_labels, Labels, Line};

/// Load a script.
///
/// Labels may be used before they are defined. Returns the first error
/// encountered.
pub fn load(text: &str) -> Result<Program, ScriptError> {
    let mut labels = Labels::new();
    let mut lines = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let line_num = idx + 1;
        let tokens = tokenize_line(raw, line_num)?;
        let tokens = take_labels(tokens, lines.len(), line_num, &mut labels)?;
        if !tokens.is_empty() {
            lines.push(Line {
                number: line_num,
                tokens,
            });
        }
    }

    let instructions = lines
        .iter()
        .map(|line| parse_line(line, &labels))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Program::new(instructions))
}
