//! Parser for script token lines into instructions.
//!
//! Dispatches on the first token: a control form (`goto`, `goto_if`,
//! `goto_unless`, `goto_on`, `gosub`, `ret`, `select`), an explicit key
//! (`op<T:M:O,V>`), or a call mnemonic (`name` or `name/N`).

use std::collections::HashMap;

use crate::error::ScriptError;
use opvm_common::key::from_mnemonic;
use opvm_common::{Body, Instruction, OpcodeKey};

/// Label name to instruction index.
pub(crate) type Labels = HashMap<String, usize>;

/// An instruction line whose labels are not yet resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Line {
    pub number: usize,
    pub tokens: Vec<String>,
}

/// Peel leading `@label` definitions off a line, recording each at `index`.
///
/// Returns the tokens that remain.
pub(crate) fn take_labels(
    mut tokens: Vec<String>,
    index: usize,
    line_num: usize,
    labels: &mut Labels,
) -> Result<Vec<String>, ScriptError> {
    let count = tokens.iter().take_while(|t| t.starts_with('@')).count();
    for token in tokens.drain(..count) {
        let name = label_name(&token, line_num)?;
        if labels.insert(name.to_string(), index).is_some() {
            return Err(ScriptError::DuplicateLabel {
                line: line_num,
                label: name.to_string(),
            });
        }
    }
    Ok(tokens)
}

/// Build the instruction for one line.
pub(crate) fn parse_line(line: &Line, labels: &Labels) -> Result<Instruction, ScriptError> {
    let n = line.number;
    let (head, args) = match line.tokens.split_first() {
        Some((head, args)) => (head.as_str(), args),
        None => {
            return Err(ScriptError::MissingArgument {
                line: n,
                form: "line".to_string(),
                expected: "an instruction",
            })
        }
    };

    match head {
        "goto" | "gosub" => {
            let [label] = args else {
                return Err(arity(n, head, args, 1, "one label"));
            };
            Ok(Instruction::new(
                builtin(head, n)?,
                Body::Goto {
                    target: target(label, n, labels)?,
                },
            ))
        }
        "goto_if" | "goto_unless" => {
            let [condition, label] = args else {
                return Err(arity(n, head, args, 2, "a condition and a label"));
            };
            Ok(Instruction::new(
                builtin(head, n)?,
                Body::GotoIf {
                    condition: condition.clone(),
                    target: target(label, n, labels)?,
                },
            ))
        }
        "goto_on" => {
            let Some((selector, table)) = args.split_first() else {
                return Err(arity(n, head, args, 1, "a selector and labels"));
            };
            let targets = table
                .iter()
                .map(|label| target(label, n, labels))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Instruction::new(
                builtin(head, n)?,
                Body::GotoOn {
                    selector: selector.clone(),
                    targets,
                },
            ))
        }
        "ret" => {
            if let Some(extra) = args.first() {
                return Err(ScriptError::UnexpectedToken {
                    line: n,
                    token: extra.clone(),
                });
            }
            Ok(Instruction::call(builtin(head, n)?, Vec::<String>::new()))
        }
        "select" => {
            if args.is_empty() {
                return Err(ScriptError::MissingArgument {
                    line: n,
                    form: "select".to_string(),
                    expected: "at least one option",
                });
            }
            Ok(Instruction::new(
                builtin(head, n)?,
                Body::Select {
                    options: args.to_vec(),
                },
            ))
        }
        _ if head.starts_with("op<") => {
            Ok(Instruction::call(parse_key(head, n)?, args.iter().cloned()))
        }
        _ => Ok(Instruction::call(parse_mnemonic(head, n)?, args.iter().cloned())),
    }
}

fn label_name(token: &str, line_num: usize) -> Result<&str, ScriptError> {
    match token.strip_prefix('@') {
        Some(name)
            if !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_') =>
        {
            Ok(name)
        }
        _ => Err(ScriptError::UnexpectedToken {
            line: line_num,
            token: token.to_string(),
        }),
    }
}

fn target(token: &str, line_num: usize, labels: &Labels) -> Result<usize, ScriptError> {
    let name = label_name(token, line_num)?;
    labels
        .get(name)
        .copied()
        .ok_or_else(|| ScriptError::UndefinedLabel {
            line: line_num,
            label: name.to_string(),
        })
}

fn builtin(name: &str, line_num: usize) -> Result<OpcodeKey, ScriptError> {
    from_mnemonic(name, 0).ok_or_else(|| ScriptError::UnknownMnemonic {
        line: line_num,
        token: name.to_string(),
    })
}

/// Too many operands point at the first extra one; too few are missing.
fn arity(
    line: usize,
    form: &str,
    args: &[String],
    needed: usize,
    expected: &'static str,
) -> ScriptError {
    match args.get(needed) {
        Some(extra) => ScriptError::UnexpectedToken {
            line,
            token: extra.clone(),
        },
        None => ScriptError::MissingArgument {
            line,
            form: form.to_string(),
            expected,
        },
    }
}

/// `op<T:M:O>` or `op<T:M:O,V>`.
fn parse_key(token: &str, line_num: usize) -> Result<OpcodeKey, ScriptError> {
    let bad = || ScriptError::BadKey {
        line: line_num,
        token: token.to_string(),
    };
    let inner = token
        .strip_prefix("op<")
        .and_then(|rest| rest.strip_suffix('>'))
        .ok_or_else(bad)?;
    let (ids, overload) = match inner.split_once(',') {
        Some((ids, overload)) => (ids, overload.trim().parse::<u8>().map_err(|_| bad())?),
        None => (inner, 0),
    };
    let parts: Vec<&str> = ids.split(':').map(str::trim).collect();
    let [module_type, module, opcode] = parts[..] else {
        return Err(bad());
    };
    Ok(OpcodeKey::new(
        module_type.parse().map_err(|_| bad())?,
        module.parse().map_err(|_| bad())?,
        opcode.parse().map_err(|_| bad())?,
        overload,
    ))
}

/// `name` or `name/N`.
fn parse_mnemonic(token: &str, line_num: usize) -> Result<OpcodeKey, ScriptError> {
    let (name, overload) = match token.split_once('/') {
        Some((name, overload)) => (
            name,
            overload.parse::<u8>().map_err(|_| ScriptError::BadKey {
                line: line_num,
                token: token.to_string(),
            })?,
        ),
        None => (token, 0),
    };
    from_mnemonic(name, overload).ok_or_else(|| ScriptError::UnknownMnemonic {
        line: line_num,
        token: name.to_string(),
    })
}
