//! Tokenizer for script lines.

use crate::error::ScriptError;

/// Split one line into tokens.
///
/// Tokens are separated by whitespace, except inside string literals,
/// `[...]` and `(...)`, so `intA[1 + 2]` and `(store * 2)` stay whole.
/// A `;` outside a string starts a comment. Returns an empty Vec for blank
/// and comment-only lines.
pub(crate) fn tokenize_line(line: &str, line_num: usize) -> Result<Vec<String>, ScriptError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_string = false;
    let mut escaped = false;
    let mut depth = 0usize;

    for ch in line.chars() {
        if in_string {
            current.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            ';' => break,
            '"' => {
                in_string = true;
                current.push(ch);
            }
            '[' | '(' => {
                depth += 1;
                current.push(ch);
            }
            ']' | ')' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or(ScriptError::UnbalancedBrackets { line: line_num })?;
                current.push(ch);
            }
            c if c.is_whitespace() && depth == 0 => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }

    if in_string {
        return Err(ScriptError::UnterminatedString { line: line_num });
    }
    if depth != 0 {
        return Err(ScriptError::UnbalancedBrackets { line: line_num });
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(line: &str) -> Vec<String> {
        tokenize_line(line, 1).unwrap()
    }

    #[test]
    fn empty_and_comment_lines() {
        assert!(toks("").is_empty());
        assert!(toks("   \t ").is_empty());
        assert!(toks("; nothing here").is_empty());
    }

    #[test]
    fn splits_on_whitespace() {
        assert_eq!(toks("sum 3 1 2 3"), ["sum", "3", "1", "2", "3"]);
    }

    #[test]
    fn brackets_and_parens_stay_whole() {
        assert_eq!(
            toks("setarray intA[ 1 + 2 ] 1 (store * 2)"),
            ["setarray", "intA[ 1 + 2 ]", "1", "(store * 2)"]
        );
    }

    #[test]
    fn strings_keep_spaces_and_semicolons() {
        assert_eq!(
            toks("strcpy strS[0] \"a; b \\\" c\" ; trailing"),
            ["strcpy", "strS[0]", "\"a; b \\\" c\""]
        );
    }

    #[test]
    fn unterminated_string() {
        assert_eq!(
            tokenize_line("strcpy strS[0] \"abc", 7),
            Err(ScriptError::UnterminatedString { line: 7 })
        );
    }

    #[test]
    fn unbalanced_brackets() {
        assert_eq!(
            tokenize_line("sum 1 intA[0", 2),
            Err(ScriptError::UnbalancedBrackets { line: 2 })
        );
        assert_eq!(
            tokenize_line("sum 1 0]", 3),
            Err(ScriptError::UnbalancedBrackets { line: 3 })
        );
    }
}
