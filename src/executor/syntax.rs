use crate::error::ExecError;
use crate::parser::{indent_width, strip_source, Language};

/// Structural pre-check run before any line executes.
pub fn check_syntax(code: &str, language: Language) -> Result<(), ExecError> {
    if code.trim().is_empty() {
        return Err(ExecError::Syntax("Code is empty".to_string()));
    }
    let stripped = strip_source(code.lines(), language);
    if language.uses_braces() {
        check_balance(&stripped)
    } else {
        check_indentation(code, &stripped)
    }
}

/// Counts over lines already stripped of literals and comments.
fn check_balance(stripped: &[String]) -> Result<(), ExecError> {
    let mut braces = 0i32;
    let mut parens = 0i32;

    for line in stripped {
        for ch in line.chars() {
            match ch {
                '{' => braces += 1,
                '}' => {
                    braces -= 1;
                    if braces < 0 {
                        return Err(ExecError::Syntax(
                            "Syntax error: Unexpected '}'".to_string(),
                        ));
                    }
                }
                '(' => parens += 1,
                ')' => parens -= 1,
                _ => {}
            }
        }
    }

    if braces != 0 {
        let missing = if braces > 0 { "}" } else { "{" };
        return Err(ExecError::Syntax(format!(
            "Syntax error: Unbalanced braces. Missing {missing}"
        )));
    }
    if parens != 0 {
        return Err(ExecError::Syntax(
            "Syntax error: Unbalanced parentheses".to_string(),
        ));
    }
    Ok(())
}

/// A line that follows a `:` line must be indented deeper than it.
fn check_indentation(code: &str, stripped: &[String]) -> Result<(), ExecError> {
    // (line number, indent, opens a block)
    let mut previous: Option<(usize, usize, bool)> = None;

    for (i, (line, text)) in code.lines().zip(stripped).enumerate() {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            continue;
        }
        let indent = indent_width(line);

        if let Some((number, prev_indent, true)) = previous {
            if indent <= prev_indent {
                return Err(ExecError::Syntax(format!(
                    "IndentationError: expected an indented block after line {number}"
                )));
            }
        }
        previous = Some((i + 1, indent, trimmed.ends_with(':')));
    }

    if let Some((number, _, true)) = previous {
        return Err(ExecError::Syntax(format!(
            "IndentationError: expected an indented block after line {number}"
        )));
    }
    Ok(())
}
