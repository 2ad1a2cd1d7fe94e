//! Post-run pattern checks.
//!
//! Both passes read the already-parsed program and never execute anything.
//! They can miss real bugs and can flag correct code; a hit only marks the
//! run as unsuccessful with an advisory error.

use crate::config::EngineConfig;
use crate::error::ExecError;
use crate::parser::{
    is_identifier, is_keyword, split_assignment, split_top_level, Language,
    ParsedProgram,
};
use std::collections::HashMap;
use tracing::warn;

/// Which passes run after a local execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeuristicChecks {
    pub bounds: bool,
    pub infinite_loops: bool,
}

impl Default for HeuristicChecks {
    fn default() -> Self {
        Self {
            bounds: true,
            infinite_loops: true,
        }
    }
}

impl From<&EngineConfig> for HeuristicChecks {
    fn from(config: &EngineConfig) -> Self {
        Self {
            bounds: config.check_bounds,
            infinite_loops: config.check_infinite_loops,
        }
    }
}

impl HeuristicChecks {
    /// First flag raised; out-of-bounds wins over infinite loops.
    pub fn run(&self, program: &ParsedProgram) -> Option<ExecError> {
        let flag = self
            .bounds
            .then(|| find_out_of_bounds(program))
            .flatten()
            .or_else(|| {
                self.infinite_loops
                    .then(|| find_infinite_loop(program))
                    .flatten()
            });
        if let Some(flag) = &flag {
            warn!(%flag, "heuristic flag raised");
        }
        flag
    }
}

/// A literal index at or past the length of an array whose size is known
/// from an earlier `new T[N]` or `{a, b, c}` initializer.
pub fn find_out_of_bounds(program: &ParsedProgram) -> Option<ExecError> {
    let mut lengths: HashMap<String, usize> = HashMap::new();

    for (line, text) in program.lines.iter().zip(&program.stripped) {
        for (array, index) in literal_accesses(text) {
            if let Some(&length) = lengths.get(&array) {
                if index >= length {
                    return Some(ExecError::OutOfBounds {
                        array,
                        index,
                        length,
                        line: line.number,
                    });
                }
            }
        }

        if let Some((name, length)) = array_definition(&line.text, program.language) {
            lengths.insert(name, length);
        }
    }
    None
}

fn array_definition(text: &str, language: Language) -> Option<(String, usize)> {
    let body = text.trim().trim_end_matches(';').trim_end();
    let (lhs, rhs) = split_assignment(body)?;
    let name = lhs.split_whitespace().last()?.trim_end_matches("[]");
    if !is_identifier(name) {
        return None;
    }
    let rhs = rhs.trim();

    if let Some(rest) = rhs.strip_prefix("new ") {
        let open = rest.find('[')?;
        let close = rest[open..].find(']')? + open;
        let size = rest[open + 1..close].trim().parse().ok()?;
        return Some((name.to_string(), size));
    }

    let (open, close) = if language == Language::Java { ('{', '}') } else { ('[', ']') };
    let inner = rhs.strip_prefix(open)?.strip_suffix(close)?.trim();
    let size = if inner.is_empty() {
        0
    } else {
        split_top_level(inner, ',')
            .into_iter()
            .filter(|item| !item.trim().is_empty())
            .count()
    };
    Some((name.to_string(), size))
}

/// `name[K]` with a decimal `K`, excluding `new T[K]`.
fn literal_accesses(text: &str) -> Vec<(String, usize)> {
    let mut found = Vec::new();

    for (open, _) in text.match_indices('[') {
        let start = text[..open]
            .rfind(|c: char| !(c.is_alphanumeric() || c == '_' || c == '$'))
            .map_or(0, |i| i + text[i..].chars().next().map_or(1, char::len_utf8));
        let name = &text[start..open];
        if !is_identifier(name) {
            continue;
        }
        if text[..start].trim_end().ends_with("new") {
            continue;
        }
        let Some(len) = text[open + 1..].find(']') else {
            continue;
        };
        let index = text[open + 1..open + 1 + len].trim();
        if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }
        if let Ok(index) = index.parse() {
            found.push((name.to_string(), index));
        }
    }
    found
}

/// A loop with no way out: `while (true)` / `for (;;)` / `while True:`
/// without `break` or `return`, or a `while (cond)` whose body neither
/// exits nor touches any variable named in `cond`.
pub fn find_infinite_loop(program: &ParsedProgram) -> Option<ExecError> {
    for (i, (line, text)) in program.lines.iter().zip(&program.stripped).enumerate() {
        let trimmed = text.trim();
        let Some(head) = LoopHead::parse(trimmed, program.language) else {
            continue;
        };

        let body = if program.language.uses_braces() {
            brace_body(program, i, head.header_end)
        } else {
            indented_body(program, i)
        };

        if mentions_word(&body, "break") || mentions_word(&body, "return") {
            continue;
        }

        let stuck = match &head.condition {
            None => true,
            Some(cond) => {
                let vars = condition_variables(cond);
                !vars.is_empty()
                    && !cond_has_call(cond)
                    && !vars.iter().any(|v| is_mutated(&body, v))
            }
        };
        if stuck {
            return Some(ExecError::InfiniteLoop { line: line.number });
        }
    }
    None
}

struct LoopHead {
    /// `None` for an unconditional loop.
    condition: Option<String>,
    /// Byte offset in the trimmed line just past the loop header.
    header_end: usize,
}

impl LoopHead {
    fn parse(trimmed: &str, language: Language) -> Option<Self> {
        if language == Language::Python {
            let cond = trimmed.strip_prefix("while ")?.strip_suffix(':')?.trim();
            let condition = (!matches!(cond, "True" | "1")).then(|| cond.to_string());
            return Some(Self {
                condition,
                header_end: trimmed.len(),
            });
        }

        let (keyword, after) = if let Some(rest) = trimmed.strip_prefix("while") {
            ("while", rest)
        } else if let Some(rest) = trimmed.strip_prefix("for") {
            ("for", rest)
        } else {
            return None;
        };
        if !after.trim_start().starts_with('(') {
            return None;
        }
        let open = trimmed.len() - after.len() + after.find('(')?;
        let close = matching_paren(trimmed, open)?;
        let inner: String = trimmed[open + 1..close].split_whitespace().collect();

        let condition = match keyword {
            "for" if inner == ";;" => None,
            "for" => return None,
            _ if inner == "true" || inner == "1" => None,
            _ => Some(trimmed[open + 1..close].trim().to_string()),
        };
        // `} while (x);` closes a do-while, and `while (x);` has no body to scan.
        if trimmed[close + 1..].trim_start().starts_with(';') && condition.is_some() {
            return None;
        }
        Some(Self {
            condition,
            header_end: close + 1,
        })
    }
}

fn matching_paren(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0i32;
    for (i, ch) in text[open..].char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

/// The braced block (or single statement) following a loop header.
fn brace_body(program: &ParsedProgram, start: usize, header_end: usize) -> String {
    let first = program.stripped[start].trim();
    let mut tail = first[header_end..].to_string();
    for text in &program.stripped[start + 1..] {
        tail.push('\n');
        tail.push_str(text);
    }

    let text = tail.trim_start();
    if let Some(block) = text.strip_prefix('{') {
        let mut depth = 1i32;
        for (i, ch) in block.char_indices() {
            match ch {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return block[..i].to_string();
                    }
                }
                _ => {}
            }
        }
        return block.to_string();
    }
    match text.find(';') {
        Some(end) => text[..end].to_string(),
        None => text.to_string(),
    }
}

/// Lines indented deeper than the loop header.
fn indented_body(program: &ParsedProgram, start: usize) -> String {
    let header_depth = program.depths[start];
    let mut body = String::new();
    for (text, depth) in program.stripped[start + 1..]
        .iter()
        .zip(&program.depths[start + 1..])
    {
        if text.trim().is_empty() {
            continue;
        }
        if *depth <= header_depth {
            break;
        }
        body.push_str(text);
        body.push('\n');
    }
    body
}

fn words(text: &str) -> impl Iterator<Item = (usize, &str)> + '_ {
    text.char_indices()
        .filter(|(_, c)| !(c.is_alphanumeric() || *c == '_' || *c == '$'))
        .map(|(i, c)| (i, c.len_utf8()))
        .chain(std::iter::once((text.len(), 0)))
        .scan(0usize, move |start, (end, width)| {
            let word = (*start, &text[*start..end]);
            *start = end + width;
            Some(word)
        })
        .filter(|(_, w)| !w.is_empty())
}

fn mentions_word(text: &str, word: &str) -> bool {
    words(text).any(|(_, w)| w == word)
}

fn condition_variables(cond: &str) -> Vec<String> {
    let mut vars: Vec<String> = Vec::new();
    for (start, word) in words(cond) {
        let after_dot = cond[..start].ends_with('.');
        if after_dot
            || !is_identifier(word)
            || is_keyword(word)
            || matches!(word, "true" | "false" | "null" | "True" | "False" | "None" | "and" | "or" | "not")
        {
            continue;
        }
        if !vars.iter().any(|v| v == word) {
            vars.push(word.to_string());
        }
    }
    vars
}

fn cond_has_call(cond: &str) -> bool {
    words(cond).any(|(start, word)| {
        is_identifier(word) && cond[start + word.len()..].trim_start().starts_with('(')
    })
}

fn is_mutated(body: &str, var: &str) -> bool {
    words(body).any(|(start, word)| {
        if word != var {
            return false;
        }
        let before = body[..start].trim_end();
        if before.ends_with("++") || before.ends_with("--") {
            return true;
        }
        let after = body[start + word.len()..].trim_start();
        if after.starts_with("++") || after.starts_with("--") || after.starts_with('.') {
            return true;
        }
        ["+=", "-=", "*=", "/=", "%="]
            .iter()
            .any(|op| after.starts_with(op))
            || (after.starts_with('=') && !after.starts_with("=="))
    })
}

#[cfg(test)]
mod heuristic_tests {
    use super::*;
    use crate::parser::preprocess;

    #[test]
    fn test_words_splits_on_punctuation() {
        let found: Vec<&str> = words("sum = sum + i;").map(|(_, w)| w).collect();
        assert_eq!(found, vec!["sum", "sum", "i"]);
    }

    #[test]
    fn test_literal_accesses_skip_allocation() {
        let found = literal_accesses("int[] a = new int[3]; a[3] = 1;");
        assert_eq!(found, vec![("a".to_string(), 3)]);
    }

    #[test]
    fn test_counter_loop_is_not_flagged() {
        let program = preprocess("int i = 0;\nwhile (i < 3) {\n  i++;\n}", Language::Java);
        assert_eq!(find_infinite_loop(&program), None);
    }

    #[test]
    fn test_floor_division_is_not_a_comment() {
        let program = preprocess("n = 100\nwhile n // 10 > 0:\n    x = 1", Language::Python);
        assert_eq!(
            find_infinite_loop(&program),
            Some(ExecError::InfiniteLoop { line: 2 }),
            "`//` is floor division in Python, so `n` is never updated"
        );
    }

    #[test]
    fn test_single_line_while_true_is_flagged() {
        let program = preprocess("while (true) { x = 1; }", Language::Java);
        assert_eq!(
            find_infinite_loop(&program),
            Some(ExecError::InfiniteLoop { line: 1 })
        );
    }
}
