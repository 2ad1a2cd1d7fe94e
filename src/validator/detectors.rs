//! Key-fix detectors.
//!
//! Each detector pulls signature fragments for one classic bug category out
//! of the lines only the reference has. The user's code must contain every
//! fragment (whitespace ignored) for the fix to count.

use std::collections::HashSet;

pub struct KeyFixDetector {
    pub category: &'static str,
    extract: fn(&str) -> Vec<String>,
}

pub const DETECTORS: &[KeyFixDetector] = &[
    KeyFixDetector {
        category: "reference-vs-value equality",
        extract: equals_calls,
    },
    KeyFixDetector {
        category: "loop bound off-by-one",
        extract: loop_bounds,
    },
    KeyFixDetector {
        category: "wrong logical operator",
        extract: logical_conditions,
    },
    KeyFixDetector {
        category: "missing null guard",
        extract: null_guards,
    },
    KeyFixDetector {
        category: "wrong increment direction",
        extract: increments,
    },
    KeyFixDetector {
        category: "assignment-vs-comparison",
        extract: comparisons,
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFixOutcome {
    /// No detector found a fragment in the reference.
    NotApplicable,
    /// Every fragment is present; carries the first detector that applied.
    Accepted(&'static str),
    /// A fragment is missing from the user's code.
    Rejected(&'static str),
}

/// Run every detector over two core-fix strings.
pub fn check_key_fixes(user_core: &str, reference_core: &str) -> KeyFixOutcome {
    let user_lines: HashSet<&str> = user_core.lines().collect();
    let changed: Vec<&str> = reference_core
        .lines()
        .filter(|line| !user_lines.contains(line))
        .collect();
    let user = compact(user_core);
    let mut accepted = None;

    for detector in DETECTORS {
        let mut fragments: Vec<String> = changed
            .iter()
            .flat_map(|line| (detector.extract)(line))
            .map(|f| compact(&f))
            .filter(|f| !f.is_empty())
            .collect();
        fragments.dedup();
        if fragments.is_empty() {
            continue;
        }
        if fragments.iter().any(|f| !user.contains(f.as_str())) {
            return KeyFixOutcome::Rejected(detector.category);
        }
        accepted.get_or_insert(detector.category);
    }

    accepted.map_or(KeyFixOutcome::NotApplicable, KeyFixOutcome::Accepted)
}

fn compact(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// `recv.equals(`
fn equals_calls(line: &str) -> Vec<String> {
    line.match_indices(".equals(")
        .map(|(at, pattern)| {
            let receiver_start = line[..at]
                .char_indices()
                .rev()
                .take_while(|(_, c)| is_word_char(*c) || *c == '.')
                .last()
                .map_or(at, |(i, _)| i);
            line[receiver_start..at + pattern.len()].to_string()
        })
        .collect()
}

/// Text between the outermost parentheses after a leading keyword.
fn paren_condition<'a>(line: &'a str, keywords: &[&str]) -> Option<&'a str> {
    let line = line.trim_start_matches(['}', ' ']);
    let line = line.strip_prefix("else ").unwrap_or(line);
    let first = line.split([' ', '(']).next()?;
    if !keywords.contains(&first) {
        return None;
    }
    let open = line.find('(')?;
    let mut depth = 0i32;
    for (i, ch) in line[open..].char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&line[open + 1..open + i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// `i < n` in `for (init; i < n; step)`.
fn loop_bounds(line: &str) -> Vec<String> {
    paren_condition(line, &["for"])
        .and_then(|header| header.split(';').nth(1))
        .map(str::trim)
        .filter(|cond| cond.contains('<') || cond.contains('>'))
        .map(|cond| vec![cond.to_string()])
        .unwrap_or_default()
}

fn branch_condition(line: &str) -> Option<String> {
    if let Some(cond) = paren_condition(line, &["if", "while"]) {
        return Some(cond.to_string());
    }
    // Python: `if a and b:`
    let rest = ["if ", "elif ", "while "]
        .iter()
        .find_map(|kw| line.strip_prefix(kw))?;
    rest.strip_suffix(':').map(|c| c.trim().to_string())
}

fn logical_conditions(line: &str) -> Vec<String> {
    branch_condition(line)
        .filter(|c| {
            c.contains("&&") || c.contains("||") || c.contains(" and ") || c.contains(" or ")
        })
        .into_iter()
        .collect()
}

/// `x != null`, `x == null`, `x is not none`.
fn null_guards(line: &str) -> Vec<String> {
    let mut found = Vec::new();
    for op in ["!== null", "!= null", "=== null", "== null", "is not none", "is none"] {
        let mut search = 0;
        while let Some(pos) = line[search..].find(op) {
            let at = search + pos;
            search = at + op.len();
            // `!= null` also matches inside `!== null`.
            if found.iter().any(|(start, end, _)| at >= *start && at < *end) {
                continue;
            }
            let lhs = line[..at].trim_end();
            let start = lhs
                .char_indices()
                .rev()
                .take_while(|(_, c)| is_word_char(*c) || *c == '.')
                .last()
                .map_or(lhs.len(), |(i, _)| i);
            let whole_start = start.min(at);
            found.push((at, at + op.len(), line[whole_start..at + op.len()].to_string()));
        }
    }
    found.into_iter().map(|(_, _, text)| text).collect()
}

/// `i++`, `--i` and the like.
fn increments(line: &str) -> Vec<String> {
    let mut found = Vec::new();
    for op in ["++", "--"] {
        for (at, _) in line.match_indices(op) {
            let before: String = line[..at]
                .chars()
                .rev()
                .take_while(|c| is_word_char(*c))
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect();
            if !before.is_empty() {
                found.push(format!("{before}{op}"));
                continue;
            }
            let after: String = line[at + op.len()..]
                .chars()
                .take_while(|c| is_word_char(*c))
                .collect();
            if !after.is_empty() {
                found.push(format!("{op}{after}"));
            }
        }
    }
    found
}

/// Branch conditions comparing with `==`.
fn comparisons(line: &str) -> Vec<String> {
    branch_condition(line)
        .filter(|c| {
            c.match_indices("==").any(|(at, _)| {
                let prev = c[..at].chars().last();
                !matches!(prev, Some('!' | '=' | '<' | '>'))
            })
        })
        .into_iter()
        .collect()
}
