use serde::Serialize;
use std::fmt;

/// Code reduced to a canonical form: no comments, no blank lines, single
/// spaces, lower case, one statement line per `\n`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct NormalizedCode(String);

impl NormalizedCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.0.lines()
    }
}

impl fmt::Display for NormalizedCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NormalizedCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Strip comments and blank lines, collapse whitespace, lower-case.
/// `normalize(normalize(x)) == normalize(x)`.
pub fn normalize(code: &str) -> NormalizedCode {
    let mut lines = Vec::new();
    let mut in_block = false;

    for raw in code.lines() {
        let stripped = strip_comments(raw, &mut in_block);
        let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
        if !collapsed.is_empty() {
            lines.push(collapsed.to_lowercase());
        }
    }

    NormalizedCode(lines.join("\n"))
}

/// Remove `//`, `#` and `/* */` comments outside string literals. A block
/// comment becomes a single space so the tokens around it stay apart.
fn strip_comments(line: &str, in_block: &mut bool) -> String {
    let mut out = String::with_capacity(line.len());
    let mut chars = line.chars().peekable();
    let mut quote: Option<char> = None;
    let mut escaped = false;

    while let Some(ch) = chars.next() {
        if *in_block {
            if ch == '*' && chars.peek() == Some(&'/') {
                chars.next();
                *in_block = false;
                out.push(' ');
            }
            continue;
        }
        if let Some(q) = quote {
            out.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' => {
                quote = Some(ch);
                out.push(ch);
            }
            '#' => break,
            '/' if chars.peek() == Some(&'/') => break,
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                *in_block = true;
            }
            _ => out.push(ch),
        }
    }
    out
}

/// Normalized code with the scaffolding around a fix removed: package and
/// import lines, class and method headers, and lines holding only closing
/// braces.
pub fn extract_core_fix(code: &str) -> String {
    normalize(code)
        .lines()
        .filter(|line| !is_scaffolding(line))
        .collect::<Vec<_>>()
        .join("\n")
}

const CONTROL_HEADS: &[&str] = &[
    "if", "else", "for", "while", "do", "switch", "catch", "try", "synchronized", "elif",
    "with", "finally", "return",
];

fn is_scaffolding(line: &str) -> bool {
    if line.chars().all(|c| matches!(c, '}' | ')' | ';' | ' ')) {
        return true;
    }
    let first = line.split([' ', '(']).next().unwrap_or("");

    if matches!(first, "import" | "package" | "using" | "from") {
        return true;
    }
    if line.starts_with("def ") && line.ends_with(':') {
        return true;
    }
    if (line.starts_with("class ") || line.contains(" class ")) && !line.contains('=') {
        return true;
    }
    if line.starts_with("function ") && line.ends_with('{') {
        return true;
    }
    is_method_header(line, first)
}

/// `public static int sum(int a, int b) {` and the like.
fn is_method_header(line: &str, first: &str) -> bool {
    if CONTROL_HEADS.contains(&first) || line.contains('=') {
        return false;
    }
    let Some(body) = line.strip_suffix('{') else {
        return false;
    };
    let body = body.trim_end();
    let Some(open) = body.find('(') else {
        return false;
    };
    // Needs at least a return type and a name before the parameter list.
    body.ends_with(')') && body[..open].split_whitespace().count() >= 2
}

#[cfg(test)]
mod normalize_tests {
    use super::*;

    #[test]
    fn test_block_comment_keeps_tokens_apart() {
        assert_eq!(normalize("a/**/b").as_str(), "a b");
    }

    #[test]
    fn test_comment_markers_inside_strings_survive() {
        assert_eq!(
            normalize("String s = \"http://x\"; // trailing").as_str(),
            "string s = \"http://x\";"
        );
    }

    #[test]
    fn test_method_header_is_scaffolding() {
        assert!(is_scaffolding("public static int sum(int a, int b) {"));
        assert!(!is_scaffolding("if (a > b) {"));
        assert!(!is_scaffolding("foo(a) {"));
    }
}
