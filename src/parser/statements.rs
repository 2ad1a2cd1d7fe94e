use super::preprocessor::paren_delta;
use super::types::{Language, Statement};

type Matcher = fn(&str, Language) -> Option<Statement>;

/// Statement shapes in priority order. The first matcher that accepts a
/// line decides its statement; a line no matcher accepts is `Unrecognized`.
const SHAPES: &[Matcher] = &[
    match_comment,
    match_declaration,
    match_assignment,
    match_step,
    match_print,
    match_return,
    match_call,
];

const JAVA_TYPES: &[&str] = &[
    "int", "long", "short", "byte", "double", "float", "boolean", "char", "String", "Integer",
    "Long", "Double", "Float", "Boolean", "Character",
];

const SCRIPT_DECLARATORS: &[&str] = &["let", "const", "var"];

const MODIFIERS: &[&str] = &["final", "static"];

const KEYWORDS: &[&str] = &[
    "if",
    "else",
    "for",
    "while",
    "do",
    "switch",
    "case",
    "catch",
    "try",
    "return",
    "new",
    "synchronized",
    "function",
    "def",
    "class",
    "elif",
];

/// Classify one source line.
pub fn classify(line: &str, language: Language) -> Statement {
    SHAPES
        .iter()
        .find_map(|matcher| matcher(line, language))
        .unwrap_or(Statement::Unrecognized)
}

pub fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(&word)
}

/// Default value bound by a declaration without an initializer.
pub fn default_value(type_tag: &str) -> &'static str {
    if type_tag.ends_with("[]") {
        return "null";
    }
    match type_tag {
        "int" | "long" | "short" | "byte" | "Integer" | "Long" => "0",
        "double" | "float" | "Double" | "Float" => "0.0",
        "boolean" | "Boolean" => "false",
        "char" | "Character" => "''",
        "let" | "const" | "var" => "undefined",
        _ => "null",
    }
}

/// Split on `sep` where it appears outside quotes and brackets.
pub fn split_top_level(text: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;

    for (i, ch) in text.char_indices() {
        if let Some(q) = quote {
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
            '"' | '\'' => quote = Some(ch),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            c if c == sep && depth == 0 => {
                parts.push(&text[start..i]);
                start = i + ch.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

/// Split `lhs = rhs` at the first plain or compound `=` outside quotes.
/// Comparisons (`==`, `!=`, `<=`, `>=`) are not assignments.
pub fn split_assignment(text: &str) -> Option<(&str, &str)> {
    let mut quote: Option<char> = None;
    let mut prev: Option<char> = None;
    let mut iter = text.char_indices().peekable();

    while let Some((i, ch)) = iter.next() {
        if let Some(q) = quote {
            if ch == q && prev != Some('\\') {
                quote = None;
            }
            prev = Some(ch);
            continue;
        }
        match ch {
            '"' | '\'' => quote = Some(ch),
            '=' => {
                let next = iter.peek().map(|(_, c)| *c);
                if next == Some('=') || matches!(prev, Some('=' | '!' | '<' | '>')) {
                    return None;
                }
                return Some((&text[..i], &text[i + 1..]));
            }
            _ => {}
        }
        prev = Some(ch);
    }
    None
}

/// The statement text without its terminator, when the line is terminated
/// the way the language requires.
fn statement_body(line: &str, language: Language) -> Option<&str> {
    let trimmed = line.trim();
    if let Some(body) = trimmed.strip_suffix(';') {
        Some(body.trim_end())
    } else if language.requires_semicolon() {
        None
    } else {
        Some(trimmed)
    }
}

fn is_type_tag(word: &str, language: Language) -> bool {
    match language {
        Language::Java => {
            let mut base = word;
            while let Some(stripped) = base.strip_suffix("[]") {
                base = stripped;
            }
            JAVA_TYPES.contains(&base)
        }
        Language::JavaScript => SCRIPT_DECLARATORS.contains(&word),
        Language::Python => false,
    }
}

fn match_comment(line: &str, language: Language) -> Option<Statement> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Some(Statement::Blank);
    }
    let is_comment = match language {
        Language::Python => trimmed.starts_with('#'),
        _ => trimmed.starts_with("//") || trimmed.starts_with("/*") || trimmed.starts_with('*'),
    };
    is_comment.then_some(Statement::Comment)
}

fn match_declaration(line: &str, language: Language) -> Option<Statement> {
    let mut body = statement_body(line, language)?;
    loop {
        let (first, rest) = body.split_once(char::is_whitespace)?;
        if MODIFIERS.contains(&first) {
            body = rest.trim_start();
            continue;
        }
        if !is_type_tag(first, language) {
            return None;
        }
        let rest = rest.trim();

        if let Some((name, init)) = split_assignment(rest) {
            let name = name.trim();
            if !is_identifier(name) {
                return None;
            }
            return Some(Statement::Declare {
                type_tag: first.to_string(),
                name: name.to_string(),
                init: init.trim().to_string(),
            });
        }

        if is_identifier(rest) {
            return Some(Statement::DeclareDefault {
                type_tag: first.to_string(),
                name: rest.to_string(),
            });
        }
        return None;
    }
}

fn match_assignment(line: &str, language: Language) -> Option<Statement> {
    let body = statement_body(line, language)?;
    let (lhs, rhs) = split_assignment(body)?;
    let mut lhs = lhs.trim_end();
    let mut op = None;

    if let Some(last) = lhs.chars().last() {
        match last {
            '+' | '-' => {
                op = Some(last);
                lhs = lhs[..lhs.len() - 1].trim_end();
            }
            '*' | '/' | '%' | '&' | '|' | '^' => return None,
            _ => {}
        }
    }

    let name = lhs.trim();
    if !is_identifier(name) || is_keyword(name) {
        return None;
    }
    Some(Statement::Assign {
        name: name.to_string(),
        op,
        expr: rhs.trim().to_string(),
    })
}

fn match_step(line: &str, language: Language) -> Option<Statement> {
    let body = statement_body(line, language)?;
    let (name, delta) = if let Some(name) = body.strip_suffix("++") {
        (name, 1)
    } else if let Some(name) = body.strip_suffix("--") {
        (name, -1)
    } else if let Some(name) = body.strip_prefix("++") {
        (name, 1)
    } else if let Some(name) = body.strip_prefix("--") {
        (name, -1)
    } else {
        return None;
    };

    let name = name.trim();
    is_identifier(name).then(|| Statement::Step {
        name: name.to_string(),
        delta,
    })
}

fn match_print(line: &str, language: Language) -> Option<Statement> {
    let body = statement_body(line, language)?;
    let prefixes: &[(&str, bool)] = match language {
        Language::Java => &[("System.out.println(", true), ("System.out.print(", false)],
        Language::Python => &[("print(", true)],
        Language::JavaScript => &[("console.log(", true)],
    };

    for (prefix, newline) in prefixes {
        let Some(rest) = body.strip_prefix(prefix) else {
            continue;
        };
        let inner = rest.strip_suffix(')')?;
        if paren_delta(inner, language) != 0 {
            return None;
        }
        let inner = inner.trim();

        let args = if inner.is_empty() {
            Vec::new()
        } else if language == Language::Java {
            vec![inner.to_string()]
        } else {
            split_top_level(inner, ',')
                .into_iter()
                .map(|arg| arg.trim().to_string())
                .collect()
        };
        return Some(Statement::Print {
            args,
            newline: *newline,
        });
    }
    None
}

fn match_return(line: &str, language: Language) -> Option<Statement> {
    let body = statement_body(line, language)?;
    let is_return = body == "return"
        || body.starts_with("return ")
        || body.starts_with("return(")
        || body.starts_with("return\"");
    is_return.then_some(Statement::Return)
}

fn match_call(line: &str, language: Language) -> Option<Statement> {
    let body = statement_body(line, language)?;
    if !body.ends_with(')') || paren_delta(body, language) != 0 {
        return None;
    }
    let open = body.find('(')?;
    let head = body[..open].trim();
    if head.starts_with("System.") || head.starts_with("console.") {
        return None;
    }
    let segments: Vec<&str> = head.split('.').map(str::trim).collect();

    if segments.iter().any(|s| !is_identifier(s)) || is_keyword(segments[0]) {
        return None;
    }
    let method = segments.last()?;
    Some(Statement::Call {
        method: method.to_string(),
    })
}
