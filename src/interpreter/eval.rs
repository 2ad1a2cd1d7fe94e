//! Expression evaluation over string-encoded values.
//!
//! Unknown syntax is never an error: anything the evaluator does not
//! recognize comes back verbatim.

use std::collections::{BTreeMap, HashMap};

/// Name lookup used by [`evaluate`].
pub trait Environment {
    fn lookup(&self, name: &str) -> Option<&str>;
}

impl Environment for HashMap<String, String> {
    fn lookup(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

impl Environment for BTreeMap<String, String> {
    fn lookup(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

/// An environment with no bindings.
pub struct EmptyEnv;

impl Environment for EmptyEnv {
    fn lookup(&self, _name: &str) -> Option<&str> {
        None
    }
}

/// Evaluate an expression to its string value.
///
/// Tried in order: string literal, number, boolean, variable, parenthesized
/// expression, `+` concatenation or `+`/`-` arithmetic chain. Anything else
/// is returned as written.
pub fn evaluate<E: Environment + ?Sized>(expression: &str, env: &E) -> String {
    let expr = expression.trim();

    if let Some(text) = string_literal(expr) {
        return text;
    }
    if is_numeric(expr) || expr == "true" || expr == "false" {
        return expr.to_string();
    }
    if let Some(value) = env.lookup(expr) {
        return value.to_string();
    }
    if let Some(inner) = strip_outer_parens(expr) {
        return evaluate(inner, env);
    }
    if let Some(value) = evaluate_chain(expr, env) {
        return value;
    }

    expr.to_string()
}

/// `-?\d+(\.\d+)?`
pub fn is_numeric(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    let (int_part, frac_part) = match digits.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (digits, None),
    };
    let all_digits = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
    all_digits(int_part) && frac_part.map_or(true, all_digits)
}

/// Render a floating result the way the snippet languages print doubles:
/// always with a fractional part.
pub fn format_decimal(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// Contents of a single quoted literal, with simple escapes resolved.
fn string_literal(expr: &str) -> Option<String> {
    let quote = expr.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    if expr.len() < 2 || !expr.ends_with(quote) {
        return None;
    }

    let inner = &expr[1..expr.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => return None,
            },
            c if c == quote => return None,
            c => out.push(c),
        }
    }
    Some(out)
}

/// `(expr)` where the outer parentheses enclose the whole expression.
fn strip_outer_parens(expr: &str) -> Option<&str> {
    let inner = expr.strip_prefix('(')?.strip_suffix(')')?;
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    for ch in inner.chars() {
        if let Some(q) = quote {
            if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' => quote = Some(ch),
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return None;
                }
            }
            _ => {}
        }
    }
    (depth == 0).then_some(inner)
}

/// Split into operands joined by binary `+`/`-` outside quotes and
/// parentheses. A sign with no operand before it belongs to the operand.
fn split_terms(expr: &str) -> Option<Vec<(char, &str)>> {
    let mut terms = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut op = '+';
    let mut start = 0;

    for (i, ch) in expr.char_indices() {
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
            '(' => depth += 1,
            ')' => depth -= 1,
            '+' | '-' if depth == 0 => {
                let operand = expr[start..i].trim();
                if operand.is_empty() {
                    if ch == '-' {
                        continue;
                    }
                    return None;
                }
                terms.push((op, operand));
                op = ch;
                start = i + 1;
            }
            _ => {}
        }
    }

    if terms.is_empty() {
        return None;
    }
    let last = expr[start..].trim();
    if last.is_empty() {
        return None;
    }
    terms.push((op, last));
    Some(terms)
}

enum Number {
    Int(i64),
    Float(f64),
}

fn parse_number(text: &str) -> Option<Number> {
    if !is_numeric(text) {
        return None;
    }
    match text.parse::<i64>() {
        Ok(n) => Some(Number::Int(n)),
        Err(_) => text.parse::<f64>().ok().map(Number::Float),
    }
}

fn evaluate_chain<E: Environment + ?Sized>(expr: &str, env: &E) -> Option<String> {
    let terms = split_terms(expr)?;
    let values: Vec<(char, String)> = terms
        .iter()
        .map(|(op, operand)| (*op, evaluate(operand, env)))
        .collect();

    let numbers: Option<Vec<(char, Number)>> = values
        .iter()
        .map(|(op, value)| parse_number(value).map(|n| (*op, n)))
        .collect();

    if let Some(numbers) = numbers {
        return Some(fold_numbers(&numbers));
    }

    // Text only concatenates; a `-` over text is left as written.
    if values.iter().all(|(op, _)| *op == '+') {
        return Some(values.into_iter().map(|(_, value)| value).collect());
    }
    None
}

fn fold_numbers(numbers: &[(char, Number)]) -> String {
    let mut int_total: Option<i64> = Some(0);
    let mut float_total = 0.0f64;
    let mut any_float = false;

    for (op, number) in numbers {
        let (as_float, as_int) = match number {
            Number::Int(n) => (*n as f64, Some(*n)),
            Number::Float(f) => {
                any_float = true;
                (*f, None)
            }
        };
        if *op == '-' {
            float_total -= as_float;
            int_total = int_total.zip(as_int).and_then(|(t, n)| t.checked_sub(n));
        } else {
            float_total += as_float;
            int_total = int_total.zip(as_int).and_then(|(t, n)| t.checked_add(n));
        }
    }

    match int_total {
        Some(total) if !any_float => total.to_string(),
        _ => format_decimal(float_total),
    }
}
