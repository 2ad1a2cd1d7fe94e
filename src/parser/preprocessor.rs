use super::statements::classify;
use super::types::{Language, ParsedProgram, SourceLine};

/// Split raw code into 1-based source lines. `\r\n` endings are accepted.
pub fn split_source_lines(code: &str) -> Vec<SourceLine> {
    code.lines()
        .enumerate()
        .map(|(i, text)| SourceLine {
            number: i + 1,
            text: text.to_string(),
        })
        .collect()
}

/// Drop string-literal contents and comments, keeping the quote characters
/// so structure survives. Line comments are `#` in Python and `//`
/// elsewhere; an inline `/* */` becomes a space.
pub fn strip_literals(line: &str, language: Language) -> String {
    let mut in_block = false;
    strip_line(line, language, &mut in_block)
}

/// [`strip_literals`] for every line of `code`, with `/* */` comments
/// allowed to span lines.
pub fn strip_source<'a>(lines: impl IntoIterator<Item = &'a str>, language: Language) -> Vec<String> {
    let mut in_block = false;
    lines
        .into_iter()
        .map(|line| strip_line(line, language, &mut in_block))
        .collect()
}

fn strip_line(line: &str, language: Language, in_block: &mut bool) -> String {
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
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
                out.push(ch);
            }
            continue;
        }

        match ch {
            '"' | '\'' => {
                quote = Some(ch);
                out.push(ch);
            }
            '#' if language == Language::Python => break,
            '/' if language.uses_braces() && chars.peek() == Some(&'/') => break,
            '/' if language.uses_braces() && chars.peek() == Some(&'*') => {
                chars.next();
                *in_block = true;
            }
            _ => out.push(ch),
        }
    }

    out
}

/// Net `(`/`)` delta for a line, ignoring literals and comments.
pub fn paren_delta(line: &str, language: Language) -> i32 {
    delta_of(&strip_literals(line, language), '(', ')')
}

fn delta_of(stripped: &str, open: char, close: char) -> i32 {
    stripped.chars().fold(0, |delta, ch| {
        if ch == open {
            delta + 1
        } else if ch == close {
            delta - 1
        } else {
            delta
        }
    })
}

/// Leading indentation width; a tab counts as four columns.
pub fn indent_width(line: &str) -> usize {
    let mut width = 0;
    for ch in line.chars() {
        match ch {
            ' ' => width += 1,
            '\t' => width += 4,
            _ => break,
        }
    }
    width
}

/// Block depth at the start of each line, from the stripped text.
///
/// Brace languages count unclosed `{`; Python uses the indentation width of
/// the line itself (blank lines inherit the previous depth).
pub fn annotate_blocks(lines: &[SourceLine], stripped: &[String], language: Language) -> Vec<u16> {
    let mut depths = Vec::with_capacity(lines.len());

    if language.uses_braces() {
        let mut depth: i32 = 0;
        for text in stripped {
            depths.push(depth.max(0) as u16);
            depth += delta_of(text, '{', '}');
        }
    } else {
        let mut last = 0u16;
        for (line, text) in lines.iter().zip(stripped) {
            if !text.trim().is_empty() {
                last = indent_width(&line.text).min(u16::MAX as usize) as u16;
            }
            depths.push(last);
        }
    }

    depths
}

/// Full preprocessing pipeline: split, classify, strip, annotate.
pub fn preprocess(code: &str, language: Language) -> ParsedProgram {
    let lines = split_source_lines(code);
    let statements = lines
        .iter()
        .map(|line| classify(&line.text, language))
        .collect();
    let stripped = strip_source(lines.iter().map(|l| l.text.as_str()), language);
    let depths = annotate_blocks(&lines, &stripped, language);

    ParsedProgram {
        language,
        lines,
        statements,
        stripped,
        depths,
    }
}

#[cfg(test)]
mod preprocessor_tests {
    use super::*;

    #[test]
    fn test_comment_markers_follow_language() {
        assert_eq!(strip_literals("while n // 10 > 0:", Language::Python), "while n // 10 > 0:");
        assert_eq!(strip_literals("x = 1  # note:", Language::Python), "x = 1  ");
        assert_eq!(strip_literals("int x = 1; // (", Language::Java), "int x = 1; ");
        assert_eq!(strip_literals("String s = \"#{\";", Language::Java), "String s = \"\";");
    }

    #[test]
    fn test_block_comment_spans_lines() {
        let stripped = strip_source(["a /* (", "{ */ b", "c"], Language::Java);
        assert_eq!(stripped, vec!["a ", "  b", "c"]);
    }
}
