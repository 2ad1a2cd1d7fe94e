use serde::{Deserialize, Serialize};

/// Source dialect of a snippet. Selects comment syntax, declaration forms,
/// the read-input placeholder and whether a run goes through the script
/// bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Java,
    Python,
    JavaScript,
}

impl Language {
    /// Unknown tags fall back to Java.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_lowercase().as_str() {
            "javascript" | "js" => Language::JavaScript,
            "python" | "py" => Language::Python,
            _ => Language::Java,
        }
    }

    /// JavaScript runs on the embedded script engine instead of locally.
    pub fn is_script_sandboxed(self) -> bool {
        self == Language::JavaScript
    }

    pub fn uses_braces(self) -> bool {
        self != Language::Python
    }

    /// Statement terminator required by the statement shapes.
    pub fn requires_semicolon(self) -> bool {
        self == Language::Java
    }

    /// Calls replaced by a test case's input before a test run.
    pub fn input_placeholders(self) -> &'static [&'static str] {
        match self {
            Language::Java => &[
                "scanner.nextLine()",
                "scanner.nextInt()",
                "scanner.next()",
            ],
            Language::Python => &["input()"],
            Language::JavaScript => &["prompt()"],
        }
    }
}

/// One physical line of a loaded snippet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceLine {
    /// 1-based.
    pub number: usize,
    pub text: String,
}

/// Recognized statement shapes, in classifier priority order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Blank,
    Comment,
    /// `int x = expr;`, `String[] a = expr;`, `let x = expr;`
    Declare {
        type_tag: String,
        name: String,
        init: String,
    },
    /// `int x;` - bound to the type's default value.
    DeclareDefault { type_tag: String, name: String },
    /// `x = expr;`, or `x += expr;` with `op` set.
    Assign {
        name: String,
        op: Option<char>,
        expr: String,
    },
    /// `x++`, `++x`, `x--`, `--x`
    Step { name: String, delta: i64 },
    Print { args: Vec<String>, newline: bool },
    Return,
    Call { method: String },
    Unrecognized,
}

/// Lines of a snippet with their classification and block depth.
///
/// Built once per run; the interpreter and the post-hoc heuristic passes
/// all read from the same program.
#[derive(Debug, Clone)]
pub struct ParsedProgram {
    pub language: Language,
    pub lines: Vec<SourceLine>,
    pub statements: Vec<Statement>,
    /// Line text with literal contents and comments removed.
    pub stripped: Vec<String>,
    /// Brace nesting (or indentation width for Python) at the start of
    /// each line.
    pub depths: Vec<u16>,
}

impl ParsedProgram {
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
