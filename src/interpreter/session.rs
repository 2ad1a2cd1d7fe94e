use super::eval::Environment;
use crate::config::EngineConfig;
use crate::parser::Language;
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use std::time::{SystemTime, UNIX_EPOCH};

pub const ROOT_FRAME: &str = "main";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableBinding {
    pub name: String,
    pub type_tag: String,
    pub value: String,
    pub declared_line: usize,
    pub last_modified_line: usize,
    /// Every distinct value the variable has held, oldest first.
    pub history: Vec<String>,
}

impl VariableBinding {
    pub fn new(name: &str, type_tag: &str, value: String, line: usize) -> Self {
        Self {
            name: name.to_string(),
            type_tag: type_tag.to_string(),
            history: vec![value.clone()],
            value,
            declared_line: line,
            last_modified_line: line,
        }
    }

    /// Returns false (and records nothing) when the value is unchanged.
    pub fn update(&mut self, value: String, line: usize) -> bool {
        if value == self.value {
            return false;
        }
        self.history.push(value.clone());
        self.value = value;
        self.last_modified_line = line;
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StackFrame {
    pub method: String,
    pub line: usize,
    pub locals: BTreeMap<String, String>,
}

impl StackFrame {
    pub fn new(method: &str, line: usize) -> Self {
        Self {
            method: method.to_string(),
            line,
            locals: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionStep {
    pub line: usize,
    pub text: String,
    pub variables: BTreeMap<String, String>,
    /// Milliseconds since the UNIX epoch.
    pub timestamp: u64,
}

/// Captured program output, capped at a fixed number of characters.
#[derive(Debug, Clone)]
pub struct OutputBuffer {
    text: String,
    chars: usize,
    limit: usize,
    truncated: bool,
}

impl OutputBuffer {
    pub fn new(limit: usize) -> Self {
        Self {
            text: String::new(),
            chars: 0,
            limit,
            truncated: false,
        }
    }

    pub fn push_str(&mut self, s: &str) {
        for ch in s.chars() {
            if self.chars >= self.limit {
                self.truncated = true;
                return;
            }
            self.text.push(ch);
            self.chars += 1;
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.chars = 0;
        self.truncated = false;
    }
}

/// Interpreter state for one loaded snippet: variables, call stack, output
/// and the execution history.
#[derive(Debug, Clone)]
pub struct Session {
    language: Language,
    variables: BTreeMap<String, VariableBinding>,
    call_stack: Vec<StackFrame>,
    output: OutputBuffer,
    history: VecDeque<ExecutionStep>,
    history_limit: usize,
}

impl Session {
    pub fn new(language: Language, config: &EngineConfig) -> Self {
        Self {
            language,
            variables: BTreeMap::new(),
            call_stack: vec![StackFrame::new(ROOT_FRAME, 0)],
            output: OutputBuffer::new(config.max_output_chars),
            history: VecDeque::new(),
            history_limit: config.history_limit,
        }
    }

    /// Back to a freshly loaded state; language and limits are kept.
    pub fn reset(&mut self) {
        self.variables.clear();
        self.call_stack.clear();
        self.call_stack.push(StackFrame::new(ROOT_FRAME, 0));
        self.output.clear();
        self.history.clear();
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn variable(&self, name: &str) -> Option<&VariableBinding> {
        self.variables.get(name)
    }

    pub fn variables(&self) -> impl Iterator<Item = &VariableBinding> {
        self.variables.values()
    }

    /// Declaring an existing name replaces its binding.
    pub fn declare(&mut self, binding: VariableBinding) {
        self.variables.insert(binding.name.clone(), binding);
        self.sync_frame_locals();
    }

    /// Returns whether the stored value changed.
    pub fn assign(&mut self, name: &str, value: String, line: usize) -> bool {
        let changed = match self.variables.get_mut(name) {
            Some(binding) => binding.update(value, line),
            None => false,
        };
        if changed {
            self.sync_frame_locals();
        }
        changed
    }

    /// Name to current value, for snapshots.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.variables
            .iter()
            .map(|(name, binding)| (name.clone(), binding.value.clone()))
            .collect()
    }

    pub fn call_stack(&self) -> &[StackFrame] {
        &self.call_stack
    }

    pub fn push_frame(&mut self, method: &str, line: usize) {
        let mut frame = StackFrame::new(method, line);
        frame.locals = self.snapshot();
        self.call_stack.push(frame);
    }

    /// Never pops the root frame.
    pub fn pop_frame(&mut self) -> Option<StackFrame> {
        if self.call_stack.len() > 1 {
            self.call_stack.pop()
        } else {
            None
        }
    }

    // Frame locals mirror the global table in this model.
    fn sync_frame_locals(&mut self) {
        let snapshot = self.snapshot();
        if let Some(top) = self.call_stack.last_mut() {
            top.locals = snapshot;
        }
    }

    pub fn output(&self) -> &OutputBuffer {
        &self.output
    }

    pub fn write_output(&mut self, text: &str) {
        self.output.push_str(text);
    }

    pub fn history(&self) -> impl Iterator<Item = &ExecutionStep> {
        self.history.iter()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Append a snapshot of the current variables. The oldest entry is
    /// dropped once the history limit is reached.
    pub fn record_step(&mut self, line: usize, text: &str) {
        if self.history_limit == 0 {
            return;
        }
        if self.history.len() >= self.history_limit {
            self.history.pop_front();
        }
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        self.history.push_back(ExecutionStep {
            line,
            text: text.to_string(),
            variables: self.snapshot(),
            timestamp,
        });
    }
}

impl Environment for Session {
    fn lookup(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(|b| b.value.as_str())
    }
}
