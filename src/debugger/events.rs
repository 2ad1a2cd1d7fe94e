use crate::interpreter::{StackFrame, VariableBinding};
use serde_json::{json, Value};

/// Notifications emitted while the stepper executes. Lines are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebugEvent {
    LineExecuted { line: usize, text: String },
    BreakpointHit { line: usize },
    VariableChanged { binding: VariableBinding },
    Output { text: String },
    Error { line: usize, message: String },
    ExecutionComplete,
    CallStackUpdated { frames: Vec<StackFrame> },
}

impl DebugEvent {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            DebugEvent::LineExecuted { .. } => "lineExecuted",
            DebugEvent::BreakpointHit { .. } => "breakpointHit",
            DebugEvent::VariableChanged { .. } => "variableChanged",
            DebugEvent::Output { .. } => "output",
            DebugEvent::Error { .. } => "error",
            DebugEvent::ExecutionComplete => "executionComplete",
            DebugEvent::CallStackUpdated { .. } => "callStackUpdated",
        }
    }

    pub fn body(&self) -> Value {
        match self {
            DebugEvent::LineExecuted { line, text } => json!({ "line": line, "text": text }),
            DebugEvent::BreakpointHit { line } => json!({ "line": line }),
            DebugEvent::VariableChanged { binding } => json!(binding),
            DebugEvent::Output { text } => json!({ "text": text }),
            DebugEvent::Error { line, message } => json!({ "line": line, "message": message }),
            DebugEvent::ExecutionComplete => json!({}),
            DebugEvent::CallStackUpdated { frames } => json!({ "frames": frames }),
        }
    }
}
