use serde::{Serialize, Serializer};
use thiserror::Error;

/// Why a batch run did not succeed.
///
/// Syntax and timeout errors stop a run; the out-of-bounds and infinite-loop
/// variants are heuristic flags raised after a normal run and are advisory.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecError {
    #[error("{0}")]
    Syntax(String),
    #[error("Execution timeout (>{ms} ms). Possible infinite loop?")]
    Timeout { ms: u64 },
    #[error("Runtime error at line {line}: {message}")]
    Runtime { line: usize, message: String },
    #[error("ArrayIndexOutOfBoundsException: Index {index} out of bounds for length {length} (line {line})")]
    OutOfBounds {
        array: String,
        index: usize,
        length: usize,
        line: usize,
    },
    #[error("Potential infinite loop detected at line {line}!")]
    InfiniteLoop { line: usize },
    #[error("{0}")]
    Script(String),
    #[error("script bridge unavailable: {0}")]
    Bridge(String),
    #[error("batch worker is no longer running")]
    WorkerGone,
}

// The wire format carries errors as display strings.
impl Serialize for ExecError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A recognized statement that could not be applied to the session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatementError {
    #[error("missing value in assignment to `{name}`")]
    MissingValue { name: String },
    #[error("integer overflow updating `{name}`")]
    Overflow { name: String },
}
