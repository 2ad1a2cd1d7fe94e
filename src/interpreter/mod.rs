mod classifier;
mod eval;
mod session;

pub use classifier::{apply, classify_and_apply, Effect};
pub use eval::{evaluate, format_decimal, is_numeric, EmptyEnv, Environment};
pub use session::{
    ExecutionStep, OutputBuffer, Session, StackFrame, VariableBinding, ROOT_FRAME,
};
