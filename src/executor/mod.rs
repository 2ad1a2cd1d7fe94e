mod heuristics;
mod runner;
mod sandbox;
mod syntax;
mod worker;

pub use heuristics::{find_infinite_loop, find_out_of_bounds, HeuristicChecks};
pub use runner::{
    inject_input, BatchEngine, ExecutionRequest, ExecutionResult, TestCase, TestCaseResult,
};
pub use sandbox::{LineScriptEngine, ScriptBridge, ScriptEngine, ScriptReply};
pub use syntax::check_syntax;
pub use worker::BatchWorker;
