//! Line-oriented snippet interpreter, interactive stepper and fix validator
//! for a fix-the-bug teaching app.
//!
//! The batch engine (`executor`) and the stepper (`debugger`) share the
//! statement classifier in `parser` and the session/evaluator in
//! `interpreter`. The `validator` decides whether an edited snippet counts
//! as the reference fix. `host` exposes all of it over a framed JSON
//! protocol.

pub mod config;
pub mod console;
pub mod debugger;
pub mod error;
pub mod executor;
pub mod host;
pub mod interpreter;
pub mod parser;
pub mod validator;

pub use config::EngineConfig;
pub use error::{ExecError, StatementError};
