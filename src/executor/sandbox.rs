//! Script bridge: JavaScript runs on a separate engine actor reached over
//! channels, one request in flight at a time.
//!
//! Replies travel as JSON payloads tagged with the request id. A caller
//! that gives up on a request abandons its id; a reply that arrives later
//! carries a stale id and is dropped.

use super::runner::interpret;
use super::syntax::check_syntax;
use crate::config::EngineConfig;
use crate::error::ExecError;
use crate::parser::{preprocess, Language};
use serde::{Deserialize, Serialize};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Result of one script evaluation, as the engine reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptReply {
    pub success: bool,
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScriptReply {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: String::new(),
            error: Some(error.into()),
        }
    }
}

/// An embedded script engine. Runs on its own thread behind a
/// [`ScriptBridge`]; it may block for as long as the script takes.
pub trait ScriptEngine: Send + 'static {
    fn evaluate(&mut self, script: &str) -> ScriptReply;
}

impl ScriptEngine for Box<dyn ScriptEngine> {
    fn evaluate(&mut self, script: &str) -> ScriptReply {
        (**self).evaluate(script)
    }
}

/// Built-in engine: the line interpreter with the JavaScript dialect.
#[derive(Debug, Clone, Default)]
pub struct LineScriptEngine {
    config: EngineConfig,
}

impl LineScriptEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }
}

impl ScriptEngine for LineScriptEngine {
    fn evaluate(&mut self, script: &str) -> ScriptReply {
        if let Err(e) = check_syntax(script, Language::JavaScript) {
            return ScriptReply::failed(e.to_string());
        }
        let program = preprocess(script, Language::JavaScript);
        match interpret(&program, &self.config, None) {
            Ok(output) => ScriptReply::ok(output),
            Err(e) => ScriptReply::failed(e.to_string()),
        }
    }
}

struct ScriptRequest {
    id: u64,
    script: String,
}

/// Caller side of the engine actor.
pub struct ScriptBridge {
    requests: Sender<ScriptRequest>,
    replies: Receiver<(u64, String)>,
    next_id: u64,
}

impl ScriptBridge {
    /// Start the actor thread that owns `engine`.
    pub fn spawn<E: ScriptEngine>(mut engine: E) -> Result<Self, ExecError> {
        let (request_tx, request_rx) = mpsc::channel::<ScriptRequest>();
        let (reply_tx, reply_rx) = mpsc::channel();

        thread::Builder::new()
            .name("script-engine".to_string())
            .spawn(move || {
                for request in request_rx {
                    let reply = engine.evaluate(&request.script);
                    let payload = serde_json::to_string(&reply).unwrap_or_default();
                    if reply_tx.send((request.id, payload)).is_err() {
                        break;
                    }
                }
                debug!("script engine actor stopped");
            })
            .map_err(|e| ExecError::Bridge(e.to_string()))?;

        Ok(Self {
            requests: request_tx,
            replies: reply_rx,
            next_id: 0,
        })
    }

    /// Send `script` and wait up to `timeout` for its reply.
    pub fn run(&mut self, script: &str, timeout: Duration) -> Result<ScriptReply, ExecError> {
        self.next_id += 1;
        let id = self.next_id;
        debug!(id, bytes = script.len(), "script request");

        self.requests
            .send(ScriptRequest {
                id,
                script: script.to_string(),
            })
            .map_err(|_| ExecError::Bridge("script engine stopped".to_string()))?;

        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.replies.recv_timeout(remaining) {
                Ok((reply_id, payload)) if reply_id == id => {
                    return serde_json::from_str(&payload)
                        .map_err(|e| ExecError::Bridge(format!("malformed reply: {e}")));
                }
                Ok((stale, _)) => {
                    debug!(stale, "discarding reply to abandoned request");
                }
                Err(RecvTimeoutError::Timeout) => {
                    let ms = timeout.as_millis() as u64;
                    warn!(id, ms, "script request timed out");
                    return Err(ExecError::Timeout { ms });
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(ExecError::Bridge("script engine stopped".to_string()));
                }
            }
        }
    }
}

#[cfg(test)]
mod sandbox_tests {
    use super::*;

    struct Stalling;

    impl ScriptEngine for Stalling {
        fn evaluate(&mut self, script: &str) -> ScriptReply {
            thread::sleep(Duration::from_millis(150));
            ScriptReply::ok(script)
        }
    }

    #[test]
    fn test_late_reply_is_discarded() {
        let mut bridge = ScriptBridge::spawn(Stalling).unwrap();
        let first = bridge.run("first", Duration::from_millis(20));
        assert_eq!(first, Err(ExecError::Timeout { ms: 20 }));

        let second = bridge.run("second", Duration::from_secs(2)).unwrap();
        assert_eq!(second.output, "second", "stale reply must not be returned");
    }

    #[test]
    fn test_line_engine_reports_output() {
        let mut engine = LineScriptEngine::default();
        let reply = engine.evaluate("let a = 2;\nconsole.log(a + 3);");
        assert_eq!(reply, ScriptReply::ok("5"));
    }
}
