use super::protocol::{read_frame, write_message, HostMessage, HostMessageContent};
use crate::config::EngineConfig;
use crate::debugger::{DebugEvent, Stepper};
use crate::executor::{BatchEngine, BatchWorker, ExecutionRequest};
use crate::parser::Language;
use crate::validator::{validate, ValidationRequest};
use serde_json::{json, Value};
use std::io::{self, BufRead, Write};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

const COMMANDS: &[&str] = &[
    "initialize",
    "configure",
    "execute",
    "validate",
    "load",
    "toggleBreakpoint",
    "clearBreakpoints",
    "stepOver",
    "stepInto",
    "stepOut",
    "continue",
    "runToLine",
    "stop",
    "restart",
    "variables",
    "stackTrace",
    "history",
    "disconnect",
];

/// Outgoing side, shared with the batch worker so `execute` can be
/// answered from its thread.
struct Outbox<W> {
    seq: u64,
    writer: W,
}

impl<W: Write> Outbox<W> {
    fn send(&mut self, msg_type: &str, content: HostMessageContent) -> io::Result<()> {
        self.seq += 1;
        let message = HostMessage {
            seq: self.seq,
            msg_type: msg_type.to_string(),
            content,
        };
        write_message(&mut self.writer, &message)?;
        debug!(seq = self.seq, msg_type, "sent");
        Ok(())
    }
}

type SharedOutbox<W> = Arc<Mutex<Outbox<W>>>;

fn send_response<W: Write>(
    outbox: &SharedOutbox<W>,
    request_seq: u64,
    command: &str,
    result: Result<Value, String>,
) -> io::Result<()> {
    let (success, message, body) = match result {
        Ok(body) => (true, None, Some(body)),
        Err(message) => (false, Some(message), None),
    };
    let content = HostMessageContent::Response {
        request_seq,
        success,
        command: command.to_string(),
        message,
        body,
    };
    outbox
        .lock()
        .map_err(|_| io::Error::new(io::ErrorKind::Other, "outbox poisoned"))?
        .send("response", content)
}

/// Serves the framed JSON protocol: one stepper session plus a batch
/// worker, over any reader/writer pair.
pub struct HostServer<R, W> {
    reader: R,
    outbox: SharedOutbox<W>,
    config: EngineConfig,
    stepper: Stepper,
    events: Receiver<DebugEvent>,
    worker: BatchWorker,
}

impl<R, W> HostServer<R, W>
where
    R: BufRead,
    W: Write + Send + 'static,
{
    pub fn new(reader: R, writer: W, config: EngineConfig) -> io::Result<Self> {
        let worker = BatchWorker::spawn(BatchEngine::new(config.clone()))
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        let mut stepper = Stepper::new(config.clone());
        let events = stepper.subscribe();
        Ok(Self {
            reader,
            outbox: Arc::new(Mutex::new(Outbox { seq: 0, writer })),
            config,
            stepper,
            events,
            worker,
        })
    }

    /// Serve requests until `disconnect` or end of input.
    pub fn run(&mut self) -> io::Result<()> {
        info!("host server ready");
        while let Some(frame) = read_frame(&mut self.reader)? {
            let message: HostMessage = match serde_json::from_slice(&frame) {
                Ok(message) => message,
                Err(e) => {
                    warn!(error = %e, "dropping malformed message");
                    continue;
                }
            };
            let HostMessageContent::Request { command, arguments } = message.content else {
                debug!(seq = message.seq, "ignoring non-request message");
                continue;
            };

            debug!(seq = message.seq, %command, "request");
            let keep_going = self.dispatch(message.seq, &command, arguments.unwrap_or(Value::Null))?;
            self.flush_events()?;
            if !keep_going {
                break;
            }
        }
        self.worker.shutdown();
        info!("host server stopped");
        Ok(())
    }

    fn dispatch(&mut self, seq: u64, command: &str, args: Value) -> io::Result<bool> {
        let result = match command {
            "initialize" => {
                send_response(&self.outbox, seq, command, Ok(json!({ "commands": COMMANDS })))?;
                self.send_event("initialized", None)?;
                return Ok(true);
            }
            "configure" => self.configure(&args),
            "execute" => return self.execute(seq, args).map(|_| true),
            "validate" => serde_json::from_value::<ValidationRequest>(args)
                .map_err(|e| e.to_string())
                .map(|request| {
                    let verdict = validate(&request);
                    let mut body = json!(verdict);
                    body["message"] = json!(verdict.message());
                    body
                }),
            "load" => self.load(&args),
            "toggleBreakpoint" => line_arg(&args).map(|line| {
                let enabled = self.stepper.toggle_breakpoint(line);
                let lines: Vec<usize> = self.stepper.breakpoints().iter().collect();
                json!({ "line": line, "enabled": enabled, "breakpoints": lines })
            }),
            "clearBreakpoints" => {
                self.stepper.clear_breakpoints();
                Ok(json!({}))
            }
            "stepOver" => Ok(self.after_step(Stepper::step_over)),
            "stepInto" => Ok(self.after_step(Stepper::step_into)),
            "stepOut" => Ok(self.after_step(Stepper::step_out)),
            "continue" => Ok(self.after_step(Stepper::continue_execution)),
            "runToLine" => line_arg(&args)
                .map(|line| self.after_step(|stepper| stepper.run_to_line(line))),
            "stop" => Ok(self.after_step(Stepper::stop)),
            "restart" => Ok(self.after_step(Stepper::restart)),
            "variables" => {
                let variables: Vec<_> = self.stepper.variables().collect();
                Ok(json!({ "variables": variables }))
            }
            "stackTrace" => Ok(json!({ "frames": self.stepper.call_stack() })),
            "history" => {
                let steps: Vec<_> = self.stepper.history().collect();
                Ok(json!({ "steps": steps }))
            }
            "disconnect" => {
                send_response(&self.outbox, seq, command, Ok(json!({})))?;
                return Ok(false);
            }
            other => Err(format!("unknown command: {other}")),
        };

        send_response(&self.outbox, seq, command, result)?;
        Ok(true)
    }

    fn configure(&mut self, args: &Value) -> Result<Value, String> {
        let mut config = self.config.clone();
        config.merge_json(args).map_err(|e| e.to_string())?;
        self.worker
            .configure(config.clone())
            .map_err(|e| e.to_string())?;
        self.stepper.set_config(config.clone());
        info!(?config, "configuration updated");
        self.config = config;
        Ok(json!(self.config))
    }

    /// Answered from the worker thread once the run finishes.
    fn execute(&mut self, seq: u64, args: Value) -> io::Result<()> {
        let request: ExecutionRequest = match serde_json::from_value(args) {
            Ok(request) => request,
            Err(e) => return send_response(&self.outbox, seq, "execute", Err(e.to_string())),
        };

        let outbox = Arc::clone(&self.outbox);
        let submitted = self.worker.submit(request, move |result| {
            if let Err(e) = send_response(&outbox, seq, "execute", Ok(json!(result))) {
                warn!(error = %e, "failed to deliver execute response");
            }
        });
        if let Err(e) = submitted {
            send_response(&self.outbox, seq, "execute", Err(e.to_string()))?;
        }
        Ok(())
    }

    fn load(&mut self, args: &Value) -> Result<Value, String> {
        let code = args
            .get("code")
            .and_then(Value::as_str)
            .ok_or_else(|| "missing `code`".to_string())?;
        let language = args
            .get("language")
            .and_then(Value::as_str)
            .map(Language::from_tag)
            .unwrap_or_else(|| self.stepper.language());
        self.stepper.load_with_language(code, language);
        Ok(json!({ "lines": self.stepper.line_count(), "language": language }))
    }

    fn after_step(&mut self, action: impl FnOnce(&mut Stepper)) -> Value {
        action(&mut self.stepper);
        json!({
            "state": self.stepper.state(),
            "line": self.stepper.current_line(),
        })
    }

    fn send_event(&self, event: &str, body: Option<Value>) -> io::Result<()> {
        let content = HostMessageContent::Event {
            event: event.to_string(),
            body,
        };
        self.outbox
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "outbox poisoned"))?
            .send("event", content)
    }

    fn flush_events(&mut self) -> io::Result<()> {
        while let Ok(event) = self.events.try_recv() {
            self.send_event(event.name(), Some(event.body()))?;
        }
        Ok(())
    }
}

fn line_arg(args: &Value) -> Result<usize, String> {
    args.get("line")
        .and_then(Value::as_u64)
        .map(|line| line as usize)
        .filter(|line| *line > 0)
        .ok_or_else(|| "expected a positive `line`".to_string())
}
