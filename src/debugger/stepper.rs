use super::breakpoints::Breakpoints;
use super::events::DebugEvent;
use super::stepping::StepperState;
use crate::config::EngineConfig;
use crate::interpreter::{apply, Effect, ExecutionStep, Session, StackFrame, VariableBinding};
use crate::parser::{preprocess, Language, ParsedProgram, Statement};
use std::sync::mpsc::{self, Receiver, Sender};
use tracing::{debug, info, warn};

/// Line-by-line execution of one loaded snippet under caller control.
///
/// All state changes happen inside the calling thread's `&mut self` calls.
/// Events go to every live subscriber in the order they occur.
pub struct Stepper {
    config: EngineConfig,
    program: ParsedProgram,
    session: Session,
    /// 0-based index of the next line to execute.
    pc: usize,
    state: StepperState,
    breakpoints: Breakpoints,
    /// Breakpoint line reported by the last pause, if any.
    last_hit: Option<usize>,
    subscribers: Vec<Sender<DebugEvent>>,
}

impl Stepper {
    pub fn new(config: EngineConfig) -> Self {
        let program = preprocess("", Language::default());
        let session = Session::new(program.language, &config);
        Self {
            config,
            program,
            session,
            pc: 0,
            state: StepperState::Loaded,
            breakpoints: Breakpoints::new(),
            last_hit: None,
            subscribers: Vec::new(),
        }
    }

    /// Load code in the current language. Breakpoints are kept.
    pub fn load(&mut self, code: &str) {
        self.load_with_language(code, self.program.language);
    }

    pub fn load_with_language(&mut self, code: &str, language: Language) {
        self.program = preprocess(code, language);
        self.session = Session::new(language, &self.config);
        self.pc = 0;
        self.state = StepperState::Loaded;
        self.last_hit = None;
        info!(?language, lines = self.program.len(), "program loaded");
    }

    /// Takes effect on the next load.
    pub fn set_config(&mut self, config: EngineConfig) {
        self.config = config;
    }

    pub fn subscribe(&mut self) -> Receiver<DebugEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn state(&self) -> StepperState {
        self.state
    }

    pub fn language(&self) -> Language {
        self.program.language
    }

    pub fn line_count(&self) -> usize {
        self.program.len()
    }

    /// 1-based number of the next line to run, if any remain.
    pub fn current_line(&self) -> Option<usize> {
        (self.pc < self.program.len()).then_some(self.pc + 1)
    }

    pub fn line_text(&self, line: usize) -> Option<&str> {
        let index = line.checked_sub(1)?;
        self.program.lines.get(index).map(|l| l.text.as_str())
    }

    pub fn variable(&self, name: &str) -> Option<&VariableBinding> {
        self.session.variable(name)
    }

    pub fn variables(&self) -> impl Iterator<Item = &VariableBinding> {
        self.session.variables()
    }

    pub fn call_stack(&self) -> &[StackFrame] {
        self.session.call_stack()
    }

    pub fn history(&self) -> impl Iterator<Item = &ExecutionStep> {
        self.session.history()
    }

    pub fn output(&self) -> &str {
        self.session.output().as_str()
    }

    pub fn breakpoints(&self) -> &Breakpoints {
        &self.breakpoints
    }

    pub fn toggle_breakpoint(&mut self, line: usize) -> bool {
        self.breakpoints.toggle(line)
    }

    pub fn clear_breakpoints(&mut self) {
        self.breakpoints.clear();
    }

    /// Execute the current line and pause on the next one.
    pub fn step_over(&mut self) {
        self.begin();
        if self.pc >= self.program.len() {
            self.complete();
            return;
        }
        self.execute_line(self.pc);
        self.pc += 1;
        self.settle(true);
    }

    /// Calls are not entered; identical to [`Stepper::step_over`].
    pub fn step_into(&mut self) {
        self.step_over();
    }

    /// Run until the enclosing block closes, including its closing line.
    pub fn step_out(&mut self) {
        self.begin();
        if self.program.language.uses_braces() {
            let mut depth = 0i32;
            while self.pc < self.program.len() {
                let text = &self.program.stripped[self.pc];
                if text.contains('{') {
                    depth += 1;
                }
                let closes = text.contains('}');
                self.execute_line(self.pc);
                self.pc += 1;
                if closes {
                    depth -= 1;
                    if depth < 0 {
                        break;
                    }
                }
            }
        } else if self.pc < self.program.len() {
            let base = self.program.depths[self.pc];
            while self.pc < self.program.len() {
                let dedented = !self.program.stripped[self.pc].trim().is_empty()
                    && self.program.depths[self.pc] < base;
                self.execute_line(self.pc);
                self.pc += 1;
                if dedented {
                    break;
                }
            }
        }
        self.settle(true);
    }

    /// Run until a breakpoint line is reached or the program ends.
    ///
    /// Resuming from a breakpoint pause executes that line first, so the
    /// same breakpoint is not hit twice in a row.
    pub fn continue_execution(&mut self) {
        let mut resumed_from = if self.state == StepperState::Paused {
            self.last_hit.take()
        } else {
            None
        };
        self.begin();

        while self.pc < self.program.len() {
            let line = self.pc + 1;
            if resumed_from.take() != Some(line) && self.breakpoints.contains(line) {
                self.pause_on_breakpoint(line);
                return;
            }
            self.execute_line(self.pc);
            self.pc += 1;
        }
        self.complete();
    }

    /// Run every line before `target` (1-based), ignoring breakpoints.
    pub fn run_to_line(&mut self, target: usize) {
        self.begin();
        while self.pc < self.program.len() && self.pc + 1 < target {
            self.execute_line(self.pc);
            self.pc += 1;
        }
        self.settle(false);
    }

    /// End the current run. The next stepping call starts over.
    pub fn stop(&mut self) {
        info!(line = self.pc + 1, "run stopped");
        self.state = StepperState::Loaded;
        self.last_hit = None;
    }

    /// Back to the first line with an empty session; breakpoints are kept.
    pub fn restart(&mut self) {
        self.session.reset();
        self.pc = 0;
        self.state = StepperState::Loaded;
        self.last_hit = None;
        info!("session restarted");
    }

    fn begin(&mut self) {
        if self.state == StepperState::Loaded && self.pc > 0 {
            self.restart();
        }
        if self.state != StepperState::Completed {
            self.state = StepperState::Running;
        }
    }

    fn settle(&mut self, report_breakpoint: bool) {
        self.last_hit = None;
        if self.pc >= self.program.len() {
            self.complete();
            return;
        }
        let line = self.pc + 1;
        if report_breakpoint && self.breakpoints.contains(line) {
            self.pause_on_breakpoint(line);
        } else {
            self.state = StepperState::Paused;
        }
    }

    fn pause_on_breakpoint(&mut self, line: usize) {
        self.state = StepperState::Paused;
        self.last_hit = Some(line);
        debug!(line, "breakpoint hit");
        self.emit(DebugEvent::BreakpointHit { line });
    }

    fn complete(&mut self) {
        if self.state != StepperState::Completed {
            info!(steps = self.session.history_len(), "execution complete");
        }
        self.state = StepperState::Completed;
        self.emit(DebugEvent::ExecutionComplete);
    }

    fn execute_line(&mut self, index: usize) {
        let number = self.program.lines[index].number;
        let text = self.program.lines[index].text.trim().to_string();
        let statement = &self.program.statements[index];
        debug!(line = number, %text, "execute");

        if matches!(statement, Statement::Blank | Statement::Comment) {
            self.emit(DebugEvent::LineExecuted { line: number, text });
            return;
        }

        match apply(statement, number, &mut self.session) {
            Ok(effect) => {
                match effect {
                    Effect::VariableChanged(name) => {
                        if let Some(binding) = self.session.variable(&name).cloned() {
                            self.emit(DebugEvent::VariableChanged { binding });
                        }
                    }
                    Effect::Output(output) => self.emit(DebugEvent::Output { text: output }),
                    Effect::None | Effect::CallStack => {}
                }
                self.session.record_step(number, &text);
                self.emit(DebugEvent::LineExecuted { line: number, text });
                let frames = self.session.call_stack().to_vec();
                self.emit(DebugEvent::CallStackUpdated { frames });
            }
            Err(e) => {
                warn!(line = number, error = %e, "statement failed");
                self.emit(DebugEvent::Error {
                    line: number,
                    message: e.to_string(),
                });
            }
        }
    }

    fn emit(&mut self, event: DebugEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

impl Default for Stepper {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
