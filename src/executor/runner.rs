use super::heuristics::HeuristicChecks;
use super::sandbox::{LineScriptEngine, ScriptBridge, ScriptEngine};
use super::syntax::check_syntax;
use crate::config::EngineConfig;
use crate::error::ExecError;
use crate::interpreter::{apply, Session};
use crate::parser::{preprocess, Language, ParsedProgram};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// A batch request as it arrives on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRequest {
    pub code: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub tests: Option<Vec<TestCase>>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub input: String,
    pub expected: String,
}

impl TestCase {
    pub fn new(input: impl Into<String>, expected: impl Into<String>) -> Self {
        Self {
            name: None,
            input: input.into(),
            expected: expected.into(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestCaseResult {
    pub name: String,
    pub input: String,
    pub expected: String,
    pub actual: String,
    pub passed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub success: bool,
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ExecError>,
    pub elapsed_ms: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub test_results: Vec<TestCaseResult>,
}

type EngineFactory = Box<dyn Fn() -> Box<dyn ScriptEngine> + Send>;

/// Runs whole snippets, one at a time.
///
/// Java and Python are interpreted on the calling thread. JavaScript goes
/// through a [`ScriptBridge`], started on first use and replaced after a
/// timeout so a stuck engine never blocks the next run.
pub struct BatchEngine {
    config: EngineConfig,
    script_engine: EngineFactory,
    bridge: Option<ScriptBridge>,
}

impl BatchEngine {
    pub fn new(config: EngineConfig) -> Self {
        let engine_config = config.clone();
        Self {
            config,
            script_engine: Box::new(move || -> Box<dyn ScriptEngine> {
                Box::new(LineScriptEngine::new(engine_config.clone()))
            }),
            bridge: None,
        }
    }

    /// Use a different script engine for JavaScript runs.
    pub fn with_script_engine<F, E>(mut self, factory: F) -> Self
    where
        F: Fn() -> E + Send + 'static,
        E: ScriptEngine,
    {
        self.script_engine = Box::new(move || -> Box<dyn ScriptEngine> { Box::new(factory()) });
        self.bridge = None;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: EngineConfig) {
        self.config = config;
    }

    pub fn run_request(&mut self, request: &ExecutionRequest) -> ExecutionResult {
        let language = Language::from_tag(&request.language);
        let timeout = request
            .timeout_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| self.config.timeout());

        match &request.tests {
            Some(tests) if !tests.is_empty() => {
                self.execute_with_tests(&request.code, language, tests, timeout)
            }
            _ => self.execute(&request.code, language, timeout),
        }
    }

    pub fn execute(&mut self, code: &str, language: Language, timeout: Duration) -> ExecutionResult {
        let started = Instant::now();
        info!(?language, "batch run");
        let (output, error) = self.run_once(code, language, timeout);

        ExecutionResult {
            success: error.is_none(),
            output,
            error,
            elapsed_ms: elapsed_ms(started),
            test_results: Vec::new(),
        }
    }

    /// Run once per test case with the case's input substituted for the
    /// language's read-input call.
    pub fn execute_with_tests(
        &mut self,
        code: &str,
        language: Language,
        tests: &[TestCase],
        timeout: Duration,
    ) -> ExecutionResult {
        let started = Instant::now();
        info!(?language, tests = tests.len(), "batch run with tests");
        let mut results = Vec::with_capacity(tests.len());

        for (i, test) in tests.iter().enumerate() {
            let name = test
                .name
                .clone()
                .unwrap_or_else(|| format!("Test {}", i + 1));
            let source = inject_input(code, language, &test.input);
            let (output, error) = self.run_once(&source, language, timeout);
            if let Some(error) = &error {
                debug!(%name, %error, "test run reported an error");
            }

            let actual = output.trim().to_string();
            let passed = actual == test.expected.trim();
            results.push(TestCaseResult {
                name,
                input: test.input.clone(),
                expected: test.expected.clone(),
                actual,
                passed,
            });
        }

        let passed = results.iter().filter(|r| r.passed).count();
        ExecutionResult {
            success: results.iter().all(|r| r.passed),
            output: format!("Tests: {}/{} passed", passed, results.len()),
            error: None,
            elapsed_ms: elapsed_ms(started),
            test_results: results,
        }
    }

    fn run_once(
        &mut self,
        code: &str,
        language: Language,
        timeout: Duration,
    ) -> (String, Option<ExecError>) {
        if language.is_script_sandboxed() {
            return match self.run_script(code, timeout) {
                Ok(output) => (output, None),
                Err(e) => (String::new(), Some(e)),
            };
        }

        if let Err(e) = check_syntax(code, language) {
            return (String::new(), Some(e));
        }
        let program = preprocess(code, language);
        match interpret(&program, &self.config, Some(timeout)) {
            Ok(output) => {
                let flag = HeuristicChecks::from(&self.config).run(&program);
                (output, flag)
            }
            Err(e) => (String::new(), Some(e)),
        }
    }

    fn run_script(&mut self, code: &str, timeout: Duration) -> Result<String, ExecError> {
        if self.bridge.is_none() {
            self.bridge = Some(ScriptBridge::spawn((self.script_engine)())?);
        }
        let Some(bridge) = self.bridge.as_mut() else {
            return Err(ExecError::Bridge("script engine unavailable".to_string()));
        };

        match bridge.run(code, timeout) {
            Ok(reply) if reply.success => {
                Ok(cap_output(reply.output.trim_end(), self.config.max_output_chars))
            }
            Ok(reply) => Err(ExecError::Script(
                reply.error.unwrap_or_else(|| "Script failed".to_string()),
            )),
            Err(e) => {
                if matches!(e, ExecError::Timeout { .. } | ExecError::Bridge(_)) {
                    warn!("abandoning script engine");
                    self.bridge = None;
                }
                Err(e)
            }
        }
    }
}

/// Interpret every line of `program` in order, returning the captured
/// output with trailing whitespace removed. A statement error stops the run.
pub(crate) fn interpret(
    program: &ParsedProgram,
    config: &EngineConfig,
    timeout: Option<Duration>,
) -> Result<String, ExecError> {
    let deadline = timeout.map(|t| (Instant::now() + t, t.as_millis() as u64));
    let mut session = Session::new(program.language, config);

    for (line, statement) in program.lines.iter().zip(&program.statements) {
        if let Some((deadline, ms)) = deadline {
            if Instant::now() > deadline {
                return Err(ExecError::Timeout { ms });
            }
        }
        apply(statement, line.number, &mut session).map_err(|e| ExecError::Runtime {
            line: line.number,
            message: e.to_string(),
        })?;
    }

    if session.output().is_truncated() {
        debug!(limit = config.max_output_chars, "output truncated");
    }
    Ok(session.output().as_str().trim_end().to_string())
}

/// Replace the language's read-input calls with `input` as a string literal.
pub fn inject_input(code: &str, language: Language, input: &str) -> String {
    let escaped = input.replace('\\', "\\\\").replace('"', "\\\"");
    let literal = format!("\"{escaped}\"");
    language
        .input_placeholders()
        .iter()
        .fold(code.to_string(), |code, placeholder| {
            code.replace(placeholder, &literal)
        })
}

fn cap_output(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
