use snippet_debugger::console::run_console;
use snippet_debugger::debugger::{DebugEvent, Stepper, StepperState};
use snippet_debugger::parser::Language;
use snippet_debugger::EngineConfig;
use std::collections::BTreeMap;
use std::fs;
use std::io::Cursor;

const PROGRAM: &str = "int a = 1;
int b = 2;
// add them
int sum = a + b;
helper();
sum = sum + 10;
return;
System.out.println(\"sum=\" + sum);";

fn create_test_snippet(name: &str, content: &str) -> String {
    let path = std::env::temp_dir().join(format!("snippet_{}_{}.java", name, std::process::id()));
    fs::write(&path, content).expect("Failed to write test snippet");
    path.to_string_lossy().into_owned()
}

fn cleanup(path: &str) {
    let _ = fs::remove_file(path);
}

fn loaded(code: &str) -> Stepper {
    let mut stepper = Stepper::new(EngineConfig::default());
    stepper.load_with_language(code, Language::Java);
    stepper
}

fn table(stepper: &Stepper) -> BTreeMap<String, String> {
    stepper
        .variables()
        .map(|b| (b.name.clone(), b.value.clone()))
        .collect()
}

#[cfg(test)]
mod stepper_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_step_over_matches_continue() {
        let mut stepped = loaded(PROGRAM);
        for _ in 0..stepped.line_count() {
            stepped.step_over();
        }

        let mut continued = loaded(PROGRAM);
        continued.continue_execution();

        assert_eq!(table(&stepped), table(&continued));
        assert_eq!(stepped.state(), StepperState::Completed);
        assert_eq!(continued.state(), StepperState::Completed);
        assert_eq!(continued.output(), "sum=13\n");
    }

    #[test]
    fn test_continue_pauses_only_on_breakpoints() {
        let mut stepper = loaded(PROGRAM);
        let events = stepper.subscribe();
        stepper.toggle_breakpoint(4);
        stepper.toggle_breakpoint(6);
        stepper.toggle_breakpoint(99);

        stepper.continue_execution();
        assert_eq!(stepper.state(), StepperState::Paused);
        assert_eq!(stepper.current_line(), Some(4));
        assert!(stepper.variable("sum").is_none(), "line 4 has not run yet");

        stepper.continue_execution();
        assert_eq!(stepper.current_line(), Some(6));
        assert_eq!(stepper.variable("sum").unwrap().value, "3");

        stepper.continue_execution();
        assert_eq!(stepper.state(), StepperState::Completed);

        let hits: Vec<usize> = events
            .try_iter()
            .filter_map(|e| match e {
                DebugEvent::BreakpointHit { line } => Some(line),
                _ => None,
            })
            .collect();
        assert_eq!(hits, vec![4, 6], "out-of-range breakpoints never hit");
    }

    #[test]
    fn test_breakpoint_on_first_line() {
        let mut stepper = loaded("int x = 1;\nx = 2;");
        stepper.toggle_breakpoint(1);
        stepper.continue_execution();
        assert_eq!(stepper.current_line(), Some(1));
        assert!(stepper.variable("x").is_none());

        stepper.continue_execution();
        assert_eq!(stepper.variable("x").unwrap().value, "2");
    }

    #[test]
    fn test_event_order_for_one_line() {
        let mut stepper = loaded("int x = 5;\n\nx++;");
        let events = stepper.subscribe();
        stepper.step_over();
        stepper.step_over();

        let names: Vec<&str> = events.try_iter().map(|e| e.name()).collect();
        assert_eq!(
            names,
            vec!["variableChanged", "lineExecuted", "callStackUpdated", "lineExecuted"]
        );
    }

    #[test]
    fn test_error_does_not_halt() {
        let mut stepper = loaded("int x = 1;\nx = ;\nx = 3;");
        let events = stepper.subscribe();
        stepper.continue_execution();

        assert_eq!(stepper.state(), StepperState::Completed);
        assert_eq!(stepper.variable("x").unwrap().value, "3");
        let errors: Vec<usize> = events
            .try_iter()
            .filter_map(|e| match e {
                DebugEvent::Error { line, .. } => Some(line),
                _ => None,
            })
            .collect();
        assert_eq!(errors, vec![2]);
    }

    #[test]
    fn test_step_out_leaves_block() {
        let code = "int n = 0;\nif (n == 0) {\nn = 1;\nn = 2;\n}\nn = 3;";
        let mut stepper = loaded(code);
        stepper.step_over();
        stepper.step_over();
        assert_eq!(stepper.current_line(), Some(3));

        stepper.step_out();
        assert_eq!(stepper.current_line(), Some(6), "stops after the closing brace");
        assert_eq!(stepper.variable("n").unwrap().value, "2");
    }

    #[test]
    fn test_step_out_of_python_block() {
        let code = "n = 0\nif n == 0:\n    n = 1\n    n = 2\nn = 3\nprint(n)";
        let mut stepper = Stepper::new(EngineConfig::default());
        stepper.load_with_language(code, Language::Python);
        stepper.step_over();
        stepper.step_over();
        assert_eq!(stepper.current_line(), Some(3));

        stepper.step_out();
        assert_eq!(
            stepper.current_line(),
            Some(6),
            "runs through the first dedented line"
        );
        assert_eq!(stepper.variable("n").unwrap().value, "3");
        assert_eq!(stepper.state(), StepperState::Paused);
    }

    #[test]
    fn test_breakpoint_set_on_paused_line() {
        let mut stepper = loaded(PROGRAM);
        let events = stepper.subscribe();
        stepper.step_over();
        assert_eq!(stepper.current_line(), Some(2));

        stepper.toggle_breakpoint(2);
        stepper.continue_execution();
        assert_eq!(stepper.state(), StepperState::Paused);
        assert_eq!(
            stepper.current_line(),
            Some(2),
            "a breakpoint added after a plain step still stops the run"
        );
        assert!(stepper.variable("b").is_none(), "line 2 has not run yet");

        let hits: Vec<usize> = events
            .try_iter()
            .filter_map(|e| match e {
                DebugEvent::BreakpointHit { line } => Some(line),
                _ => None,
            })
            .collect();
        assert_eq!(hits, vec![2]);
    }

    #[test]
    fn test_clear_breakpoints_runs_to_end() {
        let mut stepper = loaded(PROGRAM);
        let events = stepper.subscribe();
        stepper.toggle_breakpoint(2);
        stepper.toggle_breakpoint(4);
        stepper.clear_breakpoints();
        assert!(stepper.breakpoints().is_empty());

        stepper.continue_execution();
        assert_eq!(stepper.state(), StepperState::Completed);
        assert!(
            events
                .try_iter()
                .all(|e| !matches!(e, DebugEvent::BreakpointHit { .. })),
            "cleared breakpoints must not fire"
        );
    }

    #[test]
    fn test_run_to_line_ignores_breakpoints() {
        let mut stepper = loaded(PROGRAM);
        stepper.toggle_breakpoint(2);
        stepper.run_to_line(5);
        assert_eq!(stepper.current_line(), Some(5));
        assert_eq!(stepper.state(), StepperState::Paused);
        assert_eq!(stepper.variable("sum").unwrap().value, "3");
    }

    #[test]
    fn test_call_stack_and_history() {
        let mut stepper = loaded(PROGRAM);
        stepper.run_to_line(6);
        let frames = stepper.call_stack();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].method, "helper");
        assert_eq!(frames[1].line, 5);

        stepper.continue_execution();
        assert_eq!(stepper.call_stack().len(), 1);
        let lines: Vec<usize> = stepper.history().map(|s| s.line).collect();
        assert_eq!(lines, vec![1, 2, 4, 5, 6, 7, 8], "comments are not recorded");
    }

    #[test]
    fn test_history_is_bounded() {
        let config = EngineConfig {
            history_limit: 2,
            ..EngineConfig::default()
        };
        let mut stepper = Stepper::new(config);
        stepper.load("int a = 1;\nint b = 2;\nint c = 3;");
        stepper.continue_execution();
        let lines: Vec<usize> = stepper.history().map(|s| s.line).collect();
        assert_eq!(lines, vec![2, 3]);
    }

    #[test]
    fn test_restart_keeps_breakpoints() {
        let mut stepper = loaded(PROGRAM);
        stepper.toggle_breakpoint(2);
        stepper.continue_execution();
        stepper.restart();

        assert_eq!(stepper.state(), StepperState::Loaded);
        assert_eq!(stepper.current_line(), Some(1));
        assert!(stepper.variables().next().is_none());
        assert!(stepper.breakpoints().contains(2));
    }

    #[test]
    fn test_stop_then_step_starts_over() {
        let mut stepper = loaded("int a = 1;\na = 2;\na = 3;");
        stepper.step_over();
        stepper.step_over();
        stepper.stop();
        assert_eq!(stepper.state(), StepperState::Loaded);

        stepper.step_over();
        assert_eq!(stepper.variable("a").unwrap().value, "1");
        assert_eq!(stepper.current_line(), Some(2));
    }

    #[test]
    fn test_step_past_end_reports_completion() {
        let mut stepper = loaded("int a = 1;");
        let events = stepper.subscribe();
        stepper.step_over();
        stepper.step_into();
        let completions = events
            .try_iter()
            .filter(|e| *e == DebugEvent::ExecutionComplete)
            .count();
        assert_eq!(completions, 2);
    }
}

#[cfg(test)]
mod console_tests {
    use super::*;

    #[test]
    fn test_console_session_from_file() {
        let path = create_test_snippet("console", "int a = 1;\nint b = a + 1;\nSystem.out.println(b);");
        let code = fs::read_to_string(&path).expect("Could not read test snippet");

        let mut stepper = loaded(&code);
        let input = Cursor::new("b 3\nc\nvars\nn\nq\n");
        let mut output = Vec::new();
        run_console(&mut stepper, input, &mut output).unwrap();
        let text = String::from_utf8(output).unwrap();

        assert!(text.contains("Breakpoint set at line 3"), "{text}");
        assert!(text.contains("Breakpoint at line 3"), "{text}");
        assert!(text.contains("int b = 2"), "{text}");
        assert!(text.contains("Program finished"), "{text}");

        cleanup(&path);
    }

    #[test]
    fn test_console_rejects_bad_line() {
        let mut stepper = loaded("int a = 1;");
        let mut output = Vec::new();
        run_console(&mut stepper, Cursor::new("b x\nq\n"), &mut output).unwrap();
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("Invalid line number"), "{text}");
    }
}
