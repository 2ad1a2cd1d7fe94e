//! Interactive step prompt for running a snippet from the terminal.

use crate::debugger::{DebugEvent, Stepper};
use std::io::{self, BufRead, Write};
use std::sync::mpsc::Receiver;

const HELP: &str = "Commands: (n)ext, (s)tepInto, (o)ut, (c)ontinue, (b)reakpoint <line>, \
(r)un-to <line>, restart, vars, stack, (q)uit";

/// Drive `stepper` from line commands on `input` until `q` or end of input.
/// Events and the prompt go to `output`.
pub fn run_console<R: BufRead, W: Write>(
    stepper: &mut Stepper,
    mut input: R,
    output: &mut W,
) -> io::Result<()> {
    let events = stepper.subscribe();
    writeln!(output, "Loaded {} lines. {}", stepper.line_count(), HELP)?;

    loop {
        show_position(stepper, output)?;
        write!(output, "> ")?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        let Some(words) = shlex::split(line.trim()) else {
            writeln!(output, "❌ Unbalanced quotes")?;
            continue;
        };
        let command = words.first().map(String::as_str).unwrap_or("n");
        let line_arg = words.get(1).and_then(|w| w.parse::<usize>().ok());

        match (command, line_arg) {
            ("n" | "next" | "stepOver", _) => stepper.step_over(),
            ("s" | "stepInto", _) => stepper.step_into(),
            ("o" | "out" | "stepOut", _) => stepper.step_out(),
            ("c" | "continue", _) => stepper.continue_execution(),
            ("b" | "break", Some(line)) => {
                let enabled = stepper.toggle_breakpoint(line);
                let verb = if enabled { "set" } else { "removed" };
                writeln!(output, "Breakpoint {verb} at line {line}")?;
            }
            ("r" | "run", Some(line)) => stepper.run_to_line(line),
            ("b" | "break" | "r" | "run", None) => {
                writeln!(output, "❌ Invalid line number")?;
            }
            ("restart", _) => stepper.restart(),
            ("vars", _) => print_variables(stepper, output)?,
            ("stack", _) => print_call_stack(stepper, output)?,
            ("q" | "quit", _) => break,
            (other, _) => writeln!(output, "❓ Unknown command: {other}. {HELP}")?,
        }

        print_events(&events, output)?;
    }

    stepper.stop();
    Ok(())
}

fn show_position<W: Write>(stepper: &Stepper, output: &mut W) -> io::Result<()> {
    match stepper.current_line() {
        Some(line) if !stepper.state().is_finished() => {
            let text = stepper.line_text(line).unwrap_or("");
            writeln!(output, "\n🔍 Line {line}: {}", text.trim())
        }
        _ => writeln!(output, "\n✅ Program finished"),
    }
}

fn print_events<W: Write>(events: &Receiver<DebugEvent>, output: &mut W) -> io::Result<()> {
    while let Ok(event) = events.try_recv() {
        match event {
            DebugEvent::VariableChanged { binding } => {
                writeln!(output, "  {} = {}", binding.name, binding.value)?;
            }
            DebugEvent::Output { text } => write!(output, "{text}")?,
            DebugEvent::Error { line, message } => {
                writeln!(output, "❌ Line {line}: {message}")?;
            }
            DebugEvent::BreakpointHit { line } => {
                writeln!(output, "⏸  Breakpoint at line {line}")?;
            }
            DebugEvent::LineExecuted { .. }
            | DebugEvent::CallStackUpdated { .. }
            | DebugEvent::ExecutionComplete => {}
        }
    }
    Ok(())
}

fn print_variables<W: Write>(stepper: &Stepper, output: &mut W) -> io::Result<()> {
    writeln!(output, "=== Variables ===")?;
    for binding in stepper.variables() {
        writeln!(
            output,
            "  {} {} = {}  (history: {})",
            binding.type_tag,
            binding.name,
            binding.value,
            binding.history.join(" -> ")
        )?;
    }
    Ok(())
}

fn print_call_stack<W: Write>(stepper: &Stepper, output: &mut W) -> io::Result<()> {
    let frames = stepper.call_stack();
    writeln!(output, "=== Call Stack ({} frames) ===", frames.len())?;
    for (i, frame) in frames.iter().enumerate().rev() {
        writeln!(output, "  #{i}: {} (entered at line {})", frame.method, frame.line)?;
    }
    Ok(())
}
