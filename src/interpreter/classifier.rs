use super::eval::evaluate;
use super::session::{Session, VariableBinding};
use crate::error::StatementError;
use crate::parser::{classify, default_value, Language, Statement};
use tracing::debug;

/// What applying one statement did to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    None,
    /// The named variable was declared or took a new value.
    VariableChanged(String),
    Output(String),
    CallStack,
}

/// Classify a line and apply it.
pub fn classify_and_apply(
    text: &str,
    line: usize,
    session: &mut Session,
) -> Result<Effect, StatementError> {
    let statement = classify(text, session.language());
    apply(&statement, line, session)
}

/// Apply one classified statement at `line` (1-based).
pub fn apply(
    statement: &Statement,
    line: usize,
    session: &mut Session,
) -> Result<Effect, StatementError> {
    match statement {
        Statement::Blank | Statement::Comment | Statement::Unrecognized => Ok(Effect::None),

        Statement::Declare {
            type_tag,
            name,
            init,
        } => {
            if init.is_empty() {
                return Err(StatementError::MissingValue { name: name.clone() });
            }
            let value = evaluate(init, session);
            debug!(line, %name, %value, "declare");
            session.declare(VariableBinding::new(name, type_tag, value, line));
            Ok(Effect::VariableChanged(name.clone()))
        }

        Statement::DeclareDefault { type_tag, name } => {
            let value = default_value(type_tag).to_string();
            session.declare(VariableBinding::new(name, type_tag, value, line));
            Ok(Effect::VariableChanged(name.clone()))
        }

        Statement::Assign { name, op, expr } => {
            if expr.is_empty() {
                return Err(StatementError::MissingValue { name: name.clone() });
            }
            let source = match op {
                Some(op) => format!("{name} {op} ({expr})"),
                None => expr.clone(),
            };
            let value = evaluate(&source, session);

            if session.variable(name).is_none() {
                if session.language() != Language::Python {
                    debug!(line, %name, "assignment to undeclared name ignored");
                    return Ok(Effect::None);
                }
                session.declare(VariableBinding::new(name, "var", value, line));
                return Ok(Effect::VariableChanged(name.clone()));
            }

            if session.assign(name, value, line) {
                Ok(Effect::VariableChanged(name.clone()))
            } else {
                Ok(Effect::None)
            }
        }

        Statement::Step { name, delta } => {
            let Some(current) = session.variable(name) else {
                return Ok(Effect::None);
            };
            let Ok(number) = current.value.parse::<i64>() else {
                return Ok(Effect::None);
            };
            let next = number
                .checked_add(*delta)
                .ok_or_else(|| StatementError::Overflow { name: name.clone() })?;
            session.assign(name, next.to_string(), line);
            Ok(Effect::VariableChanged(name.clone()))
        }

        Statement::Print { args, newline } => {
            let mut text = args
                .iter()
                .map(|arg| evaluate(arg, session))
                .collect::<Vec<_>>()
                .join(" ");
            if *newline {
                text.push('\n');
            }
            session.write_output(&text);
            Ok(Effect::Output(text))
        }

        Statement::Return => {
            if session.pop_frame().is_some() {
                Ok(Effect::CallStack)
            } else {
                Ok(Effect::None)
            }
        }

        Statement::Call { method } => {
            session.push_frame(method, line);
            Ok(Effect::CallStack)
        }
    }
}
