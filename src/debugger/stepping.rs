use serde::Serialize;

/// Lifecycle of a stepper session.
///
/// `Loaded` after `load`, `stop` or `restart`; `Running` only inside a
/// stepping call; `Paused` between calls while lines remain; `Completed`
/// once the last line has run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StepperState {
    Loaded,
    Running,
    Paused,
    Completed,
}

impl StepperState {
    pub fn is_finished(self) -> bool {
        self == StepperState::Completed
    }
}
