mod breakpoints;
mod events;
mod stepper;
mod stepping;

pub use breakpoints::Breakpoints;
pub use events::DebugEvent;
pub use stepper::Stepper;
pub use stepping::StepperState;
