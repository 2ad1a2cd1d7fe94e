use std::collections::BTreeSet;
use tracing::debug;

/// 1-based source lines to pause on.
#[derive(Debug, Clone, Default)]
pub struct Breakpoints {
    points: BTreeSet<usize>,
}

impl Breakpoints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when the line now has a breakpoint.
    pub fn toggle(&mut self, line: usize) -> bool {
        if self.points.remove(&line) {
            debug!(line, "breakpoint removed");
            false
        } else {
            self.points.insert(line);
            debug!(line, "breakpoint set");
            true
        }
    }

    pub fn contains(&self, line: usize) -> bool {
        self.points.contains(&line)
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// In ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.points.iter().copied()
    }
}
