use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_TIMEOUT_MS: u64 = 5000;
pub const MAX_OUTPUT_CHARS: usize = 10_000;
pub const DEFAULT_HISTORY_LIMIT: usize = 1000;

/// Engine settings shared by the batch engine, the stepper and the host.
///
/// Every field is optional on the wire; missing fields keep their defaults,
/// so `{"timeoutMs": 2000}` is a complete configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub timeout_ms: u64,
    pub max_output_chars: usize,
    pub history_limit: usize,
    pub check_bounds: bool,
    pub check_infinite_loops: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_output_chars: MAX_OUTPUT_CHARS,
            history_limit: DEFAULT_HISTORY_LIMIT,
            check_bounds: true,
            check_infinite_loops: true,
        }
    }
}

impl EngineConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Overlay the fields present in a JSON object onto this config.
    pub fn merge_json(&mut self, value: &serde_json::Value) -> Result<(), serde_json::Error> {
        let mut current = serde_json::to_value(&*self)?;
        if let (Some(target), Some(patch)) = (current.as_object_mut(), value.as_object()) {
            for (key, val) in patch {
                target.insert(key.clone(), val.clone());
            }
        }
        *self = serde_json::from_value(current)?;
        Ok(())
    }
}
