//! Administrator-supplied rate override.

use tracing::debug;

/// While set, the manual rate supersedes fetching and caching entirely.
/// Set and cleared only by explicit administrative actions.
#[derive(Debug, Default)]
pub struct ManualOverride {
    rate: Option<f64>,
}

impl ManualOverride {
    pub fn new() -> Self {
        Self { rate: None }
    }

    pub fn is_active(&self) -> bool {
        self.rate.is_some()
    }

    pub fn value(&self) -> Option<f64> {
        self.rate
    }

    pub fn set(&mut self, value: f64) {
        debug!(value, "Manual override set");
        self.rate = Some(value);
    }

    pub fn clear(&mut self) {
        debug!("Manual override cleared");
        self.rate = None;
    }
}
