use crate::error::ConfigError;

/// Splits a session evenly across its steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepScheduler {
    total_ms: u64,
    step_count: usize,
}

impl StepScheduler {
    pub fn new(total_ms: u64, step_count: usize) -> Result<Self, ConfigError> {
        if total_ms == 0 {
            return Err(ConfigError::ZeroDuration);
        }
        if step_count == 0 {
            return Err(ConfigError::NoSteps);
        }
        Ok(Self {
            total_ms,
            step_count,
        })
    }

    /// `floor(elapsed / (total / count))`, clamped to the last step.
    pub fn index_at(&self, elapsed_ms: u64) -> usize {
        let index = (elapsed_ms as u128 * self.step_count as u128) / self.total_ms as u128;
        index.min(self.step_count as u128 - 1) as usize
    }
}
