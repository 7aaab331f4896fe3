use crate::{QueryError, ResourceLimits};
use std::time::{Duration, Instant};

/// Wall-clock budget for one query launch.
///
/// Checked once per candidate axiom. A budget of zero milliseconds is
/// exhausted on the first check.
#[derive(Debug, Clone)]
pub struct TimeoutTracker {
    started: Instant,
}

impl TimeoutTracker {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    pub fn restart(&mut self) {
        self.started = Instant::now();
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn check_timeout(&self, limits: &ResourceLimits) -> Result<(), QueryError> {
        let elapsed = self.elapsed();
        if elapsed >= Duration::from_millis(limits.max_evaluation_time_ms) {
            return Err(QueryError::ResourceLimitExceeded {
                limit_name: "max_evaluation_time_ms".to_string(),
                limit_value: limits.max_evaluation_time_ms.to_string(),
                actual_value: elapsed.as_millis().to_string(),
            });
        }
        Ok(())
    }
}

impl Default for TimeoutTracker {
    fn default() -> Self {
        Self::new()
    }
}
