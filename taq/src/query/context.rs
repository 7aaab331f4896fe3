//! Execution context for running a query
//!
//! Carries the per-launch settings and counters every stage consults:
//! - Case sensitivity of unification
//! - Active scope and locale (switched by scope notifiers)
//! - Resource limits, with the candidate count and elapsed time checked
//!   against them

use crate::evaluator::TimeoutTracker;
use crate::{Locale, QueryError, QueryResult, ResourceLimits};

#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    case_insensitive: bool,
    locale: Locale,
    active_scope: String,
    limits: ResourceLimits,
    candidates_examined: usize,
    timeout: TimeoutTracker,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(limits: ResourceLimits) -> Self {
        Self {
            limits,
            ..Self::default()
        }
    }

    /// Unify term names and text values ignoring ASCII case
    pub fn case_insensitive(mut self, case_insensitive: bool) -> Self {
        self.case_insensitive = case_insensitive;
        self
    }

    pub fn is_case_insensitive(&self) -> bool {
        self.case_insensitive
    }

    pub fn locale(&self) -> &Locale {
        &self.locale
    }

    pub fn set_locale(&mut self, locale: Locale) {
        self.locale = locale;
    }

    /// Name of the scope whose stage is running; empty for global
    pub fn active_scope(&self) -> &str {
        &self.active_scope
    }

    pub fn set_active_scope(&mut self, scope: impl Into<String>) {
        self.active_scope = scope.into();
    }

    pub fn limits(&self) -> &ResourceLimits {
        &self.limits
    }

    pub fn candidates_examined(&self) -> usize {
        self.candidates_examined
    }

    /// Count one candidate axiom and enforce the limits
    pub fn record_candidate(&mut self) -> QueryResult<()> {
        self.candidates_examined += 1;
        if self.candidates_examined > self.limits.max_candidates {
            return Err(QueryError::ResourceLimitExceeded {
                limit_name: "max_candidates".to_string(),
                limit_value: self.limits.max_candidates.to_string(),
                actual_value: self.candidates_examined.to_string(),
            });
        }
        self.timeout.check_timeout(&self.limits)
    }

    /// Clear counters and restart the clock for a new launch
    pub fn restart(&mut self) {
        self.candidates_examined = 0;
        self.timeout.restart();
    }
}
