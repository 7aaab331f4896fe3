//! Template expression evaluation
//!
//! Evaluator terms and criteria are expression trees over term values. The
//! evaluator computes them against a template's current bindings:
//! 1. Resolve variable references through the template
//! 2. Apply type-aware arithmetic and comparison
//! 3. Report unbound inputs as "no value" rather than as an error

pub mod expression;
pub mod operations;
pub mod timeout;

pub use expression::evaluate_expression;
pub use timeout::TimeoutTracker;
