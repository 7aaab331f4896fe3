use crate::template::QualifiedName;
use thiserror::Error;

/// Errors raised while evaluating a template expression.
///
/// These are structural: an expression that cannot be computed because of
/// its operand types aborts the query instead of driving backtracking.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpressionError {
    /// Operands of incompatible types
    #[error("Cannot apply '{op}' to {left} and {right}")]
    TypeMismatch {
        op: String,
        left: String,
        right: String,
    },

    #[error("Division by zero in term '{0}'")]
    DivisionByZero(String),

    /// A criterion or logical operand did not produce a boolean
    #[error("Expected boolean value but found {0}")]
    NotBoolean(String),

    #[error("Arithmetic overflow in '{0}'")]
    Overflow(String),
}

/// Error types for query execution
///
/// Unification mismatches and evaluation skips are not errors; they are
/// reported as `false`/status returns and drive backtracking. Everything here
/// aborts the current `execute()` call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    #[error("Scope '{0}' not found")]
    ScopeNotFound(String),

    #[error("Template '{0}' not found")]
    TemplateNotFound(QualifiedName),

    #[error("Axiom source '{0}' not found")]
    AxiomSourceNotFound(String),

    /// A calculator seed axiom does not name the template's key
    #[error("Axiom key '{found}' does not match template key '{expected}'")]
    AxiomKeyMismatch { expected: String, found: String },

    #[error("Invalid query '{query}': {reason}")]
    InvalidQuery { query: String, reason: String },

    #[error("Invalid axiom data: {0}")]
    InvalidAxiomData(String),

    /// Resource limit exceeded
    #[error("Resource limit exceeded: {limit_name} (limit: {limit_value}, actual: {actual_value})")]
    ResourceLimitExceeded {
        limit_name: String,
        limit_value: String,
        actual_value: String,
    },

    #[error(transparent)]
    Expression(#[from] ExpressionError),
}

impl QueryError {
    pub fn invalid_query(query: impl Into<String>, reason: impl Into<String>) -> Self {
        QueryError::InvalidQuery {
            query: query.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for QueryError {
    fn from(err: serde_json::Error) -> Self {
        QueryError::InvalidAxiomData(err.to_string())
    }
}
