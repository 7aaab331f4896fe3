use serde::Deserialize;

/// Resource limits for a query launch
///
/// Backtracking over large sources can examine a great many candidates. These
/// limits turn a runaway search into a `ResourceLimitExceeded` error instead of
/// an unbounded loop. Loadable from JSON; missing fields take the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ResourceLimits {
    /// Maximum number of candidate axioms examined per launch
    pub max_candidates: usize,

    /// Maximum number of links in a query chain
    pub max_chain_depth: usize,

    /// Maximum time for one launch in milliseconds
    pub max_evaluation_time_ms: u64,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_candidates: 1_000_000,
            max_chain_depth: 64,
            max_evaluation_time_ms: 10_000, // 10 seconds
        }
    }
}

impl ResourceLimits {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse limits from a JSON object
    pub fn from_json(json: &str) -> Result<Self, crate::QueryError> {
        Ok(serde_json::from_str(json)?)
    }
}
