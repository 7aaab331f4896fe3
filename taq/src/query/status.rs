/// Cursor of a logic query over its axiom sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryStatus {
    /// About to begin iterating
    #[default]
    Start,
    /// Mid-iteration, may yield more solutions
    InProgress,
    /// Exhausted until explicitly reset to `Start`
    Complete,
}
