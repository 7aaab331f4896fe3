use super::{OperandVisitor, Origin, QualifiedName, Variable};
use crate::Solution;

/// Pairs unbound template variables with values already in a solution.
///
/// A qualified variable (`person.age`) reads the named solution entry. An
/// unqualified one takes the first matching term, searching the most recently
/// stored entries first.
pub struct SolutionPairer<'a> {
    solution: &'a Solution,
    case_insensitive: bool,
    exclude: Option<String>,
    paired: usize,
}

impl<'a> SolutionPairer<'a> {
    pub fn new(solution: &'a Solution, case_insensitive: bool) -> Self {
        Self {
            solution,
            case_insensitive,
            exclude: None,
            paired: 0,
        }
    }

    /// Ignore the entry a template stored itself when searching unqualified names
    pub fn excluding(mut self, name: &QualifiedName) -> Self {
        self.exclude = Some(name.to_string());
        self
    }

    /// Number of variables bound so far
    pub fn paired(&self) -> usize {
        self.paired
    }
}

impl OperandVisitor for SolutionPairer<'_> {
    fn visit(&mut self, variable: &mut Variable) {
        if variable.is_bound() {
            return;
        }
        let name = variable.name();
        let value = match variable.qualifier() {
            Some(qualifier) => self.solution.get(qualifier).and_then(|axiom| {
                if self.case_insensitive {
                    axiom.term_ignore_case(name)
                } else {
                    axiom.term(name)
                }
            }),
            None => self
                .solution
                .iter()
                .filter(|(key, _)| self.exclude.as_deref() != Some(*key))
                .find_map(|(_, axiom)| {
                    if self.case_insensitive {
                        axiom.term_ignore_case(name)
                    } else {
                        axiom.term(name)
                    }
                }),
        }
        .map(|term| term.value.clone());

        if let Some(value) = value {
            variable.bind(value, Origin::Paired);
            self.paired += 1;
        }
    }
}
