//! Calculator: one template evaluated without iterating alternatives
//!
//! The template unifies once, against a seed axiom if one is given, and
//! otherwise against the values already in the solution. Results are stored
//! even when some terms stay unbound, because a calculation often derives a
//! few values rather than matching a whole fact.

use super::context::ExecutionContext;
use crate::template::{BackupMode, EvaluationStatus, TemplateChain};
use crate::{Axiom, QueryError, QueryResult, Solution};
use tracing::trace;

#[derive(Debug, Default, Clone, Copy)]
pub struct Calculator;

impl Calculator {
    pub fn new() -> Self {
        Self
    }

    /// Unify, evaluate and store. Returns `false` when evaluation does not
    /// complete.
    pub fn execute(
        &self,
        seed: Option<&Axiom>,
        template: &mut TemplateChain,
        solution: &mut Solution,
        context: &ExecutionContext,
    ) -> QueryResult<bool> {
        let case_insensitive = context.is_case_insensitive();
        if !template.is_backed_up() {
            template.backup(BackupMode::RetainForRetry);
        }

        let unified = match seed {
            Some(axiom) => {
                let same_key = if case_insensitive {
                    axiom.name().eq_ignore_ascii_case(template.key())
                } else {
                    axiom.name() == template.key()
                };
                if !same_key {
                    return Err(QueryError::AxiomKeyMismatch {
                        expected: template.key().to_string(),
                        found: axiom.name().to_string(),
                    });
                }
                template.unify(axiom, solution, case_insensitive)
            }
            None => false,
        };
        if !unified {
            // A failed seed unification may have bound some terms
            template.backup(BackupMode::RetainForRetry);
            let paired = template.unify_solution(solution, case_insensitive);
            trace!(
                template = %template.qualified_name(),
                paired,
                "calculator paired from solution"
            );
        }

        for link in template.iter_mut() {
            let status = link.evaluate(context)?;
            if status != EvaluationStatus::Complete {
                trace!(template = %link.qualified_name(), ?status, "calculation incomplete");
                return Ok(false);
            }
        }
        for link in template.iter() {
            solution.put_with_locale(
                link.qualified_name().to_string(),
                link.to_axiom(),
                context.locale(),
            );
        }
        Ok(true)
    }
}
