//! Logic query: one template unified against a sequence of axioms
//!
//! Each call to [`LogicQuery::iterate`] resumes the sequence where the last
//! accepted candidate left it. When the sequence runs out the query returns
//! to `Start`, so the next call begins again with a fresh iterator. That is
//! the point the enclosing search backtracks through.

use super::context::ExecutionContext;
use super::status::QueryStatus;
use crate::source::{AxiomIter, AxiomSource};
use crate::template::{BackupMode, EvaluationStatus, TemplateChain};
use crate::{Axiom, AxiomListener, QueryResult, Solution, SolutionHandler};
use std::fmt;
use std::iter::Peekable;
use std::rc::Rc;
use tracing::{debug, trace};

/// Invoked with each accepted partial solution; returning `false` rejects it
/// and the query moves on to its next candidate.
pub type Continuation<'a> =
    dyn FnMut(&mut Solution, &mut ExecutionContext) -> QueryResult<bool> + 'a;

/// What became of a candidate after unification succeeded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Completion {
    Accepted,
    Rejected,
    ShortCircuit,
}

pub struct LogicQuery {
    key: String,
    source: Option<Rc<dyn AxiomSource>>,
    status: QueryStatus,
    iterator: Option<Peekable<AxiomIter>>,
    listeners: Vec<Box<dyn AxiomListener>>,
    handler: Option<Box<dyn SolutionHandler>>,
}

impl LogicQuery {
    /// `key` names the source; without a source the query unifies against
    /// the solution instead
    pub fn new(key: impl Into<String>, source: Option<Rc<dyn AxiomSource>>) -> Self {
        Self {
            key: key.into(),
            source,
            status: QueryStatus::Start,
            iterator: None,
            listeners: Vec::new(),
            handler: None,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn status(&self) -> QueryStatus {
        self.status
    }

    pub fn set_status(&mut self, status: QueryStatus) {
        if status == QueryStatus::Start {
            self.iterator = None;
        }
        self.status = status;
    }

    pub fn has_source(&self) -> bool {
        self.source.is_some()
    }

    pub fn add_listener(&mut self, listener: Box<dyn AxiomListener>) {
        self.listeners.push(listener);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn set_handler(&mut self, handler: Box<dyn SolutionHandler>) {
        self.handler = Some(handler);
    }

    /// Back to `Start` with no iterator
    pub fn reset(&mut self) {
        self.set_status(QueryStatus::Start);
    }

    /// Find the next candidate that unifies and evaluates to a fact
    pub fn iterate(
        &mut self,
        solution: &mut Solution,
        template: &mut TemplateChain,
        context: &mut ExecutionContext,
    ) -> QueryResult<bool> {
        self.iterate_with(solution, template, context, &mut |_, _| Ok(true))
    }

    /// As [`iterate`](Self::iterate), but each candidate that completes is
    /// also offered to `continuation`, which may reject it
    pub fn iterate_with(
        &mut self,
        solution: &mut Solution,
        template: &mut TemplateChain,
        context: &mut ExecutionContext,
        continuation: &mut Continuation<'_>,
    ) -> QueryResult<bool> {
        if self.status == QueryStatus::Complete {
            return Ok(false);
        }

        let Some(source) = self.source.clone() else {
            // No fact sequence: pair with what the solution already holds
            self.status = QueryStatus::Complete;
            if !template.is_backed_up() {
                template.backup(BackupMode::RetainForRetry);
            }
            template.unify_solution(solution, context.is_case_insensitive());
            let completion = self.complete_solution(solution, template, context, continuation)?;
            if completion != Completion::Accepted {
                template.backup(BackupMode::RetainForRetry);
            }
            return Ok(completion == Completion::Accepted);
        };

        if self.status == QueryStatus::Start {
            let mut iterator = source.iterator(context).peekable();
            if iterator.peek().is_none() {
                trace!(key = %self.key, "axiom source is empty");
                return Ok(false);
            }
            debug!(key = %self.key, template = %template.qualified_name(), "logic query started");
            self.iterator = Some(iterator);
            self.status = QueryStatus::InProgress;
        }

        let Some(mut iterator) = self.iterator.take() else {
            self.status = QueryStatus::Start;
            return Ok(false);
        };

        while let Some(axiom) = iterator.next() {
            context.record_candidate()?;
            self.notify_listeners(&axiom, context);

            if template.head().is_empty() {
                template.head_mut().populate_from(&axiom);
            }
            if !template.is_backed_up() {
                template.backup(BackupMode::RetainForRetry);
            }

            if template.unify(&axiom, solution, context.is_case_insensitive()) {
                match self.complete_solution(solution, template, context, continuation)? {
                    Completion::Accepted => {
                        trace!(key = %self.key, axiom = %axiom, "candidate accepted");
                        self.iterator = Some(iterator);
                        return Ok(true);
                    }
                    Completion::ShortCircuit => {
                        debug!(key = %self.key, "logic query short-circuited");
                        template.backup(BackupMode::RetainForRetry);
                        self.status = QueryStatus::Complete;
                        return Ok(false);
                    }
                    Completion::Rejected => {}
                }
            }
            template.backup(BackupMode::RetainForRetry);
        }

        trace!(key = %self.key, "axiom sequence exhausted");
        self.status = QueryStatus::Start;
        Ok(false)
    }

    fn notify_listeners(&mut self, axiom: &Axiom, context: &ExecutionContext) {
        let key = &self.key;
        self.listeners
            .retain_mut(|listener| listener.on_next_axiom(key, axiom.clone(), context.locale()));
    }

    /// Evaluate every template of the chain; store the results when each is
    /// complete and a fact, then ask the handlers to accept them
    fn complete_solution(
        &mut self,
        solution: &mut Solution,
        template: &mut TemplateChain,
        context: &mut ExecutionContext,
        continuation: &mut Continuation<'_>,
    ) -> QueryResult<Completion> {
        for link in template.iter_mut() {
            match link.evaluate(context)? {
                EvaluationStatus::Complete => {}
                EvaluationStatus::ShortCircuit => return Ok(Completion::ShortCircuit),
                EvaluationStatus::Skip | EvaluationStatus::Fail => {
                    return Ok(Completion::Rejected)
                }
            }
            if !link.is_fact() {
                return Ok(Completion::Rejected);
            }
        }

        let keys: Vec<String> = template
            .iter()
            .map(|link| {
                let key = link.qualified_name().to_string();
                solution.put_with_locale(key.clone(), link.to_axiom(), context.locale());
                key
            })
            .collect();

        let accepted = match self.handler.as_mut() {
            Some(handler) => handler.on_solution(solution),
            None => true,
        } && continuation(solution, context)?;

        if !accepted {
            for key in keys.iter().rev() {
                solution.remove(key);
            }
            return Ok(Completion::Rejected);
        }
        Ok(Completion::Accepted)
    }
}

impl fmt::Debug for LogicQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogicQuery")
            .field("key", &self.key)
            .field("status", &self.status)
            .field("has_source", &self.source.is_some())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
