//! Executers: pull-style drivers over logic stages and query chains
//!
//! Each call to [`QueryExecuter::execute`] leaves the next complete solution
//! in the executer's [`Solution`] and returns `true`, or returns `false` once
//! the search is exhausted. The logic executer is a nested-loop join over
//! its stages. When stage *i* accepts a candidate it drives stage *i + 1*
//! from the beginning, and the chain tail runs after the last stage, so a
//! failure anywhere sends the search back to the previous stage's next
//! candidate. On a later call the innermost stage with candidates left
//! advances first.

use super::chain::QueryChain;
use super::context::ExecutionContext;
use super::launcher::KeyName;
use super::logic::{Continuation, LogicQuery};
use super::scope::ScopeNotifier;
use super::status::QueryStatus;
use crate::template::{BackupMode, EvaluationStatus, QualifiedName, TemplateChain};
use crate::{Axiom, AxiomListener, QueryResult, Solution};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, trace};

pub trait QueryExecuter {
    /// Find the next solution. `false` means exhausted; later calls keep
    /// returning `false` until [`reset`](Self::reset).
    fn execute(&mut self) -> QueryResult<bool>;

    fn solution(&self) -> &Solution;

    fn solution_mut(&mut self) -> &mut Solution;

    /// Move the solution out, leaving an empty one behind
    fn take_solution(&mut self) -> Solution;

    /// Rewind every stage, keeping initializer values, so the executer can
    /// run again
    fn backup_to_start(&mut self);

    /// Return every stage to the state it was built in
    fn reset(&mut self);
}

/// Runs a query chain once. Used on its own for calculations, and as the
/// tail of a [`LogicQueryExecuter`].
#[derive(Debug)]
pub struct ChainQueryExecuter {
    name: String,
    solution: Solution,
    head: Option<QueryChain>,
    template_stack: Vec<QualifiedName>,
    context: ExecutionContext,
    status: QueryStatus,
}

impl ChainQueryExecuter {
    pub fn new(name: impl Into<String>, solution: Solution, context: ExecutionContext) -> Self {
        Self {
            name: name.into(),
            solution,
            head: None,
            template_stack: Vec::new(),
            context,
            status: QueryStatus::Start,
        }
    }

    pub fn with_chain(mut self, chain: QueryChain) -> Self {
        if !chain.is_empty() {
            self.head = Some(chain);
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn chain(&self) -> Option<&QueryChain> {
        self.head.as_ref()
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut ExecutionContext {
        &mut self.context
    }
}

fn run_tail(
    head: &mut Option<QueryChain>,
    template_stack: &mut Vec<QualifiedName>,
    solution: &mut Solution,
    context: &mut ExecutionContext,
) -> QueryResult<bool> {
    match head {
        Some(chain) => {
            let status = chain.execute_query(solution, template_stack, context)?;
            Ok(status == EvaluationStatus::Complete)
        }
        None => Ok(true),
    }
}

impl QueryExecuter for ChainQueryExecuter {
    fn execute(&mut self) -> QueryResult<bool> {
        if self.status == QueryStatus::Complete {
            return Ok(false);
        }
        self.status = QueryStatus::Complete;
        let found = run_tail(
            &mut self.head,
            &mut self.template_stack,
            &mut self.solution,
            &mut self.context,
        )?;
        if !found {
            self.solution.reset();
        }
        debug!(query = %self.name, found, "chain executed");
        Ok(found)
    }

    fn solution(&self) -> &Solution {
        &self.solution
    }

    fn solution_mut(&mut self) -> &mut Solution {
        &mut self.solution
    }

    fn take_solution(&mut self) -> Solution {
        std::mem::take(&mut self.solution)
    }

    fn backup_to_start(&mut self) {
        if let Some(chain) = self.head.as_mut() {
            chain.backup_to_start();
        }
        self.template_stack.clear();
        self.status = QueryStatus::Start;
    }

    fn reset(&mut self) {
        if let Some(chain) = self.head.as_mut() {
            chain.reset();
        }
        self.template_stack.clear();
        self.status = QueryStatus::Start;
    }
}

/// One logic stage: a query over an axiom source and the template it fills
#[derive(Debug)]
pub struct Stage {
    pub key_name: KeyName,
    pub query: LogicQuery,
    pub template: TemplateChain,
    pub scope_notifier: Option<ScopeNotifier>,
}

impl Stage {
    pub fn new(key_name: KeyName, query: LogicQuery, template: TemplateChain) -> Self {
        Self {
            key_name,
            query,
            template,
            scope_notifier: None,
        }
    }

    pub fn with_scope(mut self, notifier: ScopeNotifier) -> Self {
        self.scope_notifier = Some(notifier);
        self
    }

    /// Remove this stage's solution entries, latest first
    fn withdraw(&self, solution: &mut Solution) {
        let keys: Vec<String> = self
            .template
            .iter()
            .map(|template| template.qualified_name().to_string())
            .collect();
        for key in keys.iter().rev() {
            solution.remove(key);
        }
    }
}

pub struct LogicQueryExecuter {
    chain: ChainQueryExecuter,
    stages: Vec<Stage>,
    pending_listeners: HashMap<String, Vec<Box<dyn AxiomListener>>>,
    seed: Option<Axiom>,
}

impl LogicQueryExecuter {
    /// `chain` supplies the solution, context and tail
    pub fn new(chain: ChainQueryExecuter, stages: Vec<Stage>) -> Self {
        Self {
            chain,
            stages,
            pending_listeners: HashMap::new(),
            seed: None,
        }
    }

    /// Initial values for the first stage's template
    pub fn with_seed(mut self, seed: Axiom) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn context(&self) -> &ExecutionContext {
        self.chain.context()
    }

    /// Listener for every candidate read from the source named `axiom_key`.
    /// Bound to the first stage reading that source when execution starts.
    pub fn add_axiom_listener(
        &mut self,
        axiom_key: impl Into<String>,
        listener: Box<dyn AxiomListener>,
    ) {
        self.pending_listeners
            .entry(axiom_key.into())
            .or_default()
            .push(listener);
    }

    /// Hand pending listeners to their stages; each key is bound once
    fn bind_axiom_listeners(&mut self) {
        if self.pending_listeners.is_empty() {
            return;
        }
        for stage in self.stages.iter_mut() {
            let Some(key) = stage.key_name.axiom_key.as_deref() else {
                continue;
            };
            if let Some(listeners) = self.pending_listeners.remove(key) {
                trace!(key, count = listeners.len(), "binding axiom listeners");
                for listener in listeners {
                    stage.query.add_listener(listener);
                }
            }
        }
    }
}

/// Run the first of `stages`; every candidate it accepts drives the rest
fn drive(
    stages: &mut [Stage],
    solution: &mut Solution,
    context: &mut ExecutionContext,
    tail: &mut Continuation<'_>,
) -> QueryResult<bool> {
    let Some((stage, rest)) = stages.split_first_mut() else {
        return tail(solution, context);
    };
    if let Some(notifier) = stage.scope_notifier.as_ref() {
        notifier.notify_scope(context);
    }
    stage
        .query
        .iterate_with(solution, &mut stage.template, context, &mut |solution, context| {
            advance(rest, solution, context, tail)
        })
}

/// Continue from a stage that just accepted a candidate: the next stage
/// starts over
fn advance(
    rest: &mut [Stage],
    solution: &mut Solution,
    context: &mut ExecutionContext,
    tail: &mut Continuation<'_>,
) -> QueryResult<bool> {
    if let Some(next) = rest.first_mut() {
        if next.query.status() != QueryStatus::Start {
            next.query.reset();
        }
        next.template.backup(BackupMode::RetainForRetry);
    }
    drive(rest, solution, context, tail)
}

/// Advance the innermost stage that still has candidates, withdrawing the
/// results of every stage above it
fn execute_next(
    stages: &mut [Stage],
    solution: &mut Solution,
    context: &mut ExecutionContext,
    tail: &mut Continuation<'_>,
) -> QueryResult<bool> {
    for index in (0..stages.len()).rev() {
        stages[index].withdraw(solution);
        if stages[index].query.status() != QueryStatus::InProgress {
            continue;
        }
        for stage in stages[index + 1..].iter_mut() {
            stage.template.backup(BackupMode::RetainForRetry);
        }
        stages[index].template.backup(BackupMode::RetainForRetry);
        trace!(stage = index, "backtracking");
        if drive(&mut stages[index..], solution, context, tail)? {
            return Ok(true);
        }
    }
    Ok(false)
}

impl QueryExecuter for LogicQueryExecuter {
    fn execute(&mut self) -> QueryResult<bool> {
        if self.stages.is_empty() {
            return self.chain.execute();
        }
        if self
            .stages
            .iter()
            .all(|stage| stage.query.status() == QueryStatus::Complete)
        {
            return Ok(false);
        }
        self.bind_axiom_listeners();

        let LogicQueryExecuter {
            chain, stages, seed, ..
        } = self;
        let ChainQueryExecuter {
            name,
            solution,
            head,
            template_stack,
            context,
            ..
        } = chain;

        let first_status = stages[0].query.status();
        if first_status == QueryStatus::Start {
            if let Some(seed) = seed.as_ref() {
                stages[0].template.head_mut().initialize(seed.terms());
            }
        } else if let Some(tail_chain) = head.as_ref() {
            tail_chain.withdraw(solution);
        }

        let mut tail = |solution: &mut Solution, context: &mut ExecutionContext| {
            run_tail(head, template_stack, solution, context)
        };
        let found = match first_status {
            QueryStatus::Start => drive(stages, solution, context, &mut tail)?,
            QueryStatus::InProgress | QueryStatus::Complete => {
                execute_next(stages, solution, context, &mut tail)?
            }
        };

        if !found {
            debug!(query = %name, "logic query exhausted");
            stages[0].query.set_status(QueryStatus::Complete);
            solution.reset();
        }
        Ok(found)
    }

    fn solution(&self) -> &Solution {
        self.chain.solution()
    }

    fn solution_mut(&mut self) -> &mut Solution {
        self.chain.solution_mut()
    }

    fn take_solution(&mut self) -> Solution {
        self.chain.take_solution()
    }

    fn backup_to_start(&mut self) {
        for stage in self.stages.iter_mut() {
            stage.query.reset();
            stage.template.backup(BackupMode::RetainForRetry);
        }
        self.chain.backup_to_start();
    }

    fn reset(&mut self) {
        for stage in self.stages.iter_mut() {
            stage.query.reset();
            stage.template.reset();
        }
        self.chain.reset();
    }
}

impl fmt::Debug for LogicQueryExecuter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogicQueryExecuter")
            .field("name", &self.chain.name)
            .field("stages", &self.stages)
            .field("pending_listeners", &self.pending_listeners.keys().collect::<Vec<_>>())
            .field("chain", &self.chain.head)
            .finish()
    }
}
