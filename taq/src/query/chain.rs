//! Query chains: stages that run once per solution of the logic stages
//!
//! A chain is an ordered list of links. Each link either unifies a template
//! against a named axiom source, taking the first match, or runs a
//! calculation. Links refer to each other by index.

use super::calculator::Calculator;
use super::context::ExecutionContext;
use super::logic::LogicQuery;
use super::scope::ScopeNotifier;
use crate::source::AxiomCollection;
use crate::template::{BackupMode, EvaluationStatus, QualifiedName, TemplateChain};
use crate::{Axiom, QueryError, QueryResult, Solution, Term};
use tracing::{debug, trace};

/// Unifies its template with the first matching axiom of a source
#[derive(Debug, Clone)]
pub struct LogicChainQuery {
    template: TemplateChain,
    collection: AxiomCollection,
}

impl LogicChainQuery {
    /// The source is looked up in `collection` by the template's key on
    /// every run
    pub fn new(template: impl Into<TemplateChain>, collection: AxiomCollection) -> Self {
        Self {
            template: template.into(),
            collection,
        }
    }

    fn execute_stage(
        &mut self,
        properties: &[Term],
        solution: &mut Solution,
        context: &mut ExecutionContext,
    ) -> QueryResult<bool> {
        let key = self.template.key().to_string();
        let source = self
            .collection
            .axiom_source(&key)
            .ok_or_else(|| QueryError::AxiomSourceNotFound(key.clone()))?;
        if !properties.is_empty() {
            self.template.head_mut().initialize(properties);
        }
        let mut query = LogicQuery::new(key, Some(source));
        query.iterate(solution, &mut self.template, context)
    }
}

/// Runs a calculator, seeded by a fixed axiom or by a solution entry
#[derive(Debug, Clone)]
pub struct CalculateChainQuery {
    template: TemplateChain,
    seed: Option<Axiom>,
    seed_key: Option<String>,
    calculator: Calculator,
}

impl CalculateChainQuery {
    pub fn new(template: impl Into<TemplateChain>) -> Self {
        Self {
            template: template.into(),
            seed: None,
            seed_key: None,
            calculator: Calculator::new(),
        }
    }

    /// Unify with `axiom` on every run
    pub fn with_seed(mut self, axiom: Axiom) -> Self {
        self.seed = Some(axiom);
        self
    }

    /// Unify with whatever the solution holds under `key` at run time
    pub fn with_seed_key(mut self, key: impl Into<String>) -> Self {
        self.seed_key = Some(key.into());
        self
    }

    fn execute_stage(
        &mut self,
        properties: &[Term],
        solution: &mut Solution,
        context: &mut ExecutionContext,
    ) -> QueryResult<bool> {
        if !properties.is_empty() {
            self.template.head_mut().initialize(properties);
        }
        let seed = match (&self.seed, &self.seed_key) {
            (Some(axiom), _) => Some(axiom.clone()),
            (None, Some(key)) => solution.get(key).cloned(),
            (None, None) => None,
        };
        self.calculator
            .execute(seed.as_ref(), &mut self.template, solution, context)
    }
}

/// One kind of chain stage
#[derive(Debug, Clone)]
pub enum ChainQuery {
    Logic(LogicChainQuery),
    Calculate(CalculateChainQuery),
}

impl ChainQuery {
    pub fn template(&self) -> &TemplateChain {
        match self {
            ChainQuery::Logic(query) => &query.template,
            ChainQuery::Calculate(query) => &query.template,
        }
    }

    fn template_mut(&mut self) -> &mut TemplateChain {
        match self {
            ChainQuery::Logic(query) => &mut query.template,
            ChainQuery::Calculate(query) => &mut query.template,
        }
    }

    pub fn template_name(&self) -> &QualifiedName {
        self.template().qualified_name()
    }

    /// Run this stage once. `false` is a search failure, not an error.
    pub fn execute_stage(
        &mut self,
        properties: &[Term],
        solution: &mut Solution,
        context: &mut ExecutionContext,
    ) -> QueryResult<bool> {
        match self {
            ChainQuery::Logic(query) => query.execute_stage(properties, solution, context),
            ChainQuery::Calculate(query) => query.execute_stage(properties, solution, context),
        }
    }

    /// Rewind every template of the stage, keeping initializer values
    pub fn backup_to_start(&mut self) {
        self.template_mut().backup(BackupMode::RetainForRetry);
    }

    pub fn reset(&mut self) {
        self.template_mut().reset();
    }

    /// Solution keys this stage writes
    fn solution_keys(&self) -> Vec<String> {
        self.template()
            .iter()
            .map(|template| template.qualified_name().to_string())
            .collect()
    }
}

impl From<LogicChainQuery> for ChainQuery {
    fn from(query: LogicChainQuery) -> Self {
        ChainQuery::Logic(query)
    }
}

impl From<CalculateChainQuery> for ChainQuery {
    fn from(query: CalculateChainQuery) -> Self {
        ChainQuery::Calculate(query)
    }
}

/// A stage together with the scope it runs in and its initializer terms
#[derive(Debug, Clone)]
pub struct ChainLink {
    pub query: ChainQuery,
    pub scope_notifier: Option<ScopeNotifier>,
    pub properties: Vec<Term>,
}

impl ChainLink {
    pub fn new(query: impl Into<ChainQuery>) -> Self {
        Self {
            query: query.into(),
            scope_notifier: None,
            properties: Vec::new(),
        }
    }

    pub fn with_scope(mut self, notifier: ScopeNotifier) -> Self {
        self.scope_notifier = Some(notifier);
        self
    }

    pub fn with_properties(mut self, properties: Vec<Term>) -> Self {
        self.properties = properties;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueryChain {
    links: Vec<ChainLink>,
}

impl QueryChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, link: ChainLink) {
        self.links.push(link);
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn links(&self) -> &[ChainLink] {
        &self.links
    }

    /// Run every link in order.
    ///
    /// `template_stack` records the template of each link run so far. Meeting
    /// a template already on it means a fresh pass over the chain: the stack
    /// is cut back to that point, and that link and the ones after it drop
    /// their previous results. The first failing link ends the pass with
    /// `ShortCircuit` and the results of earlier links are withdrawn.
    pub fn execute_query(
        &mut self,
        solution: &mut Solution,
        template_stack: &mut Vec<QualifiedName>,
        context: &mut ExecutionContext,
    ) -> QueryResult<EvaluationStatus> {
        if let Some(notifier) = self.links.first().and_then(|l| l.scope_notifier.as_ref()) {
            notifier.notify_scope(context);
        }

        let mut stored: Vec<String> = Vec::new();
        for index in 0..self.links.len() {
            let name = self.links[index].query.template_name().clone();
            if let Some(position) = template_stack.iter().position(|n| *n == name) {
                trace!(template = %name, "template repeated; rewinding chain");
                template_stack.truncate(position);
                for link in self.links[index..].iter_mut() {
                    for key in link.query.solution_keys().iter().rev() {
                        solution.remove(key);
                    }
                    link.query.backup_to_start();
                }
            }

            let link = &mut self.links[index];
            let succeeded = link
                .query
                .execute_stage(&link.properties, solution, context)?;
            template_stack.push(name);
            if !succeeded {
                debug!(template = %link.query.template_name(), "chain link failed");
                for key in stored.iter().rev() {
                    solution.remove(key);
                }
                return Ok(EvaluationStatus::ShortCircuit);
            }
            stored.extend(link.query.solution_keys());

            if let Some(notifier) = self
                .links
                .get(index + 1)
                .and_then(|next| next.scope_notifier.as_ref())
            {
                notifier.notify_scope(context);
            }
        }
        Ok(EvaluationStatus::Complete)
    }

    /// Remove every entry the chain's links store, latest link first
    pub fn withdraw(&self, solution: &mut Solution) {
        for link in self.links.iter().rev() {
            for key in link.query.solution_keys().iter().rev() {
                solution.remove(key);
            }
        }
    }

    pub fn backup_to_start(&mut self) {
        for link in self.links.iter_mut() {
            link.query.backup_to_start();
        }
    }

    pub fn reset(&mut self) {
        for link in self.links.iter_mut() {
            link.query.reset();
        }
    }
}
