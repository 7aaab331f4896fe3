//! Query launcher
//!
//! Turns a [`QuerySpec`] into an executer and runs it. Logic queries get a
//! [`LogicQueryExecuter`] with one stage per key name; calculations get a
//! [`ChainQueryExecuter`] whose chain starts with calculator links. Either
//! way the chained queries of the query spec are appended as the tail.

use super::chain::{CalculateChainQuery, ChainLink, LogicChainQuery, QueryChain};
use super::context::ExecutionContext;
use super::executer::{ChainQueryExecuter, LogicQueryExecuter, QueryExecuter, Stage};
use super::logic::LogicQuery;
use super::scope::{ScopeNotifier, ScopeRegistry};
use super::worker::WorkerService;
use crate::source::AxiomCollection;
use crate::template::{EvaluationStatus, QualifiedName, TemplateChain};
use crate::{Axiom, AxiomListener, QueryError, QueryResult, Solution, SolutionHandler, Term};
use std::fmt;
use std::rc::Rc;
use tracing::{debug, info};

/// Pairs an axiom source with the template that unifies its axioms
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyName {
    /// Source name; `None` unifies against the solution instead
    pub axiom_key: Option<String>,
    pub template_name: QualifiedName,
}

impl KeyName {
    pub fn new(axiom_key: impl Into<String>, template_name: impl Into<QualifiedName>) -> Self {
        Self {
            axiom_key: Some(axiom_key.into()),
            template_name: template_name.into(),
        }
    }

    /// A stage that reads only from the solution
    pub fn without_source(template_name: impl Into<QualifiedName>) -> Self {
        Self {
            axiom_key: None,
            template_name: template_name.into(),
        }
    }
}

/// A chained query, run once per solution of the logic stages
#[derive(Debug, Clone, PartialEq)]
pub enum ChainSpec {
    Logic {
        template_name: QualifiedName,
        properties: Vec<Term>,
    },
    Calculate {
        template_name: QualifiedName,
        properties: Vec<Term>,
        seed_key: Option<String>,
    },
}

impl ChainSpec {
    pub fn logic(template_name: impl Into<QualifiedName>) -> Self {
        ChainSpec::Logic {
            template_name: template_name.into(),
            properties: Vec::new(),
        }
    }

    pub fn calculate(template_name: impl Into<QualifiedName>) -> Self {
        ChainSpec::Calculate {
            template_name: template_name.into(),
            properties: Vec::new(),
            seed_key: None,
        }
    }

    /// Initial term values for the link's template
    pub fn with_properties(mut self, terms: Vec<Term>) -> Self {
        match &mut self {
            ChainSpec::Logic { properties, .. } | ChainSpec::Calculate { properties, .. } => {
                *properties = terms
            }
        }
        self
    }

    /// Seed a calculation with the solution entry stored under `key`
    pub fn with_seed_key(mut self, key: impl Into<String>) -> Self {
        if let ChainSpec::Calculate { seed_key, .. } = &mut self {
            *seed_key = Some(key.into());
        }
        self
    }

    pub fn template_name(&self) -> &QualifiedName {
        match self {
            ChainSpec::Logic { template_name, .. }
            | ChainSpec::Calculate { template_name, .. } => template_name,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuerySpec {
    pub name: String,
    pub key_names: Vec<KeyName>,
    pub chain: Vec<ChainSpec>,
    pub calculator: bool,
}

impl QuerySpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn key(mut self, key_name: KeyName) -> Self {
        self.key_names.push(key_name);
        self
    }

    pub fn chain(mut self, chain: ChainSpec) -> Self {
        self.chain.push(chain);
        self
    }

    pub fn calculator(mut self, calculator: bool) -> Self {
        self.calculator = calculator;
        self
    }

    /// Calculations produce at most one solution
    pub fn is_calculator(&self) -> bool {
        self.calculator || self.key_names.is_empty()
    }

    fn depth(&self) -> usize {
        self.key_names.len() + self.chain.len()
    }
}

/// Everything a launch needs besides the spec. The solution is handed back
/// here when the run ends.
pub struct QueryParams {
    pub spec: QuerySpec,
    pub scope: String,
    pub registry: Rc<ScopeRegistry>,
    pub solution: Solution,
    pub context: ExecutionContext,
    pub seed: Option<Axiom>,
    pub listeners: Vec<(String, Box<dyn AxiomListener>)>,
    pub handler: Option<Box<dyn SolutionHandler>>,
    pub worker: Option<Rc<dyn WorkerService>>,
}

impl QueryParams {
    /// Parameters for running `spec` in the global scope
    pub fn new(spec: QuerySpec, registry: Rc<ScopeRegistry>) -> Self {
        Self {
            spec,
            scope: String::new(),
            registry,
            solution: Solution::new(),
            context: ExecutionContext::new(),
            seed: None,
            listeners: Vec::new(),
            handler: None,
            worker: None,
        }
    }

    pub fn in_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    pub fn with_context(mut self, context: ExecutionContext) -> Self {
        self.context = context;
        self
    }

    /// Initial values for the first stage
    pub fn with_seed(mut self, seed: Axiom) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_worker(mut self, worker: Rc<dyn WorkerService>) -> Self {
        self.worker = Some(worker);
        self
    }

    /// Listen to axioms named `key`. A key naming a stage's source hears
    /// every candidate read from it; any other key hears solution entries
    /// stored under it.
    pub fn add_listener(&mut self, key: impl Into<String>, listener: Box<dyn AxiomListener>) {
        self.listeners.push((key.into(), listener));
    }

    /// Called with every solution; returning `false` ends the run
    pub fn set_handler(&mut self, handler: Box<dyn SolutionHandler>) {
        self.handler = Some(handler);
    }
}

impl fmt::Debug for QueryParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryParams")
            .field("spec", &self.spec)
            .field("scope", &self.scope)
            .field("solution", &self.solution)
            .field("seed", &self.seed)
            .field(
                "listeners",
                &self.listeners.iter().map(|(k, _)| k).collect::<Vec<_>>(),
            )
            .field("handler", &self.handler.is_some())
            .field("worker", &self.worker.is_some())
            .finish()
    }
}

pub struct QueryLauncher;

impl QueryLauncher {
    /// Run the query until it is exhausted or the handler stops it.
    ///
    /// Returns the number of solutions found. A calculation stops after its
    /// first solution, which stays readable in `params.solution`.
    pub fn launch(params: &mut QueryParams) -> QueryResult<usize> {
        if let Some(worker) = params.worker.as_ref() {
            worker.activate();
        }
        let result = Self::run(params);
        if let Some(worker) = params.worker.as_ref() {
            worker.close();
        }
        result
    }

    fn run(params: &mut QueryParams) -> QueryResult<usize> {
        let calculation = params.spec.is_calculator();
        let mut executer = Self::executer(params)?;
        let outcome = Self::drain(executer.as_mut(), calculation);

        if calculation {
            executer.backup_to_start();
        } else {
            executer.reset();
        }
        params.solution = executer.take_solution();

        let count = outcome?;
        info!(query = %params.spec.name, count, "query finished");
        Ok(count)
    }

    fn drain(executer: &mut dyn QueryExecuter, calculation: bool) -> QueryResult<usize> {
        let mut count = 0;
        while executer.execute()? {
            count += 1;
            if executer.solution_mut().evaluate() == EvaluationStatus::ShortCircuit || calculation {
                break;
            }
        }
        Ok(count)
    }

    /// Build the executer for pull-style use.
    ///
    /// Moves the solution, handler and listeners out of `params`; put the
    /// solution back with [`QueryExecuter::take_solution`] when done.
    pub fn executer(params: &mut QueryParams) -> QueryResult<Box<dyn QueryExecuter>> {
        let spec = &params.spec;
        let registry = Rc::clone(&params.registry);
        let limits = params.context.limits();
        if spec.depth() > limits.max_chain_depth {
            return Err(QueryError::ResourceLimitExceeded {
                limit_name: "max_chain_depth".to_string(),
                limit_value: limits.max_chain_depth.to_string(),
                actual_value: spec.depth().to_string(),
            });
        }
        if spec.depth() == 0 {
            return Err(QueryError::invalid_query(&spec.name, "query has no stages"));
        }

        let query_scope = registry
            .scope(&params.scope)
            .ok_or_else(|| QueryError::ScopeNotFound(params.scope.clone()))?;
        let resolver = Resolver {
            registry: &registry,
            scope: &params.scope,
        };

        let mut context = params.context.clone();
        context.restart();
        context.set_active_scope(query_scope.name());
        context.set_locale(query_scope.locale().clone());

        let mut chain = QueryChain::new();
        let calculation = spec.is_calculator();
        if calculation {
            for (index, key_name) in spec.key_names.iter().enumerate() {
                let (template, notifier) = resolver.template(&key_name.template_name)?;
                let mut query = CalculateChainQuery::new(template);
                if index == 0 {
                    if let Some(seed) = params.seed.clone() {
                        query = query.with_seed(seed);
                    }
                }
                chain.push(ChainLink::new(query).with_scope(notifier));
            }
        }
        // With no key names the first chained calculation takes the seed
        let mut chain_seed = if calculation && spec.key_names.is_empty() {
            params.seed.clone()
        } else {
            None
        };
        for chain_spec in &spec.chain {
            let seed = match chain_spec {
                ChainSpec::Calculate { .. } => chain_seed.take(),
                ChainSpec::Logic { .. } => None,
            };
            chain.push(resolver.chain_link(chain_spec, seed)?);
        }
        if chain_seed.is_some() {
            return Err(QueryError::invalid_query(
                &spec.name,
                "seed axiom given but no calculator stage can take it",
            ));
        }

        let mut stages = Vec::new();
        if !calculation {
            for key_name in &spec.key_names {
                let (template, notifier) = resolver.template(&key_name.template_name)?;
                let source = match key_name.axiom_key.as_deref() {
                    Some(key) => Some(
                        resolver
                            .collection(notifier.scope())
                            .axiom_source(key)
                            .ok_or_else(|| QueryError::AxiomSourceNotFound(key.to_string()))?,
                    ),
                    None => None,
                };
                let query_key = key_name
                    .axiom_key
                    .clone()
                    .unwrap_or_else(|| template.key().to_string());
                let query = LogicQuery::new(query_key, source);
                stages.push(Stage::new(key_name.clone(), query, template).with_scope(notifier));
            }
        }

        let mut solution = std::mem::take(&mut params.solution);
        if let Some(handler) = params.handler.take() {
            solution.set_handler(handler);
        }
        let mut axiom_listeners = Vec::new();
        for (key, listener) in std::mem::take(&mut params.listeners) {
            let reads_source = !calculation
                && spec
                    .key_names
                    .iter()
                    .any(|k| k.axiom_key.as_deref() == Some(key.as_str()));
            if reads_source {
                axiom_listeners.push((key, listener));
            } else {
                solution.add_listener(key, listener);
            }
        }
        let tail = ChainQueryExecuter::new(spec.name.clone(), solution, context).with_chain(chain);

        if calculation {
            debug!(query = %spec.name, "built calculation executer");
            return Ok(Box::new(tail));
        }

        let mut executer = LogicQueryExecuter::new(tail, stages);
        if let Some(seed) = params.seed.clone() {
            executer = executer.with_seed(seed);
        }
        for (key, listener) in axiom_listeners {
            executer.add_axiom_listener(key, listener);
        }
        debug!(query = %spec.name, stages = executer.stages().len(), "built logic executer");
        Ok(Box::new(executer))
    }
}

/// Finds templates and sources as seen from the query's scope
struct Resolver<'a> {
    registry: &'a ScopeRegistry,
    scope: &'a str,
}

impl Resolver<'_> {
    /// Look up a template and the scope it runs in.
    ///
    /// An unqualified name is searched in the query scope, then in the global
    /// scope. A global template marked for replication is copied into the
    /// query scope and runs there.
    fn template(&self, name: &QualifiedName) -> QueryResult<(TemplateChain, ScopeNotifier)> {
        let not_found = || QueryError::TemplateNotFound(name.clone());
        if !name.is_global() {
            let scope = self
                .registry
                .scope(&name.scope)
                .ok_or_else(|| QueryError::ScopeNotFound(name.scope.clone()))?;
            let template = scope.template(&name.name).ok_or_else(not_found)?;
            return Ok((template.clone(), scope.notifier()));
        }

        let query_scope = self
            .registry
            .scope(self.scope)
            .ok_or_else(|| QueryError::ScopeNotFound(self.scope.to_string()))?;
        if let Some(template) = query_scope.template(&name.name) {
            return Ok((template.clone(), query_scope.notifier()));
        }

        let global = self.registry.global();
        let template = global.template(&name.name).ok_or_else(not_found)?;
        if !query_scope.is_global() && template.iter().any(|t| t.is_replicate()) {
            let mut replica = template.clone();
            for link in replica.iter_mut() {
                link.rescope(self.scope);
            }
            debug!(template = %name, scope = %self.scope, "replicated global template");
            return Ok((replica, query_scope.notifier()));
        }
        Ok((template.clone(), global.notifier()))
    }

    /// Global sources overlaid with those of `scope`
    fn collection(&self, scope: &str) -> AxiomCollection {
        let mut collection = self.registry.global().axiom_collection().clone();
        if let Some(scope) = self.registry.scope(scope).filter(|s| !s.is_global()) {
            collection.extend_from(scope.axiom_collection());
        }
        collection
    }

    fn chain_link(&self, spec: &ChainSpec, seed: Option<Axiom>) -> QueryResult<ChainLink> {
        let (template, notifier) = self.template(spec.template_name())?;
        let link = match spec {
            ChainSpec::Logic { properties, .. } => {
                let collection = self.collection(notifier.scope());
                ChainLink::new(LogicChainQuery::new(template, collection))
                    .with_properties(properties.clone())
            }
            ChainSpec::Calculate {
                properties,
                seed_key,
                ..
            } => {
                let mut query = CalculateChainQuery::new(template);
                if let Some(key) = seed_key {
                    query = query.with_seed_key(key.clone());
                }
                if let Some(seed) = seed {
                    query = query.with_seed(seed);
                }
                ChainLink::new(query).with_properties(properties.clone())
            }
        };
        Ok(link.with_scope(notifier))
    }
}
