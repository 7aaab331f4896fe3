//! Scopes and scope notification
//!
//! A scope is a namespace of axiom sources and templates with its own
//! locale. When a query crosses into a stage that belongs to another scope,
//! a [`ScopeNotifier`] switches the active scope and locale on the execution
//! context just before the stage runs.

use super::context::ExecutionContext;
use crate::source::{AxiomCollection, AxiomSource};
use crate::template::{Template, TemplateChain};
use crate::{Axiom, Locale};
use std::collections::HashMap;
use std::rc::Rc;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct Scope {
    name: String,
    locale: Locale,
    axioms: AxiomCollection,
    templates: HashMap<String, TemplateChain>,
}

impl Scope {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// The unnamed global scope
    pub fn global() -> Self {
        Self::default()
    }

    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_global(&self) -> bool {
        self.name.is_empty()
    }

    pub fn locale(&self) -> &Locale {
        &self.locale
    }

    pub fn add_axioms(&mut self, name: impl Into<String>, axioms: Vec<Axiom>) {
        self.axioms.insert_axioms(name, axioms);
    }

    pub fn add_source(&mut self, name: impl Into<String>, source: Rc<dyn AxiomSource>) {
        self.axioms.insert(name, source);
    }

    pub fn axiom_collection(&self) -> &AxiomCollection {
        &self.axioms
    }

    /// Register a template chain under its head's name, qualified by this scope
    pub fn add_template(&mut self, template: impl Into<TemplateChain>) {
        let mut chain = template.into();
        for link in chain.iter_mut() {
            link.rescope(&self.name);
        }
        self.templates
            .insert(chain.qualified_name().name.clone(), chain);
    }

    pub fn template(&self, name: &str) -> Option<&TemplateChain> {
        self.templates.get(name)
    }

    pub fn head_template(&self, name: &str) -> Option<&Template> {
        self.template(name).map(TemplateChain::head)
    }

    /// Notifier that activates this scope
    pub fn notifier(&self) -> ScopeNotifier {
        ScopeNotifier::new(self.name.clone(), self.locale.clone())
    }
}

/// All scopes of a program, always including the global scope
#[derive(Debug, Clone)]
pub struct ScopeRegistry {
    scopes: HashMap<String, Scope>,
}

impl Default for ScopeRegistry {
    fn default() -> Self {
        let mut scopes = HashMap::new();
        scopes.insert(String::new(), Scope::global());
        Self { scopes }
    }
}

impl ScopeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn global(&self) -> &Scope {
        &self.scopes[""]
    }

    pub fn global_mut(&mut self) -> &mut Scope {
        self.scopes.entry(String::new()).or_default()
    }

    /// Add or replace a scope
    pub fn insert(&mut self, scope: Scope) {
        self.scopes.insert(scope.name.clone(), scope);
    }

    pub fn scope(&self, name: &str) -> Option<&Scope> {
        self.scopes.get(name)
    }

    pub fn scope_mut(&mut self, name: &str) -> Option<&mut Scope> {
        self.scopes.get_mut(name)
    }
}

/// Activates a scope and its locale on the execution context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeNotifier {
    scope: String,
    locale: Locale,
}

impl ScopeNotifier {
    pub fn new(scope: impl Into<String>, locale: Locale) -> Self {
        Self {
            scope: scope.into(),
            locale,
        }
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn locale(&self) -> &Locale {
        &self.locale
    }

    pub fn notify_scope(&self, context: &mut ExecutionContext) {
        if context.active_scope() == self.scope && *context.locale() == self.locale {
            return;
        }
        debug!(
            from = %context.active_scope(),
            to = %self.scope,
            locale = %self.locale,
            "switching scope"
        );
        context.set_active_scope(self.scope.clone());
        context.set_locale(self.locale.clone());
    }
}
