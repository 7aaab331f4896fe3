//! Templates: patterns unified against axioms and then evaluated
//!
//! A template is a named, ordered set of term slots plus the free variables
//! its expressions read and the criteria that guard a result. It is mutable
//! and reused across many candidate axioms, so every unification attempt must
//! start from a backed-up template.

pub mod chain;
pub mod operand;
pub mod pairer;

pub use chain::TemplateChain;
pub use operand::{
    ArithmeticOperation, ComparisonOperator, Expr, OperandKind, OperandVisitor, Origin, Variable,
    VariableRef,
};
pub use pairer::SolutionPairer;

use crate::error::ExpressionError;
use crate::evaluator::evaluate_expression;
use crate::query::context::ExecutionContext;
use crate::{Axiom, Solution, Term, TermValue};
use regex::Regex;
use std::fmt;
use tracing::trace;

/// Scope-qualified name of a template, query or solution entry.
///
/// An empty scope is the global scope and displays as the bare name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QualifiedName {
    pub scope: String,
    pub name: String,
}

impl QualifiedName {
    pub fn new(scope: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            name: name.into(),
        }
    }

    pub fn global(name: impl Into<String>) -> Self {
        Self::new("", name)
    }

    pub fn is_global(&self) -> bool {
        self.scope.is_empty()
    }

    /// Same name placed in another scope
    pub fn in_scope(&self, scope: &str) -> Self {
        Self::new(scope, self.name.clone())
    }
}

impl From<&str> for QualifiedName {
    fn from(value: &str) -> Self {
        match value.rsplit_once('.') {
            Some((scope, name)) => QualifiedName::new(scope, name),
            None => QualifiedName::global(value),
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_global() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}.{}", self.scope, self.name)
        }
    }
}

/// Outcome of evaluating a template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationStatus {
    Complete,
    /// Discard this candidate and try the next
    Skip,
    /// Stop producing solutions
    ShortCircuit,
    /// Could not be decided, e.g. a criterion read an unbound variable
    Fail,
}

/// How much a backup erases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupMode {
    /// Erase unified, paired and evaluated values; keep initializer values
    RetainForRetry,
    /// Erase every non-constant value
    ClearToEmpty,
}

/// A boolean guard checked after evaluator terms are computed
#[derive(Debug, Clone, PartialEq)]
pub struct Criterion {
    pub expr: Expr,
    /// Status reported when the guard is false
    pub on_false: EvaluationStatus,
}

/// One term slot of a template
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateTerm {
    variable: Variable,
    operand: OperandKind,
    discovered: bool,
}

impl TemplateTerm {
    fn new(name: impl Into<String>, operand: OperandKind) -> Self {
        let mut variable = Variable::new(name, None);
        if let OperandKind::Constant(value) = &operand {
            variable.bind(value.clone(), Origin::Initial);
        }
        Self {
            variable,
            operand,
            discovered: false,
        }
    }

    pub fn name(&self) -> &str {
        self.variable.name()
    }

    pub fn value(&self) -> Option<&TermValue> {
        self.variable.value()
    }

    pub fn operand(&self) -> &OperandKind {
        &self.operand
    }

    fn is_constant(&self) -> bool {
        matches!(self.operand, OperandKind::Constant(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    name: QualifiedName,
    key: String,
    terms: Vec<TemplateTerm>,
    free: Vec<Variable>,
    criteria: Vec<Criterion>,
    replicate: bool,
    backed_up: bool,
}

impl Template {
    /// Start building a template named `name` that unifies against `key` axioms
    pub fn builder(name: impl Into<QualifiedName>, key: impl Into<String>) -> TemplateBuilder {
        TemplateBuilder {
            name: name.into(),
            key: key.into(),
            terms: Vec::new(),
            criteria: Vec::new(),
            replicate: false,
        }
    }

    pub fn qualified_name(&self) -> &QualifiedName {
        &self.name
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn terms(&self) -> &[TemplateTerm] {
        &self.terms
    }

    pub fn is_replicate(&self) -> bool {
        self.replicate
    }

    pub fn is_backed_up(&self) -> bool {
        self.backed_up
    }

    /// A template declaring no terms passes through whatever it meets
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// True when every term slot holds a value
    pub fn is_fact(&self) -> bool {
        self.terms.iter().all(|t| t.variable.is_bound())
    }

    /// Move the template into another scope, keeping its name
    pub fn rescope(&mut self, scope: &str) {
        self.name = self.name.in_scope(scope);
    }

    /// Value currently held by a term slot
    pub fn value(&self, name: &str) -> Option<&TermValue> {
        self.terms
            .iter()
            .find(|t| t.name() == name)
            .and_then(|t| t.value())
    }

    /// Current bindings as an axiom named after the template.
    /// Unbound slots are left out.
    pub fn to_axiom(&self) -> Axiom {
        let terms = self
            .terms
            .iter()
            .filter_map(|t| {
                t.variable
                    .value()
                    .map(|value| Term::new(t.name(), value.clone()))
            })
            .collect();
        Axiom::new(self.name.name.clone(), terms)
    }

    /// Give an empty template one variable slot per named term of `axiom`.
    ///
    /// Discovered slots are removed again by `reset`.
    pub fn populate_from(&mut self, axiom: &Axiom) {
        if !self.terms.is_empty() {
            return;
        }
        for term in axiom.terms().iter().filter(|t| !t.is_anonymous()) {
            let mut slot = TemplateTerm::new(term.name.clone(), OperandKind::Variable);
            slot.discovered = true;
            self.terms.push(slot);
        }
        trace!(template = %self.name, slots = self.terms.len(), "populated empty template");
    }

    /// Assign initializer values by name. They survive `RetainForRetry` backups.
    pub fn initialize(&mut self, properties: &[Term]) {
        for property in properties {
            if let Some(slot) = self
                .terms
                .iter_mut()
                .find(|t| t.name() == property.name && !t.is_constant())
            {
                slot.variable.bind(property.value.clone(), Origin::Initial);
            }
            for variable in self
                .free
                .iter_mut()
                .filter(|v| v.qualifier().is_none() && v.name() == property.name)
            {
                variable.bind(property.value.clone(), Origin::Initial);
            }
        }
    }

    pub fn unify(&mut self, axiom: &Axiom, solution: &Solution) -> bool {
        self.unify_with(axiom, solution, false)
    }

    pub fn unify_case_insensitive(&mut self, axiom: &Axiom, solution: &Solution) -> bool {
        self.unify_with(axiom, solution, true)
    }

    fn unify_with(&mut self, axiom: &Axiom, solution: &Solution, case_insensitive: bool) -> bool {
        self.backed_up = false;
        let find = |name: &str, index: usize| -> Option<&Term> {
            let by_name = if case_insensitive {
                axiom.term_ignore_case(name)
            } else {
                axiom.term(name)
            };
            by_name.or_else(|| axiom.term_at(index).filter(|t| t.is_anonymous()))
        };

        for (index, slot) in self.terms.iter_mut().enumerate() {
            let Some(term) = find(slot.variable.name(), index) else {
                continue;
            };
            let accepted = match &slot.operand {
                OperandKind::Evaluator(_) => continue,
                OperandKind::Constant(value) => value.matches(&term.value, case_insensitive),
                OperandKind::Pattern(pattern) => {
                    matches!(&term.value, TermValue::Text(text) if pattern.is_match(text))
                        && bind_or_match(&mut slot.variable, &term.value, case_insensitive)
                }
                OperandKind::Variable => {
                    bind_or_match(&mut slot.variable, &term.value, case_insensitive)
                }
            };
            if !accepted {
                trace!(template = %self.name, term = %slot.variable.name(), "unification mismatch");
                return false;
            }
        }

        for variable in self.free.iter_mut() {
            let local = match variable.qualifier() {
                None => true,
                Some(qualifier) => qualifier == axiom.name(),
            };
            if !local {
                continue;
            }
            let term = if case_insensitive {
                axiom.term_ignore_case(variable.name())
            } else {
                axiom.term(variable.name())
            };
            if let Some(term) = term {
                if !bind_or_match(variable, &term.value, case_insensitive) {
                    return false;
                }
            }
        }

        // Variables qualified by another axiom read from the solution
        let mut pairer = SolutionPairer::new(solution, case_insensitive).excluding(&self.name);
        for variable in self.free.iter_mut().filter(|v| v.qualifier().is_some()) {
            pairer.visit(variable);
        }
        true
    }

    /// Compute evaluator terms, then check criteria
    pub fn evaluate(
        &mut self,
        _context: &ExecutionContext,
    ) -> Result<EvaluationStatus, ExpressionError> {
        self.backed_up = false;
        for index in 0..self.terms.len() {
            let result = match &self.terms[index].operand {
                OperandKind::Evaluator(expr) => {
                    evaluate_expression(expr, self.terms[index].name(), &|r| self.lookup(r))?
                }
                _ => continue,
            };
            if let Some(value) = result {
                self.terms[index].variable.bind(value, Origin::Evaluated);
            }
        }

        for criterion in &self.criteria {
            match evaluate_expression(&criterion.expr, &self.name.name, &|r| self.lookup(r))? {
                Some(TermValue::Boolean(true)) => {}
                Some(TermValue::Boolean(false)) => {
                    trace!(template = %self.name, criterion = %criterion.expr, "criterion not met");
                    return Ok(criterion.on_false);
                }
                Some(other) => return Err(ExpressionError::NotBoolean(other.to_string())),
                None => return Ok(EvaluationStatus::Fail),
            }
        }
        Ok(EvaluationStatus::Complete)
    }

    fn lookup(&self, reference: &VariableRef) -> Option<TermValue> {
        if reference.qualifier.is_none() {
            if let Some(value) = self.value(&reference.name) {
                return Some(value.clone());
            }
        }
        self.free
            .iter()
            .find(|v| v.refers_to(reference))
            .and_then(|v| v.value().cloned())
    }

    /// Undo the most recent unification and evaluation
    pub fn backup(&mut self, mode: BackupMode) {
        let retain_initial = mode == BackupMode::RetainForRetry;
        for slot in self.terms.iter_mut().filter(|t| !t.is_constant()) {
            slot.variable.clear(retain_initial);
        }
        for variable in self.free.iter_mut() {
            variable.clear(retain_initial);
        }
        self.backed_up = true;
    }

    /// Return to the state the template was built in
    pub fn reset(&mut self) {
        self.backup(BackupMode::ClearToEmpty);
        self.terms.retain(|t| !t.discovered);
    }

    /// Visit every variable that can take a value from outside the template
    pub fn visit_variables(&mut self, visitor: &mut dyn OperandVisitor) {
        for slot in self.terms.iter_mut() {
            if matches!(slot.operand, OperandKind::Variable | OperandKind::Pattern(_)) {
                visitor.visit(&mut slot.variable);
            }
        }
        for variable in self.free.iter_mut() {
            visitor.visit(variable);
        }
    }
}

fn bind_or_match(variable: &mut Variable, value: &TermValue, case_insensitive: bool) -> bool {
    match variable.value() {
        Some(current) if variable.origin() != Origin::Unified => {
            current.matches(value, case_insensitive)
        }
        _ => {
            variable.bind(value.clone(), Origin::Unified);
            true
        }
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "template {}(", self.name)?;
        for (i, slot) in self.terms.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match &slot.operand {
                OperandKind::Evaluator(expr) => write!(f, "{}={}", slot.name(), expr)?,
                _ => match slot.value() {
                    Some(value) => write!(f, "{}={}", slot.name(), value)?,
                    None => write!(f, "{}", slot.name())?,
                },
            }
        }
        write!(f, ")")
    }
}

pub struct TemplateBuilder {
    name: QualifiedName,
    key: String,
    terms: Vec<TemplateTerm>,
    criteria: Vec<Criterion>,
    replicate: bool,
}

impl TemplateBuilder {
    pub fn variable(mut self, name: impl Into<String>) -> Self {
        self.terms.push(TemplateTerm::new(name, OperandKind::Variable));
        self
    }

    pub fn constant(mut self, name: impl Into<String>, value: impl Into<TermValue>) -> Self {
        self.terms.push(TemplateTerm::new(name, OperandKind::Constant(value.into())));
        self
    }

    pub fn pattern(mut self, name: impl Into<String>, pattern: Regex) -> Self {
        self.terms.push(TemplateTerm::new(name, OperandKind::Pattern(pattern)));
        self
    }

    pub fn evaluator(mut self, name: impl Into<String>, expr: Expr) -> Self {
        self.terms.push(TemplateTerm::new(name, OperandKind::Evaluator(expr)));
        self
    }

    /// Guard that skips the candidate when false
    pub fn criterion(mut self, expr: Expr) -> Self {
        self.criteria.push(Criterion {
            expr,
            on_false: EvaluationStatus::Skip,
        });
        self
    }

    /// Guard that stops the query when false
    pub fn short_circuit(mut self, expr: Expr) -> Self {
        self.criteria.push(Criterion {
            expr,
            on_false: EvaluationStatus::ShortCircuit,
        });
        self
    }

    pub fn replicate(mut self, replicate: bool) -> Self {
        self.replicate = replicate;
        self
    }

    pub fn build(self) -> Template {
        let mut free: Vec<Variable> = Vec::new();
        {
            let mut references = Vec::new();
            for slot in &self.terms {
                if let OperandKind::Evaluator(expr) = &slot.operand {
                    expr.references(&mut references);
                }
            }
            for criterion in &self.criteria {
                criterion.expr.references(&mut references);
            }
            for reference in references {
                let is_slot = reference.qualifier.is_none()
                    && self.terms.iter().any(|t| t.name() == reference.name);
                if is_slot || free.iter().any(|v| v.refers_to(reference)) {
                    continue;
                }
                free.push(Variable::new(
                    reference.name.clone(),
                    reference.qualifier.clone(),
                ));
            }
        }
        Template {
            name: self.name,
            key: self.key,
            terms: self.terms,
            free,
            criteria: self.criteria,
            replicate: self.replicate,
            backed_up: true,
        }
    }
}
