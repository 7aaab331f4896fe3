//! Axiom sources
//!
//! A source produces a fresh, restartable sequence of axioms for a key. Every
//! call to [`AxiomSource::iterator`] starts again from the first axiom, which
//! is what lets a query stage backtrack over the same facts many times.

use crate::query::context::ExecutionContext;
use crate::Axiom;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use tracing::warn;

/// Iterator over a source's axioms. Owned so a stage can keep it between pulls.
pub type AxiomIter = Box<dyn Iterator<Item = Axiom>>;

pub trait AxiomSource {
    /// Returns a new iterator positioned at the first axiom
    fn iterator(&self, context: &ExecutionContext) -> AxiomIter;

    /// Number of axioms, when known without iterating
    fn len_hint(&self) -> Option<usize> {
        None
    }
}

/// In-memory source over a fixed list of axioms
#[derive(Debug, Clone)]
pub struct AxiomListSource {
    axioms: Rc<[Axiom]>,
}

impl AxiomListSource {
    pub fn new(axioms: Vec<Axiom>) -> Self {
        Self {
            axioms: axioms.into(),
        }
    }

    pub fn axioms(&self) -> &[Axiom] {
        &self.axioms
    }
}

impl AxiomSource for AxiomListSource {
    fn iterator(&self, _context: &ExecutionContext) -> AxiomIter {
        let axioms = Rc::clone(&self.axioms);
        Box::new((0..axioms.len()).map(move |index| axioms[index].clone()))
    }

    fn len_hint(&self) -> Option<usize> {
        Some(self.axioms.len())
    }
}

/// Raised by a deferred producer whose underlying query was interrupted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceInterrupted;

impl fmt::Display for SourceInterrupted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "axiom query interrupted")
    }
}

/// Source that runs a producer each time it is iterated.
///
/// An interrupted producer is treated as "no more data": the iterator is
/// empty and a warning is logged.
pub struct DeferredAxiomSource<F> {
    name: String,
    producer: F,
}

impl<F> DeferredAxiomSource<F>
where
    F: Fn(&ExecutionContext) -> Result<Vec<Axiom>, SourceInterrupted>,
{
    pub fn new(name: impl Into<String>, producer: F) -> Self {
        Self {
            name: name.into(),
            producer,
        }
    }
}

impl<F> AxiomSource for DeferredAxiomSource<F>
where
    F: Fn(&ExecutionContext) -> Result<Vec<Axiom>, SourceInterrupted>,
{
    fn iterator(&self, context: &ExecutionContext) -> AxiomIter {
        match (self.producer)(context) {
            Ok(axioms) => Box::new(axioms.into_iter()),
            Err(interrupted) => {
                warn!(source = %self.name, "{}; treating as empty", interrupted);
                Box::new(std::iter::empty())
            }
        }
    }
}

/// Named bundle of axiom sources
#[derive(Clone, Default)]
pub struct AxiomCollection {
    sources: HashMap<String, Rc<dyn AxiomSource>>,
}

impl AxiomCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, source: Rc<dyn AxiomSource>) {
        self.sources.insert(name.into(), source);
    }

    /// Convenience for registering an in-memory list
    pub fn insert_axioms(&mut self, name: impl Into<String>, axioms: Vec<Axiom>) {
        self.insert(name, Rc::new(AxiomListSource::new(axioms)));
    }

    /// Add every source of `other`, replacing sources with the same name
    pub fn extend_from(&mut self, other: &AxiomCollection) {
        for (name, source) in &other.sources {
            self.sources.insert(name.clone(), Rc::clone(source));
        }
    }

    pub fn axiom_source(&self, name: &str) -> Option<Rc<dyn AxiomSource>> {
        self.sources.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sources.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.sources.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for AxiomCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AxiomCollection")
            .field("sources", &self.names())
            .finish()
    }
}
