//! The solution store
//!
//! A solution maps keys (qualified template names) to the axioms produced for
//! them during one query execution. It is not a plain map: a key stack records
//! insertion order so later stages can remove and re-insert entries, and
//! listeners registered per key are told about every stored axiom.

use crate::template::EvaluationStatus;
use crate::{Axiom, Locale};
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::trace;

/// Told about axioms as they are produced.
///
/// Each call receives its own copy of the axiom, so a listener may mutate it
/// freely. Returning `false` unregisters the listener.
pub trait AxiomListener {
    fn on_next_axiom(&mut self, qualified_name: &str, axiom: Axiom, locale: &Locale) -> bool;
}

impl<F> AxiomListener for F
where
    F: FnMut(&str, Axiom, &Locale) -> bool,
{
    fn on_next_axiom(&mut self, qualified_name: &str, axiom: Axiom, locale: &Locale) -> bool {
        self(qualified_name, axiom, locale)
    }
}

/// Accepts or rejects a complete solution
pub trait SolutionHandler {
    fn on_solution(&mut self, solution: &Solution) -> bool;
}

impl<F> SolutionHandler for F
where
    F: FnMut(&Solution) -> bool,
{
    fn on_solution(&mut self, solution: &Solution) -> bool {
        self(solution)
    }
}

#[derive(Default)]
pub struct Solution {
    axioms: HashMap<String, Axiom>,
    key_stack: Vec<String>,
    listeners: HashMap<String, Vec<Box<dyn AxiomListener>>>,
    handler: Option<Box<dyn SolutionHandler>>,
    locale: Locale,
}

impl Solution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Solution whose listeners are notified in `locale`
    pub fn with_locale(locale: Locale) -> Self {
        Self {
            locale,
            ..Self::default()
        }
    }

    pub fn locale(&self) -> &Locale {
        &self.locale
    }

    /// Store `axiom` under `key`, replacing any previous entry, then notify
    /// the listeners registered for `key`
    pub fn put(&mut self, key: impl Into<String>, axiom: Axiom) {
        let locale = self.locale.clone();
        self.put_with_locale(key, axiom, &locale);
    }

    pub fn put_with_locale(&mut self, key: impl Into<String>, axiom: Axiom, locale: &Locale) {
        let key = key.into();
        trace!(key = %key, axiom = %axiom, "solution put");
        self.axioms.insert(key.clone(), axiom);
        if self.key_stack.last() != Some(&key) {
            self.key_stack.push(key.clone());
        }
        self.dispatch(&key, locale);
    }

    /// Notification runs after the store is updated. Every listener gets an
    /// independent copy of the stored axiom.
    fn dispatch(&mut self, key: &str, locale: &Locale) {
        let Some(stored) = self.axioms.get(key) else {
            return;
        };
        if let Some(listeners) = self.listeners.get_mut(key) {
            listeners.retain_mut(|listener| listener.on_next_axiom(key, stored.clone(), locale));
        }
    }

    /// Remove the entry for `key` and unwind the key stack down to and
    /// including its most recent occurrence
    pub fn remove(&mut self, key: &str) -> Option<Axiom> {
        let removed = self.axioms.remove(key);
        if self.key_stack.iter().any(|k| k == key) {
            while let Some(top) = self.key_stack.pop() {
                if top == key {
                    break;
                }
            }
        }
        removed
    }

    /// The axiom stored under `key`, or an empty axiom named `key`
    pub fn get_axiom(&self, key: &str) -> Axiom {
        self.axioms
            .get(key)
            .cloned()
            .unwrap_or_else(|| Axiom::empty(key))
    }

    pub fn get(&self, key: &str) -> Option<&Axiom> {
        self.axioms.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.axioms.contains_key(key)
    }

    /// Most recently pushed key still on the stack
    pub fn current_key(&self) -> Option<&str> {
        self.key_stack.last().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.axioms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.axioms.is_empty()
    }

    /// Entries, most recently stored first. Entries whose key was unwound
    /// from the stack follow in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Axiom)> {
        let mut seen = HashSet::new();
        let mut keys: Vec<&str> = self
            .key_stack
            .iter()
            .rev()
            .map(String::as_str)
            .filter(|k| self.axioms.contains_key(*k) && seen.insert(*k))
            .collect();
        let mut rest: Vec<&str> = self
            .axioms
            .keys()
            .map(String::as_str)
            .filter(|k| !seen.contains(k))
            .collect();
        rest.sort_unstable();
        keys.extend(rest);
        keys.into_iter().map(move |k| (k, &self.axioms[k]))
    }

    pub fn keys(&self) -> Vec<&str> {
        self.iter().map(|(k, _)| k).collect()
    }

    pub fn add_listener(
        &mut self,
        qualified_name: impl Into<String>,
        listener: Box<dyn AxiomListener>,
    ) {
        self.listeners
            .entry(qualified_name.into())
            .or_default()
            .push(listener);
    }

    pub fn has_listeners(&self) -> bool {
        self.listeners.values().any(|l| !l.is_empty())
    }

    pub fn set_handler(&mut self, handler: Box<dyn SolutionHandler>) {
        self.handler = Some(handler);
    }

    pub fn clear_handler(&mut self) -> Option<Box<dyn SolutionHandler>> {
        self.handler.take()
    }

    /// Offer the current solution to the handler.
    ///
    /// `ShortCircuit` means the handler rejected it and no further solutions
    /// should be produced for this query.
    pub fn evaluate(&mut self) -> EvaluationStatus {
        let Some(mut handler) = self.handler.take() else {
            return EvaluationStatus::Complete;
        };
        let accepted = handler.on_solution(self);
        self.handler = Some(handler);
        if accepted {
            EvaluationStatus::Complete
        } else {
            EvaluationStatus::ShortCircuit
        }
    }

    /// Clear every entry. Listeners and the handler are kept.
    pub fn reset(&mut self) {
        self.axioms.clear();
        self.key_stack.clear();
    }
}

impl fmt::Debug for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Solution")
            .field("axioms", &self.iter().collect::<Vec<_>>())
            .field("key_stack", &self.key_stack)
            .field("listeners", &self.listeners.keys().collect::<Vec<_>>())
            .field("handler", &self.handler.is_some())
            .finish()
    }
}

impl fmt::Display for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (_, axiom)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", axiom)?;
        }
        Ok(())
    }
}
