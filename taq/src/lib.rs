//! # Taq query engine
//!
//! Resolves logic queries over collections of axioms.
//!
//! An axiom is a named tuple of terms. A template describes the shape of the
//! axioms a query wants, with variables to bind, constants and patterns to
//! match, and evaluator terms computed from other values. A query is an
//! ordered list of stages, each unifying one template against the axioms of
//! one source, and the engine searches every combination of candidates the
//! way a nested-loop join does. The innermost stage advances first.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::rc::Rc;
//! use taq::query::{KeyName, QueryLauncher, QueryParams, QuerySpec, ScopeRegistry};
//! use taq::template::Template;
//! use taq::{Axiom, QueryResult, Term};
//!
//! fn main() -> QueryResult<()> {
//!     let mut registry = ScopeRegistry::new();
//!     let global = registry.global_mut();
//!     global.add_axioms(
//!         "person",
//!         vec![
//!             Axiom::new("person", vec![Term::new("name", "John"), Term::new("age", 23)]),
//!             Axiom::new("person", vec![Term::new("name", "Mary"), Term::new("age", 31)]),
//!         ],
//!     );
//!     global.add_template(Template::builder("who", "person").variable("name").build());
//!
//!     let spec = QuerySpec::new("people").key(KeyName::new("person", "who"));
//!     let mut params = QueryParams::new(spec, Rc::new(registry));
//!     let found = QueryLauncher::launch(&mut params)?;
//!     assert_eq!(found, 2);
//!     Ok(())
//! }
//! ```
//!
//! ## Core Concepts
//!
//! ### Solutions
//! A [`Solution`] collects the axiom each template produced for the current
//! combination, keyed by qualified template name.
//!
//! ### Search failures and errors
//! A candidate that fails to unify, or a criterion that is not met, is part
//! of the search and never surfaces as an error. Missing scopes, templates
//! or sources, and expressions over incompatible values, abort the query
//! with a [`QueryError`].

pub mod axiom;
pub mod error;
pub mod evaluator;
pub mod locale;
pub mod query;
pub mod resource_limits;
pub mod serializers;
pub mod solution;
pub mod source;
pub mod template;

pub use axiom::{Axiom, Term, TermValue};
pub use error::{ExpressionError, QueryError};
pub use locale::Locale;
pub use resource_limits::ResourceLimits;
pub use solution::{AxiomListener, Solution, SolutionHandler};
pub use source::{AxiomCollection, AxiomListSource, AxiomSource, DeferredAxiomSource};

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;

#[cfg(test)]
mod tests;
