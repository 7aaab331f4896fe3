//! Axioms and the terms they carry
//!
//! An axiom is an immutable named fact: an ordered sequence of named terms.
//! Term values own any nested axioms or lists, so cloning a value is always a
//! deep copy with the same archetype.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A value held by a term
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TermValue {
    Integer(i64),
    Decimal(Decimal),
    Text(String),
    Boolean(bool),
    Axiom(Axiom),
    List(Vec<TermValue>),
}

impl TermValue {
    /// Name of the value type, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            TermValue::Integer(_) => "integer",
            TermValue::Decimal(_) => "decimal",
            TermValue::Text(_) => "text",
            TermValue::Boolean(_) => "boolean",
            TermValue::Axiom(_) => "axiom",
            TermValue::List(_) => "list",
        }
    }

    /// Numeric view of the value, if it has one
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            TermValue::Integer(i) => Some(Decimal::from(*i)),
            TermValue::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            TermValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            TermValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Value equality used by unification.
    ///
    /// Integers and decimals compare numerically. Text compares exactly, or
    /// ignoring ASCII case when `case_insensitive` is set. Nested axioms and
    /// lists compare element by element.
    pub fn matches(&self, other: &TermValue, case_insensitive: bool) -> bool {
        match (self, other) {
            (TermValue::Text(l), TermValue::Text(r)) => {
                if case_insensitive {
                    l.eq_ignore_ascii_case(r)
                } else {
                    l == r
                }
            }
            (TermValue::Boolean(l), TermValue::Boolean(r)) => l == r,
            (TermValue::List(l), TermValue::List(r)) => {
                l.len() == r.len()
                    && l
                        .iter()
                        .zip(r.iter())
                        .all(|(a, b)| a.matches(b, case_insensitive))
            }
            (TermValue::Axiom(l), TermValue::Axiom(r)) => l.matches(r, case_insensitive),
            _ => match (self.as_decimal(), other.as_decimal()) {
                (Some(l), Some(r)) => l == r,
                _ => false,
            },
        }
    }
}

impl From<i64> for TermValue {
    fn from(value: i64) -> Self {
        TermValue::Integer(value)
    }
}

impl From<i32> for TermValue {
    fn from(value: i32) -> Self {
        TermValue::Integer(i64::from(value))
    }
}

impl From<Decimal> for TermValue {
    fn from(value: Decimal) -> Self {
        TermValue::Decimal(value)
    }
}

impl From<&str> for TermValue {
    fn from(value: &str) -> Self {
        TermValue::Text(value.to_string())
    }
}

impl From<String> for TermValue {
    fn from(value: String) -> Self {
        TermValue::Text(value)
    }
}

impl From<bool> for TermValue {
    fn from(value: bool) -> Self {
        TermValue::Boolean(value)
    }
}

impl From<Axiom> for TermValue {
    fn from(value: Axiom) -> Self {
        TermValue::Axiom(value)
    }
}

impl From<Vec<TermValue>> for TermValue {
    fn from(value: Vec<TermValue>) -> Self {
        TermValue::List(value)
    }
}

impl fmt::Display for TermValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TermValue::Integer(i) => write!(f, "{}", i),
            TermValue::Decimal(d) => write!(f, "{}", d),
            TermValue::Text(s) => write!(f, "\"{}\"", s),
            TermValue::Boolean(b) => write!(f, "{}", b),
            TermValue::Axiom(a) => write!(f, "{}", a),
            TermValue::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

/// A named value. An empty name marks an anonymous, positional-only term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Term {
    pub name: String,
    pub value: TermValue,
}

impl Term {
    pub fn new(name: impl Into<String>, value: impl Into<TermValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn anonymous(value: impl Into<TermValue>) -> Self {
        Self {
            name: String::new(),
            value: value.into(),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.name.is_empty()
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_anonymous() {
            write!(f, "{}", self.value)
        } else {
            write!(f, "{}={}", self.name, self.value)
        }
    }
}

/// An immutable named fact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Axiom {
    name: String,
    terms: Vec<Term>,
}

impl Axiom {
    pub fn new(name: impl Into<String>, terms: Vec<Term>) -> Self {
        Self {
            name: name.into(),
            terms,
        }
    }

    /// An axiom with no terms
    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name, Vec::new())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// First term with the given name
    pub fn term(&self, name: &str) -> Option<&Term> {
        self.terms.iter().find(|t| t.name == name)
    }

    pub fn term_ignore_case(&self, name: &str) -> Option<&Term> {
        self.terms.iter().find(|t| t.name.eq_ignore_ascii_case(name))
    }

    pub fn term_at(&self, index: usize) -> Option<&Term> {
        self.terms.get(index)
    }

    /// Value of the named term, if present
    pub fn value(&self, name: &str) -> Option<&TermValue> {
        self.term(name).map(|t| &t.value)
    }

    /// Ordered term names
    pub fn archetype(&self) -> Vec<&str> {
        self.terms.iter().map(|t| t.name.as_str()).collect()
    }

    fn matches(&self, other: &Axiom, case_insensitive: bool) -> bool {
        self.name == other.name
            && self.terms.len() == other.terms.len()
            && self
                .terms
                .iter()
                .zip(other.terms.iter())
                .all(|(l, r)| l.name == r.name && l.value.matches(&r.value, case_insensitive))
    }
}

impl fmt::Display for Axiom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, term) in self.terms.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", term)?;
        }
        write!(f, ")")
    }
}
