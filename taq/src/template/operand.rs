//! Template operands and the expressions evaluator terms compute

use crate::TermValue;
use regex::Regex;
use std::fmt;

/// Where a variable's current value came from.
///
/// Backup decides what to erase by origin: values from unification,
/// pairing and evaluation are transient, initializer values are not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Initial,
    Unified,
    Paired,
    Evaluated,
}

/// Reference from an expression to a variable.
///
/// A qualifier names an axiom already in the solution, e.g. `person.age`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariableRef {
    pub name: String,
    pub qualifier: Option<String>,
}

impl VariableRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            qualifier: None,
        }
    }

    pub fn qualified(qualifier: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            qualifier: Some(qualifier.into()),
        }
    }
}

impl fmt::Display for VariableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.qualifier {
            Some(qualifier) => write!(f, "{}.{}", qualifier, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// A value slot in a template: either a term slot or a free variable
/// referenced by an expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    name: String,
    qualifier: Option<String>,
    value: Option<TermValue>,
    origin: Origin,
}

impl Variable {
    pub(crate) fn new(name: impl Into<String>, qualifier: Option<String>) -> Self {
        Self {
            name: name.into(),
            qualifier,
            value: None,
            origin: Origin::Initial,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn qualifier(&self) -> Option<&str> {
        self.qualifier.as_deref()
    }

    pub fn value(&self) -> Option<&TermValue> {
        self.value.as_ref()
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn is_bound(&self) -> bool {
        self.value.is_some()
    }

    pub fn bind(&mut self, value: TermValue, origin: Origin) {
        self.value = Some(value);
        self.origin = origin;
    }

    pub(crate) fn refers_to(&self, reference: &VariableRef) -> bool {
        self.name == reference.name && self.qualifier == reference.qualifier
    }

    /// Erase the value unless it must survive this kind of backup
    pub(crate) fn clear(&mut self, retain_initial: bool) {
        if retain_initial && self.origin == Origin::Initial {
            return;
        }
        self.value = None;
        self.origin = Origin::Initial;
    }
}

/// Visits the variables of a template's operand tree
pub trait OperandVisitor {
    fn visit(&mut self, variable: &mut Variable);
}

/// The kind of operand occupying a template term slot
#[derive(Debug, Clone)]
pub enum OperandKind {
    /// Binds from the incoming axiom term of the same name
    Variable,
    /// Must match the incoming term value
    Constant(TermValue),
    /// Incoming text must match the pattern; the text is then bound
    Pattern(Regex),
    /// Computed from other values by `evaluate`
    Evaluator(Expr),
}

impl PartialEq for OperandKind {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (OperandKind::Variable, OperandKind::Variable) => true,
            (OperandKind::Constant(l), OperandKind::Constant(r)) => l == r,
            (OperandKind::Pattern(l), OperandKind::Pattern(r)) => l.as_str() == r.as_str(),
            (OperandKind::Evaluator(l), OperandKind::Evaluator(r)) => l == r,
            _ => false,
        }
    }
}

/// Arithmetic operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithmeticOperation {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

impl ArithmeticOperation {
    pub fn symbol(&self) -> &'static str {
        match self {
            ArithmeticOperation::Add => "+",
            ArithmeticOperation::Subtract => "-",
            ArithmeticOperation::Multiply => "*",
            ArithmeticOperation::Divide => "/",
            ArithmeticOperation::Modulo => "%",
        }
    }
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOperator {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

impl ComparisonOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            ComparisonOperator::Equal => "==",
            ComparisonOperator::NotEqual => "!=",
            ComparisonOperator::LessThan => "<",
            ComparisonOperator::LessThanOrEqual => "<=",
            ComparisonOperator::GreaterThan => ">",
            ComparisonOperator::GreaterThanOrEqual => ">=",
        }
    }
}

/// Expression tree computed by evaluator terms and criteria
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(TermValue),
    Variable(VariableRef),
    Arithmetic(Box<Expr>, ArithmeticOperation, Box<Expr>),
    Comparison(Box<Expr>, ComparisonOperator, Box<Expr>),
    LogicalAnd(Box<Expr>, Box<Expr>),
    LogicalOr(Box<Expr>, Box<Expr>),
    LogicalNegation(Box<Expr>),
    Negation(Box<Expr>),
}

impl Expr {
    pub fn literal(value: impl Into<TermValue>) -> Self {
        Expr::Literal(value.into())
    }

    pub fn var(name: impl Into<String>) -> Self {
        Expr::Variable(VariableRef::new(name))
    }

    pub fn qualified(qualifier: impl Into<String>, name: impl Into<String>) -> Self {
        Expr::Variable(VariableRef::qualified(qualifier, name))
    }

    pub fn arithmetic(left: Expr, op: ArithmeticOperation, right: Expr) -> Self {
        Expr::Arithmetic(Box::new(left), op, Box::new(right))
    }

    pub fn comparison(left: Expr, op: ComparisonOperator, right: Expr) -> Self {
        Expr::Comparison(Box::new(left), op, Box::new(right))
    }

    pub fn and(left: Expr, right: Expr) -> Self {
        Expr::LogicalAnd(Box::new(left), Box::new(right))
    }

    pub fn or(left: Expr, right: Expr) -> Self {
        Expr::LogicalOr(Box::new(left), Box::new(right))
    }

    pub fn not(expr: Expr) -> Self {
        Expr::LogicalNegation(Box::new(expr))
    }

    pub fn negate(expr: Expr) -> Self {
        Expr::Negation(Box::new(expr))
    }

    /// Collect every variable reference in the tree, in order of appearance
    pub fn references<'a>(&'a self, found: &mut Vec<&'a VariableRef>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Variable(reference) => found.push(reference),
            Expr::Arithmetic(left, _, right)
            | Expr::Comparison(left, _, right)
            | Expr::LogicalAnd(left, right)
            | Expr::LogicalOr(left, right) => {
                left.references(found);
                right.references(found);
            }
            Expr::LogicalNegation(inner) | Expr::Negation(inner) => inner.references(found),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(value) => write!(f, "{}", value),
            Expr::Variable(reference) => write!(f, "{}", reference),
            Expr::Arithmetic(left, op, right) => write!(f, "{} {} {}", left, op.symbol(), right),
            Expr::Comparison(left, op, right) => write!(f, "{} {} {}", left, op.symbol(), right),
            Expr::LogicalAnd(left, right) => write!(f, "{} and {}", left, right),
            Expr::LogicalOr(left, right) => write!(f, "{} or {}", left, right),
            Expr::LogicalNegation(inner) => write!(f, "not {}", inner),
            Expr::Negation(inner) => write!(f, "-{}", inner),
        }
    }
}
