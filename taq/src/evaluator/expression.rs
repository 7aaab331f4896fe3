//! Expression evaluation
//!
//! Recursively evaluates template expressions to term values.

use super::operations::{arithmetic_operation, comparison_operation};
use crate::error::ExpressionError;
use crate::template::{Expr, VariableRef};
use crate::TermValue;

/// Evaluate an expression.
///
/// `lookup` resolves variable references. An unbound reference makes the
/// whole expression unbound (`Ok(None)`) rather than failing, except where a
/// logical operator can decide without it. `term` names the slot being
/// computed and only appears in error messages.
pub fn evaluate_expression(
    expr: &Expr,
    term: &str,
    lookup: &dyn Fn(&VariableRef) -> Option<TermValue>,
) -> Result<Option<TermValue>, ExpressionError> {
    match expr {
        Expr::Literal(value) => Ok(Some(value.clone())),

        Expr::Variable(reference) => Ok(lookup(reference)),

        Expr::Arithmetic(left, op, right) => {
            let (Some(left), Some(right)) = (
                evaluate_expression(left, term, lookup)?,
                evaluate_expression(right, term, lookup)?,
            ) else {
                return Ok(None);
            };
            arithmetic_operation(&left, *op, &right, term).map(Some)
        }

        Expr::Comparison(left, op, right) => {
            let (Some(left), Some(right)) = (
                evaluate_expression(left, term, lookup)?,
                evaluate_expression(right, term, lookup)?,
            ) else {
                return Ok(None);
            };
            comparison_operation(&left, *op, &right).map(|b| Some(TermValue::Boolean(b)))
        }

        Expr::LogicalAnd(left, right) => {
            // false and <unbound> is still false
            match evaluate_boolean(left, term, lookup)? {
                Some(false) => Ok(Some(TermValue::Boolean(false))),
                Some(true) => Ok(evaluate_boolean(right, term, lookup)?.map(TermValue::Boolean)),
                None => match evaluate_boolean(right, term, lookup)? {
                    Some(false) => Ok(Some(TermValue::Boolean(false))),
                    _ => Ok(None),
                },
            }
        }

        Expr::LogicalOr(left, right) => match evaluate_boolean(left, term, lookup)? {
            Some(true) => Ok(Some(TermValue::Boolean(true))),
            Some(false) => Ok(evaluate_boolean(right, term, lookup)?.map(TermValue::Boolean)),
            None => match evaluate_boolean(right, term, lookup)? {
                Some(true) => Ok(Some(TermValue::Boolean(true))),
                _ => Ok(None),
            },
        },

        Expr::LogicalNegation(inner) => {
            Ok(evaluate_boolean(inner, term, lookup)?.map(|b| TermValue::Boolean(!b)))
        }

        Expr::Negation(inner) => match evaluate_expression(inner, term, lookup)? {
            None => Ok(None),
            Some(TermValue::Integer(i)) => i
                .checked_neg()
                .map(|n| Some(TermValue::Integer(n)))
                .ok_or_else(|| ExpressionError::Overflow(term.to_string())),
            Some(TermValue::Decimal(d)) => Ok(Some(TermValue::Decimal(-d))),
            Some(other) => Err(ExpressionError::TypeMismatch {
                op: "unary -".to_string(),
                left: other.type_name().to_string(),
                right: "nothing".to_string(),
            }),
        },
    }
}

fn evaluate_boolean(
    expr: &Expr,
    term: &str,
    lookup: &dyn Fn(&VariableRef) -> Option<TermValue>,
) -> Result<Option<bool>, ExpressionError> {
    match evaluate_expression(expr, term, lookup)? {
        None => Ok(None),
        Some(TermValue::Boolean(b)) => Ok(Some(b)),
        Some(other) => Err(ExpressionError::NotBoolean(other.to_string())),
    }
}
