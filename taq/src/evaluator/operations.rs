//! Type-aware arithmetic and comparison operations
//!
//! Handles operations on integers, decimals, text and booleans.

use crate::error::ExpressionError;
use crate::template::{ArithmeticOperation, ComparisonOperator};
use crate::TermValue;
use rust_decimal::Decimal;
use std::cmp::Ordering;

/// Perform type-aware arithmetic.
///
/// - Integer op Integer = Integer, except a division that does not come out
///   even, which produces a Decimal
/// - Integer op Decimal = Decimal
/// - Text + anything = Text (concatenation)
///
/// # Examples
/// ```text
/// 23 + 1 = 24
/// 7 / 2 = 3.5
/// 1.5 * 2 = 3.0
/// "age " + 23 = "age 23"
/// ```
pub fn arithmetic_operation(
    left: &TermValue,
    op: ArithmeticOperation,
    right: &TermValue,
    term: &str,
) -> Result<TermValue, ExpressionError> {
    match (left, right) {
        (TermValue::Integer(l), TermValue::Integer(r)) => integer_arithmetic(*l, op, *r, term),

        (TermValue::Text(l), _) if op == ArithmeticOperation::Add => {
            Ok(TermValue::Text(format!("{}{}", l, display_bare(right))))
        }

        _ => match (left.as_decimal(), right.as_decimal()) {
            (Some(l), Some(r)) => Ok(TermValue::Decimal(decimal_arithmetic(l, op, r, term)?)),
            _ => Err(mismatch(op.symbol(), left, right)),
        },
    }
}

fn integer_arithmetic(
    l: i64,
    op: ArithmeticOperation,
    r: i64,
    term: &str,
) -> Result<TermValue, ExpressionError> {
    let overflow = || ExpressionError::Overflow(term.to_string());
    match op {
        ArithmeticOperation::Add => l.checked_add(r).map(TermValue::Integer).ok_or_else(overflow),
        ArithmeticOperation::Subtract => {
            l.checked_sub(r).map(TermValue::Integer).ok_or_else(overflow)
        }
        ArithmeticOperation::Multiply => {
            l.checked_mul(r).map(TermValue::Integer).ok_or_else(overflow)
        }
        ArithmeticOperation::Divide => {
            if r == 0 {
                return Err(ExpressionError::DivisionByZero(term.to_string()));
            }
            match l.checked_rem(r) {
                Some(0) => l.checked_div(r).map(TermValue::Integer).ok_or_else(overflow),
                Some(_) => Ok(TermValue::Decimal(decimal_arithmetic(
                    Decimal::from(l),
                    op,
                    Decimal::from(r),
                    term,
                )?)),
                None => Err(overflow()),
            }
        }
        ArithmeticOperation::Modulo => {
            if r == 0 {
                return Err(ExpressionError::DivisionByZero(term.to_string()));
            }
            l.checked_rem(r).map(TermValue::Integer).ok_or_else(overflow)
        }
    }
}

fn decimal_arithmetic(
    l: Decimal,
    op: ArithmeticOperation,
    r: Decimal,
    term: &str,
) -> Result<Decimal, ExpressionError> {
    let overflow = || ExpressionError::Overflow(term.to_string());
    match op {
        ArithmeticOperation::Add => l.checked_add(r).ok_or_else(overflow),
        ArithmeticOperation::Subtract => l.checked_sub(r).ok_or_else(overflow),
        ArithmeticOperation::Multiply => l.checked_mul(r).ok_or_else(overflow),
        ArithmeticOperation::Divide => {
            if r.is_zero() {
                return Err(ExpressionError::DivisionByZero(term.to_string()));
            }
            l.checked_div(r).ok_or_else(overflow)
        }
        ArithmeticOperation::Modulo => {
            if r.is_zero() {
                return Err(ExpressionError::DivisionByZero(term.to_string()));
            }
            l.checked_rem(r).ok_or_else(overflow)
        }
    }
}

/// Perform type-aware comparison.
///
/// Numbers compare numerically across integer and decimal, text compares
/// lexically, booleans only support equality.
pub fn comparison_operation(
    left: &TermValue,
    op: ComparisonOperator,
    right: &TermValue,
) -> Result<bool, ExpressionError> {
    let ordering = match (left, right) {
        (TermValue::Text(l), TermValue::Text(r)) => l.cmp(r),
        (TermValue::Boolean(l), TermValue::Boolean(r)) => {
            return match op {
                ComparisonOperator::Equal => Ok(l == r),
                ComparisonOperator::NotEqual => Ok(l != r),
                _ => Err(mismatch(op.symbol(), left, right)),
            };
        }
        (TermValue::Axiom(_), TermValue::Axiom(_)) | (TermValue::List(_), TermValue::List(_)) => {
            return match op {
                ComparisonOperator::Equal => Ok(left.matches(right, false)),
                ComparisonOperator::NotEqual => Ok(!left.matches(right, false)),
                _ => Err(mismatch(op.symbol(), left, right)),
            };
        }
        _ => match (left.as_decimal(), right.as_decimal()) {
            (Some(l), Some(r)) => l.cmp(&r),
            _ => return Err(mismatch(op.symbol(), left, right)),
        },
    };

    Ok(match op {
        ComparisonOperator::Equal => ordering == Ordering::Equal,
        ComparisonOperator::NotEqual => ordering != Ordering::Equal,
        ComparisonOperator::LessThan => ordering == Ordering::Less,
        ComparisonOperator::LessThanOrEqual => ordering != Ordering::Greater,
        ComparisonOperator::GreaterThan => ordering == Ordering::Greater,
        ComparisonOperator::GreaterThanOrEqual => ordering != Ordering::Less,
    })
}

fn mismatch(op: &str, left: &TermValue, right: &TermValue) -> ExpressionError {
    ExpressionError::TypeMismatch {
        op: op.to_string(),
        left: left.type_name().to_string(),
        right: right.type_name().to_string(),
    }
}

/// Text without the quotes `Display` adds
fn display_bare(value: &TermValue) -> String {
    match value {
        TermValue::Text(s) => s.clone(),
        other => other.to_string(),
    }
}
