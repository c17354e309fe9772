use std::cmp::Ordering;

use crate::core::{Result, ServiceError, Value};
use crate::query::ast::ConditionOperator;
use crate::query::pattern;

/// Apply one condition operator to a stored value.
///
/// A null stored value satisfies only `Null`; every other operator,
/// `NotEqual` and `NotLike` included, evaluates to false against null.
pub fn apply(operator: ConditionOperator, stored: &Value, operands: &[Value]) -> Result<bool> {
    check_arity(operator, operands.len())?;

    use ConditionOperator::*;
    match operator {
        Null => return Ok(stored.is_null()),
        NotNull => return Ok(!stored.is_null()),
        _ => {}
    }
    if stored.is_null() {
        return Ok(false);
    }

    match operator {
        Equal => Ok(compare_eq(stored, &operands[0])?),
        NotEqual => Ok(!compare_eq(stored, &operands[0])?),
        Greater => Ok(stored.compare(&operands[0])? == Ordering::Greater),
        GreaterEqual => Ok(stored.compare(&operands[0])? != Ordering::Less),
        Less => Ok(stored.compare(&operands[0])? == Ordering::Less),
        LessEqual => Ok(stored.compare(&operands[0])? != Ordering::Greater),
        Like => match_pattern(stored, &operands[0], PatternShape::Raw),
        NotLike => Ok(!match_pattern(stored, &operands[0], PatternShape::Raw)?),
        BeginsWith => match_pattern(stored, &operands[0], PatternShape::Prefix),
        EndsWith => match_pattern(stored, &operands[0], PatternShape::Suffix),
        In => any_equal(stored, operands),
        NotIn => Ok(!any_equal(stored, operands)?),
        Between => in_range(stored, operands),
        NotBetween => Ok(!in_range(stored, operands)?),
        Null | NotNull => unreachable!("handled above"),
    }
}

fn check_arity(operator: ConditionOperator, got: usize) -> Result<()> {
    let ok = match operator.expected_operands() {
        Some(expected) => got == expected,
        None => got >= 1,
    };
    if ok {
        Ok(())
    } else {
        Err(ServiceError::malformed(
            "condition",
            format!("operator '{}' cannot take {} value(s)", operator.name(), got),
        ))
    }
}

fn compare_eq(stored: &Value, operand: &Value) -> Result<bool> {
    Ok(stored.compare(operand)? == Ordering::Equal)
}

fn any_equal(stored: &Value, operands: &[Value]) -> Result<bool> {
    for operand in operands {
        if compare_eq(stored, operand)? {
            return Ok(true);
        }
    }
    Ok(false)
}

fn in_range(stored: &Value, operands: &[Value]) -> Result<bool> {
    let low = stored.compare(&operands[0])?;
    let high = stored.compare(&operands[1])?;
    Ok(low != Ordering::Less && high != Ordering::Greater)
}

enum PatternShape {
    Raw,
    Prefix,
    Suffix,
}

/// Text matching is case-insensitive. Prefix and suffix shapes treat
/// the operand literally, wildcards included.
fn match_pattern(stored: &Value, operand: &Value, shape: PatternShape) -> Result<bool> {
    let rendered;
    let text = match stored.as_str() {
        Some(s) => s,
        None => {
            rendered = stored.to_string();
            &rendered
        }
    };
    let raw = operand.as_str().ok_or_else(|| {
        ServiceError::TypeMismatch(format!(
            "text pattern expected, got {}",
            operand.type_name()
        ))
    })?;
    let pattern = match shape {
        PatternShape::Raw => raw.to_string(),
        PatternShape::Prefix => format!("{}%", pattern::escape_wildcards(raw)),
        PatternShape::Suffix => format!("%{}", pattern::escape_wildcards(raw)),
    };
    pattern::eval_like(text, &pattern, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ConditionOperator::*;

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    #[test]
    fn null_satisfies_only_null_operator() {
        assert!(apply(Null, &Value::Null, &[]).unwrap());
        assert!(!apply(NotNull, &Value::Null, &[]).unwrap());
        assert!(!apply(Equal, &Value::Null, &[Value::Integer(1)]).unwrap());
        assert!(!apply(NotEqual, &Value::Null, &[Value::Integer(1)]).unwrap());
        assert!(!apply(Greater, &Value::Null, &[Value::Integer(1)]).unwrap());
        assert!(!apply(Like, &Value::Null, &[text("%")]).unwrap());
    }

    #[test]
    fn ordering_operators() {
        let stored = Value::Integer(10);
        assert!(apply(Greater, &stored, &[Value::Integer(5)]).unwrap());
        assert!(!apply(Greater, &stored, &[Value::Integer(10)]).unwrap());
        assert!(apply(GreaterEqual, &stored, &[Value::Integer(10)]).unwrap());
        assert!(apply(Less, &stored, &[Value::Float(10.5)]).unwrap());
        assert!(apply(LessEqual, &stored, &[Value::Integer(10)]).unwrap());
    }

    #[test]
    fn between_checks_both_bounds() {
        let operands = [Value::Integer(5), Value::Integer(10)];
        assert!(apply(Between, &Value::Integer(5), &operands).unwrap());
        assert!(apply(Between, &Value::Integer(10), &operands).unwrap());
        assert!(!apply(Between, &Value::Integer(11), &operands).unwrap());
        assert!(apply(NotBetween, &Value::Integer(4), &operands).unwrap());
    }

    #[test]
    fn between_requires_two_operands() {
        let err = apply(Between, &Value::Integer(5), &[Value::Integer(1)]).unwrap_err();
        assert!(matches!(err, ServiceError::Malformed { .. }));
    }

    #[test]
    fn in_list_membership() {
        let operands = [text("red"), text("blue")];
        assert!(apply(In, &text("blue"), &operands).unwrap());
        assert!(!apply(In, &text("green"), &operands).unwrap());
        assert!(apply(NotIn, &text("green"), &operands).unwrap());
    }

    #[test]
    fn like_is_case_insensitive() {
        assert!(apply(Like, &text("Widget Mark II"), &[text("widget%")]).unwrap());
        assert!(apply(NotLike, &text("Gadget"), &[text("widget%")]).unwrap());
    }

    #[test]
    fn begins_and_ends_with_treat_operand_literally() {
        assert!(apply(BeginsWith, &text("100% cotton"), &[text("100%")]).unwrap());
        assert!(!apply(BeginsWith, &text("1009 cotton"), &[text("100%")]).unwrap());
        assert!(apply(EndsWith, &text("rebate 50%"), &[text("50%")]).unwrap());
    }

    #[test]
    fn text_operands_coerce_against_stored_numbers() {
        assert!(apply(Equal, &Value::Integer(42), &[text("42")]).unwrap());
        assert!(apply(Greater, &Value::Money(10.5), &[text("10")]).unwrap());
    }
}
