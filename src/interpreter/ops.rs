//! Arithmetic rules for runtime values.
//!
//! Pure functions computing the result of the binary arithmetic operators
//! over two values. Arrays are incompatible with every operator (array `+`
//! array concatenation is deliberately disallowed); strings are only valid
//! for `add`, which concatenates the string conversions of both operands.
//! Numeric operations promote to float when either operand is a float, with
//! booleans coerced to 0/1. Integer arithmetic wraps on overflow.

use super::error::RuntimeError;
use super::value::Value;

/// Addition, or string concatenation when either operand is a string.
pub fn add(a: &Value, b: &Value) -> Result<Value, RuntimeError> {
    if a.is_array() || b.is_array() {
        return Err(incompatible("+", a, b));
    }

    if a.is_string() || b.is_string() {
        return Ok(Value::Str(format!("{}{}", a, b)));
    }

    numeric("+", a, b, |x, y| x + y, i64::wrapping_add)
}

/// Subtraction.
pub fn subtract(a: &Value, b: &Value) -> Result<Value, RuntimeError> {
    numeric("-", a, b, |x, y| x - y, i64::wrapping_sub)
}

/// Multiplication.
pub fn multiply(a: &Value, b: &Value) -> Result<Value, RuntimeError> {
    numeric("*", a, b, |x, y| x * y, i64::wrapping_mul)
}

/// Exponentiation, computed in floating point. The result is a float when
/// either operand is a float, otherwise it truncates to an integer.
pub fn pow(a: &Value, b: &Value) -> Result<Value, RuntimeError> {
    check_numeric("**", a, b)?;

    let result = a.to_float().powf(b.to_float());
    if matches!(a, Value::Float(_)) || matches!(b, Value::Float(_)) {
        Ok(Value::Float(result))
    } else {
        Ok(Value::Int(result as i64))
    }
}

/// Division: truncating integer division when both operands are bool/int,
/// float division otherwise. Integer division by zero is fatal.
pub fn divide(a: &Value, b: &Value) -> Result<Value, RuntimeError> {
    check_numeric("/", a, b)?;

    if is_integral(a) && is_integral(b) {
        let divisor = b.to_int();
        if divisor == 0 {
            return Err(RuntimeError::DivisionByZero);
        }
        return Ok(Value::Int(a.to_int().wrapping_div(divisor)));
    }

    Ok(Value::Float(a.to_float() / b.to_float()))
}

/// Remainder, with the same promotion rule as `subtract`. Integer modulo by
/// zero is fatal.
pub fn modulo(a: &Value, b: &Value) -> Result<Value, RuntimeError> {
    check_numeric("%", a, b)?;

    if matches!(a, Value::Float(_)) || matches!(b, Value::Float(_)) {
        return Ok(Value::Float(a.to_float() % b.to_float()));
    }

    let divisor = b.to_int();
    if divisor == 0 {
        return Err(RuntimeError::DivisionByZero);
    }
    Ok(Value::Int(a.to_int().wrapping_rem(divisor)))
}

/// Whether the value participates in integer arithmetic (bool coerces 0/1).
fn is_integral(v: &Value) -> bool {
    matches!(v, Value::Bool(_) | Value::Int(_))
}

/// Reject operands that have no numeric interpretation for this operator.
fn check_numeric(op: &'static str, a: &Value, b: &Value) -> Result<(), RuntimeError> {
    let numeric = |v: &Value| matches!(v, Value::Bool(_) | Value::Float(_) | Value::Int(_));
    if !numeric(a) || !numeric(b) {
        return Err(incompatible(op, a, b));
    }
    Ok(())
}

/// Apply a numeric operator with float promotion.
fn numeric(
    op: &'static str,
    a: &Value,
    b: &Value,
    float_op: fn(f64, f64) -> f64,
    int_op: fn(i64, i64) -> i64,
) -> Result<Value, RuntimeError> {
    check_numeric(op, a, b)?;

    if matches!(a, Value::Float(_)) || matches!(b, Value::Float(_)) {
        Ok(Value::Float(float_op(a.to_float(), b.to_float())))
    } else {
        Ok(Value::Int(int_op(a.to_int(), b.to_int())))
    }
}

fn incompatible(op: &'static str, a: &Value, b: &Value) -> RuntimeError {
    RuntimeError::IncompatibleOperands {
        op,
        lhs: a.type_name(),
        rhs: b.type_name(),
    }
}
