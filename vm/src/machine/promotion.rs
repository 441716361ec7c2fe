use crate::error::RuntimeError;
use memory::Value;

/// Trait for type promotion operations
pub trait TypePromotion {
    fn binary_op<F, G>(
        &self,
        name: &str,
        left: Value,
        right: Value,
        int_op: F,
        real_op: G,
    ) -> Result<Value, RuntimeError>
    where
        F: Fn(i32, i32) -> Result<i32, RuntimeError>,
        G: Fn(f64, f64) -> f64;

    fn integer_op<F>(
        &self,
        name: &str,
        left: Value,
        right: Value,
        op: F,
    ) -> Result<Value, RuntimeError>
    where
        F: Fn(i32, i32) -> i32;
}

impl TypePromotion for super::vm::VM {
    /// Binary operation with Integer -> Real promotion.
    /// Two integers stay in wrapping i32 arithmetic; any real operand makes
    /// the result real.
    fn binary_op<F, G>(
        &self,
        name: &str,
        left: Value,
        right: Value,
        int_op: F,
        real_op: G,
    ) -> Result<Value, RuntimeError>
    where
        F: Fn(i32, i32) -> Result<i32, RuntimeError>,
        G: Fn(f64, f64) -> f64,
    {
        match (left, right) {
            (Value::Integer(a), Value::Integer(b)) => Ok(Value::int(int_op(a, b)?)),
            _ => match (left.as_number(), right.as_number()) {
                (Some(a), Some(b)) => Ok(Value::real(real_op(a, b))),
                _ => Err(RuntimeError::TypeMismatch(format!(
                    "{} expects numbers, got {} and {}",
                    name,
                    left.type_of(),
                    right.type_of()
                ))),
            },
        }
    }

    /// Integer-only binary operation (bitwise and shifts).
    fn integer_op<F>(
        &self,
        name: &str,
        left: Value,
        right: Value,
        op: F,
    ) -> Result<Value, RuntimeError>
    where
        F: Fn(i32, i32) -> i32,
    {
        match (left, right) {
            (Value::Integer(a), Value::Integer(b)) => Ok(Value::int(op(a, b))),
            _ => Err(RuntimeError::TypeMismatch(format!(
                "{} expects integers, got {} and {}",
                name,
                left.type_of(),
                right.type_of()
            ))),
        }
    }
}
