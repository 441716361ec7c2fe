use crate::error::RuntimeError;
use crate::opcode::{instruction::*, OpCode};
use memory::Value;
use std::cmp::Ordering;

use super::promotion::TypePromotion;
use super::stack::StackOps;

/// Trait for arithmetic and comparison instruction handlers
pub trait ArithmeticOps {
    fn handle_arithmetic(
        &mut self,
        op: OpCode,
        instruction: u32,
        base: usize,
    ) -> Result<(), RuntimeError>;

    fn handle_comparison(
        &mut self,
        op: OpCode,
        instruction: u32,
        base: usize,
    ) -> Result<(), RuntimeError>;

    /// Apply a binary arithmetic or bitwise opcode to two values.
    fn arith(&self, op: OpCode, x: Value, y: Value) -> Result<Value, RuntimeError>;

    /// Numeric comparison; both operands must be numbers.
    fn numeric_compare(&self, x: Value, y: Value) -> Result<Option<Ordering>, RuntimeError>;
}

impl ArithmeticOps for super::vm::VM {
    fn handle_arithmetic(
        &mut self,
        op: OpCode,
        instruction: u32,
        base: usize,
    ) -> Result<(), RuntimeError> {
        let a = decode_a(instruction) as usize;
        let b = decode_b(instruction) as usize;
        let vb = self.get_reg(base, b)?;

        let res = match op {
            OpCode::Bnot => match vb {
                Value::Integer(i) => Value::int(!i),
                other => {
                    return Err(RuntimeError::TypeMismatch(format!(
                        "~ expects an integer, got {}",
                        other.type_of()
                    )))
                }
            },
            OpCode::AddImmediate => {
                let imm = decode_imm8(instruction) as i32;
                self.arith(OpCode::Add, vb, Value::int(imm))?
            }
            _ => {
                let c = decode_c(instruction) as usize;
                let vc = self.get_reg(base, c)?;
                self.arith(op, vb, vc)?
            }
        };
        self.set_reg(base, a, res)
    }

    fn handle_comparison(
        &mut self,
        op: OpCode,
        instruction: u32,
        base: usize,
    ) -> Result<(), RuntimeError> {
        let a = decode_a(instruction) as usize;
        let b = decode_b(instruction) as usize;
        let vb = self.get_reg(base, b)?;

        let result = match op {
            OpCode::EqualsImmediate => {
                let imm = decode_imm8(instruction) as f64;
                vb.as_number() == Some(imm)
            }
            OpCode::LessThanImmediate => {
                let imm = decode_imm8(instruction) as f64;
                match vb.as_number() {
                    Some(n) => n < imm,
                    None => {
                        return Err(RuntimeError::TypeMismatch(format!(
                            "expected number for < comparison, got {}",
                            vb.type_of()
                        )))
                    }
                }
            }
            _ => {
                let c = decode_c(instruction) as usize;
                let vc = self.get_reg(base, c)?;
                match op {
                    OpCode::Equals => self.heap.equals(vb, vc),
                    OpCode::GreaterThan => self.heap.compare(vb, vc) == Ordering::Greater,
                    OpCode::LessThan => self.heap.compare(vb, vc) == Ordering::Less,
                    OpCode::EqualsInteger => {
                        self.numeric_compare(vb, vc)? == Some(Ordering::Equal)
                    }
                    OpCode::NumericEqual => {
                        self.numeric_compare(vb, vc)? == Some(Ordering::Equal)
                    }
                    OpCode::NumericGreaterThan => {
                        self.numeric_compare(vb, vc)? == Some(Ordering::Greater)
                    }
                    OpCode::NumericLessThan => {
                        self.numeric_compare(vb, vc)? == Some(Ordering::Less)
                    }
                    OpCode::NumericGreaterThanEqual => matches!(
                        self.numeric_compare(vb, vc)?,
                        Some(Ordering::Greater | Ordering::Equal)
                    ),
                    OpCode::NumericLessThanEqual => matches!(
                        self.numeric_compare(vb, vc)?,
                        Some(Ordering::Less | Ordering::Equal)
                    ),
                    other => {
                        return Err(RuntimeError::InvalidOperand(format!(
                            "{} is not a comparison",
                            other
                        )))
                    }
                }
            }
        };
        self.set_reg(base, a, Value::bool(result))
    }

    fn arith(&self, op: OpCode, x: Value, y: Value) -> Result<Value, RuntimeError> {
        match op {
            OpCode::Add => self.binary_op("+", x, y, |a, b| Ok(a.wrapping_add(b)), |a, b| a + b),
            OpCode::Subtract => {
                self.binary_op("-", x, y, |a, b| Ok(a.wrapping_sub(b)), |a, b| a - b)
            }
            OpCode::Multiply => {
                self.binary_op("*", x, y, |a, b| Ok(a.wrapping_mul(b)), |a, b| a * b)
            }
            OpCode::Divide => self.binary_op(
                "/",
                x,
                y,
                |a, b| {
                    if b == 0 {
                        Err(RuntimeError::DivisionByZero)
                    } else {
                        Ok(a.wrapping_div(b))
                    }
                },
                |a, b| a / b,
            ),
            OpCode::Band => self.integer_op("&", x, y, |a, b| a & b),
            OpCode::Bor => self.integer_op("|", x, y, |a, b| a | b),
            OpCode::Bxor => self.integer_op("^", x, y, |a, b| a ^ b),
            OpCode::ShiftLeft => self.integer_op("<<", x, y, |a, b| a.wrapping_shl(b as u32)),
            OpCode::ShiftRight => self.integer_op(">>", x, y, |a, b| a.wrapping_shr(b as u32)),
            OpCode::ShiftRightUnsigned => self.integer_op(">>>", x, y, |a, b| {
                (a as u32).wrapping_shr(b as u32) as i32
            }),
            other => Err(RuntimeError::InvalidOperand(format!(
                "{} is not an arithmetic operator",
                other
            ))),
        }
    }

    fn numeric_compare(&self, x: Value, y: Value) -> Result<Option<Ordering>, RuntimeError> {
        match (x, y) {
            (Value::Integer(a), Value::Integer(b)) => Ok(Some(a.cmp(&b))),
            _ => match (x.as_number(), y.as_number()) {
                (Some(a), Some(b)) => Ok(a.partial_cmp(&b)),
                _ => Err(RuntimeError::TypeMismatch(format!(
                    "expected numbers for comparison, got {} and {}",
                    x.type_of(),
                    y.type_of()
                ))),
            },
        }
    }
}
