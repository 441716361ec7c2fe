use crate::error::RuntimeError;
use memory::Value;

/// Trait for stack operations (registers of the running fiber)
pub trait StackOps {
    fn get_reg(&self, base: usize, reg: usize) -> Result<Value, RuntimeError>;
    fn set_reg(&mut self, base: usize, reg: usize, val: Value) -> Result<(), RuntimeError>;
}

impl StackOps for super::vm::VM {
    #[inline(always)]
    fn get_reg(&self, base: usize, reg: usize) -> Result<Value, RuntimeError> {
        self.fiber
            .stack
            .get(base + reg)
            .copied()
            .ok_or_else(|| RuntimeError::InvalidOperand(format!("register {} out of range", reg)))
    }

    #[inline(always)]
    fn set_reg(&mut self, base: usize, reg: usize, val: Value) -> Result<(), RuntimeError> {
        match self.fiber.stack.get_mut(base + reg) {
            Some(slot) => {
                *slot = val;
                Ok(())
            }
            None => Err(RuntimeError::InvalidOperand(format!(
                "register {} out of range",
                reg
            ))),
        }
    }
}
