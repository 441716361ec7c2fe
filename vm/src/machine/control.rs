use crate::error::RuntimeError;
use crate::opcode::{instruction::*, OpCode};
use memory::{Frame, Value};

use super::stack::StackOps;

/// Trait for control flow instruction handlers
pub trait ControlFlowOps {
    /// Handles the call family. `Some(v)` means a frame without a return
    /// slot finished with `v` and the run loop must stop.
    fn handle_control(
        &mut self,
        op: OpCode,
        instruction: u32,
        base: usize,
    ) -> Result<Option<Value>, RuntimeError>;

    /// Enter a bytecode function with `args` on the running fiber.
    fn push_frame(
        &mut self,
        handle: u32,
        args: Vec<Value>,
        ret_dest: Option<usize>,
    ) -> Result<(), RuntimeError>;

    fn call_native(&mut self, idx: u32, args: Vec<Value>) -> Result<Value, RuntimeError>;

    /// Pop the innermost frame, delivering `value` to its return slot.
    fn return_from_frame(&mut self, value: Value) -> Result<Option<Value>, RuntimeError>;
}

impl ControlFlowOps for super::vm::VM {
    fn handle_control(
        &mut self,
        op: OpCode,
        instruction: u32,
        base: usize,
    ) -> Result<Option<Value>, RuntimeError> {
        let a = decode_a(instruction) as usize;

        match op {
            OpCode::Push => {
                let v = self.get_reg(base, a)?;
                self.fiber.pending.push(v);
            }

            OpCode::PushArray => {
                let seq = self.get_reg(base, a)?;
                let items = self.sequence_items(seq).ok_or_else(|| {
                    RuntimeError::TypeMismatch(format!(
                        "expected array or tuple to spread, got {}",
                        seq.type_of()
                    ))
                })?;
                self.fiber.pending.extend(items);
            }

            OpCode::Call => {
                // R[A] = R[B](pending...)
                let b = decode_b(instruction) as usize;
                let callee = self.get_reg(base, b)?;
                let args = std::mem::take(&mut self.fiber.pending);
                match callee {
                    Value::Function(h) => self.push_frame(h, args, Some(base + a))?,
                    Value::CFunction(idx) => {
                        let result = self.call_native(idx, args)?;
                        self.set_reg(base, a, result)?;
                    }
                    other => {
                        return Err(RuntimeError::TypeMismatch(format!(
                            "cannot call value of type {}",
                            other.type_of()
                        )))
                    }
                }
            }

            OpCode::TailCall => {
                let callee = self.get_reg(base, a)?;
                let args = std::mem::take(&mut self.fiber.pending);
                match callee {
                    Value::Function(h) => {
                        let frame = self.fiber.frames.pop().ok_or_else(|| {
                            RuntimeError::Unknown("tail call without a frame".into())
                        })?;
                        self.fiber.stack.truncate(frame.base);
                        self.push_frame(h, args, frame.ret_dest)?;
                    }
                    Value::CFunction(idx) => {
                        let result = self.call_native(idx, args)?;
                        return self.return_from_frame(result);
                    }
                    other => {
                        return Err(RuntimeError::TypeMismatch(format!(
                            "cannot call value of type {}",
                            other.type_of()
                        )))
                    }
                }
            }

            OpCode::Return => {
                let v = self.get_reg(base, a)?;
                return self.return_from_frame(v);
            }

            OpCode::ReturnNil => return self.return_from_frame(Value::Nil),

            other => {
                return Err(RuntimeError::InvalidOperand(format!(
                    "{} is not a control instruction",
                    other
                )))
            }
        }

        Ok(None)
    }

    fn push_frame(
        &mut self,
        handle: u32,
        args: Vec<Value>,
        ret_dest: Option<usize>,
    ) -> Result<(), RuntimeError> {
        if self.fiber.frames.len() >= self.config.max_call_depth {
            return Err(RuntimeError::StackOverflow);
        }

        let def = self
            .heap
            .get_function(handle)
            .map(|f| f.def.clone())
            .ok_or_else(|| RuntimeError::Unknown(format!("dangling function handle {}", handle)))?;

        let arity = def.arity as usize;
        let vararg = def.flags.is_vararg();
        if (!vararg && args.len() != arity) || args.len() < arity {
            return Err(RuntimeError::ArityMismatch(format!(
                "{} expects {}{} arguments, got {}",
                def.name,
                if vararg { "at least " } else { "" },
                arity,
                args.len()
            )));
        }

        let mut regs = args;
        if vararg {
            let rest = regs.split_off(arity);
            let tuple = self.heap.alloc_tuple(rest);
            regs.push(Value::Tuple(tuple));
        }

        let base = self.fiber.stack.len();
        let size = (def.slot_count as usize).max(regs.len());
        self.fiber.stack.extend(regs);
        self.fiber.stack.resize(base + size, Value::Nil);
        self.fiber.frames.push(Frame::new(handle, base, ret_dest));
        Ok(())
    }

    fn call_native(&mut self, idx: u32, args: Vec<Value>) -> Result<Value, RuntimeError> {
        let func = {
            let native = self.natives.get(idx as usize).ok_or_else(|| {
                RuntimeError::Unknown(format!("unknown native function {}", idx))
            })?;
            if native.arity >= 0 && args.len() != native.arity as usize {
                return Err(RuntimeError::ArityMismatch(format!(
                    "{} expects {} arguments, got {}",
                    native.name,
                    native.arity,
                    args.len()
                )));
            }
            native.func
        };

        // Arguments stay reachable for the duration of the call
        let mark = self.pinned.len();
        self.pinned.extend_from_slice(&args);
        let result = func(self, &args);
        self.pinned.truncate(mark);
        result
    }

    fn return_from_frame(&mut self, value: Value) -> Result<Option<Value>, RuntimeError> {
        let frame = self
            .fiber
            .frames
            .pop()
            .ok_or_else(|| RuntimeError::Unknown("return without a frame".into()))?;
        self.fiber.stack.truncate(frame.base);
        match frame.ret_dest {
            Some(dest) => {
                let slot = self.fiber.stack.get_mut(dest).ok_or_else(|| {
                    RuntimeError::OutOfBounds(format!("return slot {} past the stack", dest))
                })?;
                *slot = value;
                Ok(None)
            }
            None => Ok(Some(value)),
        }
    }
}
