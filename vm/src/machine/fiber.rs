use crate::error::RuntimeError;
use crate::opcode::instruction::{decode_a, decode_b, decode_c};
use memory::{Fiber, FiberStatus, Value};
use tracing::trace;

use super::control::ControlFlowOps;
use super::stack::StackOps;
use super::vm::Signal;

/// Signal codes carried in operand C of the SIGNAL instruction.
pub const SIGNAL_ERROR: u8 = 1;
pub const SIGNAL_DEBUG: u8 = 2;
pub const SIGNAL_YIELD: u8 = 3;

/// Trait for the coroutine protocol: suspension and re-entry of fibers
pub trait FiberOps {
    fn new_fiber(&mut self, function: Value) -> Result<Value, RuntimeError>;

    fn resume_fiber(&mut self, handle: u32, value: Value) -> Result<Signal, RuntimeError>;

    fn handle_signal(
        &mut self,
        instruction: u32,
        base: usize,
        stop_depth: usize,
    ) -> Result<Signal, RuntimeError>;

    fn handle_resume(&mut self, instruction: u32, base: usize) -> Result<(), RuntimeError>;
}

impl FiberOps for super::vm::VM {
    fn new_fiber(&mut self, function: Value) -> Result<Value, RuntimeError> {
        match function {
            Value::Function(_) | Value::CFunction(_) => {
                Ok(Value::Fiber(self.heap.alloc_fiber(Fiber::new(function))))
            }
            other => Err(RuntimeError::TypeMismatch(format!(
                "fiber entry must be a function, got {}",
                other.type_of()
            ))),
        }
    }

    fn resume_fiber(&mut self, handle: u32, value: Value) -> Result<Signal, RuntimeError> {
        let status = self
            .heap
            .get_fiber(handle)
            .map(|f| f.status)
            .ok_or_else(|| RuntimeError::Unknown(format!("dangling fiber handle {}", handle)))?;
        if !status.is_resumable() {
            return Err(RuntimeError::Fiber(format!(
                "cannot resume fiber with status {}",
                status.name()
            )));
        }
        if self.parents.len() >= self.config.max_fiber_depth {
            return Err(RuntimeError::StackOverflow);
        }

        let child = self
            .heap
            .take_fiber(handle)
            .ok_or_else(|| RuntimeError::Unknown(format!("dangling fiber handle {}", handle)))?;
        let parent = std::mem::replace(&mut self.fiber, child);
        self.parents.push((self.current_fiber, parent));
        self.current_fiber = Some(handle);
        self.fiber.status = FiberStatus::Alive;
        trace!(fiber = handle, from = status.name(), "resume");

        let result = self.enter(status, value);

        let (parent_handle, parent) = self
            .parents
            .pop()
            .ok_or_else(|| RuntimeError::Unknown("fiber parent stack underflow".into()))?;
        let mut child = std::mem::replace(&mut self.fiber, parent);
        self.current_fiber = parent_handle;

        let signal = match result {
            Ok(Signal::Ok(v)) => {
                child.status = FiberStatus::Dead;
                Signal::Ok(v)
            }
            Ok(Signal::Yield(v)) => {
                child.status = FiberStatus::Pending;
                Signal::Yield(v)
            }
            Ok(Signal::Debug(v)) => {
                child.status = FiberStatus::Debug;
                Signal::Debug(v)
            }
            Ok(Signal::Error(v)) => {
                child.status = FiberStatus::Error;
                Signal::Error(v)
            }
            Err(e) => {
                child.status = FiberStatus::Error;
                Signal::Error(self.error_value(e))
            }
        };
        if matches!(child.status, FiberStatus::Dead | FiberStatus::Error) {
            child.frames.clear();
            child.stack.clear();
            child.pending.clear();
            child.resume_dest = None;
        }
        self.heap.restore_fiber(handle, child);
        Ok(signal)
    }

    fn handle_signal(
        &mut self,
        instruction: u32,
        base: usize,
        stop_depth: usize,
    ) -> Result<Signal, RuntimeError> {
        let a = decode_a(instruction) as usize;
        let b = decode_b(instruction) as usize;
        let code = decode_c(instruction);
        let value = self.get_reg(base, b)?;

        match code {
            SIGNAL_ERROR => return Err(RuntimeError::Raised(value)),
            SIGNAL_DEBUG | SIGNAL_YIELD => {}
            other => {
                return Err(RuntimeError::InvalidOperand(format!(
                    "unknown signal code {}",
                    other
                )))
            }
        }
        if self.current_fiber.is_none() {
            return Err(RuntimeError::UnhandledSignal);
        }
        if stop_depth != 0 {
            return Err(RuntimeError::Fiber(
                "cannot signal across a native call".into(),
            ));
        }

        self.fiber.resume_dest = Some(base + a);
        Ok(if code == SIGNAL_DEBUG {
            Signal::Debug(value)
        } else {
            Signal::Yield(value)
        })
    }

    fn handle_resume(&mut self, instruction: u32, base: usize) -> Result<(), RuntimeError> {
        // R[A] = resume(R[B], R[C])
        let a = decode_a(instruction) as usize;
        let b = decode_b(instruction) as usize;
        let c = decode_c(instruction) as usize;
        let target = self.get_reg(base, b)?;
        let value = self.get_reg(base, c)?;
        let signal = self.resume(target, value)?;
        self.set_reg(base, a, signal.value())
    }
}

impl super::vm::VM {
    /// Start or continue the fiber now installed as the running one.
    fn enter(&mut self, status: FiberStatus, value: Value) -> Result<Signal, RuntimeError> {
        if status == FiberStatus::New {
            match self.fiber.function {
                Value::Function(h) => {
                    let takes_args = self
                        .heap
                        .get_function(h)
                        .is_some_and(|f| f.def.arity > 0 || f.def.flags.is_vararg());
                    let args = if takes_args { vec![value] } else { Vec::new() };
                    self.push_frame(h, args, None)?;
                }
                Value::CFunction(idx) => {
                    return self.call_native(idx, vec![value]).map(Signal::Ok);
                }
                other => {
                    return Err(RuntimeError::TypeMismatch(format!(
                        "fiber entry must be a function, got {}",
                        other.type_of()
                    )))
                }
            }
        } else if let Some(dest) = self.fiber.resume_dest.take() {
            if let Some(slot) = self.fiber.stack.get_mut(dest) {
                *slot = value;
            }
        }
        self.run(0)
    }
}
