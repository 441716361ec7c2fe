use crate::config::VmConfig;
use crate::error::RuntimeError;
use crate::loader::{DynamicLoader, PlatformLoader};
use crate::native::NativeObj;
use crate::opcode::{instruction::*, OpCode};
use memory::{Fiber, FiberStatus, Heap, Value};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::io::Write;
use tracing::trace;

use super::arithmetic::ArithmeticOps;
use super::control::ControlFlowOps;
use super::data::DataOps;
use super::fiber::FiberOps;
use super::gc::GarbageCollector;
use super::stack::StackOps;

/// Outcome of running a fiber until it stops.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Signal {
    /// The entry function returned.
    Ok(Value),
    /// `yield` suspended the fiber.
    Yield(Value),
    /// `debug` suspended the fiber.
    Debug(Value),
    /// The fiber raised; carries the error value.
    Error(Value),
}

impl Signal {
    pub fn value(self) -> Value {
        match self {
            Signal::Ok(v) | Signal::Yield(v) | Signal::Debug(v) | Signal::Error(v) => v,
        }
    }
}

/// The Virtual Machine struct
pub struct VM {
    pub heap: Heap,
    pub natives: Vec<NativeObj>,
    /// Entry points already loaded by `native`, keyed by module path
    pub native_modules: HashMap<String, u32>,

    /// Values kept alive regardless of reachability
    pub roots: Vec<Value>,

    /// The running fiber. Host calls run on a root fiber with no heap handle.
    pub fiber: Fiber,
    /// Heap handle of the running fiber, `None` for the root fiber
    pub current_fiber: Option<u32>,
    /// Resumers suspended under the running fiber, innermost last
    pub parents: Vec<(Option<u32>, Fiber)>,

    /// Arguments of native calls in progress (GC roots)
    pub pinned: Vec<Value>,

    pub config: VmConfig,

    /// Platform layer behind the `native` primitive
    pub loader: Box<dyn DynamicLoader>,

    /// Sink for `print`
    pub output: Box<dyn Write>,

    /// Generator behind `math/random` and `math/seedrandom`
    pub rng: StdRng,

    pub(crate) gensym_counter: u32,
}

impl Default for VM {
    fn default() -> Self {
        Self::new()
    }
}

impl VM {
    pub fn new() -> Self {
        Self::with_config(VmConfig::default())
    }

    pub fn with_config(config: VmConfig) -> Self {
        let mut heap = Heap::new();
        heap.gc_interval = config.gc_interval;

        let mut root = Fiber::new(Value::Nil);
        root.status = FiberStatus::Alive;

        Self {
            heap,
            natives: Vec::new(),
            native_modules: HashMap::new(),
            roots: Vec::new(),
            fiber: root,
            current_fiber: None,
            parents: Vec::new(),
            pinned: Vec::new(),
            config,
            loader: Box::new(PlatformLoader::default()),
            output: Box::new(std::io::stdout()),
            rng: StdRng::seed_from_u64(0),
            gensym_counter: 0,
        }
    }

    pub fn set_output(&mut self, output: Box<dyn Write>) {
        self.output = output;
    }

    pub fn set_loader(&mut self, loader: Box<dyn DynamicLoader>) {
        self.loader = loader;
    }

    // --- Value helpers ---

    pub fn string_value(&mut self, s: &str) -> Value {
        Value::String(self.heap.alloc_string(s.as_bytes()))
    }

    pub fn symbol_value(&mut self, s: &str) -> Value {
        Value::Symbol(self.heap.intern(s.as_bytes()))
    }

    /// Tuple or array contents, copied out of the heap.
    pub fn sequence_items(&self, v: Value) -> Option<Vec<Value>> {
        self.heap.sequence(v).map(<[Value]>::to_vec)
    }

    /// Error value observed by `resume` when a fiber fails: the raised value
    /// itself, or the error message as a string.
    pub fn error_value(&mut self, err: RuntimeError) -> Value {
        match err {
            RuntimeError::Raised(v) => v,
            other => {
                let msg = other.to_string();
                self.string_value(&msg)
            }
        }
    }

    // --- Host API ---

    /// Call a function or cfunction with `args` on the running fiber and
    /// return its result. A `yield` that escapes the call is reported as
    /// [`RuntimeError::UnhandledSignal`].
    pub fn call(&mut self, callee: Value, args: &[Value]) -> Result<Value, RuntimeError> {
        match callee {
            Value::CFunction(idx) => self.call_native(idx, args.to_vec()),
            Value::Function(handle) => {
                let depth = self.fiber.frames.len();
                let stack_len = self.fiber.stack.len();
                let pending = std::mem::take(&mut self.fiber.pending);

                let result = match self.push_frame(handle, args.to_vec(), None) {
                    Ok(()) => self.run(depth),
                    Err(e) => Err(e),
                };

                self.fiber.frames.truncate(depth);
                self.fiber.stack.truncate(stack_len);
                self.fiber.pending = pending;

                match result? {
                    Signal::Ok(v) => Ok(v),
                    Signal::Error(v) => Err(RuntimeError::Raised(v)),
                    Signal::Yield(_) | Signal::Debug(_) => Err(RuntimeError::UnhandledSignal),
                }
            }
            other => Err(RuntimeError::TypeMismatch(format!(
                "cannot call value of type {}",
                other.type_of()
            ))),
        }
    }

    /// Resume a suspended fiber with `value`. Errors raised inside the
    /// fiber come back as [`Signal::Error`]; `Err` means the fiber could not
    /// be resumed at all.
    pub fn resume(&mut self, fiber: Value, value: Value) -> Result<Signal, RuntimeError> {
        match fiber {
            Value::Fiber(handle) => self.resume_fiber(handle, value),
            other => Err(RuntimeError::TypeMismatch(format!(
                "expected fiber, got {}",
                other.type_of()
            ))),
        }
    }

    /// Main interpretation loop.
    ///
    /// Runs the current fiber until the frame count drops back to
    /// `stop_depth` through a frame without a return slot, or until the
    /// fiber signals.
    pub(crate) fn run(&mut self, stop_depth: usize) -> Result<Signal, RuntimeError> {
        while self.fiber.frames.len() > stop_depth {
            // GC Check Point
            if self.config.stress_gc || self.heap.should_collect() {
                self.collect_garbage();
            }

            let frame_idx = self.fiber.frames.len() - 1;
            let (func_handle, ip, base) = {
                let f = &self.fiber.frames[frame_idx];
                (f.function, f.ip, f.base)
            };

            let instruction = {
                let func = self.heap.get_function(func_handle).ok_or_else(|| {
                    RuntimeError::Unknown(format!("dangling function handle {}", func_handle))
                })?;
                *func.def.bytecode.get(ip).ok_or_else(|| {
                    RuntimeError::OutOfBounds(format!(
                        "instruction pointer {} past the end of {}",
                        ip, func.def.name
                    ))
                })?
            };
            self.fiber.frames[frame_idx].ip += 1;

            let op_byte = decode_opcode(instruction);
            let op = OpCode::from_u8(op_byte).ok_or(RuntimeError::InvalidOpcode(op_byte))?;
            trace!(ip, op = op.name(), "step");

            match op {
                OpCode::Noop => {}

                // Arithmetic (delegated to arithmetic.rs)
                OpCode::Add
                | OpCode::Subtract
                | OpCode::Multiply
                | OpCode::Divide
                | OpCode::Band
                | OpCode::Bor
                | OpCode::Bxor
                | OpCode::ShiftLeft
                | OpCode::ShiftRight
                | OpCode::ShiftRightUnsigned
                | OpCode::Bnot
                | OpCode::AddImmediate => {
                    self.handle_arithmetic(op, instruction, base)?;
                }

                OpCode::GreaterThan
                | OpCode::LessThan
                | OpCode::Equals
                | OpCode::NumericGreaterThan
                | OpCode::NumericLessThan
                | OpCode::NumericGreaterThanEqual
                | OpCode::NumericLessThanEqual
                | OpCode::NumericEqual
                | OpCode::EqualsImmediate
                | OpCode::LessThanImmediate
                | OpCode::EqualsInteger => {
                    self.handle_comparison(op, instruction, base)?;
                }

                // Data structures (delegated to data.rs)
                OpCode::Get | OpCode::Put | OpCode::Length | OpCode::GetIndex => {
                    self.handle_data(op, instruction, base)?;
                }

                // Calls (delegated to control.rs)
                OpCode::Push
                | OpCode::PushArray
                | OpCode::Call
                | OpCode::TailCall
                | OpCode::Return
                | OpCode::ReturnNil => {
                    if let Some(ret) = self.handle_control(op, instruction, base)? {
                        return Ok(Signal::Ok(ret));
                    }
                }

                OpCode::LoadInteger => {
                    let a = decode_a(instruction) as usize;
                    let imm = decode_imm16(instruction) as i32;
                    self.set_reg(base, a, Value::int(imm))?;
                }

                OpCode::LoadTrue | OpCode::LoadFalse | OpCode::LoadNil => {
                    let a = decode_a(instruction) as usize;
                    let v = match op {
                        OpCode::LoadTrue => Value::bool(true),
                        OpCode::LoadFalse => Value::bool(false),
                        _ => Value::nil(),
                    };
                    self.set_reg(base, a, v)?;
                }

                OpCode::MoveNear => {
                    let a = decode_a(instruction) as usize;
                    let b = decode_b(instruction) as usize;
                    let v = self.get_reg(base, b)?;
                    self.set_reg(base, a, v)?;
                }

                // Control Flow - Jumps (relative to the jump itself)
                OpCode::Jump => {
                    let offset = decode_imm24(instruction);
                    self.jump(frame_idx, ip, offset)?;
                }

                OpCode::JumpIf | OpCode::JumpIfNot => {
                    let a = decode_a(instruction) as usize;
                    let offset = decode_imm16(instruction) as i32;
                    let truthy = self.get_reg(base, a)?.is_truthy();
                    if truthy == (op == OpCode::JumpIf) {
                        self.jump(frame_idx, ip, offset)?;
                    }
                }

                OpCode::Error => {
                    let a = decode_a(instruction) as usize;
                    return Err(RuntimeError::Raised(self.get_reg(base, a)?));
                }

                OpCode::Signal => {
                    return self.handle_signal(instruction, base, stop_depth);
                }

                OpCode::Resume => {
                    self.handle_resume(instruction, base)?;
                }
            }
        }

        // Only reached if a frame was unwound from under this loop
        Ok(Signal::Ok(Value::nil()))
    }

    fn jump(&mut self, frame_idx: usize, ip: usize, offset: i32) -> Result<(), RuntimeError> {
        let target = ip as i64 + offset as i64;
        if target < 0 {
            return Err(RuntimeError::OutOfBounds(format!(
                "jump from {} by {} lands before the function start",
                ip, offset
            )));
        }
        self.fiber.frames[frame_idx].ip = target as usize;
        Ok(())
    }
}
